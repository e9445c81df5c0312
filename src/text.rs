use regex::Regex;
use std::sync::OnceLock;

fn bracketed_verse_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\d+\]").unwrap())
}

fn fused_verse_re() -> &'static Regex {
    // A 1-3 digit verse number glued to the first letter of the verse,
    // e.g. "1Jesus" or "12Naquele". Longer numbers are left alone.
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{1,3}(\p{L})").unwrap())
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s{2,}").unwrap())
}

/// Strips verse-number artifacts from a Gospel body and re-flows it into a
/// single line suitable for read-aloud delivery. Idempotent.
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let text = raw.replace(['\r', '\n'], " ");
    let text = bracketed_verse_re().replace_all(&text, "");
    let text = fused_verse_re().replace_all(&text, "$1");
    let text = whitespace_re().replace_all(&text, " ");
    text.trim().to_string()
}
