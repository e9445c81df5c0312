use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Structured evangelist/chapter/verse citation parsed out of a liturgical
/// title such as "Evangelho de Jesus Cristo segundo São João 14, 1-6".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiblicalReference {
    pub evangelist: String,
    pub chapter: String,
    pub verses: String,
}

fn title_re() -> &'static Regex {
    // "segundo [São] <Evangelista> <capítulo>, <versículos>" where the verse
    // range may use a hyphen or an en-dash.
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"segundo\s+(?:(?:S\.|São|Santo|Santa)\s+)?(\p{Lu}\p{L}*)\s*,?\s+(\d+)\s*,\s*(\d+(?:\s*[-–]\s*\d+)?)",
        )
        .unwrap()
    })
}

fn verse_sep_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*[-–]\s*").unwrap())
}

/// Extracts the biblical reference from a title, or `None` when the title
/// does not follow the expected grammar. The verse-range separator is
/// rewritten for spoken display ("15-20" becomes "15 a 20").
pub fn extract(title: &str) -> Option<BiblicalReference> {
    let caps = title_re().captures(title)?;
    let verses = verse_sep_re()
        .replace_all(caps.get(3)?.as_str(), " a ")
        .to_string();

    Some(BiblicalReference {
        evangelist: caps.get(1)?.as_str().to_string(),
        chapter: caps.get(2)?.as_str().to_string(),
        verses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_with_honorific() {
        let r = extract("Evangelho de Jesus Cristo segundo São João 14, 1-6").unwrap();
        assert_eq!(r.evangelist, "João");
        assert_eq!(r.chapter, "14");
        assert_eq!(r.verses, "1 a 6");
    }

    #[test]
    fn test_extracts_without_honorific() {
        let r = extract("Proclamação do Evangelho segundo Marcos 16, 15-20").unwrap();
        assert_eq!(r.evangelist, "Marcos");
        assert_eq!(r.chapter, "16");
        assert_eq!(r.verses, "15 a 20");
    }

    #[test]
    fn test_en_dash_range() {
        let r = extract("segundo São Lucas 2, 1–14").unwrap();
        assert_eq!(r.verses, "1 a 14");
    }

    #[test]
    fn test_single_verse() {
        let r = extract("segundo São Mateus 5, 3").unwrap();
        assert_eq!(r.verses, "3");
    }

    #[test]
    fn test_verses_never_keep_a_dash() {
        for title in [
            "segundo São João 6, 41-51",
            "segundo Marcos 1, 2–8",
            "segundo Santo Mateus 28, 16-20",
        ] {
            let r = extract(title).unwrap();
            assert!(!r.verses.contains('-') && !r.verses.contains('–'));
            assert!(r.verses.contains(" a "));
        }
    }

    #[test]
    fn test_non_matching_titles() {
        assert!(extract("").is_none());
        assert!(extract("Evangelho do dia").is_none());
        assert!(extract("Leitura do livro do profeta Isaías").is_none());
        assert!(extract("segundo a tradição").is_none());
    }
}
