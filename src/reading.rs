use crate::reference::BiblicalReference;

const GENERIC_EVANGELIST: &str = "o Evangelista";

/// Wraps the cleaned Gospel text in the fixed liturgical opening and closing
/// formulas. Never LLM-generated: the proclaimed reading must be the literal
/// scripture text, not a paraphrase.
pub fn assemble(gospel_text: &str, reference: Option<&BiblicalReference>) -> String {
    let opening = match reference {
        Some(r) => format!(
            "Proclamação do Evangelho de Jesus Cristo, segundo São {}, Capítulo {}, versículos {}.",
            r.evangelist, r.chapter, r.verses
        ),
        None => format!(
            "Proclamação do Evangelho de Jesus Cristo, segundo {}.",
            GENERIC_EVANGELIST
        ),
    };

    format!(
        "{} Glória a vós, Senhor! {} Palavra da Salvação. Glória a vós, Senhor!",
        opening,
        gospel_text.trim()
    )
}
