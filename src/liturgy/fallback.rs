use super::{LiturgyRecord, LiturgySourceKind, DEFAULT_REFERENCE};
use crate::error::LiturgyError;
use crate::llm::{ChatParams, LlmClient};
use regex::Regex;
use std::sync::OnceLock;

const FALLBACK_TITLE: &str = "Evangelho do dia (gerado por IA)";

const FALLBACK_PARAMS: ChatParams = ChatParams {
    temperature: 0.4,
    max_tokens: 800,
};

const SYSTEM_PROMPT: &str = "\
Você é um teólogo e liturgista católico.
Para a data informada, gere UMA proposta de Evangelho do dia, EM TEXTO COMPLETO, \
como se fosse lido na Missa, sem números de versículos.

Responda APENAS neste formato, em português do Brasil:
REFERENCIA: Evangelho de Jesus Cristo segundo São ... [capítulo, versículos]
TEXTO: [texto completo do Evangelho, pronto para ser lido em voz alta, sem números de versículos]";

fn referencia_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"REFERENCIA:\s*(.+)").unwrap())
}

fn texto_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)TEXTO:\s*(.+)").unwrap())
}

/// Last-resort Gospel, generated when no liturgy API responded. An LLM
/// failure propagates to the caller; the resolver must not present a failed
/// fallback as success.
pub async fn generate_gospel(llm: &dyn LlmClient, date: &str) -> Result<LiturgyRecord, LiturgyError> {
    let user_prompt = format!(
        "Data litúrgica: {}.\n\n\
         Gere uma referência e o texto COMPLETO de um Evangelho apropriado para esse dia, \
         seguindo o formato acima, sem comentários adicionais.",
        date
    );

    let response = llm.chat(SYSTEM_PROMPT, &user_prompt, FALLBACK_PARAMS).await?;
    let (reference, text) = parse_response(&response);

    LiturgyRecord::from_raw(LiturgySourceKind::LlmFallback, FALLBACK_TITLE, &reference, &text)
        .ok_or_else(|| LiturgyError::Exhausted {
            date: date.to_string(),
        })
}

/// Single-pass label extraction. A missing REFERENCIA degrades to the
/// placeholder; a missing TEXTO means the whole response is the text.
fn parse_response(response: &str) -> (String, String) {
    let reference = referencia_re()
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| DEFAULT_REFERENCE.to_string());

    let text = texto_re()
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| response.trim().to_string());

    (reference, text)
}
