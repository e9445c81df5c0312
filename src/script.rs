use crate::config::Config;
use crate::error::LlmError;
use crate::llm::{ChatParams, LlmClient};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// The five named segments of a devotional short-video script, in delivery
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptPart {
    Hook,
    Reading,
    Reflection,
    Application,
    Prayer,
}

impl ScriptPart {
    pub const ALL: [ScriptPart; 5] = [
        ScriptPart::Hook,
        ScriptPart::Reading,
        ScriptPart::Reflection,
        ScriptPart::Application,
        ScriptPart::Prayer,
    ];

    /// Output label as requested from the model, accents included.
    pub fn label(&self) -> &'static str {
        match self {
            ScriptPart::Hook => "HOOK",
            ScriptPart::Reading => "LEITURA",
            ScriptPart::Reflection => "REFLEXÃO",
            ScriptPart::Application => "APLICAÇÃO",
            ScriptPart::Prayer => "ORAÇÃO",
        }
    }

    /// Accent-stripped form used for tolerant label matching.
    fn canonical(&self) -> &'static str {
        match self {
            ScriptPart::Hook => "HOOK",
            ScriptPart::Reading => "LEITURA",
            ScriptPart::Reflection => "REFLEXAO",
            ScriptPart::Application => "APLICACAO",
            ScriptPart::Prayer => "ORACAO",
        }
    }

    fn visual_canonical(&self) -> String {
        format!("PROMPT_{}", self.canonical())
    }
}

const PROMPT_GERAL: &str = "PROMPT_GERAL";

/// All five parts are always present; a part the model failed to produce
/// holds the placeholder text instead, so callers never need to check for
/// missing keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptParts {
    pub hook: String,
    pub reading: String,
    pub reflection: String,
    pub application: String,
    pub prayer: String,
}

impl ScriptParts {
    pub fn get(&self, part: ScriptPart) -> &str {
        match part {
            ScriptPart::Hook => &self.hook,
            ScriptPart::Reading => &self.reading,
            ScriptPart::Reflection => &self.reflection,
            ScriptPart::Application => &self.application,
            ScriptPart::Prayer => &self.prayer,
        }
    }

    pub fn set(&mut self, part: ScriptPart, content: String) {
        match part {
            ScriptPart::Hook => self.hook = content,
            ScriptPart::Reading => self.reading = content,
            ScriptPart::Reflection => self.reflection = content,
            ScriptPart::Application => self.application = content,
            ScriptPart::Prayer => self.prayer = content,
        }
    }
}

/// Image-generation prompts, one per part plus a thumbnail prompt. A label
/// the model skipped degrades to an empty string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisualPrompts {
    pub hook: String,
    pub reading: String,
    pub reflection: String,
    pub application: String,
    pub prayer: String,
    pub general: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptRecord {
    pub parts: ScriptParts,
    pub visual_prompts: Option<VisualPrompts>,
}

pub fn placeholder(part: ScriptPart) -> String {
    format!("[Parte {} não foi gerada pela IA]", part.label())
}

/// Builds the constrained prompt, invokes the LLM once and parses the
/// fixed-format response.
pub struct ScriptGenerator {
    max_gospel_chars: usize,
    visual_prompts: bool,
}

impl ScriptGenerator {
    pub fn new(config: &Config) -> Self {
        Self {
            max_gospel_chars: config.script.max_gospel_chars,
            visual_prompts: config.script.visual_prompts,
        }
    }

    pub async fn generate(
        &self,
        llm: &dyn LlmClient,
        gospel_text: &str,
        liturgical_reference: &str,
        characters: &HashMap<String, String>,
    ) -> Result<ScriptRecord, LlmError> {
        let system = self.system_prompt(characters);
        let user = self.user_prompt(gospel_text, liturgical_reference);

        let params = ChatParams {
            temperature: 0.7,
            max_tokens: if self.visual_prompts { 1600 } else { 1200 },
        };

        let response = llm.chat(&system, &user, params).await?;
        Ok(parse_script(&response, self.visual_prompts))
    }

    fn system_prompt(&self, characters: &HashMap<String, String>) -> String {
        let mut prompt = String::from(
            "Você cria roteiros católicos para vídeos curtos (TikTok/Reels) em português do Brasil.\n\n\
             Sempre responda EXATAMENTE neste formato, com 5 partes, cada uma iniciando com o título em maiúsculas:\n\
             HOOK: uma ou duas frases curtas (5-8 segundos) que criem curiosidade sobre o Evangelho.\n\
             LEITURA: 'Proclamação do Evangelho de Jesus Cristo, segundo [evangelista]. [referência]. Glória a vós, Senhor!' \
             + o texto limpo do Evangelho adaptado para leitura em vídeo + 'Palavra da Salvação. Glória a vós, Senhor!'.\n\
             REFLEXÃO: meditação devocional de 20-25 segundos (2-3 frases) conectando o Evangelho com a vida espiritual.\n\
             APLICAÇÃO: 'Evangelho na sua vida hoje' em 20-25 segundos, bem prática.\n\
             ORAÇÃO: oração curta (20-25 segundos), simples e sincera, inspirada no Evangelho.\n\n\
             Nenhuma parte pode repetir o conteúdo de outra parte nem usar o título de outra parte no texto.\n",
        );

        if !characters.is_empty() {
            let mut names: Vec<&String> = characters.keys().collect();
            names.sort();
            prompt.push_str(
                "\nPersonagens deste Evangelho, com descrições visuais que devem ser reutilizadas \
                 EXATAMENTE como fornecidas sempre que citadas:\n",
            );
            for name in names {
                prompt.push_str(&format!("- {}: {}\n", name, characters[name]));
            }
        }

        if self.visual_prompts {
            prompt.push_str(
                "\nApós as 5 partes, gere também um prompt de geração de imagem para cada parte \
                 e um prompt geral para a thumbnail, cada um em uma linha própria:\n\
                 PROMPT_HOOK: ...\nPROMPT_LEITURA: ...\nPROMPT_REFLEXÃO: ...\n\
                 PROMPT_APLICAÇÃO: ...\nPROMPT_ORAÇÃO: ...\nPROMPT_GERAL: ...\n",
            );
        }

        prompt.push_str(
            "\nFormato exato da resposta (sem comentários adicionais):\n\
             HOOK: ...\nLEITURA: ...\nREFLEXÃO: ...\nAPLICAÇÃO: ...\nORAÇÃO: ...",
        );

        prompt
    }

    fn user_prompt(&self, gospel_text: &str, liturgical_reference: &str) -> String {
        // Long readings lose their tail here on purpose, to bound request
        // size.
        let truncated: String = gospel_text.chars().take(self.max_gospel_chars).collect();
        format!(
            "Evangelho do dia: {}\n\nTexto (sem números de versículos):\n{}\n\n\
             Gere o roteiro completo no formato exato pedido.",
            liturgical_reference, truncated
        )
    }
}

fn label_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*([\p{L}_]{3,})[ \t]*:").unwrap())
}

/// Uppercases and strips the accents the model may or may not reproduce, so
/// "APLICACAO" and "APLICAÇÃO" match the same label.
fn canonical_label(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_uppercase)
        .map(|c| match c {
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

fn recognized_labels() -> Vec<String> {
    let mut labels: Vec<String> = ScriptPart::ALL
        .iter()
        .map(|p| p.canonical().to_string())
        .collect();
    labels.extend(ScriptPart::ALL.iter().map(|p| p.visual_canonical()));
    labels.push(PROMPT_GERAL.to_string());
    labels
}

/// Splits the response at every recognized `LABEL:` line. Each section runs
/// until the next recognized label or the end of text; unrecognized labels
/// do not break a section. First occurrence of a label wins.
fn extract_sections(response: &str) -> HashMap<String, String> {
    let recognized = recognized_labels();
    let mut boundaries = Vec::new();

    for caps in label_line_re().captures_iter(response) {
        let whole = caps.get(0).expect("match always has group 0");
        let canon = canonical_label(&caps[1]);
        if recognized.contains(&canon) {
            boundaries.push((whole.start(), whole.end(), canon));
        }
    }

    let mut sections = HashMap::new();
    for (i, (_, content_start, canon)) in boundaries.iter().enumerate() {
        let content_end = boundaries
            .get(i + 1)
            .map(|b| b.0)
            .unwrap_or(response.len());
        let content = response[*content_start..content_end].trim().to_string();
        sections.entry(canon.clone()).or_insert(content);
    }
    sections
}

/// Deterministic parse of the model response. Never fails: missing parts get
/// the placeholder, missing visual prompts degrade to empty strings.
pub fn parse_script(response: &str, want_visuals: bool) -> ScriptRecord {
    let sections = extract_sections(response);

    let mut parts = ScriptParts::default();
    for part in ScriptPart::ALL {
        let content = sections
            .get(part.canonical())
            .filter(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| placeholder(part));
        parts.set(part, content);
    }

    let visual_prompts = if want_visuals {
        let lookup = |key: &str| sections.get(key).cloned().unwrap_or_default();
        Some(VisualPrompts {
            hook: lookup(&ScriptPart::Hook.visual_canonical()),
            reading: lookup(&ScriptPart::Reading.visual_canonical()),
            reflection: lookup(&ScriptPart::Reflection.visual_canonical()),
            application: lookup(&ScriptPart::Application.visual_canonical()),
            prayer: lookup(&ScriptPart::Prayer.visual_canonical()),
            general: lookup(PROMPT_GERAL),
        })
    } else {
        None
    };

    ScriptRecord {
        parts,
        visual_prompts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    const FULL_RESPONSE: &str = "\
HOOK: Você sabia que uma frase pode mudar o seu dia?
LEITURA: Proclamação do Evangelho de Jesus Cristo, segundo São João. Glória a vós, Senhor!
REFLEXÃO: Este Evangelho nos lembra que não estamos sozinhos.
Cada passo é acompanhado por Deus.
APLICAÇÃO: Hoje, escolha uma pessoa para ouvir com atenção de verdade.
ORAÇÃO: Senhor Jesus, obrigado por tua Palavra. Amém.";

    #[test]
    fn test_parses_all_five_parts_without_leakage() {
        let record = parse_script(FULL_RESPONSE, false);
        let parts = &record.parts;

        assert_eq!(parts.hook, "Você sabia que uma frase pode mudar o seu dia?");
        assert!(parts.reading.starts_with("Proclamação do Evangelho"));
        assert_eq!(
            parts.reflection,
            "Este Evangelho nos lembra que não estamos sozinhos.\nCada passo é acompanhado por Deus."
        );
        assert_eq!(
            parts.application,
            "Hoje, escolha uma pessoa para ouvir com atenção de verdade."
        );
        assert_eq!(parts.prayer, "Senhor Jesus, obrigado por tua Palavra. Amém.");

        for part in ScriptPart::ALL {
            for other in ScriptPart::ALL {
                if part != other {
                    assert!(!parts.get(part).contains(parts.get(other)));
                }
            }
        }
        assert!(record.visual_prompts.is_none());
    }

    #[test]
    fn test_missing_prayer_gets_placeholder() {
        let response = "\
HOOK: Uma pergunta para você.
LEITURA: Texto da leitura.
REFLEXÃO: Uma meditação.
APLICAÇÃO: Uma prática.";
        let record = parse_script(response, false);

        assert_eq!(record.parts.prayer, "[Parte ORAÇÃO não foi gerada pela IA]");
        assert_eq!(record.parts.hook, "Uma pergunta para você.");
    }

    #[test]
    fn test_accent_free_and_lowercase_labels_match() {
        let response = "\
hook: Olá!
leitura: Texto.
reflexao: Pensamento.
aplicacao: Prática.
oracao: Amém.";
        let record = parse_script(response, false);

        assert_eq!(record.parts.reflection, "Pensamento.");
        assert_eq!(record.parts.application, "Prática.");
        assert_eq!(record.parts.prayer, "Amém.");
    }

    #[test]
    fn test_unrecognized_label_does_not_split_section() {
        let response = "\
HOOK: Primeira linha.
OBSERVACAO: isto pertence ao hook.
LEITURA: Texto.
REFLEXÃO: R.
APLICAÇÃO: A.
ORAÇÃO: O.";
        let record = parse_script(response, false);
        assert!(record.parts.hook.contains("isto pertence ao hook"));
    }

    #[test]
    fn test_visual_prompts_parsed_and_missing_degrade_to_empty() {
        let response = format!(
            "{}\nPROMPT_HOOK: Nascer do sol sobre o mar da Galileia\nPROMPT_GERAL: Thumbnail dourada com cruz",
            FULL_RESPONSE
        );
        let record = parse_script(&response, true);
        let visuals = record.visual_prompts.unwrap();

        assert_eq!(visuals.hook, "Nascer do sol sobre o mar da Galileia");
        assert_eq!(visuals.general, "Thumbnail dourada com cruz");
        assert_eq!(visuals.prayer, "");
        // The prompt labels must not leak into the prayer part.
        assert_eq!(
            record.parts.prayer,
            "Senhor Jesus, obrigado por tua Palavra. Amém."
        );
    }

    #[test]
    fn test_accented_prompt_labels_match() {
        let response = format!("{}\nPROMPT_ORAÇÃO: Mãos postas à luz de velas", FULL_RESPONSE);
        let record = parse_script(&response, true);
        assert_eq!(
            record.visual_prompts.unwrap().prayer,
            "Mãos postas à luz de velas"
        );
    }

    #[test]
    fn test_garbage_response_yields_placeholders_everywhere() {
        let record = parse_script("o modelo divagou e não usou rótulo algum", false);
        for part in ScriptPart::ALL {
            assert_eq!(record.parts.get(part), placeholder(part));
        }
    }

    #[derive(Debug)]
    struct StubLlm;

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn chat(
            &self,
            system: &str,
            user: &str,
            _params: ChatParams,
        ) -> Result<String, LlmError> {
            assert!(system.contains("HOOK:"));
            assert!(user.contains("Evangelho do dia"));
            Ok(FULL_RESPONSE.to_string())
        }
    }

    #[tokio::test]
    async fn test_generate_end_to_end_with_stub() {
        let config: crate::config::Config = serde_yaml_ng::from_str(
            "llm:\n  provider: groq\n  groq:\n    api_key: sk-test\n",
        )
        .unwrap();
        let generator = ScriptGenerator::new(&config);

        let mut characters = HashMap::new();
        characters.insert("Jesus".to_string(), "Túnica branca".to_string());

        let record = generator
            .generate(&StubLlm, "Texto do Evangelho.", "Jo 14, 1-6", &characters)
            .await
            .unwrap();
        assert!(record.parts.hook.contains("mudar o seu dia"));
    }

    #[test]
    fn test_gospel_text_is_truncated_in_prompt() {
        let config: crate::config::Config = serde_yaml_ng::from_str(
            "llm:\n  provider: groq\n  groq:\n    api_key: sk-test\nscript:\n  max_gospel_chars: 10\n",
        )
        .unwrap();
        let generator = ScriptGenerator::new(&config);

        let user = generator.user_prompt("abcdefghijKLMNOP", "ref");
        assert!(user.contains("abcdefghij"));
        assert!(!user.contains("KLMNOP"));
    }

    #[test]
    fn test_system_prompt_lists_characters() {
        let config: crate::config::Config =
            serde_yaml_ng::from_str("llm:\n  provider: groq\n  groq: {}\n").unwrap();
        let generator = ScriptGenerator::new(&config);

        let mut characters = HashMap::new();
        characters.insert("Pedro".to_string(), "Pescador robusto".to_string());
        let system = generator.system_prompt(&characters);

        assert!(system.contains("- Pedro: Pescador robusto"));
    }
}
