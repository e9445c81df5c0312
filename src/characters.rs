use crate::error::LlmError;
use crate::llm::{ChatParams, LlmClient};
use log::info;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

const DETECT_PARAMS: ChatParams = ChatParams {
    temperature: 0.3,
    max_tokens: 600,
};

/// Recurring cast of biblical characters mapped to visual descriptions for
/// image generation. Session-scoped, owned by the caller; name is the unique
/// key and the last write wins.
#[derive(Debug, Clone)]
pub struct CharacterRegistry {
    characters: HashMap<String, String>,
}

impl CharacterRegistry {
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.upsert(
            "Jesus",
            "Homem de cerca de 33 anos, cabelos castanhos na altura dos ombros, barba, \
             túnica branca com manto vermelho, olhar sereno e acolhedor",
        );
        registry.upsert(
            "Maria",
            "Mulher de semblante doce, véu azul claro sobre os cabelos, túnica branca simples",
        );
        registry.upsert(
            "Pedro",
            "Pescador robusto de meia-idade, barba grisalha cheia, túnica marrom de tecido rústico",
        );
        registry.upsert(
            "João",
            "Jovem de cabelos escuros compridos, rosto sem barba, túnica verde-oliva",
        );
        registry.upsert(
            "Maria Madalena",
            "Mulher de cabelos ruivos longos, manto terracota sobre túnica clara",
        );
        registry
    }

    pub fn empty() -> Self {
        Self {
            characters: HashMap::new(),
        }
    }

    pub fn all(&self) -> &HashMap<String, String> {
        &self.characters
    }

    /// Names in stable alphabetical order, for prompts and display.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.characters.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.characters.get(name).map(String::as_str)
    }

    pub fn upsert(&mut self, name: &str, description: &str) {
        self.characters
            .insert(name.to_string(), description.to_string());
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.characters.remove(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

const SYSTEM_PROMPT: &str = "\
Você analisa leituras do Evangelho e identifica os personagens bíblicos que aparecem no texto.

Responda EXATAMENTE neste formato, sem comentários adicionais:
CONHECIDOS: nomes da lista fornecida que aparecem no texto, separados por ponto e vírgula
NOVOS: personagens do texto que NÃO estão na lista, no formato nome|descrição visual detalhada, separados por vírgula

Se uma seção não tiver personagens, deixe-a vazia após o rótulo.";

fn conhecidos_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)CONHECIDOS:\s*(.*?)(?:\n\s*NOVOS:|\z)").unwrap())
}

fn novos_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)NOVOS:\s*(.*)").unwrap())
}

/// Asks the LLM which characters appear in the Gospel text and reconciles
/// against the registry. Newly proposed characters are persisted into the
/// registry immediately, so a character keeps the same description across
/// requests.
pub async fn detect(
    llm: &dyn LlmClient,
    gospel_text: &str,
    registry: &mut CharacterRegistry,
) -> Result<HashMap<String, String>, LlmError> {
    let known_names = registry.names().join("; ");
    let user_prompt = format!(
        "Personagens já cadastrados: [{}]\n\nTexto do Evangelho:\n{}\n\n\
         Liste os personagens conforme o formato pedido.",
        known_names, gospel_text
    );

    let response = llm.chat(SYSTEM_PROMPT, &user_prompt, DETECT_PARAMS).await?;
    let (known, new) = parse_detection(&response);

    let mut detected = HashMap::new();
    for name in known {
        if let Some(description) = registry.get(&name) {
            detected.insert(name, description.to_string());
        }
    }
    for (name, description) in new {
        info!("New character detected: {}", name);
        registry.upsert(&name, &description);
        detected.insert(name, description);
    }

    Ok(detected)
}

/// Splits the two labeled sections. A label with nothing after it parses to
/// an empty list, not an error.
fn parse_detection(response: &str) -> (Vec<String>, Vec<(String, String)>) {
    let known = conhecidos_re()
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("nenhum"))
        .map(str::to_string)
        .collect();

    let new = novos_re()
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or_default()
        .split(',')
        .filter_map(|pair| {
            let (name, description) = pair.split_once('|')?;
            let name = name.trim();
            let description = description.trim();
            if name.is_empty() || description.is_empty() {
                return None;
            }
            Some((name.to_string(), description.to_string()))
        })
        .collect();

    (known, new)
}
