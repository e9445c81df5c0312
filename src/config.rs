use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub llm: LlmConfig,

    #[serde(default)]
    pub liturgy: LiturgyConfig,

    #[serde(default)]
    pub script: ScriptConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    pub provider: String, // "groq", "openai" or "ollama"
    pub groq: Option<GroqConfig>,
    pub openai: Option<OpenAIConfig>,
    pub ollama: Option<OllamaConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GroqConfig {
    /// Falls back to the GROQ_API_KEY environment variable when unset.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_groq_model")]
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LiturgyConfig {
    #[serde(default = "default_primary_base_url")]
    pub primary_base_url: String,

    #[serde(default = "default_secondary_base_url")]
    pub secondary_base_url: String,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScriptConfig {
    /// Also ask the model for one image-generation prompt per part plus a
    /// thumbnail prompt.
    #[serde(default)]
    pub visual_prompts: bool,

    #[serde(default = "default_detect_characters")]
    pub detect_characters: bool,

    /// Gospel text is truncated to this many characters before being put in
    /// the prompt. Deliberately lossy to bound request size.
    #[serde(default = "default_max_gospel_chars")]
    pub max_gospel_chars: usize,
}

impl Default for LiturgyConfig {
    fn default() -> Self {
        Self {
            primary_base_url: default_primary_base_url(),
            secondary_base_url: default_secondary_base_url(),
            fetch_timeout_seconds: default_fetch_timeout(),
        }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            visual_prompts: false,
            detect_characters: default_detect_characters(),
            max_gospel_chars: default_max_gospel_chars(),
        }
    }
}

fn default_groq_model() -> String {
    "llama3-70b-8192".to_string()
}
fn default_ollama_base_url() -> String {
    "http://127.0.0.1:11434".to_string()
}
fn default_primary_base_url() -> String {
    "https://api-liturgia-diaria.vercel.app".to_string()
}
fn default_secondary_base_url() -> String {
    "https://liturgia.up.railway.app".to_string()
}
fn default_fetch_timeout() -> u64 {
    10
}
fn default_detect_characters() -> bool {
    true
}
fn default_max_gospel_chars() -> usize {
    2000
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Path::new("config.yml");
        if !path.exists() {
            anyhow::bail!("config.yml not found. Please create one.");
        }
        Self::load_from(path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config =
            serde_yaml_ng::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let content = serde_yaml_ng::to_string(self)?;
        fs::write("config.yml", content).context("Failed to write config.yml")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let yaml = "llm:\n  provider: groq\n  groq:\n    api_key: sk-abc\n";
        let config: Config = serde_yaml_ng::from_str(yaml).unwrap();

        assert_eq!(config.llm.provider, "groq");
        assert_eq!(config.llm.groq.unwrap().model, "llama3-70b-8192");
        assert_eq!(config.liturgy.fetch_timeout_seconds, 10);
        assert_eq!(
            config.liturgy.primary_base_url,
            "https://api-liturgia-diaria.vercel.app"
        );
        assert_eq!(config.script.max_gospel_chars, 2000);
        assert!(config.script.detect_characters);
        assert!(!config.script.visual_prompts);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "llm:\n  provider: ollama\n  ollama:\n    model: llama3\nscript:\n  visual_prompts: true\n"
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.ollama.unwrap().base_url, "http://127.0.0.1:11434");
        assert!(config.script.visual_prompts);
    }

    #[test]
    fn test_missing_llm_section_is_an_error() {
        assert!(serde_yaml_ng::from_str::<Config>("liturgy: {}\n").is_err());
    }
}
