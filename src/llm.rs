use crate::config::Config;
use crate::error::LlmError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

const LLM_TIMEOUT: Duration = Duration::from_secs(60);
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Per-call generation knobs. Each pipeline stage tunes these differently
/// (low temperature for detection, higher for script prose).
#[derive(Debug, Clone, Copy)]
pub struct ChatParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait LlmClient: Send + Sync + Debug {
    async fn chat(&self, system: &str, user: &str, params: ChatParams) -> Result<String, LlmError>;
}

/// Builds the configured LLM client. Credentials are validated here so a
/// missing key fails at startup, not halfway through a pipeline run.
pub fn create_llm(config: &Config) -> Result<Box<dyn LlmClient>> {
    let http = reqwest::Client::builder()
        .timeout(LLM_TIMEOUT)
        .build()
        .context("Failed to build HTTP client for LLM")?;

    match config.llm.provider.as_str() {
        "groq" => {
            let cfg = config.llm.groq.as_ref().context("Groq config missing")?;
            let api_key = resolve_key(cfg.api_key.as_deref(), "GROQ_API_KEY")?;
            Ok(Box::new(OpenAiCompatClient::new(
                &api_key,
                &cfg.model,
                GROQ_BASE_URL,
                http,
            )))
        }
        "openai" => {
            let cfg = config.llm.openai.as_ref().context("OpenAI config missing")?;
            let api_key = resolve_key(cfg.api_key.as_deref(), "OPENAI_API_KEY")?;
            let base_url = cfg
                .base_url
                .as_deref()
                .unwrap_or("https://api.openai.com/v1");
            Ok(Box::new(OpenAiCompatClient::new(
                &api_key, &cfg.model, base_url, http,
            )))
        }
        "ollama" => {
            let cfg = config.llm.ollama.as_ref().context("Ollama config missing")?;
            Ok(Box::new(OllamaClient::new(&cfg.base_url, &cfg.model, http)))
        }
        other => anyhow::bail!("Unknown LLM provider: {}", other),
    }
}

fn resolve_key(configured: Option<&str>, env_var: &str) -> Result<String, LlmError> {
    if let Some(key) = configured {
        if !key.trim().is_empty() {
            return Ok(key.to_string());
        }
    }
    std::env::var(env_var).map_err(|_| {
        LlmError::AuthOrQuota(format!(
            "no API key in config.yml and {} is not set",
            env_var
        ))
    })
}

fn classify_http_failure(status: reqwest::StatusCode, body: &str) -> LlmError {
    match status.as_u16() {
        401 | 403 | 429 => LlmError::AuthOrQuota(format!("HTTP {}: {}", status, body)),
        _ => LlmError::Request(format!("HTTP {}: {}", status, body)),
    }
}

// --- OpenAI-compatible (Groq, OpenAI) ---

#[derive(Debug)]
struct OpenAiCompatClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    fn new(api_key: &str, model: &str, base_url: &str, client: reqwest::Client) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

fn extract_completion(result: &ChatCompletionResponse) -> Result<String, LlmError> {
    if let Some(choice) = result.choices.first() {
        if let Some(content) = &choice.message.content {
            return Ok(content.clone());
        }
    }
    Err(LlmError::MalformedResponse(
        "completion response empty or missing content".to_string(),
    ))
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn chat(&self, system: &str, user: &str, params: ChatParams) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request_body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(classify_http_failure(status, &error_text));
        }

        let result: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        extract_completion(&result)
    }
}

// --- Ollama ---

#[derive(Debug)]
struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaClient {
    fn new(base_url: &str, model: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: OllamaMessageResponse,
}

#[derive(Deserialize)]
struct OllamaMessageResponse {
    content: String,
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn chat(&self, system: &str, user: &str, params: ChatParams) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.base_url);

        let request_body = OllamaRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: params.temperature,
                num_predict: params.max_tokens,
            },
        };

        let resp = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(classify_http_failure(status, &error_text));
        }

        let result: OllamaResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
        Ok(result.message.content)
    }
}
