use thiserror::Error;

/// Failures of the LLM chat service. `AuthOrQuota` is not transient: the
/// caller should abort instead of retrying or degrading silently.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM credential missing or rejected by provider: {0}")]
    AuthOrQuota(String),

    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("LLM response in unexpected format: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Error)]
pub enum LiturgyError {
    /// Every configured source and the LLM fallback failed to produce a
    /// usable Gospel. Terminal for the request.
    #[error("no gospel available for {date}: all liturgy sources and the LLM fallback failed")]
    Exhausted { date: String },

    #[error(transparent)]
    Llm(#[from] LlmError),
}
