use crate::config::Config;
use crate::error::LiturgyError;
use crate::llm::LlmClient;
use crate::reference::{self, BiblicalReference};
use crate::text;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod fallback;
pub mod railway;
pub mod vercel;

/// Reference label shown when a source carries no usable title.
pub const DEFAULT_REFERENCE: &str = "Evangelho do dia";

/// Provenance of a liturgy record, surfaced to the user as a trust signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiturgySourceKind {
    ApiPrimary,
    ApiSecondary,
    LlmFallback,
}

impl LiturgySourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            LiturgySourceKind::ApiPrimary => "api-liturgia-diaria.vercel.app",
            LiturgySourceKind::ApiSecondary => "liturgia.up.railway.app",
            LiturgySourceKind::LlmFallback => "llm-fallback",
        }
    }
}

/// The day's Gospel in the common shape every source adapter maps into.
/// Created fresh per request and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiturgyRecord {
    pub source: LiturgySourceKind,
    pub title: String,
    pub liturgical_reference: String,
    pub biblical_reference: Option<BiblicalReference>,
    pub text: String,
}

impl LiturgyRecord {
    /// Normalizes the raw body and builds a record. A body that normalizes
    /// to nothing yields `None`: an empty Gospel is not a success.
    pub fn from_raw(
        source: LiturgySourceKind,
        title: &str,
        reference: &str,
        raw_text: &str,
    ) -> Option<Self> {
        let body = text::normalize(raw_text);
        if body.is_empty() {
            return None;
        }

        let liturgical_reference = if reference.trim().is_empty() {
            DEFAULT_REFERENCE.to_string()
        } else {
            reference.trim().to_string()
        };

        Some(Self {
            source,
            title: title.trim().to_string(),
            liturgical_reference,
            biblical_reference: reference::extract(title),
            text: body,
        })
    }
}

/// One external liturgy API. Failures are silent at this layer: any network,
/// status, or shape problem yields `None` and the resolver moves on.
#[async_trait]
pub trait LiturgySource: Send + Sync {
    fn kind(&self) -> LiturgySourceKind;
    fn name(&self) -> &str;
    async fn fetch(&self, date: &str) -> Option<LiturgyRecord>;
}

/// Builds the adapters in their fixed priority order.
pub fn create_sources(config: &Config) -> Result<Vec<Box<dyn LiturgySource>>> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.liturgy.fetch_timeout_seconds))
        .build()
        .context("Failed to build HTTP client for liturgy sources")?;

    Ok(vec![
        Box::new(vercel::VercelSource::new(
            &config.liturgy.primary_base_url,
            http.clone(),
        )),
        Box::new(railway::RailwaySource::new(
            &config.liturgy.secondary_base_url,
            http,
        )),
    ])
}

/// Tries each source in priority order, then asks the LLM to generate a
/// Gospel as a last resort. The first present result wins; a failed fallback
/// is surfaced as an error, never dressed up as success.
pub async fn resolve(
    date: &str,
    sources: &[Box<dyn LiturgySource>],
    llm: &dyn LlmClient,
) -> Result<LiturgyRecord, LiturgyError> {
    for source in sources {
        match source.fetch(date).await {
            Some(record) => {
                info!("Liturgy for {} served by {}", date, source.name());
                return Ok(record);
            }
            None => warn!("Liturgy source {} unavailable for {}", source.name(), date),
        }
    }

    warn!("No liturgy API responded for {}; generating Gospel via LLM", date);
    let record = fallback::generate_gospel(llm, date).await?;
    info!("Liturgy for {} generated by the LLM fallback", date);
    Ok(record)
}
