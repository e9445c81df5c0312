use super::{LiturgyRecord, LiturgySource, LiturgySourceKind};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

/// Adapter for liturgia.up.railway.app. GET /v2/AAAA-MM-DD; field names vary
/// between deployments, so every spelling seen in the wild is tolerated.
pub struct RailwaySource {
    base_url: String,
    client: reqwest::Client,
}

impl RailwaySource {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[derive(Deserialize)]
struct Payload {
    #[serde(default)]
    liturgia: Option<Liturgia>,
}

#[derive(Deserialize)]
struct Liturgia {
    #[serde(default)]
    evangelho: Option<Evangelho>,
    #[serde(default)]
    evangelho_do_dia: Option<Evangelho>,
}

#[derive(Deserialize)]
struct Evangelho {
    #[serde(default)]
    texto: String,
    #[serde(default)]
    conteudo: String,
    #[serde(default)]
    referencia: String,
    #[serde(default, rename = "ref")]
    referencia_curta: String,
    #[serde(default)]
    titulo: String,
    #[serde(default)]
    titulo_evangelho: String,
}

fn first_non_empty(candidates: &[&str]) -> String {
    candidates
        .iter()
        .find(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
        .unwrap_or_default()
}

fn map_payload(payload: Payload) -> Option<LiturgyRecord> {
    let liturgia = payload.liturgia?;
    let gospel = liturgia.evangelho.or(liturgia.evangelho_do_dia)?;

    let text = first_non_empty(&[&gospel.texto, &gospel.conteudo]);
    let title = first_non_empty(&[&gospel.titulo, &gospel.titulo_evangelho]);
    let reference = first_non_empty(&[&gospel.referencia, &gospel.referencia_curta, &title]);

    LiturgyRecord::from_raw(LiturgySourceKind::ApiSecondary, &title, &reference, &text)
}

#[async_trait]
impl LiturgySource for RailwaySource {
    fn kind(&self) -> LiturgySourceKind {
        LiturgySourceKind::ApiSecondary
    }

    fn name(&self) -> &str {
        "liturgia.up.railway.app"
    }

    async fn fetch(&self, date: &str) -> Option<LiturgyRecord> {
        let url = format!("{}/v2/{}", self.base_url, date);

        let resp = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                debug!("{}: request failed: {}", self.name(), e);
                return None;
            }
        };

        if !resp.status().is_success() {
            debug!("{}: HTTP {}", self.name(), resp.status());
            return None;
        }

        let payload: Payload = match resp.json().await {
            Ok(payload) => payload,
            Err(e) => {
                debug!("{}: malformed JSON: {}", self.name(), e);
                return None;
            }
        };

        map_payload(payload)
    }
}
