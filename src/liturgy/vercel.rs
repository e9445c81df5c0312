use super::{LiturgyRecord, LiturgySource, LiturgySourceKind};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

/// Adapter for api-liturgia-diaria.vercel.app (sagradaliturgia.com.br data).
/// GET /date/AAAA-MM-DD; the day payload is sometimes nested under "today"
/// and sometimes at the root.
pub struct VercelSource {
    base_url: String,
    client: reqwest::Client,
}

impl VercelSource {
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
    today: Option<Day>,
    #[serde(default)]
    readings: Option<Readings>,
}

#[derive(Deserialize)]
struct Day {
    #[serde(default)]
    readings: Option<Readings>,
}

#[derive(Deserialize)]
struct Readings {
    #[serde(default)]
    gospel: Option<Gospel>,
}

#[derive(Deserialize)]
struct Gospel {
    #[serde(default)]
    text: String,
    #[serde(default)]
    head_title: String,
    #[serde(default)]
    title: String,
}

fn map_payload(payload: Payload) -> Option<LiturgyRecord> {
    let readings = payload.today.and_then(|d| d.readings).or(payload.readings)?;
    let gospel = readings.gospel?;

    let title = if gospel.head_title.is_empty() {
        gospel.title
    } else {
        gospel.head_title
    };

    LiturgyRecord::from_raw(LiturgySourceKind::ApiPrimary, &title, &title, &gospel.text)
}

#[async_trait]
impl LiturgySource for VercelSource {
    fn kind(&self) -> LiturgySourceKind {
        LiturgySourceKind::ApiPrimary
    }

    fn name(&self) -> &str {
        "api-liturgia-diaria.vercel.app"
    }

    async fn fetch(&self, date: &str) -> Option<LiturgyRecord> {
        let url = format!("{}/date/{}", self.base_url, date);

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_nested_today_payload() {
        let json = r#"{
            "today": {
                "readings": {
                    "gospel": {
                        "head_title": "Evangelho de Jesus Cristo segundo São João 14, 1-6",
                        "title": "Eu sou o caminho",
                        "text": "1Jesus disse aos seus discípulos: 2Eu sou o caminho."
                    }
                }
            }
        }"#;
        let record = map_payload(serde_json::from_str(json).unwrap()).unwrap();

        assert_eq!(record.source, LiturgySourceKind::ApiPrimary);
        assert_eq!(
            record.text,
            "Jesus disse aos seus discípulos: Eu sou o caminho."
        );
        assert_eq!(record.biblical_reference.unwrap().evangelist, "João");
    }

    #[test]
    fn test_maps_root_payload_and_title_fallback() {
        let json = r#"{
            "readings": {
                "gospel": { "title": "Evangelho do dia", "text": "Texto do dia." }
            }
        }"#;
        let record = map_payload(serde_json::from_str(json).unwrap()).unwrap();
        assert_eq!(record.title, "Evangelho do dia");
        assert_eq!(record.liturgical_reference, "Evangelho do dia");
    }

    #[test]
    fn test_missing_gospel_is_absent() {
        let payload: Payload = serde_json::from_str(r#"{"today": {"readings": {}}}"#).unwrap();
        assert!(map_payload(payload).is_none());
    }

    #[test]
    fn test_empty_text_is_absent() {
        let json = r#"{"readings": {"gospel": {"title": "t", "text": "  "}}}"#;
        assert!(map_payload(serde_json::from_str(json).unwrap()).is_none());
    }
}
