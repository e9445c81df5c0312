use crate::characters::{self, CharacterRegistry};
use crate::config::Config;
use crate::liturgy::{self, LiturgyRecord, LiturgySource};
use crate::llm::LlmClient;
use crate::reading;
use crate::script::{ScriptGenerator, ScriptRecord};
use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use std::collections::HashMap;

/// One generated script kept in the in-memory session history.
#[derive(Debug, Clone, Serialize)]
pub struct SessionEntry {
    pub date: String,
    pub reference: String,
    pub source: &'static str,
    pub script: ScriptRecord,
}

/// Owns the whole pipeline for one user session: liturgy sources, LLM
/// client, character registry and history. Nothing here is global state.
pub struct StudioManager {
    config: Config,
    llm: Box<dyn LlmClient>,
    sources: Vec<Box<dyn LiturgySource>>,
    generator: ScriptGenerator,
    registry: CharacterRegistry,
    history: Vec<SessionEntry>,
}

impl StudioManager {
    pub fn new(
        config: Config,
        llm: Box<dyn LlmClient>,
        sources: Vec<Box<dyn LiturgySource>>,
    ) -> Self {
        let generator = ScriptGenerator::new(&config);
        Self {
            config,
            llm,
            sources,
            generator,
            registry: CharacterRegistry::with_defaults(),
            history: Vec::new(),
        }
    }

    pub fn registry(&self) -> &CharacterRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CharacterRegistry {
        &mut self.registry
    }

    pub fn history(&self) -> &[SessionEntry] {
        &self.history
    }

    /// Runs the full pipeline for a date: resolve liturgy, detect characters,
    /// generate the script, then overwrite the reading part with the verbatim
    /// assembled text. Context strings tell the caller which stage failed.
    pub async fn generate_for_date(
        &mut self,
        date: &str,
    ) -> Result<(LiturgyRecord, ScriptRecord)> {
        let liturgy = liturgy::resolve(date, &self.sources, self.llm.as_ref())
            .await
            .context("Liturgy acquisition failed")?;
        info!(
            "Gospel in use: {} ({})",
            liturgy.liturgical_reference,
            liturgy.source.label()
        );

        let detected = if self.config.script.detect_characters {
            characters::detect(self.llm.as_ref(), &liturgy.text, &mut self.registry)
                .await
                .context("Character detection failed")?
        } else {
            HashMap::new()
        };

        let mut script = self
            .generator
            .generate(
                self.llm.as_ref(),
                &liturgy.text,
                &liturgy.liturgical_reference,
                &detected,
            )
            .await
            .context("Script generation failed")?;

        // The proclaimed reading is assembled deterministically, never taken
        // from the model.
        script.parts.reading =
            reading::assemble(&liturgy.text, liturgy.biblical_reference.as_ref());

        self.history.push(SessionEntry {
            date: date.to_string(),
            reference: liturgy.liturgical_reference.clone(),
            source: liturgy.source.label(),
            script: script.clone(),
        });

        Ok((liturgy, script))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::liturgy::LiturgySourceKind;
    use crate::llm::ChatParams;
    use async_trait::async_trait;

    struct StaticSource;

    #[async_trait]
    impl LiturgySource for StaticSource {
        fn kind(&self) -> LiturgySourceKind {
            LiturgySourceKind::ApiPrimary
        }
        fn name(&self) -> &str {
            "static"
        }
        async fn fetch(&self, _date: &str) -> Option<LiturgyRecord> {
            LiturgyRecord::from_raw(
                LiturgySourceKind::ApiPrimary,
                "Evangelho de Jesus Cristo segundo São João 14, 1-6",
                "Jo 14, 1-6",
                "1Jesus disse aos seus discípulos: 2Eu sou o caminho.",
            )
        }
    }

    /// Answers the detection call and the script call with canned responses,
    /// telling them apart by the system prompt.
    #[derive(Debug)]
    struct StubLlm;

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn chat(
            &self,
            system: &str,
            _user: &str,
            _params: ChatParams,
        ) -> Result<String, LlmError> {
            if system.contains("identifica os personagens") {
                return Ok("CONHECIDOS: Jesus\nNOVOS: Tomé|Apóstolo de túnica cinza".to_string());
            }
            Ok("HOOK: H.\nLEITURA: texto do modelo, será descartado.\nREFLEXÃO: R.\nAPLICAÇÃO: A.\nORAÇÃO: O.".to_string())
        }
    }

    fn manager() -> StudioManager {
        let config: Config =
            serde_yaml_ng::from_str("llm:\n  provider: groq\n  groq:\n    api_key: sk-test\n")
                .unwrap();
        StudioManager::new(config, Box::new(StubLlm), vec![Box::new(StaticSource)])
    }

    #[tokio::test]
    async fn test_pipeline_replaces_reading_with_assembled_text() {
        let mut manager = manager();
        let (liturgy, script) = manager.generate_for_date("2025-12-01").await.unwrap();

        assert_eq!(liturgy.source, LiturgySourceKind::ApiPrimary);
        assert_eq!(
            script.parts.reading,
            "Proclamação do Evangelho de Jesus Cristo, segundo São João, Capítulo 14, \
             versículos 1 a 6. Glória a vós, Senhor! Jesus disse aos seus discípulos: \
             Eu sou o caminho. Palavra da Salvação. Glória a vós, Senhor!"
        );
        assert_eq!(script.parts.hook, "H.");
    }

    #[tokio::test]
    async fn test_pipeline_registers_detected_characters_and_history() {
        let mut manager = manager();
        manager.generate_for_date("2025-12-01").await.unwrap();
        manager.generate_for_date("2025-12-02").await.unwrap();

        assert_eq!(manager.registry().get("Tomé"), Some("Apóstolo de túnica cinza"));
        assert_eq!(manager.history().len(), 2);
        assert_eq!(manager.history()[0].date, "2025-12-01");
        assert_eq!(manager.history()[1].source, "api-liturgia-diaria.vercel.app");
    }
}
