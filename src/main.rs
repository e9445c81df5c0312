use anyhow::Result;
use chrono::{Local, NaiveDate};
use gospel2script::config::Config;
use gospel2script::error::{LiturgyError, LlmError};
use gospel2script::liturgy::{self, LiturgyRecord};
use gospel2script::llm;
use gospel2script::script::{ScriptPart, ScriptRecord};
use gospel2script::workflow::StudioManager;
use indicatif::ProgressBar;
use inquire::{Select, Text};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            eprintln!("Please ensure 'config.yml' exists with valid LLM settings.");
            return Err(e);
        }
    };

    // Credential problems surface here, before any pipeline work.
    let llm = llm::create_llm(&config)?;
    let sources = liturgy::create_sources(&config)?;
    let mut manager = StudioManager::new(config, llm, sources);

    loop {
        let choice = Select::new(
            "Gospel script studio:",
            vec!["Generate script", "Characters", "History", "Quit"],
        )
        .prompt()?;

        match choice {
            "Generate script" => generate(&mut manager).await?,
            "Characters" => manage_characters(&mut manager)?,
            "History" => print_history(&manager),
            _ => break,
        }
    }

    Ok(())
}

async fn generate(manager: &mut StudioManager) -> Result<()> {
    let today = Local::now().format("%Y-%m-%d").to_string();
    let date = Text::new("Liturgy date (AAAA-MM-DD):")
        .with_default(&today)
        .prompt()?;

    if NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_err() {
        println!("Invalid date: {}", date);
        return Ok(());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Resolving liturgy and generating script...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = manager.generate_for_date(&date).await;
    spinner.finish_and_clear();

    match result {
        Ok((liturgy, script)) => print_script(&liturgy, &script),
        Err(e) if is_auth_failure(&e) => {
            // Not transient; retrying will not help.
            return Err(e.context("LLM credential or quota problem, check config.yml"));
        }
        Err(e) => println!("Generation failed: {:#}", e),
    }

    Ok(())
}

fn is_auth_failure(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| {
        matches!(cause.downcast_ref::<LlmError>(), Some(LlmError::AuthOrQuota(_)))
            || matches!(
                cause.downcast_ref::<LiturgyError>(),
                Some(LiturgyError::Llm(LlmError::AuthOrQuota(_)))
            )
    })
}

fn print_script(liturgy: &LiturgyRecord, script: &ScriptRecord) {
    println!();
    println!(
        "Gospel: {} (source: {})",
        liturgy.liturgical_reference,
        liturgy.source.label()
    );
    println!();

    for part in ScriptPart::ALL {
        println!("=== {} ===", part.label());
        println!("{}", script.parts.get(part));
        println!();
    }

    if let Some(visuals) = &script.visual_prompts {
        println!("=== IMAGE PROMPTS ===");
        for (name, prompt) in [
            ("HOOK", &visuals.hook),
            ("LEITURA", &visuals.reading),
            ("REFLEXÃO", &visuals.reflection),
            ("APLICAÇÃO", &visuals.application),
            ("ORAÇÃO", &visuals.prayer),
            ("GERAL", &visuals.general),
        ] {
            if !prompt.is_empty() {
                println!("{}: {}", name, prompt);
            }
        }
        println!();
    }
}

fn manage_characters(manager: &mut StudioManager) -> Result<()> {
    loop {
        let choice = Select::new("Characters:", vec!["List", "Add", "Remove", "Back"]).prompt()?;

        match choice {
            "List" => {
                for name in manager.registry().names() {
                    println!("- {}: {}", name, manager.registry().get(&name).unwrap_or(""));
                }
            }
            "Add" => {
                let name = Text::new("Name:").prompt()?;
                if name.trim().is_empty() {
                    println!("Name cannot be empty.");
                    continue;
                }
                let description = Text::new("Visual description:").prompt()?;
                manager.registry_mut().upsert(name.trim(), description.trim());
            }
            "Remove" => {
                let names = manager.registry().names();
                if names.is_empty() {
                    println!("No characters registered.");
                    continue;
                }
                let name = Select::new("Remove which character?", names).prompt()?;
                manager.registry_mut().remove(&name);
            }
            _ => break,
        }
    }

    Ok(())
}

fn print_history(manager: &StudioManager) {
    let history = manager.history();
    if history.is_empty() {
        println!("No scripts generated in this session yet.");
        return;
    }

    for entry in history.iter().rev().take(10) {
        println!(
            "{} - {} ({})",
            entry.date, entry.reference, entry.source
        );
        println!("  HOOK: {}", snippet(&entry.script.parts.hook, 120));
        println!("  LEITURA: {}", snippet(&entry.script.parts.reading, 120));
    }
}

fn snippet(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
