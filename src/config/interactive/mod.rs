
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};

use super::{Config, ConfigError, GeminiConfig};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 PDF Chat Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir);

    eprintln!("{}", style("Documents").bold().yellow());
    eprintln!("Choose the folder whose PDF files questions are answered from.");
    eprintln!();

    let folder: String = Input::new()
        .with_prompt("PDF folder")
        .default(config.documents.folder.display().to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Folder cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    config.documents.folder = PathBuf::from(folder.trim());

    if !config.documents.folder.is_dir() {
        eprintln!(
            "{}",
            style("⚠ Warning: the folder does not exist yet").yellow()
        );
    }

    eprintln!();
    eprintln!("{}", style("Gemini Configuration").bold().yellow());
    eprintln!("Models used for embeddings and answer generation.");
    eprintln!();

    configure_gemini(&mut config.gemini)?;

    let top_k: usize = Input::new()
        .with_prompt("Chunks retrieved per question")
        .default(config.retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input == 0 || *input > 100 {
                Err("Must be between 1 and 100")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    config.retrieval.top_k = top_k;

    eprintln!();
    match config.api_key() {
        Ok(_) => eprintln!(
            "{}",
            style(format!("✓ API key found in {}", config.gemini.api_key_env)).green()
        ),
        Err(e) => eprintln!("{}", style(format!("⚠ Warning: {e}")).yellow()),
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Documents:").bold().yellow());
    eprintln!(
        "  Folder: {}",
        style(config.documents.folder.display()).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Gemini Settings:").bold().yellow());
    eprintln!("  Base URL: {}", style(&config.gemini.base_url).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.gemini.embedding_model).cyan()
    );
    eprintln!("  Chat Model: {}", style(&config.gemini.chat_model).cyan());
    eprintln!("  Temperature: {}", style(config.gemini.temperature).cyan());
    eprintln!("  Batch Size: {}", style(config.gemini.batch_size).cyan());
    match config.api_key() {
        Ok(_) => eprintln!(
            "  API Key: {} ({})",
            style("set").green(),
            config.gemini.api_key_env
        ),
        Err(_) => eprintln!(
            "  API Key: {} ({})",
            style("missing").red(),
            config.gemini.api_key_env
        ),
    }

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!(
        "  Chunk Size: {} characters",
        style(config.chunking.chunk_size).cyan()
    );
    eprintln!(
        "  Chunk Overlap: {} characters",
        style(config.chunking.chunk_overlap).cyan()
    );
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());

    eprintln!();
    eprintln!(
        "  Vector Index: {}",
        style(config.paths.index_dir.display()).cyan()
    );
    eprintln!(
        "  Response Log: {}",
        style(config.paths.responses_file.display()).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Config {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No usable configuration found. Using defaults.").yellow()
            );
            Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            }
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            config
        },
    )
}

fn configure_gemini(gemini: &mut GeminiConfig) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt("Gemini API base URL")
        .default(gemini.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = GeminiConfig {
                base_url: input.clone(),
                ..GeminiConfig::default()
            };
            temp_config.api_url()?;
            Ok(())
        })
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(gemini.embedding_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let chat_model: String = Input::new()
        .with_prompt("Chat model")
        .default(gemini.chat_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let temperature: f32 = Input::new()
        .with_prompt("Sampling temperature")
        .default(gemini.temperature)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if (0.0..=2.0).contains(input) {
                Ok(())
            } else {
                Err("Temperature must be between 0.0 and 2.0")
            }
        })
        .interact_text()?;

    gemini.set_base_url(base_url)?;
    gemini.set_embedding_model(embedding_model)?;
    gemini.set_chat_model(chat_model)?;
    gemini.set_temperature(temperature)?;

    Ok(())
}
