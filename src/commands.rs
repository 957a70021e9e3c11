use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::config::{Config, get_config_dir};
use crate::gemini::GeminiClient;
use crate::pipeline::{Answer, AnswerOutcome, QaPipeline};
use crate::{ChatError, Result};

pub type GeminiPipeline = QaPipeline<GeminiClient, GeminiClient>;

const CHAT_PROMPT: &str = "Ask a Question from the PDF Files";

/// Load the saved configuration, applying a `--folder` override
#[inline]
pub fn load_config(folder: Option<PathBuf>) -> Result<Config> {
    let config_dir = get_config_dir().map_err(|e| ChatError::Config(e.to_string()))?;
    let mut config =
        Config::load(&config_dir).map_err(|e| ChatError::Config(format!("{e:#}")))?;

    if let Some(folder) = folder {
        config.documents.folder = folder;
    }

    config
        .validate()
        .map_err(|e| ChatError::Config(e.to_string()))?;
    Ok(config)
}

/// Build the Gemini-backed pipeline; fails when the API key is not set
#[inline]
pub fn build_pipeline(config: &Config) -> Result<GeminiPipeline> {
    let client = GeminiClient::new(config).map_err(|e| ChatError::Config(format!("{e:#}")))?;
    Ok(QaPipeline::new(config, client.clone(), client))
}

/// Answer a single question and exit
#[inline]
pub async fn ask_question(folder: Option<PathBuf>, question: &str, show_sources: bool) -> Result<()> {
    let config = load_config(folder)?;
    let mut pipeline = build_pipeline(&config)?;

    let answer = run_with_spinner(&mut pipeline, question).await?;

    println!("{}", render_answer(&answer));
    if show_sources {
        print!("{}", render_sources(&answer));
    }
    if let Some(warning) = &answer.log_error {
        eprintln!("{}", style(warning).yellow());
    }

    Ok(())
}

/// Interactive question loop; an empty line, `exit` or `quit` leaves
#[inline]
pub async fn run_chat(folder: Option<PathBuf>) -> Result<()> {
    let config = load_config(folder)?;
    let mut pipeline = build_pipeline(&config)?;

    eprintln!("{}", style("Chat with PDF using Gemini").bold().cyan());
    eprintln!(
        "Answering from the PDF files in {}",
        style(pipeline.folder().display()).green()
    );
    eprintln!("Press Enter on an empty line or type 'exit' to leave.");
    eprintln!();

    loop {
        let question: String = Input::new()
            .with_prompt(CHAT_PROMPT)
            .allow_empty(true)
            .interact_text()
            .map_err(anyhow::Error::from)?;

        if is_exit_command(&question) {
            info!("Leaving chat");
            break;
        }

        match run_with_spinner(&mut pipeline, &question).await {
            Ok(answer) => {
                println!("{}", render_answer(&answer));
                if let Some(warning) = &answer.log_error {
                    eprintln!("{}", style(warning).yellow());
                }
            }
            Err(e) => {
                error!("Interaction failed: {}", e);
                eprintln!("{}", style(e.user_message()).red());
            }
        }
        println!();
    }

    Ok(())
}

async fn run_with_spinner(pipeline: &mut GeminiPipeline, question: &str) -> Result<Answer> {
    let spinner = if console::user_attended_stderr() {
        let bar = ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message("Reading the PDF files and asking Gemini...");
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    } else {
        ProgressBar::hidden()
    };

    let result = pipeline.ask(question).await;
    spinner.finish_and_clear();
    result
}

/// Whether a chat line ends the session
#[inline]
pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim();
    input.is_empty() || input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

#[inline]
pub fn render_answer(answer: &Answer) -> String {
    match answer.outcome {
        AnswerOutcome::Answered => format!("Reply: {}", answer.text),
        AnswerOutcome::NoContent => format!("Reply: {}", style(&answer.text).dim()),
    }
}

/// List the retrieved chunks that were handed to the model
#[inline]
pub fn render_sources(answer: &Answer) -> String {
    let mut out = String::new();
    if answer.sources.is_empty() {
        return out;
    }

    let _ = writeln!(out, "\nSources ({} chunks):", answer.sources.len());
    for (rank, source) in answer.sources.iter().enumerate() {
        let preview: String = source.record.content.chars().take(200).collect();
        let _ = writeln!(
            out,
            "{}. chunk {} (distance {:.4})\n   {}",
            rank + 1,
            source.record.chunk_index,
            source.distance,
            preview.split_whitespace().collect::<Vec<_>>().join(" ")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::lancedb::ChunkRecord;
    use crate::database::lancedb::vector_store::SearchResult;

    fn answer(outcome: AnswerOutcome, sources: Vec<SearchResult>) -> Answer {
        Answer {
            question: "What is the capital of France?".to_string(),
            text: "Paris".to_string(),
            outcome,
            sources,
            log_error: None,
        }
    }

    fn source(chunk_index: u32, content: &str, distance: f32) -> SearchResult {
        SearchResult {
            record: ChunkRecord {
                id: format!("row-{chunk_index}"),
                vector: vec![0.0],
                content: content.to_string(),
                chunk_index,
                created_at: "2024-01-01T00:00:00Z".to_string(),
            },
            distance,
            similarity_score: 1.0 / (1.0 + distance),
        }
    }

    #[test]
    fn exit_commands() {
        assert!(is_exit_command(""));
        assert!(is_exit_command("   "));
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("QUIT"));
        assert!(is_exit_command(" Exit \n"));
        assert!(!is_exit_command("exit strategy?"));
        assert!(!is_exit_command("What is the capital of France?"));
    }

    #[test]
    fn reply_rendering() {
        let rendered = render_answer(&answer(AnswerOutcome::Answered, Vec::new()));
        assert_eq!(rendered, "Reply: Paris");

        let no_content = render_answer(&answer(AnswerOutcome::NoContent, Vec::new()));
        assert!(no_content.starts_with("Reply: "));
        assert!(no_content.contains("Paris"));
    }

    #[test]
    fn sources_rendering() {
        assert!(render_sources(&answer(AnswerOutcome::Answered, Vec::new())).is_empty());

        let sources = vec![
            source(0, "Paris is the capital\nof France.", 0.25),
            source(4, "Rome is the capital of Italy.", 1.5),
        ];
        let rendered = render_sources(&answer(AnswerOutcome::Answered, sources));

        assert!(rendered.contains("Sources (2 chunks):"));
        assert!(rendered.contains("1. chunk 0 (distance 0.2500)"));
        assert!(rendered.contains("Paris is the capital of France."));
        assert!(rendered.contains("2. chunk 4 (distance 1.5000)"));
    }
}
