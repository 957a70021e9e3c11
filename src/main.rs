use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pdf_chat::Result;
use pdf_chat::commands::{ask_question, run_chat};
use pdf_chat::config::{get_config_dir, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "pdf-chat")]
#[command(about = "Ask questions about a folder of PDF files using Gemini")]
#[command(version)]
struct Cli {
    /// Folder of PDF files to answer from, overriding the configured one
    #[arg(long, global = true)]
    folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive question loop (default)
    Chat,
    /// Answer a single question and exit
    Ask {
        /// The question to answer
        question: String,
        /// Also print the retrieved chunks
        #[arg(long)]
        sources: bool,
    },
    /// Configure the PDF folder and Gemini settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            run_chat(cli.folder).await?;
        }
        Commands::Ask { question, sources } => {
            ask_question(cli.folder, &question, sources).await?;
        }
        Commands::Config { show } => {
            let config_dir = get_config_dir().map_err(anyhow::Error::from)?;
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn no_subcommand_defaults_to_chat() {
        let cli = Cli::try_parse_from(["pdf-chat"]).expect("should parse");
        assert!(cli.command.is_none());
        assert!(cli.folder.is_none());
    }

    #[test]
    fn chat_command() {
        let cli = Cli::try_parse_from(["pdf-chat", "chat"]).expect("should parse");
        assert!(matches!(cli.command, Some(Commands::Chat)));
    }

    #[test]
    fn ask_command_with_question() {
        let cli = Cli::try_parse_from(["pdf-chat", "ask", "What is the capital of France?"])
            .expect("should parse");

        if let Some(Commands::Ask { question, sources }) = cli.command {
            assert_eq!(question, "What is the capital of France?");
            assert!(!sources);
        } else {
            panic!("expected ask command");
        }
    }

    #[test]
    fn ask_command_with_sources() {
        let cli = Cli::try_parse_from(["pdf-chat", "ask", "Who?", "--sources"])
            .expect("should parse");

        assert!(matches!(cli.command, Some(Commands::Ask { sources: true, .. })));
    }

    #[test]
    fn global_folder_flag() {
        let cli = Cli::try_parse_from(["pdf-chat", "ask", "Who?", "--folder", "docs/pdfs"])
            .expect("should parse");
        assert_eq!(cli.folder, Some(PathBuf::from("docs/pdfs")));

        let cli = Cli::try_parse_from(["pdf-chat", "--folder", "papers"]).expect("should parse");
        assert_eq!(cli.folder, Some(PathBuf::from("papers")));
        assert!(cli.command.is_none());
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["pdf-chat", "config", "--show"]).expect("should parse");

        assert!(matches!(cli.command, Some(Commands::Config { show: true })));
    }

    #[test]
    fn ask_requires_question() {
        let cli = Cli::try_parse_from(["pdf-chat", "ask"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["pdf-chat", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["pdf-chat", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
