use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChatError>;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Document source error: {0}")]
    Source(String),

    #[error("Remote service error: {0}")]
    Remote(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Response log error: {0}")]
    Log(String),

    #[error("Invalid question: {0}")]
    InvalidQuestion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl ChatError {
    /// Message shown in the interactive shell when an interaction fails
    #[inline]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(detail) => format!(
                "The configuration is not usable ({detail}). Run `pdf-chat config` to fix it."
            ),
            Self::Source(detail) => {
                format!("Could not read the PDF documents: {detail}")
            }
            Self::Remote(detail) => format!(
                "The Gemini API request failed: {detail}. Check your network connection, API key and quota, then try again."
            ),
            Self::Index(detail) => format!("The vector index could not be updated: {detail}"),
            Self::Log(detail) => format!(
                "The answer was generated but could not be saved to the response log: {detail}"
            ),
            Self::InvalidQuestion(detail) => format!("Please ask a question ({detail})."),
            Self::Io(e) => format!("A file operation failed: {e}"),
            Self::Other(e) => format!("Something went wrong: {e:#}"),
        }
    }
}

pub mod answer;
pub mod commands;
pub mod config;
pub mod database;
pub mod documents;
pub mod embeddings;
pub mod gemini;
pub mod pipeline;
pub mod responses;
