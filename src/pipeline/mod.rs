// Question answering pipeline
// One call runs load, chunk, embed, index, search, answer and log


use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::answer::{AnswerGenerator, Completer};
use crate::config::Config;
use crate::database::lancedb::ChunkRecord;
use crate::database::lancedb::vector_store::{SearchResult, VectorIndex};
use crate::documents::load_folder;
use crate::embeddings::{ChunkingConfig, Embedder, chunk_text};
use crate::responses::ResponseLog;
use crate::{ChatError, Result};

/// Reply used when the PDF folder yields no text to answer from
pub const NO_CONTENT_ANSWER: &str =
    "No text could be extracted from the PDF files, so there is nothing to answer from.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// The chat model produced the answer from retrieved context
    Answered,
    /// The documents produced no chunks; no remote call was made
    NoContent,
}

/// Result of one interaction
#[derive(Debug, Clone)]
pub struct Answer {
    pub question: String,
    pub text: String,
    pub outcome: AnswerOutcome,
    /// Chunks handed to the chat model, nearest first
    pub sources: Vec<SearchResult>,
    /// Set when the answer could not be written to the response log
    pub log_error: Option<String>,
}

pub struct QaPipeline<E, C> {
    folder: PathBuf,
    chunking: ChunkingConfig,
    top_k: usize,
    index_dir: PathBuf,
    responses_file: PathBuf,
    embedder: E,
    generator: AnswerGenerator<C>,
    index: Option<VectorIndex>,
    log: Option<ResponseLog>,
}

impl<E: Embedder, C: Completer> QaPipeline<E, C> {
    #[inline]
    pub fn new(config: &Config, embedder: E, completer: C) -> Self {
        Self {
            folder: config.documents.folder.clone(),
            chunking: config.chunking.clone(),
            top_k: config.retrieval.top_k,
            index_dir: config.paths.index_dir.clone(),
            responses_file: config.paths.responses_file.clone(),
            embedder,
            generator: AnswerGenerator::new(completer, config.gemini.temperature),
            index: None,
            log: None,
        }
    }

    #[inline]
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    #[inline]
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    #[inline]
    pub fn completer(&self) -> &C {
        self.generator.completer()
    }

    /// Answer `question` from the current contents of the PDF folder
    ///
    /// The documents are re-read and the index is rebuilt on every call.
    #[inline]
    pub async fn ask(&mut self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::InvalidQuestion(
                "the question is empty".to_string(),
            ));
        }

        let started = Instant::now();
        info!("Answering question: {}", question);

        let documents = load_folder(&self.folder)?;
        let chunks = chunk_text(&documents.text, &self.chunking);
        debug!(
            "Split {} PDF files into {} chunks",
            documents.files.len(),
            chunks.len()
        );

        if chunks.is_empty() {
            warn!(
                "No text found in {}, skipping remote calls",
                self.folder.display()
            );
            self.open_index().await?.rebuild(&[]).await?;
            let mut answer = Answer {
                question: question.to_string(),
                text: NO_CONTENT_ANSWER.to_string(),
                outcome: AnswerOutcome::NoContent,
                sources: Vec::new(),
                log_error: None,
            };
            self.record(&mut answer);
            return Ok(answer);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self
            .embedder
            .embed_documents(&texts)
            .map_err(|e| ChatError::Remote(format!("Failed to embed document chunks: {e:#}")))?;
        if vectors.len() != chunks.len() {
            return Err(ChatError::Remote(format!(
                "Expected {} chunk embeddings, received {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let records: Vec<ChunkRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| ChunkRecord::from_chunk(chunk, vector))
            .collect();

        self.open_index().await?.rebuild(&records).await?;

        let query_vector = self
            .embedder
            .embed_query(question)
            .map_err(|e| ChatError::Remote(format!("Failed to embed question: {e:#}")))?;

        let top_k = self.top_k;
        let sources = self.open_index().await?.search(&query_vector, top_k).await?;
        debug!("Retrieved {} chunks for the question", sources.len());

        let context: Vec<&str> = sources.iter().map(|s| s.record.content.as_str()).collect();
        let text = self
            .generator
            .generate(&context, question)
            .map_err(|e| ChatError::Remote(format!("Failed to generate answer: {e:#}")))?;

        let mut answer = Answer {
            question: question.to_string(),
            text,
            outcome: AnswerOutcome::Answered,
            sources,
            log_error: None,
        };
        self.record(&mut answer);

        info!("Answered in {:?}", started.elapsed());
        Ok(answer)
    }

    async fn open_index(&mut self) -> Result<&mut VectorIndex> {
        if self.index.is_none() {
            self.index = Some(VectorIndex::open(&self.index_dir).await?);
        }

        self.index
            .as_mut()
            .ok_or_else(|| ChatError::Index("Vector index is not open".to_string()))
    }

    fn response_log(&mut self) -> Result<&mut ResponseLog> {
        if self.log.is_none() {
            self.log = Some(ResponseLog::open(&self.responses_file)?);
        }

        self.log
            .as_mut()
            .ok_or_else(|| ChatError::Log("Response log is not open".to_string()))
    }

    fn record(&mut self, answer: &mut Answer) {
        let result = self
            .response_log()
            .and_then(|log| log.record(&answer.question, &answer.text));

        if let Err(e) = result {
            warn!("Failed to record response: {}", e);
            answer.log_error = Some(e.user_message());
        }
    }
}
