// Embeddings module
// Text chunking and the embedding capability

pub mod chunking;

use anyhow::Result;

pub use chunking::{ChunkingConfig, TextChunk, chunk_text};

/// Maps text to embedding vectors
pub trait Embedder: Send + Sync {
    /// Embed a batch of document chunks, one vector per input in the same order
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single search query
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}
