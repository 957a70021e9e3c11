// LanceDB vector index module
// Holds the embedded chunks of the current document set


pub mod vector_store;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::embeddings::TextChunk;

/// One embedded chunk stored in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique identifier for this row
    pub id: String,
    /// Embedding of `content`
    pub vector: Vec<f32>,
    /// The chunk text handed to the answer prompt
    pub content: String,
    /// Position of the chunk within the document text
    pub chunk_index: u32,
    /// RFC 3339 timestamp of the rebuild that produced this row
    pub created_at: String,
}

impl ChunkRecord {
    /// Pair a chunk with its embedding
    #[inline]
    pub fn from_chunk(chunk: &TextChunk, vector: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            vector,
            content: chunk.content.clone(),
            chunk_index: u32::try_from(chunk.chunk_index).unwrap_or(u32::MAX),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}
