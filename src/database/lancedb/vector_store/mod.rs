
use super::ChunkRecord;
use crate::{ChatError, Result};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType,
    query::{ExecutableQuery, QueryBase},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const TABLE_NAME: &str = "chunks";

/// Vector index over the chunks of the current document set
pub struct VectorIndex {
    connection: Connection,
    path: PathBuf,
    table_name: String,
}

/// A stored chunk returned by similarity search
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub record: ChunkRecord,
    /// L2 distance to the query vector
    pub distance: f32,
    /// Higher is closer; derived from `distance`
    pub similarity_score: f32,
}

impl VectorIndex {
    /// Connect to the index stored under `path`, creating the directory if needed
    #[inline]
    pub async fn open(path: &Path) -> Result<Self> {
        debug!("Opening vector index at {:?}", path);

        std::fs::create_dir_all(path).map_err(|e| {
            ChatError::Index(format!(
                "Failed to create vector index directory {}: {}",
                path.display(),
                e
            ))
        })?;

        let uri = path
            .to_str()
            .ok_or_else(|| ChatError::Index(format!("Non UTF-8 index path: {:?}", path)))?;

        let connection = lancedb::connect(uri)
            .execute()
            .await
            .map_err(|e| ChatError::Index(format!("Failed to connect to LanceDB: {}", e)))?;

        Ok(Self {
            connection,
            path: path.to_path_buf(),
            table_name: TABLE_NAME.to_string(),
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the whole index with `records`
    ///
    /// Any previous table is dropped first. An empty `records` leaves the
    /// index without a table.
    #[inline]
    pub async fn rebuild(&mut self, records: &[ChunkRecord]) -> Result<()> {
        self.drop_table_if_exists().await?;

        let Some(first) = records.first() else {
            debug!("No records to index");
            return Ok(());
        };

        let vector_dim = first.vector.len();
        if vector_dim == 0 {
            return Err(ChatError::Index("Embedding vectors are empty".to_string()));
        }
        if let Some(bad) = records.iter().find(|r| r.vector.len() != vector_dim) {
            return Err(ChatError::Index(format!(
                "Inconsistent vector dimensions: expected {}, found {} for chunk {}",
                vector_dim,
                bad.vector.len(),
                bad.chunk_index
            )));
        }

        let record_batch = Self::create_record_batch(records, vector_dim)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);

        self.connection
            .create_table(&self.table_name, reader)
            .execute()
            .await
            .map_err(|e| ChatError::Index(format!("Failed to create table: {}", e)))?;

        info!(
            "Indexed {} chunks with {} dimensions",
            records.len(),
            vector_dim
        );
        Ok(())
    }

    /// Return up to `limit` records nearest to `query_vector`, nearest first
    #[inline]
    pub async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        debug!("Searching for similar vectors with limit: {}", limit);

        if limit == 0 || !self.table_exists().await? {
            return Ok(Vec::new());
        }

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| ChatError::Index(format!("Failed to open table: {}", e)))?;

        let results = table
            .vector_search(query_vector)
            .map_err(|e| ChatError::Index(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::L2)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| ChatError::Index(format!("Failed to execute search: {}", e)))?;

        let mut search_results = Self::parse_search_results_stream(results).await?;
        search_results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(search_results)
    }

    /// Number of stored records, zero when no table exists
    #[inline]
    pub async fn count(&self) -> Result<usize> {
        if !self.table_exists().await? {
            return Ok(0);
        }

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| ChatError::Index(format!("Failed to open table: {}", e)))?;

        table
            .count_rows(None)
            .await
            .map_err(|e| ChatError::Index(format!("Failed to count rows: {}", e)))
    }

    fn create_schema(vector_dim: usize) -> Result<Arc<Schema>> {
        let list_size = i32::try_from(vector_dim).map_err(|_| {
            ChatError::Index(format!("Vector dimension {} is too large", vector_dim))
        })?;

        Ok(Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    list_size,
                ),
                false,
            ),
            Field::new("content", DataType::Utf8, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("created_at", DataType::Utf8, false),
        ])))
    }

    fn create_record_batch(records: &[ChunkRecord], vector_dim: usize) -> Result<RecordBatch> {
        let schema = Self::create_schema(vector_dim)?;
        let list_size = i32::try_from(vector_dim).map_err(|_| {
            ChatError::Index(format!("Vector dimension {} is too large", vector_dim))
        })?;

        let mut flat_values = Vec::with_capacity(records.len() * vector_dim);
        for record in records {
            flat_values.extend_from_slice(&record.vector);
        }
        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(field, list_size, Arc::new(values_array), None).map_err(
                |e| ChatError::Index(format!("Failed to create vector array: {}", e)),
            )?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from_iter_values(
                records.iter().map(|r| r.id.as_str()),
            )),
            Arc::new(vector_array),
            Arc::new(StringArray::from_iter_values(
                records.iter().map(|r| r.content.as_str()),
            )),
            Arc::new(UInt32Array::from_iter_values(
                records.iter().map(|r| r.chunk_index),
            )),
            Arc::new(StringArray::from_iter_values(
                records.iter().map(|r| r.created_at.as_str()),
            )),
        ];

        RecordBatch::try_new(schema, arrays)
            .map_err(|e| ChatError::Index(format!("Failed to create record batch: {}", e)))
    }

    async fn parse_search_results_stream(
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<SearchResult>> {
        let mut search_results = Vec::new();

        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| ChatError::Index(format!("Failed to read result stream: {}", e)))?
        {
            search_results.extend(Self::parse_search_batch(&batch)?);
        }

        debug!("Parsed {} search results", search_results.len());
        Ok(search_results)
    }

    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>> {
        let ids = string_column(batch, "id")?;
        let contents = string_column(batch, "content")?;
        let created_ats = string_column(batch, "created_at")?;

        let chunk_indices = batch
            .column_by_name("chunk_index")
            .ok_or_else(|| ChatError::Index("Missing chunk_index column".to_string()))?
            .as_any()
            .downcast_ref::<UInt32Array>()
            .ok_or_else(|| ChatError::Index("Invalid chunk_index column type".to_string()))?;

        let vectors = batch
            .column_by_name("vector")
            .and_then(|col| col.as_any().downcast_ref::<FixedSizeListArray>());

        let distances = batch
            .column_by_name("_distance")
            .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

        let mut search_results = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let vector = vectors
                .and_then(|list| {
                    list.value(row)
                        .as_any()
                        .downcast_ref::<Float32Array>()
                        .map(|values| values.values().to_vec())
                })
                .unwrap_or_default();

            let distance = distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            search_results.push(SearchResult {
                record: ChunkRecord {
                    id: ids.value(row).to_string(),
                    vector,
                    content: contents.value(row).to_string(),
                    chunk_index: chunk_indices.value(row),
                    created_at: created_ats.value(row).to_string(),
                },
                distance,
                similarity_score: 1.0 / (1.0 + distance),
            });
        }

        Ok(search_results)
    }

    async fn table_exists(&self) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| ChatError::Index(format!("Failed to list tables: {}", e)))?;

        Ok(table_names.contains(&self.table_name))
    }

    async fn drop_table_if_exists(&self) -> Result<()> {
        if self.table_exists().await? {
            info!("Dropping existing chunks table");
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| ChatError::Index(format!("Failed to drop table: {}", e)))?;
        }

        Ok(())
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| ChatError::Index(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| ChatError::Index(format!("Invalid {} column type", name)))
}
