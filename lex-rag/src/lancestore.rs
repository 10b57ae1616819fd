//! Durable vector store on LanceDB.
//!
//! Each collection is a Lance table under the store directory. Inserts append
//! a new fragment and commit a new table version; readers always open the
//! latest committed version and never wait on a writer. Several processes may
//! append to the same directory, since concurrent appends are merged at
//! commit time.
//!
//! This module is only available when the `lancedb` feature is enabled.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arrow_array::types::Float32Type;
use arrow_array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, Int64Array, RecordBatch,
    RecordBatchIterator, StringArray, UInt32Array,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::DistanceType;
use lancedb::query::{ExecutableQuery, QueryBase};
use tracing::{debug, info};

use crate::document::{Chunk, Metadata, Neighbor};
use crate::error::{RagError, Result};
use crate::inmemory::missing_collection;
use crate::vectorstore::VectorStore;

const BACKEND: &str = "LanceDB";

const CHUNK_ID: &str = "chunk_id";
const DOC_ID: &str = "doc_id";
const CHUNK_INDEX: &str = "chunk_index";
const TEXT: &str = "text";
const METADATA: &str = "metadata";
const INSERTED_AT: &str = "inserted_at";
const VECTOR: &str = "vector";
const DISTANCE: &str = "_distance";

fn lance_error(e: impl Display) -> RagError {
    RagError::store(BACKEND, e.to_string())
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(RagError::ConfigError(format!(
            "collection name '{name}' may only contain ASCII letters, digits, '_' and '-'"
        )))
    }
}

fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// A [`VectorStore`] persisted with LanceDB that survives process restarts.
///
/// Vectors are stored in fixed-size columns, so a store is opened for one
/// embedding dimensionality and rejects collections written with another.
///
/// # Example
///
/// ```rust,ignore
/// use lex_rag::{LanceVectorStore, VectorStore};
///
/// let store = LanceVectorStore::open("./data/embeddings", 768).await?;
/// store.create_collection("legal_documents").await?;
/// ```
pub struct LanceVectorStore {
    db: lancedb::Connection,
    root: PathBuf,
    dimensions: usize,
}

impl LanceVectorStore {
    /// Open a store rooted at `root` for `dimensions`-wide embeddings,
    /// creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `dimensions` is zero or the
    /// directory cannot be created or opened.
    pub async fn open(root: impl Into<PathBuf>, dimensions: usize) -> Result<Self> {
        let root = root.into();
        if dimensions == 0 {
            return Err(RagError::ConfigError("embedding dimensions must be non-zero".to_string()));
        }
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            RagError::ConfigError(format!("cannot create store directory {}: {e}", root.display()))
        })?;
        let uri = root.to_str().ok_or_else(|| {
            RagError::ConfigError(format!("store path {} is not valid UTF-8", root.display()))
        })?;

        let db = lancedb::connect(uri)
            .read_consistency_interval(Duration::ZERO)
            .execute()
            .await
            .map_err(|e| RagError::ConfigError(format!("cannot open store at {uri}: {e}")))?;

        Ok(Self { db, root, dimensions })
    }

    /// The directory this store writes to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn schema(&self) -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new(CHUNK_ID, DataType::Utf8, false),
            Field::new(DOC_ID, DataType::Utf8, false),
            Field::new(CHUNK_INDEX, DataType::UInt32, false),
            Field::new(TEXT, DataType::Utf8, false),
            Field::new(METADATA, DataType::Utf8, false),
            Field::new(INSERTED_AT, DataType::Int64, false),
            Field::new(
                VECTOR,
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.dimensions as i32,
                ),
                false,
            ),
        ]))
    }

    async fn table(&self, name: &str) -> Result<lancedb::Table> {
        self.db.open_table(name).execute().await.map_err(|e| match e {
            lancedb::Error::TableNotFound { .. } => missing_collection(BACKEND, name),
            e => lance_error(e),
        })
    }

    async fn check_dimensions(&self, name: &str) -> Result<()> {
        let schema = self.table(name).await?.schema().await.map_err(lance_error)?;
        match schema.field_with_name(VECTOR).map(|f| f.data_type().clone()) {
            Ok(DataType::FixedSizeList(_, width)) if width as usize == self.dimensions => Ok(()),
            Ok(DataType::FixedSizeList(_, width)) => Err(RagError::ConfigError(format!(
                "collection '{name}' holds {width}-dimensional vectors but the embedder produces {}",
                self.dimensions
            ))),
            _ => Err(RagError::store(BACKEND, format!("collection '{name}' has no vector column"))),
        }
    }

    fn to_batch(&self, chunks: &[Chunk]) -> Result<RecordBatch> {
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != self.dimensions) {
            return Err(RagError::store(
                BACKEND,
                format!(
                    "chunk {} has {} dimensions, store expects {}",
                    bad.chunk_id,
                    bad.embedding.len(),
                    self.dimensions
                ),
            ));
        }

        let metadata = chunks
            .iter()
            .map(|c| serde_json::to_string(&c.metadata))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| RagError::store(BACKEND, format!("serialize metadata: {e}")))?;
        let chunk_indexes = chunks
            .iter()
            .map(|c| u32::try_from(c.chunk_index))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| RagError::store(BACKEND, format!("chunk index out of range: {e}")))?;
        let inserted_at = now_micros();

        let vectors = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            chunks.iter().map(|c| Some(c.embedding.iter().copied().map(Some).collect::<Vec<_>>())),
            self.dimensions as i32,
        );

        RecordBatch::try_new(
            self.schema(),
            vec![
                Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.chunk_id.as_str()))),
                Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.doc_id.as_str()))),
                Arc::new(UInt32Array::from(chunk_indexes)),
                Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| c.text.as_str()))),
                Arc::new(StringArray::from(metadata)),
                Arc::new(Int64Array::from(vec![inserted_at; chunks.len()])),
                Arc::new(vectors) as ArrayRef,
            ],
        )
        .map_err(|e| RagError::store(BACKEND, format!("build record batch: {e}")))
    }
}

/// A decoded table row.
struct Row {
    chunk: Chunk,
    inserted_at: i64,
    distance: Option<f32>,
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| RagError::store(BACKEND, format!("column '{name}' missing or mistyped")))
}

fn decode(batches: &[RecordBatch]) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    for batch in batches {
        let chunk_ids = column::<StringArray>(batch, CHUNK_ID)?;
        let doc_ids = column::<StringArray>(batch, DOC_ID)?;
        let chunk_indexes = column::<UInt32Array>(batch, CHUNK_INDEX)?;
        let texts = column::<StringArray>(batch, TEXT)?;
        let metadata = column::<StringArray>(batch, METADATA)?;
        let inserted_at = column::<Int64Array>(batch, INSERTED_AT)?;
        let vectors = column::<FixedSizeListArray>(batch, VECTOR)?;
        let distances = batch
            .column_by_name(DISTANCE)
            .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

        for i in 0..batch.num_rows() {
            let meta: Metadata = serde_json::from_str(metadata.value(i)).map_err(|e| {
                let id = chunk_ids.value(i);
                RagError::store(BACKEND, format!("corrupt metadata for {id}: {e}"))
            })?;
            let embedding = vectors
                .value(i)
                .as_any()
                .downcast_ref::<Float32Array>()
                .map(|v| v.values().to_vec())
                .unwrap_or_default();

            rows.push(Row {
                chunk: Chunk {
                    chunk_id: chunk_ids.value(i).to_string(),
                    doc_id: doc_ids.value(i).to_string(),
                    chunk_index: chunk_indexes.value(i) as usize,
                    text: texts.value(i).to_string(),
                    embedding,
                    metadata: meta,
                },
                inserted_at: inserted_at.value(i),
                distance: distances.map(|d| d.value(i)),
            });
        }
    }
    Ok(rows)
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn create_collection(&self, name: &str) -> Result<()> {
        validate_name(name)?;

        let names = self.db.table_names().execute().await.map_err(lance_error)?;
        if !names.iter().any(|n| n == name) {
            let schema = self.schema();
            let empty = RecordBatch::new_empty(schema.clone());
            let batches = RecordBatchIterator::new(vec![Ok(empty)], schema);
            match self.db.create_table(name, batches).execute().await {
                Ok(_) => {
                    info!(collection = name, dimensions = self.dimensions, "created collection")
                }
                // Another process created it first.
                Err(lancedb::Error::TableAlreadyExists { .. }) => {}
                Err(e) => return Err(lance_error(e)),
            }
        }

        self.check_dimensions(name).await
    }

    async fn insert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let batch = self.to_batch(chunks)?;
        let table = self.table(collection).await?;
        table
            .add(RecordBatchIterator::new(vec![Ok(batch)], self.schema()))
            .execute()
            .await
            .map_err(lance_error)?;

        debug!(collection, chunk_count = chunks.len(), "appended chunks");
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<Neighbor>> {
        let table = self.table(collection).await?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let batches: Vec<RecordBatch> = table
            .query()
            .nearest_to(embedding)
            .map_err(lance_error)?
            .distance_type(DistanceType::Cosine)
            .limit(top_k)
            .execute()
            .await
            .map_err(lance_error)?
            .try_collect()
            .await
            .map_err(lance_error)?;

        let mut neighbors: Vec<Neighbor> = decode(&batches)?
            .into_iter()
            .map(|row| Neighbor { distance: row.distance.unwrap_or(1.0), chunk: row.chunk })
            .collect();
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(top_k);
        Ok(neighbors)
    }

    async fn list(&self, collection: &str) -> Result<Vec<Chunk>> {
        let table = self.table(collection).await?;
        let total = table.count_rows(None).await.map_err(lance_error)?;
        if total == 0 {
            return Ok(Vec::new());
        }

        let batches: Vec<RecordBatch> = table
            .query()
            .limit(total)
            .execute()
            .await
            .map_err(lance_error)?
            .try_collect()
            .await
            .map_err(lance_error)?;

        let mut rows = decode(&batches)?;
        // Stable: rows of one insert keep their scan order.
        rows.sort_by_key(|row| row.inserted_at);
        Ok(rows.into_iter().map(|row| row.chunk).collect())
    }
}
