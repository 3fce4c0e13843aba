//! `LanceDB` implementation of `VectorStore`.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use arrow_array::builder::{FixedSizeListBuilder, Float32Builder};
use arrow_array::{Array, ArrayRef, Float32Array, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use gqlsearch_core::{
    DeclarationDocument, DeclarationKind, Metadata, MetadataStore, SearchOptions, SearchResult,
    StoreError, StoredDocument, VectorStore,
};
use lancedb::index::Index;
use lancedb::index::vector::IvfPqIndexBuilder;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table, connect};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::filter;
use crate::schema::{DOCUMENTS_TABLE, KV_TABLE, documents_schema, kv_schema, vector_dimension};

/// Rows needed before an ANN index is worth training.
pub const MIN_ROWS_FOR_INDEX: usize = 256;

/// LanceDB-based vector store.
pub struct LanceStore {
    /// Path to the `LanceDB` database
    db_path: PathBuf,
    /// Embedding dimension
    embedding_dim: usize,
    /// Database connection (lazy initialized)
    connection: RwLock<Option<Connection>>,
    /// Documents table handle
    documents_table: RwLock<Option<Table>>,
    /// Key/value table handle
    kv_table: RwLock<Option<Table>>,
}

impl LanceStore {
    /// Create a new `LanceStore`.
    #[must_use]
    pub fn new(db_path: PathBuf, embedding_dim: usize) -> Self {
        Self {
            db_path,
            embedding_dim,
            connection: RwLock::new(None),
            documents_table: RwLock::new(None),
            kv_table: RwLock::new(None),
        }
    }

    /// Get the database path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Get the embedding dimension.
    #[must_use]
    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Get or create connection.
    async fn get_connection(&self) -> Result<Connection, StoreError> {
        {
            let conn = self.connection.read().await;
            if let Some(ref c) = *conn {
                return Ok(c.clone());
            }
        }

        let mut conn = self.connection.write().await;
        if let Some(ref c) = *conn {
            return Ok(c.clone());
        }
        let db_path_str = self.db_path.to_string_lossy().to_string();
        let new_conn = connect(&db_path_str)
            .execute()
            .await
            .map_err(|e| StoreError::Init(format!("Failed to connect to LanceDB: {e}")))?;
        *conn = Some(new_conn.clone());
        Ok(new_conn)
    }

    /// Get or open a table, caching the handle in `slot`.
    async fn get_table(
        &self,
        slot: &RwLock<Option<Table>>,
        name: &str,
    ) -> Result<Table, StoreError> {
        {
            let table = slot.read().await;
            if let Some(ref t) = *table {
                return Ok(t.clone());
            }
        }

        let conn = self.get_connection().await?;
        let mut table_lock = slot.write().await;
        if let Some(ref t) = *table_lock {
            return Ok(t.clone());
        }
        let t = conn
            .open_table(name)
            .execute()
            .await
            .map_err(|e| StoreError::Init(format!("Failed to open {name} table: {e}")))?;
        *table_lock = Some(t.clone());
        Ok(t)
    }

    async fn get_documents_table(&self) -> Result<Table, StoreError> {
        self.get_table(&self.documents_table, DOCUMENTS_TABLE).await
    }

    async fn get_kv_table(&self) -> Result<Table, StoreError> {
        self.get_table(&self.kv_table, KV_TABLE).await
    }

    fn check_dimension(&self, len: usize) -> Result<(), StoreError> {
        if len == self.embedding_dim {
            Ok(())
        } else {
            Err(StoreError::Dimension {
                expected: self.embedding_dim,
                actual: len,
            })
        }
    }

    /// Convert documents to an Arrow `RecordBatch`.
    fn documents_to_batch(&self, documents: &[StoredDocument]) -> Result<RecordBatch, StoreError> {
        let ids: Vec<_> = documents.iter().map(|d| d.document.id.clone()).collect();
        let kinds: Vec<_> = documents.iter().map(|d| d.document.kind.as_str()).collect();
        let names: Vec<_> = documents.iter().map(|d| d.document.name.clone()).collect();
        let descriptions: Vec<_> = documents
            .iter()
            .map(|d| d.document.description.clone())
            .collect();
        let contents: Vec<_> = documents
            .iter()
            .map(|d| d.document.content.clone())
            .collect();
        let metadata = documents
            .iter()
            .map(|d| serde_json::to_string(&d.document.metadata))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Insert(format!("Failed to encode metadata: {e}")))?;

        let schema = Arc::new(documents_schema(self.embedding_dim));
        let vector_array = build_vector_array(documents, self.embedding_dim)?;

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(kinds)),
                Arc::new(StringArray::from(names)),
                Arc::new(StringArray::from(descriptions)),
                Arc::new(StringArray::from(contents)),
                Arc::new(StringArray::from(metadata)),
                vector_array,
            ],
        )
        .map_err(|e| StoreError::Insert(format!("Failed to create RecordBatch: {e}")))
    }

    /// Build an IVF-PQ index once the table is large enough.
    ///
    /// Returns `true` when an index was created. Smaller tables are searched
    /// exhaustively, which is exact and fast at that size.
    pub async fn optimize(&self) -> Result<bool, StoreError> {
        let table = self.get_documents_table().await?;
        let rows = table
            .count_rows(None)
            .await
            .map_err(|e| StoreError::Query(format!("Failed to count rows: {e}")))?;
        if rows < MIN_ROWS_FOR_INDEX {
            debug!("Skipping index build: {} rows", rows);
            return Ok(false);
        }

        let indices = table
            .list_indices()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to list indices: {e}")))?;
        if indices
            .iter()
            .any(|index| index.columns.iter().any(|c| c == "vector"))
        {
            debug!("Vector index already present");
            return Ok(false);
        }

        info!("Building vector index over {} rows", rows);
        table
            .create_index(
                &["vector"],
                Index::IvfPq(IvfPqIndexBuilder::default().distance_type(DistanceType::Cosine)),
            )
            .execute()
            .await
            .map_err(|e| StoreError::Insert(format!("Failed to build vector index: {e}")))?;
        Ok(true)
    }
}

#[async_trait]
impl VectorStore for LanceStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        info!("Initializing LanceDB at {:?}", self.db_path);

        // Ensure directory exists
        if let Some(parent) = self.db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Init(format!("Failed to create db directory: {e}")))?;
        }

        let conn = self.get_connection().await?;

        let tables = conn
            .table_names()
            .execute()
            .await
            .map_err(|e| StoreError::Init(format!("Failed to list tables: {e}")))?;

        if tables.iter().any(|t| t == DOCUMENTS_TABLE) {
            let table = self.get_documents_table().await?;
            let schema = table
                .schema()
                .await
                .map_err(|e| StoreError::Schema(format!("Failed to read table schema: {e}")))?;
            match vector_dimension(&schema) {
                Some(dim) if dim == self.embedding_dim => {}
                Some(dim) => {
                    return Err(StoreError::Dimension {
                        expected: dim,
                        actual: self.embedding_dim,
                    });
                }
                None => {
                    return Err(StoreError::Schema(
                        "documents table has no vector column".to_string(),
                    ));
                }
            }
        } else {
            info!("Creating documents table");
            conn.create_empty_table(DOCUMENTS_TABLE, Arc::new(documents_schema(self.embedding_dim)))
                .execute()
                .await
                .map_err(|e| StoreError::Init(format!("Failed to create documents table: {e}")))?;
        }

        if !tables.iter().any(|t| t == KV_TABLE) {
            info!("Creating kv table");
            conn.create_empty_table(KV_TABLE, Arc::new(kv_schema()))
                .execute()
                .await
                .map_err(|e| StoreError::Init(format!("Failed to create kv table: {e}")))?;
        }

        info!("LanceDB initialized successfully");
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        *self.documents_table.write().await = None;
        *self.kv_table.write().await = None;
        *self.connection.write().await = None;
        debug!("LanceDB handles released");
        Ok(())
    }

    async fn store(&self, documents: &[StoredDocument]) -> Result<(), StoreError> {
        if documents.is_empty() {
            return Ok(());
        }
        for document in documents {
            self.check_dimension(document.embedding.len())?;
        }

        debug!("Upserting {} documents", documents.len());

        let table = self.get_documents_table().await?;
        let batch = self.documents_to_batch(documents)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)], schema));

        let mut merge = table.merge_insert(&["id"]);
        merge
            .when_matched_update_all(None)
            .when_not_matched_insert_all();
        merge
            .execute(reader)
            .await
            .map_err(|e| StoreError::Insert(format!("Failed to upsert documents: {e}")))?;

        debug!("Successfully upserted {} documents", documents.len());
        Ok(())
    }

    async fn search(
        &self,
        embedding: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, StoreError> {
        self.check_dimension(embedding.len())?;
        filter::validate_options(options)?;
        if options.limit == 0 {
            return Ok(Vec::new());
        }

        let table = self.get_documents_table().await?;

        // Metadata lives in a JSON column, so metadata filters run on decoded
        // rows and the vector search must see every row. An ANN index only
        // probes some partitions, so that path scans exhaustively.
        let exhaustive = !options.metadata_filters.is_empty();
        let fetch = if !exhaustive {
            options.limit
        } else {
            table
                .count_rows(None)
                .await
                .map_err(|e| StoreError::Query(format!("Failed to count rows: {e}")))?
        };
        if fetch == 0 {
            return Ok(Vec::new());
        }

        debug!("Searching with limit {} (fetching {})", options.limit, fetch);

        let mut query = table
            .vector_search(embedding.to_vec())
            .map_err(|e| StoreError::Query(format!("Failed to create search query: {e}")))?
            .distance_type(DistanceType::Cosine)
            .limit(fetch);
        if exhaustive {
            query = query.bypass_vector_index();
        }
        if let Some(predicate) = filter::column_predicates(&options.column_filters)? {
            query = query.only_if(predicate);
        }

        let mut stream = query
            .execute()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to execute search: {e}")))?;

        let mut results = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to fetch results: {e}")))?
        {
            results.extend(batch_to_search_results(&batch)?);
        }

        results.retain(|r| filter::matches(&r.document, options));
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(options.limit);

        debug!("Found {} results", results.len());
        Ok(results)
    }

    async fn delete(&self, ids: &[String]) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let table = self.get_documents_table().await?;
        let list: Vec<String> = ids.iter().map(|id| filter::sql_literal(id)).collect();
        let predicate = format!("id IN ({})", list.join(", "));

        let existing = table
            .count_rows(Some(predicate.clone()))
            .await
            .map_err(|e| StoreError::Query(format!("Failed to count rows: {e}")))?;
        table
            .delete(&predicate)
            .await
            .map_err(|e| StoreError::Delete(format!("Failed to delete documents: {e}")))?;

        debug!("Deleted {} documents", existing);
        Ok(existing as u64)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let table = self.get_documents_table().await?;
        table
            .delete("id IS NOT NULL")
            .await
            .map_err(|e| StoreError::Delete(format!("Failed to clear documents: {e}")))?;
        info!("Cleared documents table");
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let table = self.get_documents_table().await?;
        let rows = table
            .count_rows(None)
            .await
            .map_err(|e| StoreError::Query(format!("Failed to count rows: {e}")))?;
        Ok(rows as u64)
    }
}

#[async_trait]
impl MetadataStore for LanceStore {
    async fn get_metadata(&self, key: &str) -> Result<Option<String>, StoreError> {
        filter::validate_field(key)?;
        let table = self.get_kv_table().await?;

        let mut stream = table
            .query()
            .only_if(format!("key = {}", filter::sql_literal(key)))
            .limit(1)
            .execute()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to query metadata: {e}")))?;

        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to fetch metadata: {e}")))?
        {
            if batch.num_rows() == 0 {
                continue;
            }
            let values = string_column(&batch, "value")?;
            return Ok(Some(values.value(0).to_string()));
        }
        Ok(None)
    }

    async fn set_metadata(&self, key: &str, value: &str) -> Result<(), StoreError> {
        filter::validate_field(key)?;
        let table = self.get_kv_table().await?;

        let schema = Arc::new(kv_schema());
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![key.to_string()])),
                Arc::new(StringArray::from(vec![value.to_string()])),
            ],
        )
        .map_err(|e| StoreError::Insert(format!("Failed to create kv RecordBatch: {e}")))?;
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)], schema));

        let mut merge = table.merge_insert(&["key"]);
        merge
            .when_matched_update_all(None)
            .when_not_matched_insert_all();
        merge
            .execute(reader)
            .await
            .map_err(|e| StoreError::Insert(format!("Failed to write metadata: {e}")))?;
        Ok(())
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn build_vector_array(documents: &[StoredDocument], dim: usize) -> Result<ArrayRef, StoreError> {
    let width = i32::try_from(dim)
        .map_err(|_| StoreError::Schema(format!("embedding dimension {dim} too large")))?;
    let mut builder = FixedSizeListBuilder::new(Float32Builder::new(), width);

    for document in documents {
        let values_builder = builder.values();
        for &v in &document.embedding {
            values_builder.append_value(v);
        }
        builder.append(true);
    }

    Ok(Arc::new(builder.finish()))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, StoreError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| StoreError::Query(format!("Missing column {name}")))
}

fn batch_to_search_results(batch: &RecordBatch) -> Result<Vec<SearchResult>, StoreError> {
    let ids = string_column(batch, "id")?;
    let kinds = string_column(batch, "type")?;
    let names = string_column(batch, "name")?;
    let descriptions = string_column(batch, "description")?;
    let contents = string_column(batch, "content")?;
    let metadata = string_column(batch, "metadata")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    let mut results = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let kind = DeclarationKind::from_str(kinds.value(i)).map_err(StoreError::Query)?;
        let metadata: Metadata = serde_json::from_str(metadata.value(i)).map_err(|e| {
            warn!("Undecodable metadata for {}: {}", ids.value(i), e);
            StoreError::Query(format!("Failed to decode metadata: {e}"))
        })?;
        let description = (!descriptions.is_null(i)).then(|| descriptions.value(i).to_string());

        let score = distances.map_or(0.0, |d| 1.0 - d.value(i));

        results.push(SearchResult {
            document: DeclarationDocument {
                id: ids.value(i).to_string(),
                kind,
                name: names.value(i).to_string(),
                description,
                content: contents.value(i).to_string(),
                metadata,
            },
            score,
        });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gqlsearch_core::{Column, ColumnFilter, MetadataFilter, keys};
    use serde_json::Value;
    use tempfile::tempdir;

    const TEST_DIM: usize = 8;

    fn embedding(seed: usize) -> Vec<f32> {
        (0..TEST_DIM)
            .map(|i| ((i + seed) as f32 * 0.7).sin())
            .collect()
    }

    fn stored(kind: DeclarationKind, name: &str, root: bool, seed: usize) -> StoredDocument {
        let mut metadata = Metadata::new();
        metadata.insert(keys::IS_ROOT_OPERATION_FIELD.to_string(), Value::Bool(root));
        StoredDocument::new(
            DeclarationDocument::new(
                kind,
                name,
                Some(format!("The {name}")),
                format!("{name}: String"),
                metadata,
            ),
            embedding(seed),
        )
    }

    async fn open_store() -> (tempfile::TempDir, LanceStore) {
        let temp = tempdir().unwrap();
        let store = LanceStore::new(temp.path().join("test.lance"), TEST_DIM);
        store.initialize().await.unwrap();
        (temp, store)
    }

    #[tokio::test]
    async fn test_initialize_creates_tables() {
        let (_temp, store) = open_store().await;

        let conn = store.get_connection().await.unwrap();
        let tables = conn.table_names().execute().await.unwrap();
        assert!(tables.contains(&DOCUMENTS_TABLE.to_string()));
        assert!(tables.contains(&KV_TABLE.to_string()));
    }

    #[tokio::test]
    async fn test_initialize_idempotent() {
        let (_temp, store) = open_store().await;
        assert!(store.initialize().await.is_ok());
    }

    #[tokio::test]
    async fn test_initialize_rejects_other_dimension() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("test.lance");
        LanceStore::new(path.clone(), TEST_DIM)
            .initialize()
            .await
            .unwrap();

        let err = LanceStore::new(path, TEST_DIM * 2)
            .initialize()
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Dimension { .. }));
    }

    #[tokio::test]
    async fn test_store_and_search_round_trip() {
        let (_temp, store) = open_store().await;
        let doc = stored(DeclarationKind::Field, "getUser", true, 1);
        store.store(std::slice::from_ref(&doc)).await.unwrap();

        let results = store
            .search(&embedding(1), &SearchOptions::new(5))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document, doc.document);
        assert!((results[0].score - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let (_temp, store) = open_store().await;
        let doc = stored(DeclarationKind::Field, "getUser", true, 1);
        store.store(std::slice::from_ref(&doc)).await.unwrap();
        store.store(std::slice::from_ref(&doc)).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_search_filters() {
        let (_temp, store) = open_store().await;
        store
            .store(&[
                stored(DeclarationKind::Field, "getUser", true, 1),
                stored(DeclarationKind::Field, "name", false, 2),
                stored(DeclarationKind::Object, "User", false, 3),
                stored(DeclarationKind::Enum, "Role", false, 4),
            ])
            .await
            .unwrap();

        let roots = store
            .search(
                &embedding(2),
                &SearchOptions::new(10)
                    .with_metadata_filter(MetadataFilter::eq(keys::IS_ROOT_OPERATION_FIELD, true)),
            )
            .await
            .unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].document.name, "getUser");

        let types = store
            .search(
                &embedding(2),
                &SearchOptions::new(10)
                    .with_column_filter(ColumnFilter::is_in(
                        Column::Name,
                        vec!["User".to_string(), "Role".to_string(), "getUser".to_string()],
                    ))
                    .with_column_filter(ColumnFilter::kinds(&DeclarationKind::TYPE_KINDS)),
            )
            .await
            .unwrap();
        let mut names: Vec<_> = types.iter().map(|r| r.document.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["Role", "User"]);
    }

    #[tokio::test]
    async fn test_search_rejects_bad_filter() {
        let (_temp, store) = open_store().await;
        let err = store
            .search(
                &embedding(1),
                &SearchOptions::new(1).with_metadata_filter(MetadataFilter::exists("x y")),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidFilter(_)));
    }

    #[tokio::test]
    async fn test_delete_counts_existing() {
        let (_temp, store) = open_store().await;
        let a = stored(DeclarationKind::Field, "a", true, 1);
        let b = stored(DeclarationKind::Field, "b", true, 2);
        store.store(&[a.clone(), b]).await.unwrap();

        let deleted = store
            .delete(&[a.id().to_string(), "field-missing".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let (_temp, store) = open_store().await;
        store
            .store(&[stored(DeclarationKind::Field, "a", true, 1)])
            .await
            .unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_on_store() {
        let (_temp, store) = open_store().await;
        let mut doc = stored(DeclarationKind::Field, "a", true, 1);
        doc.embedding.push(0.0);
        let err = store.store(&[doc]).await.unwrap_err();
        assert!(matches!(err, StoreError::Dimension { .. }));
    }

    #[tokio::test]
    async fn test_metadata_side_channel() {
        let (_temp, store) = open_store().await;
        assert_eq!(store.get_metadata("schema").await.unwrap(), None);

        store.set_metadata("schema", "type Query { a: Int }").await.unwrap();
        store.set_metadata("schema", "type Query { it's: Int }").await.unwrap();
        assert_eq!(
            store.get_metadata("schema").await.unwrap().as_deref(),
            Some("type Query { it's: Int }")
        );
    }

    #[tokio::test]
    async fn test_optimize_skips_small_tables() {
        let (_temp, store) = open_store().await;
        store
            .store(&[stored(DeclarationKind::Field, "a", true, 1)])
            .await
            .unwrap();
        assert!(!store.optimize().await.unwrap());
    }

    #[tokio::test]
    async fn test_optimize_then_filtered_search() {
        const DIM: usize = 32;
        let vector = |seed: usize| -> Vec<f32> {
            (0..DIM)
                .map(|i| ((i * 7 + seed * 13) as f32 * 0.37).sin())
                .collect()
        };

        let temp = tempdir().unwrap();
        let store = LanceStore::new(temp.path().join("ann.lance"), DIM);
        store.initialize().await.unwrap();

        let documents: Vec<StoredDocument> = (0..MIN_ROWS_FOR_INDEX + 64)
            .map(|i| {
                let mut metadata = Metadata::new();
                metadata.insert(
                    keys::IS_ROOT_OPERATION_FIELD.to_string(),
                    Value::Bool(i % 40 == 0),
                );
                StoredDocument::new(
                    DeclarationDocument::new(
                        DeclarationKind::Field,
                        format!("field{i}"),
                        None,
                        format!("Node.field{i}: Int"),
                        metadata,
                    ),
                    vector(i),
                )
            })
            .collect();
        store.store(&documents).await.unwrap();

        assert!(store.optimize().await.unwrap());
        // second call sees the existing index
        assert!(!store.optimize().await.unwrap());

        let plain = store
            .search(&vector(5), &SearchOptions::new(10))
            .await
            .unwrap();
        assert_eq!(plain.len(), 10);

        let roots = store
            .search(
                &vector(5),
                &SearchOptions::new(50)
                    .with_metadata_filter(MetadataFilter::eq(keys::IS_ROOT_OPERATION_FIELD, true)),
            )
            .await
            .unwrap();
        let expected = documents
            .iter()
            .filter(|d| d.document.is_root_operation_field())
            .count();
        assert_eq!(roots.len(), expected);
        assert!(roots.iter().all(|r| r.document.is_root_operation_field()));
        assert!(roots.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_close_and_reopen() {
        let (_temp, store) = open_store().await;
        store
            .store(&[stored(DeclarationKind::Field, "a", true, 1)])
            .await
            .unwrap();
        store.close().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
