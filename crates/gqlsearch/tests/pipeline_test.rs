//! Integration tests for the full gqlsearch pipeline.
//!
//! Tests the complete flow: decompose → embed → store → search → generate.

use async_trait::async_trait;
use gqlsearch_core::{
    ChatMessage, CompletionOptions, DeclarationDocument, DeclarationKind, EmbedError,
    EmbeddingProvider, Error, LanguageModel, LlmError, MetadataFilter, MetadataStore,
    OperationType, SchemaDecomposer, SearchOptions, VectorStore, keys,
};
use gqlsearch_generate::{GenerationConfig, OperationGenerator, SelectionTier, SyntaxValidator};
use gqlsearch_index::EmbeddingService;
use gqlsearch_schema::SdlDecomposer;
use gqlsearch_store::{LanceStore, MemoryStore};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

const TEST_DIM: usize = 256;

const SCHEMA: &str = r#"
"""Blog API"""
type Query {
  "Fetch one user by id"
  user(id: ID!): User
  "List posts, optionally by author"
  posts(authorId: ID): [Post!]!
}

type Mutation {
  "Register a new user"
  createUser(name: String!): User
  "Publish a post"
  createPost(title: String!, body: String): Post
}

type User {
  id: ID!
  name: String!
  posts: [Post!]!
}

type Post {
  id: ID!
  title: String!
  body: String
  author: User!
  tags: [Tag!]!
}

enum Tag {
  NEWS
  TUTORIAL
}
"#;

/// Mock embedder for testing (avoids a model server).
///
/// Bag of words: each lowercased word, camelCase split, adds one to a
/// blake3-chosen bucket, so texts sharing words have positive similarity.
struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn words(text: &str) -> Vec<String> {
        let mut words = Vec::new();
        let mut current = String::new();
        for c in text.chars() {
            if !c.is_alphanumeric() || (c.is_uppercase() && !current.is_empty()) {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            if c.is_alphanumeric() {
                current.extend(c.to_lowercase());
            }
        }
        if !current.is_empty() {
            words.push(current);
        }
        words
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimension];
        for word in Self::words(text) {
            let hash = blake3::hash(word.as_bytes());
            let bytes = hash.as_bytes();
            let bucket = usize::from(u16::from_le_bytes([bytes[0], bytes[1]])) % self.dimension;
            embedding[bucket] += 1.0;
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    fn model_name(&self) -> &str {
        "mock-embedder"
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|text| self.vector(text)).collect())
    }
}

/// Replays canned answers in order and records every conversation.
struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLlm {
    fn new(replies: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::Response("script exhausted".to_string()))
    }
}

fn field_id(parent: &str, name: &str) -> String {
    SdlDecomposer::new()
        .parse(SCHEMA)
        .unwrap()
        .into_iter()
        .find(|d| {
            d.kind == DeclarationKind::Field
                && d.name == name
                && d.metadata_str(keys::PARENT_TYPE) == Some(parent)
        })
        .map(|d| d.id)
        .unwrap()
}

/// Index `SCHEMA` into a fresh memory store.
async fn indexed_memory_store() -> (Arc<MemoryStore>, Arc<MockEmbedder>) {
    let store = Arc::new(MemoryStore::new(TEST_DIM));
    store.initialize().await.unwrap();
    let embedder = Arc::new(MockEmbedder::new(TEST_DIM));

    let decomposer = Arc::new(SdlDecomposer::new());
    let documents = decomposer.parse(SCHEMA).unwrap();
    let service = EmbeddingService::new(embedder.clone(), decomposer, store.clone());
    let result = service.embed_and_store(&documents).await.unwrap();
    assert_eq!(result.embedded_count, documents.len());
    assert_eq!(result.skipped_count, 0);

    store.set_metadata("schema", SCHEMA).await.unwrap();
    (store, embedder)
}

fn config() -> GenerationConfig {
    GenerationConfig {
        // bag-of-words scores are low; keep every root field
        min_similarity_score: 0.0,
        ..GenerationConfig::default()
    }
}

#[tokio::test]
async fn test_full_pipeline_index_search_generate() {
    let (store, embedder) = indexed_memory_store().await;
    let request = "create a post titled Hello";
    let create_post = field_id("Mutation", "createPost");

    let llm = Arc::new(ScriptedLlm::new(vec![
        "mutation".to_string(),
        create_post.clone(),
        "```graphql\nmutation {\n  createPost(title: \"Hello\") {\n    id\n    title\n    author { name }\n  }\n}\n```"
            .to_string(),
    ]));
    let schema = store.get_metadata("schema").await.unwrap().unwrap();
    let generator = OperationGenerator::new(
        store.clone(),
        llm.clone(),
        Arc::new(SyntaxValidator::new()),
        schema,
        config(),
    );

    let embedding = embedder.embed(request).await.unwrap();
    let result = generator.generate(request, embedding).await.unwrap();

    assert!(result.valid, "{:?}", result.diagnostics.last_errors);
    assert_eq!(result.validation_attempts, 1);
    assert_eq!(result.operation_type, OperationType::Mutation);
    assert_eq!(result.root_field.id, create_post);
    assert_eq!(result.diagnostics.selection_tier, SelectionTier::Exact);
    assert!(result.operation.starts_with("mutation {"));
    assert!(!result.operation.contains("```"));

    // the draft prompt carries the closure of Post
    let calls = llm.calls();
    assert_eq!(calls.len(), 3);
    let draft_prompt = &calls[2][1].content;
    assert!(draft_prompt.contains("type Post {"));
    assert!(draft_prompt.contains("type User {"));
    assert!(draft_prompt.contains("enum Tag {"));
    assert!(result.diagnostics.closure_size >= 3);
    assert!(!result.diagnostics.closure_truncated);
}

#[tokio::test]
async fn test_syntax_validator_drives_repair() {
    let (store, embedder) = indexed_memory_store().await;
    let request = "show me the posts";

    let llm = Arc::new(ScriptedLlm::new(vec![
        "query".to_string(),
        field_id("Query", "posts"),
        "query { allPosts { id } }".to_string(),
        "```graphql\nquery { posts { id title } }\n```".to_string(),
    ]));
    let generator = OperationGenerator::new(
        store.clone(),
        llm.clone(),
        Arc::new(SyntaxValidator::new()),
        SCHEMA,
        config(),
    );

    let embedding = embedder.embed(request).await.unwrap();
    let result = generator.generate(request, embedding).await.unwrap();

    assert!(result.valid);
    assert_eq!(result.validation_attempts, 2);
    assert_eq!(result.operation, "query { posts { id title } }");

    let calls = llm.calls();
    assert_eq!(calls.len(), 4);
    let repair = &calls[3];
    assert_eq!(repair.len(), 4);
    assert!(repair[2].content.contains("allPosts"));
    assert!(
        repair[3]
            .content
            .contains("Cannot query field \"allPosts\" on type \"Query\".")
    );
}

#[tokio::test]
async fn test_never_valid_returns_last_draft() {
    let (store, embedder) = indexed_memory_store().await;
    let request = "fetch a user";

    let mut replies = vec!["query".to_string(), field_id("Query", "user")];
    replies.extend((1..=3).map(|i| format!("query {{ person{i} {{ id }} }}")));
    let llm = Arc::new(ScriptedLlm::new(replies));
    let generator = OperationGenerator::new(
        store,
        llm,
        Arc::new(SyntaxValidator::new()),
        SCHEMA,
        config(),
    );

    let embedding = embedder.embed(request).await.unwrap();
    let result = generator.generate(request, embedding).await.unwrap();

    assert!(!result.valid);
    assert_eq!(result.validation_attempts, 3);
    assert_eq!(result.operation, "query { person3 { id } }");
    assert_eq!(result.diagnostics.last_errors.len(), 1);
}

#[tokio::test]
async fn test_root_field_search_ranks_shared_words_first() {
    let (store, embedder) = indexed_memory_store().await;

    let embedding = embedder.embed("create a post").await.unwrap();
    let options = SearchOptions::new(10)
        .with_metadata_filter(MetadataFilter::eq(keys::IS_ROOT_OPERATION_FIELD, true));
    let results = store.search(&embedding, &options).await.unwrap();

    assert_eq!(results.len(), 4);
    assert_eq!(results[0].document.name, "createPost");
    assert!(results.iter().all(|r| r.document.is_root_operation_field()));
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn test_reindexing_is_idempotent() {
    let (store, embedder) = indexed_memory_store().await;
    let before = store.count().await.unwrap();

    let decomposer = Arc::new(SdlDecomposer::new());
    let documents = decomposer.parse(SCHEMA).unwrap();
    let service = EmbeddingService::new(embedder, decomposer, store.clone());
    service.embed_and_store(&documents).await.unwrap();

    assert_eq!(store.count().await.unwrap(), before);
}

#[tokio::test]
async fn test_empty_index_has_no_root_fields() {
    let store = Arc::new(MemoryStore::new(TEST_DIM));
    store.initialize().await.unwrap();
    let embedder = MockEmbedder::new(TEST_DIM);
    let llm = Arc::new(ScriptedLlm::new(vec![]));

    let generator = OperationGenerator::new(
        store,
        llm.clone(),
        Arc::new(SyntaxValidator::new()),
        SCHEMA,
        GenerationConfig::default(),
    );
    let embedding = embedder.embed("anything").await.unwrap();
    let err = generator.generate("anything", embedding).await.unwrap_err();

    assert!(matches!(err, Error::NoRelevantRootFields { .. }));
    assert!(llm.calls().is_empty());
}

#[tokio::test]
async fn test_lancedb_index_and_search() {
    let db_dir = tempdir().unwrap();
    let store = Arc::new(LanceStore::new(db_dir.path().join("index.lance"), TEST_DIM));
    store.initialize().await.unwrap();
    let embedder = Arc::new(MockEmbedder::new(TEST_DIM));

    let decomposer = Arc::new(SdlDecomposer::new());
    let documents: Vec<DeclarationDocument> = decomposer.parse(SCHEMA).unwrap();
    let service = EmbeddingService::new(embedder.clone(), decomposer, store.clone());
    let result = service.embed_and_store(&documents).await.unwrap();
    store.set_metadata("schema", SCHEMA).await.unwrap();

    assert_eq!(store.count().await.unwrap(), result.stored_count as u64);
    assert_eq!(
        store.get_metadata("schema").await.unwrap().as_deref(),
        Some(SCHEMA)
    );

    let embedding = embedder.embed("create a post").await.unwrap();
    let options = SearchOptions::new(2)
        .with_metadata_filter(MetadataFilter::eq(keys::IS_ROOT_OPERATION_FIELD, true));
    let results = store.search(&embedding, &options).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].document.name, "createPost");
    assert_eq!(
        results[0].document.root_operation_type(),
        Some(OperationType::Mutation)
    );
}
