//! Core types for gqlsearch.
//!
//! This module contains all shared data structures used across gqlsearch:
//!
//! ## Declarations
//! - [`DeclarationDocument`]: One indexed schema construct
//! - [`DeclarationKind`]: Which construct a document describes
//! - [`OperationType`]: Query / mutation / subscription
//! - [`StoredDocument`]: A declaration with its embedding
//!
//! ## Search
//! - [`SearchOptions`]: Limit and filters for a similarity search
//! - [`MetadataFilter`] / [`ColumnFilter`]: ANDed search predicates
//! - [`SearchResult`]: A matching document with similarity score
//!
//! ## Ingestion
//! - [`EmbedResult`]: Accounting for one `embed_and_store` run
//!
//! ## Language models and validation
//! - [`ChatMessage`]: A role-tagged conversation turn
//! - [`CompletionOptions`]: Sampling parameters
//! - [`ValidationOutcome`]: Verdict from an operation validator

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Ordered metadata map attached to every declaration document.
pub type Metadata = BTreeMap<String, Value>;

/// Well-known metadata keys.
pub mod keys {
    /// Type that declares a field (`Query`, `User`, ...)
    pub const PARENT_TYPE: &str = "parentType";
    /// Named return type of a field, wrappers removed
    pub const FIELD_TYPE: &str = "fieldType";
    /// Named types of a field's arguments
    pub const ARGUMENT_TYPES: &str = "argumentTypes";
    /// Whether a field sits directly under a root operation type
    pub const IS_ROOT_OPERATION_FIELD: &str = "isRootOperationField";
    /// `Query`, `Mutation` or `Subscription`
    pub const ROOT_OPERATION_TYPE: &str = "rootOperationType";
    /// Named types referenced by a type declaration
    pub const REFERENCED_TYPES: &str = "referencedTypes";
    /// Id of the document a chunk was cut from
    pub const PARENT_ID: &str = "parentId";
    /// Position of a chunk in its group
    pub const CHUNK_INDEX: &str = "chunkIndex";
    /// Size of a chunk group
    pub const CHUNK_COUNT: &str = "chunkCount";
}

// ============================================================================
// Declarations
// ============================================================================

/// Kind of schema construct a document describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Field,
    Object,
    Input,
    Enum,
    Interface,
    Union,
    Scalar,
    Directive,
    Schema,
}

impl DeclarationKind {
    /// Kinds that name a type usable in a field or argument signature.
    pub const TYPE_KINDS: [Self; 6] = [
        Self::Object,
        Self::Input,
        Self::Enum,
        Self::Interface,
        Self::Union,
        Self::Scalar,
    ];

    /// Stable lowercase name, used in ids and the `type` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Object => "object",
            Self::Input => "input",
            Self::Enum => "enum",
            Self::Interface => "interface",
            Self::Union => "union",
            Self::Scalar => "scalar",
            Self::Directive => "directive",
            Self::Schema => "schema",
        }
    }

    /// Whether this kind names a type.
    #[must_use]
    pub fn is_type(self) -> bool {
        Self::TYPE_KINDS.contains(&self)
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeclarationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "field" => Ok(Self::Field),
            "object" => Ok(Self::Object),
            "input" => Ok(Self::Input),
            "enum" => Ok(Self::Enum),
            "interface" => Ok(Self::Interface),
            "union" => Ok(Self::Union),
            "scalar" => Ok(Self::Scalar),
            "directive" => Ok(Self::Directive),
            "schema" => Ok(Self::Schema),
            other => Err(format!("unknown declaration kind: {other}")),
        }
    }
}

/// GraphQL operation type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    #[default]
    Query,
    Mutation,
    Subscription,
}

impl OperationType {
    pub const ALL: [Self; 3] = [Self::Query, Self::Mutation, Self::Subscription];

    /// Operation keyword (`query`, `mutation`, `subscription`).
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }

    /// Default root type name (`Query`, `Mutation`, `Subscription`).
    #[must_use]
    pub const fn root_type_name(self) -> &'static str {
        match self {
            Self::Query => "Query",
            Self::Mutation => "Mutation",
            Self::Subscription => "Subscription",
        }
    }

    /// Parse a root type name as stored in `rootOperationType` metadata.
    #[must_use]
    pub fn from_root_type_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.root_type_name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One indexed schema construct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclarationDocument {
    /// Content-addressed identifier
    pub id: String,
    /// Construct kind
    #[serde(rename = "type")]
    pub kind: DeclarationKind,
    /// Declared name (field name for fields)
    pub name: String,
    /// Description string, if the schema carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Canonical SDL rendering
    pub content: String,
    /// Structured metadata, see [`keys`]
    #[serde(default)]
    pub metadata: Metadata,
}

impl DeclarationDocument {
    /// Build a document, deriving its id from kind, name and content.
    #[must_use]
    pub fn new(
        kind: DeclarationKind,
        name: impl Into<String>,
        description: Option<String>,
        content: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        let name = name.into();
        let content = content.into();
        Self {
            id: Self::compute_id(kind, &name, &content),
            kind,
            name,
            description,
            content,
            metadata,
        }
    }

    /// Deterministic id: `{kind}-{blake3(kind, name, content)[..32]}`.
    #[must_use]
    pub fn compute_id(kind: DeclarationKind, name: &str, content: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(kind.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
        hasher.update(content.as_bytes());
        let hex = hasher.finalize().to_hex();
        format!("{}-{}", kind.as_str(), &hex[..32])
    }

    /// Metadata value as a string slice.
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Metadata array of strings; missing or malformed values yield an empty list.
    #[must_use]
    pub fn metadata_strings(&self, key: &str) -> Vec<String> {
        self.metadata
            .get(key)
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether this is a field directly under a root operation type.
    #[must_use]
    pub fn is_root_operation_field(&self) -> bool {
        self.metadata
            .get(keys::IS_ROOT_OPERATION_FIELD)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Root operation type for root fields.
    #[must_use]
    pub fn root_operation_type(&self) -> Option<OperationType> {
        self.metadata_str(keys::ROOT_OPERATION_TYPE)
            .and_then(OperationType::from_root_type_name)
    }

    /// Named return type of a field.
    #[must_use]
    pub fn field_type(&self) -> Option<&str> {
        self.metadata_str(keys::FIELD_TYPE)
    }

    /// Named argument types of a field.
    #[must_use]
    pub fn argument_types(&self) -> Vec<String> {
        self.metadata_strings(keys::ARGUMENT_TYPES)
    }

    /// Named types a type declaration refers to.
    #[must_use]
    pub fn referenced_types(&self) -> Vec<String> {
        self.metadata_strings(keys::REFERENCED_TYPES)
    }
}

/// A declaration document with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    #[serde(flatten)]
    pub document: DeclarationDocument,
    /// Embedding vector, length equal to the store dimension
    pub embedding: Vec<f32>,
}

impl StoredDocument {
    #[must_use]
    pub fn new(document: DeclarationDocument, embedding: Vec<f32>) -> Self {
        Self {
            document,
            embedding,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.document.id
    }
}

// ============================================================================
// Search
// ============================================================================

/// Parameters for a similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Maximum results to return
    pub limit: usize,
    /// Predicates over metadata keys
    pub metadata_filters: Vec<MetadataFilter>,
    /// Predicates over the fixed `name` / `type` columns
    pub column_filters: Vec<ColumnFilter>,
}

impl SearchOptions {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            metadata_filters: Vec::new(),
            column_filters: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_metadata_filter(mut self, filter: MetadataFilter) -> Self {
        self.metadata_filters.push(filter);
        self
    }

    #[must_use]
    pub fn with_column_filter(mut self, filter: ColumnFilter) -> Self {
        self.column_filters.push(filter);
        self
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Filter over a named metadata key.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataFilter {
    pub field: String,
    pub op: MetadataOp,
}

/// Metadata filter operators.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataOp {
    Eq(Value),
    Neq(Value),
    In(Vec<Value>),
    Exists,
}

impl MetadataFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: MetadataOp::Eq(value.into()),
        }
    }

    pub fn neq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: MetadataOp::Neq(value.into()),
        }
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            op: MetadataOp::In(values),
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: MetadataOp::Exists,
        }
    }

    /// Evaluate against a metadata map. A missing key only satisfies `Neq`.
    #[must_use]
    pub fn matches(&self, metadata: &Metadata) -> bool {
        let value = metadata.get(&self.field);
        match (&self.op, value) {
            (MetadataOp::Exists, value) => value.is_some_and(|v| !v.is_null()),
            (MetadataOp::Eq(expected), Some(actual)) => actual == expected,
            (MetadataOp::Neq(expected), Some(actual)) => actual != expected,
            (MetadataOp::Neq(_), None) => true,
            (MetadataOp::In(options), Some(actual)) => options.contains(actual),
            (MetadataOp::Eq(_) | MetadataOp::In(_), None) => false,
        }
    }
}

/// Fixed document columns that can be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    Type,
}

impl Column {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Type => "type",
        }
    }

    /// Column value of a document.
    #[must_use]
    pub fn value_of(self, document: &DeclarationDocument) -> &str {
        match self {
            Self::Name => &document.name,
            Self::Type => document.kind.as_str(),
        }
    }
}

/// Filter over a fixed column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFilter {
    pub column: Column,
    pub op: ColumnOp,
}

/// Column filter operators.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnOp {
    Eq(String),
    In(Vec<String>),
}

impl ColumnFilter {
    pub fn eq(column: Column, value: impl Into<String>) -> Self {
        Self {
            column,
            op: ColumnOp::Eq(value.into()),
        }
    }

    #[must_use]
    pub fn is_in(column: Column, values: Vec<String>) -> Self {
        Self {
            column,
            op: ColumnOp::In(values),
        }
    }

    /// Restrict to the given declaration kinds.
    #[must_use]
    pub fn kinds(kinds: &[DeclarationKind]) -> Self {
        Self::is_in(
            Column::Type,
            kinds.iter().map(|k| k.as_str().to_string()).collect(),
        )
    }

    #[must_use]
    pub fn matches(&self, document: &DeclarationDocument) -> bool {
        let actual = self.column.value_of(document);
        match &self.op {
            ColumnOp::Eq(expected) => actual == expected,
            ColumnOp::In(options) => options.iter().any(|o| o == actual),
        }
    }
}

/// A search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: DeclarationDocument,
    /// Cosine similarity in `[-1, 1]`
    pub score: f32,
}

// ============================================================================
// Ingestion
// ============================================================================

/// A document dropped because it could not fit the embedding context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDocument {
    pub id: String,
    pub name: String,
    pub token_count: usize,
    pub limit: usize,
}

/// A document that was split into a chunk group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkedDocument {
    pub id: String,
    pub name: String,
    pub token_count: usize,
    pub chunk_count: usize,
}

/// Accounting for one embed-and-store run.
///
/// `embedded_count + skipped_count` equals the number of input documents;
/// a chunk group counts once towards `embedded_count`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedResult {
    pub embedded_count: usize,
    pub skipped_count: usize,
    pub skipped_documents: Vec<SkippedDocument>,
    pub chunked_count: usize,
    pub chunked_documents: Vec<ChunkedDocument>,
    /// Physical records written, chunks counted individually
    pub stored_count: usize,
}

// ============================================================================
// Language models
// ============================================================================

/// Conversation role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling parameters for a completion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 2048,
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Verdict from an operation validator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    #[must_use]
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}
