//! Arrow schema definitions for `LanceDB` tables.

use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// Declaration documents table.
pub const DOCUMENTS_TABLE: &str = "documents";
/// Key/value side-channel table.
pub const KV_TABLE: &str = "kv";

/// Schema for the documents table.
///
/// `metadata` holds the document's metadata map serialized as JSON.
#[must_use]
pub fn documents_schema(embedding_dim: usize) -> Schema {
    Schema::new(vec![
        // Identity
        Field::new("id", DataType::Utf8, false),
        Field::new("type", DataType::Utf8, false),
        Field::new("name", DataType::Utf8, false),
        // Content
        Field::new("description", DataType::Utf8, true),
        Field::new("content", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, false),
        // Embedding
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                i32::try_from(embedding_dim).unwrap_or(i32::MAX),
            ),
            false,
        ),
    ])
}

/// Schema for the key/value metadata table.
#[must_use]
pub fn kv_schema() -> Schema {
    Schema::new(vec![
        Field::new("key", DataType::Utf8, false),
        Field::new("value", DataType::Utf8, false),
    ])
}

/// Vector width declared by a documents table schema.
#[must_use]
pub fn vector_dimension(schema: &Schema) -> Option<usize> {
    match schema.field_with_name("vector").ok()?.data_type() {
        DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_schema_columns() {
        let schema = documents_schema(384);
        let names: Vec<_> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(
            names,
            vec!["id", "type", "name", "description", "content", "metadata", "vector"]
        );
        assert!(schema.field_with_name("description").unwrap().is_nullable());
    }

    #[test]
    fn test_vector_dimension() {
        assert_eq!(vector_dimension(&documents_schema(768)), Some(768));
        assert_eq!(vector_dimension(&kv_schema()), None);
    }
}
