//! GraphQL schema decomposition for gqlsearch.
//!
//! [`SdlDecomposer`] reads schema definition language and produces one
//! [`DeclarationDocument`](gqlsearch_core::DeclarationDocument) per type,
//! directive and schema definition, plus one per object or interface field.
//! Oversized documents are split with [`chunk_documents`].

pub mod chunk;
pub mod decomposer;
pub mod render;
pub mod syntax;

pub use chunk::{chunk_documents, split_content};
pub use decomposer::SdlDecomposer;
pub use syntax::{error_line, error_summary};
