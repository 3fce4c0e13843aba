//! GraphQL operation synthesis for gqlsearch.
//!
//! [`OperationGenerator`] turns a natural-language request into an operation
//! by searching indexed root fields, asking a language model to classify the
//! request and pick a field, collecting the types that field reaches, and
//! drafting an operation that a [`Validator`](gqlsearch_core::Validator)
//! accepts within a bounded number of attempts.
//!
//! # Example
//!
//! ```rust,ignore
//! use gqlsearch_generate::{GenerationConfig, OperationGenerator, SyntaxValidator};
//!
//! let generator = OperationGenerator::new(
//!     store,
//!     llm,
//!     Arc::new(SyntaxValidator::new()),
//!     schema_sdl,
//!     GenerationConfig::default(),
//! );
//! let embedding = embedder.embed("list every user with their posts").await?;
//! let result = generator.generate("list every user with their posts", embedding).await?;
//! println!("{}", result.operation);
//! ```

pub mod classify;
pub mod closure;
pub mod config;
pub mod context;
pub mod extract;
pub mod pipeline;
pub mod prompts;
pub mod select;
pub mod validate;

pub use classify::parse_operation_type;
pub use closure::{BUILT_IN_SCALARS, TypeClosure, discover_types};
pub use config::GenerationConfig;
pub use context::{Diagnostics, GenerationContext, GenerationResult, SelectionTier};
pub use extract::extract_operation;
pub use pipeline::OperationGenerator;
pub use select::{
    ExactIdMatcher, HighestScoreMatcher, MatcherChain, PartialIdMatcher, RootFieldMatcher,
};
pub use validate::{CommandValidator, SyntaxValidator};
