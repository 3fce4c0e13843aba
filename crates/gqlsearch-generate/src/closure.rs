//! Type-closure discovery.
//!
//! Breadth-first walk over type declarations starting from a field's return
//! and argument types. Each level is one store search restricted by name and
//! kind; the next level comes from the found documents' `referencedTypes`.

use std::collections::HashSet;

use gqlsearch_core::{
    Column, ColumnFilter, DeclarationDocument, DeclarationKind, SearchOptions, StoreError,
    VectorStore,
};
use tracing::debug;

/// Scalars every schema has; never looked up.
pub const BUILT_IN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// Documents reached from the seed types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeClosure {
    /// In discovery order, level by level
    pub documents: Vec<DeclarationDocument>,
    /// Traversal stopped at the document limit with names still unvisited
    pub truncated: bool,
}

/// Names a field document points at: return type first, then arguments.
#[must_use]
pub fn seed_types(field: &DeclarationDocument) -> Vec<String> {
    let mut seeds: Vec<String> = field.field_type().map(str::to_string).into_iter().collect();
    seeds.extend(field.argument_types());
    seeds
}

/// Walk the closure from `seeds`, collecting at most `max_documents`.
pub async fn discover_types(
    store: &dyn VectorStore,
    embedding: &[f32],
    seeds: &[String],
    max_documents: usize,
) -> Result<TypeClosure, StoreError> {
    let mut closure = TypeClosure::default();
    let mut visited: HashSet<String> = HashSet::new();
    let mut frontier = next_frontier(seeds.iter().cloned(), &mut visited);
    let mut level = 0usize;

    while !frontier.is_empty() {
        let remaining = max_documents.saturating_sub(closure.documents.len());
        if remaining == 0 {
            closure.truncated = true;
            break;
        }

        level += 1;
        debug!("Closure level {}: {:?}", level, frontier);

        let requested = frontier.len();
        let options = SearchOptions::new(remaining)
            .with_column_filter(ColumnFilter::is_in(Column::Name, frontier))
            .with_column_filter(ColumnFilter::kinds(&DeclarationKind::TYPE_KINDS));
        let results = store.search(embedding, &options).await?;
        // the limit cut this level short
        let capped = results.len() == remaining && results.len() < requested;

        let mut referenced = Vec::new();
        for result in results {
            referenced.extend(result.document.referenced_types());
            closure.documents.push(result.document);
        }
        if capped {
            closure.truncated = true;
            break;
        }
        frontier = next_frontier(referenced.into_iter(), &mut visited);
    }

    debug!(
        "Closure has {} documents after {} levels{}",
        closure.documents.len(),
        level,
        if closure.truncated { " (truncated)" } else { "" }
    );
    Ok(closure)
}

fn next_frontier(
    names: impl Iterator<Item = String>,
    visited: &mut HashSet<String>,
) -> Vec<String> {
    let mut frontier = Vec::new();
    for name in names {
        if BUILT_IN_SCALARS.contains(&name.as_str()) {
            continue;
        }
        if visited.insert(name.clone()) {
            frontier.push(name);
        }
    }
    frontier
}
