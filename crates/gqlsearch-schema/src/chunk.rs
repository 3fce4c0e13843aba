//! Character-limit chunking for oversized declaration documents.
//!
//! Pieces never overlap, so concatenating the chunks of a document in
//! order reproduces its content exactly.

use gqlsearch_core::{keys, ChunkError, DeclarationDocument};
use serde_json::Value;
use tracing::debug;

/// Split every document whose content is longer than `char_limit` characters.
///
/// Documents within the limit pass through unchanged. A split document is
/// replaced by its chunks, each carrying the parent's kind, name and
/// metadata plus `parentId`, `chunkIndex` and `chunkCount`. Only the first
/// chunk of a root operation field keeps the root flag, so a root field
/// is never listed once per chunk.
pub fn chunk_documents(
    documents: &[DeclarationDocument],
    char_limit: usize,
) -> Result<Vec<DeclarationDocument>, ChunkError> {
    if char_limit == 0 {
        return Err(ChunkError::InvalidConfig(
            "character limit must be positive".to_string(),
        ));
    }

    let mut output = Vec::with_capacity(documents.len());
    for document in documents {
        if document.content.chars().count() <= char_limit {
            output.push(document.clone());
            continue;
        }

        let pieces = split_content(&document.content, char_limit);
        debug!(
            "Split {} into {} chunks at {} chars",
            document.id,
            pieces.len(),
            char_limit
        );

        let count = pieces.len();
        for (index, content) in pieces.into_iter().enumerate() {
            let mut metadata = document.metadata.clone();
            metadata.insert(keys::PARENT_ID.to_string(), Value::from(document.id.clone()));
            metadata.insert(keys::CHUNK_INDEX.to_string(), Value::from(index));
            metadata.insert(keys::CHUNK_COUNT.to_string(), Value::from(count));
            if index > 0 && document.is_root_operation_field() {
                metadata.insert(keys::IS_ROOT_OPERATION_FIELD.to_string(), Value::Bool(false));
                metadata.remove(keys::ROOT_OPERATION_TYPE);
            }

            output.push(DeclarationDocument {
                id: format!("{}-chunk-{index}", document.id),
                kind: document.kind,
                name: document.name.clone(),
                description: document.description.clone(),
                content,
                metadata,
            });
        }
    }

    Ok(output)
}

/// Split text into consecutive pieces of at most `char_limit` characters.
pub fn split_content(text: &str, char_limit: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let limit = char_limit.max(1);

    let mut pieces = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + limit).min(total);
        let cut = find_break_point(&chars, start, end, total);
        pieces.push(chars[start..cut].iter().collect());
        start = cut;
    }
    pieces
}

/// Find a good break point at or before the target end position.
fn find_break_point(chars: &[char], start: usize, target_end: usize, total: usize) -> usize {
    if target_end >= total {
        return total;
    }

    // Look within the last 20% of the window
    let search_start = target_end
        .saturating_sub((target_end - start) / 5)
        .max(start + 1);

    // Prefer a blank line between declarations
    for i in (search_start..target_end.saturating_sub(1)).rev() {
        if chars[i] == '\n' && chars[i + 1] == '\n' {
            return i + 2;
        }
    }

    // Then the end of a line
    for i in (search_start..target_end).rev() {
        if chars[i] == '\n' {
            return i + 1;
        }
    }

    // Then a word boundary
    for i in (search_start..target_end).rev() {
        if chars[i] == ' ' || chars[i] == ',' {
            return i + 1;
        }
    }

    target_end
}
