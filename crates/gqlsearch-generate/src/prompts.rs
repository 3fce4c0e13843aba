//! Prompt construction for each model-backed stage.

use std::fmt::Write as _;

use gqlsearch_core::{ChatMessage, DeclarationDocument, OperationType, SearchResult};

const CLASSIFY_SYSTEM: &str = "You classify requests against a GraphQL API. \
Answer with exactly one word: query, mutation or subscription.";

const SELECT_SYSTEM: &str = "You pick the GraphQL root field that best serves a request. \
Answer with the id of one candidate and nothing else.";

const GENERATE_SYSTEM: &str = "You write GraphQL operations. \
Use only the fields, arguments and types shown. \
Reply with a single operation in a ```graphql code block.";

/// Candidates grouped by root operation type, then the request.
#[must_use]
pub fn classification_messages(input: &str, candidates: &[SearchResult]) -> Vec<ChatMessage> {
    let mut prompt = String::from("Candidate root fields:\n");
    for operation in OperationType::ALL {
        let group: Vec<_> = candidates
            .iter()
            .filter(|c| c.document.root_operation_type() == Some(operation))
            .collect();
        if group.is_empty() {
            continue;
        }
        let _ = writeln!(prompt, "\n{}:", operation.root_type_name());
        for candidate in group {
            let _ = writeln!(prompt, "- {}", signature(&candidate.document));
        }
    }
    let _ = write!(prompt, "\nRequest: {input}\n\nOperation type:");

    vec![ChatMessage::system(CLASSIFY_SYSTEM), ChatMessage::user(prompt)]
}

/// Candidate ids with signatures and scores, then the request.
#[must_use]
pub fn selection_messages(
    input: &str,
    operation_type: OperationType,
    candidates: &[SearchResult],
) -> Vec<ChatMessage> {
    let mut prompt = format!("Candidate {} fields:\n", operation_type.keyword());
    for candidate in candidates {
        let _ = writeln!(
            prompt,
            "\nid: {}\nscore: {:.3}\n{}",
            candidate.document.id, candidate.score, candidate.document.content
        );
    }
    let _ = write!(prompt, "\nRequest: {input}\n\nid:");

    vec![ChatMessage::system(SELECT_SYSTEM), ChatMessage::user(prompt)]
}

/// Root field, type closure and request for the first draft.
#[must_use]
pub fn generation_messages(
    input: &str,
    operation_type: OperationType,
    root_field: &DeclarationDocument,
    closure: &[DeclarationDocument],
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(GENERATE_SYSTEM),
        ChatMessage::user(context_block(input, operation_type, root_field, closure)),
    ]
}

/// The first-draft conversation plus the failing draft and its errors.
#[must_use]
pub fn repair_messages(
    input: &str,
    operation_type: OperationType,
    root_field: &DeclarationDocument,
    closure: &[DeclarationDocument],
    draft: &str,
    errors: &[String],
) -> Vec<ChatMessage> {
    let mut feedback = String::from("That operation failed validation:\n");
    for error in errors {
        let _ = writeln!(feedback, "- {error}");
    }
    feedback.push_str("\nFix every error and reply with the corrected operation.");

    vec![
        ChatMessage::system(GENERATE_SYSTEM),
        ChatMessage::user(context_block(input, operation_type, root_field, closure)),
        ChatMessage::assistant(format!("```graphql\n{draft}\n```")),
        ChatMessage::user(feedback),
    ]
}

fn context_block(
    input: &str,
    operation_type: OperationType,
    root_field: &DeclarationDocument,
    closure: &[DeclarationDocument],
) -> String {
    let mut prompt = format!(
        "Write a {} using the root field {} on {}:\n\n{}\n",
        operation_type.keyword(),
        root_field.name,
        operation_type.root_type_name(),
        root_field.content
    );
    if !closure.is_empty() {
        prompt.push_str("\nRelated types:\n");
        for document in closure {
            let _ = writeln!(prompt, "\n{}", document.content);
        }
    }
    let _ = write!(prompt, "\nRequest: {input}");
    prompt
}

fn signature(document: &DeclarationDocument) -> String {
    match &document.description {
        Some(description) => format!("{} ({})", document.name, first_line(description)),
        None => document.name.clone(),
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}
