//! Operation validators.
//!
//! - [`SyntaxValidator`]: in-process structural check against the schema's
//!   root fields
//! - [`CommandValidator`]: delegates to an external process speaking JSON
//!   over stdin/stdout

use std::collections::HashSet;
use std::process::Stdio;
use std::time::Duration;

use async_graphql_parser::parse_query;
use async_graphql_parser::types::{
    DocumentOperations, ExecutableDocument, OperationDefinition, OperationType as ParsedOperation,
    Selection, SelectionSet,
};
use async_graphql_parser::Positioned;
use async_trait::async_trait;
use gqlsearch_core::{
    OperationType, SchemaDecomposer, ValidateError, ValidationOutcome, Validator,
};
use gqlsearch_schema::{SdlDecomposer, error_line, error_summary};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

// ============================================================================
// Syntax validator
// ============================================================================

/// Structural pre-check used when no external validator is configured.
///
/// Checks that the operation parses as an executable document and that
/// every top-level field, including those reached through fragments,
/// exists on the matching root type. It does not type-check nested
/// selections or arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxValidator;

impl SyntaxValidator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Validator for SyntaxValidator {
    async fn validate(
        &self,
        schema: &str,
        operation: &str,
    ) -> Result<ValidationOutcome, ValidateError> {
        let document = match parse_query(operation) {
            Ok(document) => document,
            Err(e) => {
                return Ok(ValidationOutcome::invalid(vec![format!(
                    "Syntax Error: {} (line {})",
                    error_summary(&e),
                    error_line(&e)
                )]));
            }
        };

        let mut errors = Vec::new();
        let check_schema = !schema.trim().is_empty();
        for definition in operations(&document) {
            let operation_type = match definition.node.ty {
                ParsedOperation::Query => OperationType::Query,
                ParsedOperation::Mutation => OperationType::Mutation,
                ParsedOperation::Subscription => OperationType::Subscription,
            };
            let fields = match root_selections(&document, &definition.node.selection_set) {
                Ok(fields) => fields,
                Err(message) => {
                    errors.push(message);
                    continue;
                }
            };
            if !check_schema {
                continue;
            }

            let known = root_fields(schema, operation_type)?;
            let root = operation_type.root_type_name();
            if known.is_empty() {
                errors.push(format!("Schema does not define a {root} root type"));
                continue;
            }
            for field in fields.iter().filter(|f| f.as_str() != "__typename") {
                if !known.contains(field.as_str()) {
                    errors.push(format!("Cannot query field \"{field}\" on type \"{root}\"."));
                }
            }
        }

        if errors.is_empty() {
            Ok(ValidationOutcome::valid())
        } else {
            Ok(ValidationOutcome::invalid(errors))
        }
    }
}

/// Operation definitions in source order.
fn operations(document: &ExecutableDocument) -> Vec<&Positioned<OperationDefinition>> {
    let mut definitions: Vec<_> = match &document.operations {
        DocumentOperations::Single(definition) => vec![definition],
        DocumentOperations::Multiple(definitions) => definitions.values().collect(),
    };
    definitions.sort_by_key(|definition| (definition.pos.line, definition.pos.column));
    definitions
}

/// Field names selected at the root of an operation, following inline
/// fragments and fragment spreads.
fn root_selections(
    document: &ExecutableDocument,
    selection_set: &Positioned<SelectionSet>,
) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut visited = HashSet::new();
    collect_fields(document, &selection_set.node, &mut visited, &mut fields)?;
    Ok(fields)
}

fn collect_fields<'a>(
    document: &'a ExecutableDocument,
    selection_set: &'a SelectionSet,
    visited: &mut HashSet<&'a str>,
    fields: &mut Vec<String>,
) -> Result<(), String> {
    for selection in &selection_set.items {
        match &selection.node {
            Selection::Field(field) => {
                let name = field.node.name.node.as_str().to_string();
                if !fields.contains(&name) {
                    fields.push(name);
                }
            }
            Selection::InlineFragment(fragment) => {
                collect_fields(document, &fragment.node.selection_set.node, visited, fields)?;
            }
            Selection::FragmentSpread(spread) => {
                let name = spread.node.fragment_name.node.as_str();
                let fragment = document
                    .fragments
                    .iter()
                    .find_map(|(fragment_name, fragment)| {
                        (fragment_name.as_str() == name).then_some(fragment)
                    });
                let Some(fragment) = fragment else {
                    return Err(format!("Unknown fragment \"{name}\"."));
                };
                if visited.insert(name) {
                    collect_fields(document, &fragment.node.selection_set.node, visited, fields)?;
                }
            }
        }
    }
    Ok(())
}

fn root_fields(schema: &str, operation_type: OperationType) -> Result<HashSet<String>, ValidateError> {
    let documents = SdlDecomposer::new()
        .parse(schema)
        .map_err(|e| ValidateError::Protocol(format!("schema does not parse: {e}")))?;
    Ok(documents
        .into_iter()
        .filter(|d| d.is_root_operation_field() && d.root_operation_type() == Some(operation_type))
        .map(|d| d.name)
        .collect())
}

// ============================================================================
// Command validator
// ============================================================================

#[derive(Serialize)]
struct ValidatorInput<'a> {
    schema: &'a str,
    operation: &'a str,
}

/// Runs an external validator per call.
///
/// The process receives `{"schema": ..., "operation": ...}` on stdin and
/// must print `{"valid": bool, "errors": [..]}` on stdout.
#[derive(Debug, Clone)]
pub struct CommandValidator {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandValidator {
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, input: &[u8]) -> Result<std::process::Output, ValidateError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ValidateError::Spawn(format!("{}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input)
                .await
                .map_err(|e| ValidateError::Protocol(format!("failed to write stdin: {e}")))?;
        }

        child
            .wait_with_output()
            .await
            .map_err(|e| ValidateError::Protocol(format!("failed to read output: {e}")))
    }
}

#[async_trait]
impl Validator for CommandValidator {
    async fn validate(
        &self,
        schema: &str,
        operation: &str,
    ) -> Result<ValidationOutcome, ValidateError> {
        let input = serde_json::to_vec(&ValidatorInput { schema, operation })
            .map_err(|e| ValidateError::Protocol(e.to_string()))?;

        debug!("Running validator {}", self.program);
        let output = tokio::time::timeout(self.timeout, self.run(&input))
            .await
            .map_err(|_| {
                ValidateError::Protocol(format!("validator timed out after {:?}", self.timeout))
            })??;

        serde_json::from_slice::<ValidationOutcome>(&output.stdout).map_err(|e| {
            let stderr = String::from_utf8_lossy(&output.stderr);
            ValidateError::Protocol(format!(
                "unreadable validator output ({}): {e}; stderr: {}",
                output.status,
                stderr.trim()
            ))
        })
    }
}
