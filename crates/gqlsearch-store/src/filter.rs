//! Filter validation, evaluation and SQL rendering shared by the backends.

use gqlsearch_core::{ColumnFilter, ColumnOp, DeclarationDocument, SearchOptions, StoreError};

/// Reject filter field names outside `^[A-Za-z_][A-Za-z0-9_]*$`.
pub fn validate_field(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric());
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidFilter(name.to_string()))
    }
}

/// Validate every field name referenced by `options`.
pub fn validate_options(options: &SearchOptions) -> Result<(), StoreError> {
    for filter in &options.metadata_filters {
        validate_field(&filter.field)?;
    }
    for filter in &options.column_filters {
        validate_field(filter.column.as_str())?;
    }
    Ok(())
}

/// Whether a document passes every filter in `options`.
#[must_use]
pub fn matches(document: &DeclarationDocument, options: &SearchOptions) -> bool {
    options.column_filters.iter().all(|f| f.matches(document))
        && options
            .metadata_filters
            .iter()
            .all(|f| f.matches(&document.metadata))
}

/// Quote a string as an SQL literal.
#[must_use]
pub fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Render one column filter as an SQL predicate.
pub fn column_predicate(filter: &ColumnFilter) -> Result<String, StoreError> {
    let column = filter.column.as_str();
    validate_field(column)?;
    Ok(match &filter.op {
        ColumnOp::Eq(value) => format!("`{column}` = {}", sql_literal(value)),
        ColumnOp::In(values) if values.is_empty() => "FALSE".to_string(),
        ColumnOp::In(values) => {
            let list: Vec<String> = values.iter().map(|v| sql_literal(v)).collect();
            format!("`{column}` IN ({})", list.join(", "))
        }
    })
}

/// AND together all column filters; `None` when there are none.
pub fn column_predicates(filters: &[ColumnFilter]) -> Result<Option<String>, StoreError> {
    if filters.is_empty() {
        return Ok(None);
    }
    let parts = filters
        .iter()
        .map(column_predicate)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(
        parts
            .into_iter()
            .map(|p| format!("({p})"))
            .collect::<Vec<_>>()
            .join(" AND "),
    ))
}
