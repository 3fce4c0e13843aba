//! Operation-type classification.

use gqlsearch_core::OperationType;

/// Read an operation type out of a free-form model answer.
///
/// Case-insensitive. Whichever of `mutation` / `subscription` occurs first
/// wins; anything else is a query.
#[must_use]
pub fn parse_operation_type(answer: &str) -> OperationType {
    let lower = answer.to_lowercase();
    let mutation = lower.find("mutation");
    let subscription = lower.find("subscription");

    match (mutation, subscription) {
        (Some(m), Some(s)) if s < m => OperationType::Subscription,
        (Some(_), _) => OperationType::Mutation,
        (None, Some(_)) => OperationType::Subscription,
        (None, None) => OperationType::Query,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_keywords() {
        assert_eq!(parse_operation_type("Mutation"), OperationType::Mutation);
        assert_eq!(parse_operation_type("SUBSCRIPTION"), OperationType::Subscription);
        assert_eq!(parse_operation_type("query"), OperationType::Query);
    }

    #[test]
    fn test_free_text() {
        assert_eq!(
            parse_operation_type("This request changes data, so it is a mutation."),
            OperationType::Mutation
        );
    }

    #[test]
    fn test_unrecognized_defaults_to_query() {
        assert_eq!(parse_operation_type("I am not sure"), OperationType::Query);
        assert_eq!(parse_operation_type(""), OperationType::Query);
    }

    #[test]
    fn test_earliest_keyword_wins() {
        assert_eq!(
            parse_operation_type("subscription, not a mutation"),
            OperationType::Subscription
        );
        assert_eq!(
            parse_operation_type("mutation rather than subscription"),
            OperationType::Mutation
        );
    }
}
