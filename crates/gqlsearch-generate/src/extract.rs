//! Pull an operation out of a model answer.

const FENCE: &str = "```";

/// First fenced block tagged `graphql`, `gql` or untagged; otherwise the
/// trimmed answer.
#[must_use]
pub fn extract_operation(answer: &str) -> String {
    let mut rest = answer;
    while let Some(open) = rest.find(FENCE) {
        let after = &rest[open + FENCE.len()..];
        let (tag, body) = match after.find('\n') {
            Some(newline) => (after[..newline].trim(), &after[newline + 1..]),
            None => break,
        };
        let Some(close) = body.find(FENCE) else {
            break;
        };
        if tag.is_empty() || tag.eq_ignore_ascii_case("graphql") || tag.eq_ignore_ascii_case("gql")
        {
            return body[..close].trim().to_string();
        }
        rest = &body[close + FENCE.len()..];
    }
    answer.trim().to_string()
}
