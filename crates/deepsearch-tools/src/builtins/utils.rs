//! Utility helpers shared by built-in tools.

use deepsearch_protocol::ToolError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;

/// Parse JSON args into a typed struct for tool calls.
pub(super) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|err| ToolError::InvalidArguments(err.to_string()))
}

/// Drop repeated entries, keeping the first occurrence.
pub(super) fn dedup_preserving_order(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{dedup_preserving_order, parse_args};
    use deepsearch_protocol::ToolError;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Args {
        #[allow(dead_code)]
        query: String,
    }

    #[test]
    fn parse_args_maps_errors_to_invalid_arguments() {
        let err = parse_args::<Args>(json!({ "query": 1 })).expect_err("type error");
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let values = ["b", "a", "b", "c", "a"].map(String::from);
        assert_eq!(dedup_preserving_order(values), vec!["b", "a", "c"]);
    }
}
