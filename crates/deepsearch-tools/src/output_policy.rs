//! Truncation policy applied to tool results before they reach the model.

use deepsearch_config::ToolOutputPolicyConfig;
use serde_json::Value;

/// Limits applied recursively to tool output values.
#[derive(Debug, Clone)]
pub struct ToolOutputPolicy {
    /// Maximum characters kept per string.
    pub max_string_chars: usize,
    /// Maximum elements kept per array.
    pub max_array_len: usize,
    /// Maximum entries kept per object.
    pub max_object_entries: usize,
    /// Suffix appended to truncated strings.
    pub truncation_marker: String,
}

impl Default for ToolOutputPolicy {
    fn default() -> Self {
        Self::from(&ToolOutputPolicyConfig::default())
    }
}

impl From<&ToolOutputPolicyConfig> for ToolOutputPolicy {
    fn from(config: &ToolOutputPolicyConfig) -> Self {
        Self {
            max_string_chars: config.max_string_chars,
            max_array_len: config.max_array_len,
            max_object_entries: config.max_object_entries,
            truncation_marker: config.truncation_marker.clone(),
        }
    }
}

impl ToolOutputPolicy {
    /// Apply the policy to a JSON value.
    pub fn apply(&self, value: Value) -> Value {
        match value {
            Value::String(value) => Value::String(self.truncate_string(value)),
            Value::Array(values) => Value::Array(
                values
                    .into_iter()
                    .take(self.max_array_len)
                    .map(|value| self.apply(value))
                    .collect(),
            ),
            Value::Object(values) => Value::Object(
                values
                    .into_iter()
                    .take(self.max_object_entries)
                    .map(|(key, value)| (key, self.apply(value)))
                    .collect(),
            ),
            value => value,
        }
    }

    /// Cut a string at `max_string_chars` characters and mark the cut.
    fn truncate_string(&self, value: String) -> String {
        match value.char_indices().nth(self.max_string_chars) {
            Some((end, _)) => {
                let mut truncated = value[..end].to_string();
                truncated.push_str(&self.truncation_marker);
                truncated
            }
            None => value,
        }
    }
}
