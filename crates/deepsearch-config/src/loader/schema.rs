//! Schema validation helpers for DeepSearch JSON5 configuration.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer against the schema.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    let allowed = [
        "$schema", "model", "agent", "search", "scraper", "cache", "tools", "database", "server",
        "auth",
    ];
    ensure_allowed_keys(map, &allowed, layer, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("model") {
        validate_model(value, layer, "model")?;
    }
    if let Some(value) = map.get("agent") {
        validate_agent(value, layer, "agent")?;
    }
    if let Some(value) = map.get("search") {
        validate_search(value, layer, "search")?;
    }
    if let Some(value) = map.get("scraper") {
        validate_scraper(value, layer, "scraper")?;
    }
    if let Some(value) = map.get("cache") {
        validate_cache(value, layer, "cache")?;
    }
    if let Some(value) = map.get("tools") {
        validate_tools(value, layer, "tools")?;
    }
    if let Some(value) = map.get("database") {
        validate_database(value, layer, "database")?;
    }
    if let Some(value) = map.get("server") {
        validate_server(value, layer, "server")?;
    }
    if let Some(value) = map.get("auth") {
        validate_auth(value, layer, "auth")?;
    }
    Ok(())
}

/// Validate the "model" block.
fn validate_model(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["provider", "name", "api_key_env", "system_prompt"],
        layer,
        path,
    )?;
    if let Some(value) = map.get("provider") {
        let provider_path = join_path(path, "provider");
        expect_one_of(value, &["openai"], layer, &provider_path)?;
    }
    for key in ["name", "api_key_env", "system_prompt"] {
        if let Some(value) = map.get(key) {
            expect_string(value, layer, &join_path(path, key))?;
        }
    }
    Ok(())
}

/// Validate the "agent" block.
fn validate_agent(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["max_steps", "title_max_chars"], layer, path)?;
    for key in ["max_steps", "title_max_chars"] {
        if let Some(value) = map.get(key) {
            expect_u64(value, layer, &join_path(path, key))?;
        }
    }
    Ok(())
}

/// Validate the "search" block.
fn validate_search(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &[
            "provider",
            "endpoint",
            "api_key_env",
            "num_results",
            "timeout_ms",
        ],
        layer,
        path,
    )?;
    if let Some(value) = map.get("provider") {
        expect_one_of(value, &["serper"], layer, &join_path(path, "provider"))?;
    }
    for key in ["endpoint", "api_key_env"] {
        if let Some(value) = map.get(key) {
            expect_string(value, layer, &join_path(path, key))?;
        }
    }
    for key in ["num_results", "timeout_ms"] {
        if let Some(value) = map.get(key) {
            expect_u64(value, layer, &join_path(path, key))?;
        }
    }
    Ok(())
}

/// Validate the "scraper" block.
fn validate_scraper(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["timeout_ms", "max_chars", "max_bytes", "max_urls", "user_agent"],
        layer,
        path,
    )?;
    for key in ["timeout_ms", "max_chars", "max_bytes", "max_urls"] {
        if let Some(value) = map.get(key) {
            expect_u64(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("user_agent") {
        expect_string(value, layer, &join_path(path, "user_agent"))?;
    }
    Ok(())
}

/// Validate the "cache" block.
fn validate_cache(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["enabled", "provider", "path", "ttl_secs"], layer, path)?;
    if let Some(value) = map.get("enabled") {
        expect_bool(value, layer, &join_path(path, "enabled"))?;
    }
    if let Some(value) = map.get("provider") {
        expect_one_of(
            value,
            &["memory", "sqlite"],
            layer,
            &join_path(path, "provider"),
        )?;
    }
    if let Some(value) = map.get("path") {
        expect_string(value, layer, &join_path(path, "path"))?;
    }
    if let Some(value) = map.get("ttl_secs")
        && !value.is_null()
    {
        expect_u64(value, layer, &join_path(path, "ttl_secs"))?;
    }
    Ok(())
}

/// Validate the "tools" block.
fn validate_tools(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["output_policy"], layer, path)?;
    if let Some(value) = map.get("output_policy") {
        validate_tool_output_policy(value, layer, &join_path(path, "output_policy"))?;
    }
    Ok(())
}

/// Validate the tool output policy block.
fn validate_tool_output_policy(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let numeric = ["max_string_chars", "max_array_len", "max_object_entries"];
    let mut allowed = numeric.to_vec();
    allowed.push("truncation_marker");
    ensure_allowed_keys(map, &allowed, layer, path)?;
    for key in numeric {
        if let Some(value) = map.get(key) {
            expect_u64(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("truncation_marker") {
        expect_string(value, layer, &join_path(path, "truncation_marker"))?;
    }
    Ok(())
}

/// Validate the "database" block.
fn validate_database(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["path"], layer, path)?;
    if let Some(value) = map.get("path") {
        expect_string(value, layer, &join_path(path, "path"))?;
    }
    Ok(())
}

/// Validate the "server" block.
fn validate_server(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["address", "port", "max_duration_secs"],
        layer,
        path,
    )?;
    if let Some(value) = map.get("address") {
        expect_string(value, layer, &join_path(path, "address"))?;
    }
    if let Some(value) = map.get("port") {
        let port_path = join_path(path, "port");
        match value.as_u64() {
            Some(port) if port <= u64::from(u16::MAX) => {}
            Some(_) => return Err(invalid_field(layer, &port_path, "port out of range")),
            None => return Err(invalid_field(layer, &port_path, "expected integer")),
        }
    }
    if let Some(value) = map.get("max_duration_secs") {
        expect_u64(value, layer, &join_path(path, "max_duration_secs"))?;
    }
    Ok(())
}

/// Validate the "auth" block.
fn validate_auth(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["tokens"], layer, path)?;
    if let Some(value) = map.get("tokens") {
        let tokens_path = join_path(path, "tokens");
        let tokens = expect_object(value, layer, &tokens_path)?;
        for (token, user) in tokens {
            expect_string(user, layer, &join_path(&tokens_path, token))?;
        }
    }
    Ok(())
}

/// Expect a JSON object or return a typed error.
fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

/// Expect a JSON string or return a typed error.
fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.as_str().is_some() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

/// Expect one of a fixed set of strings.
fn expect_one_of(
    value: &Value,
    options: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    let Some(value) = value.as_str() else {
        return Err(invalid_field(layer, path, "expected string"));
    };
    if options.contains(&value) {
        return Ok(());
    }
    Err(invalid_field(
        layer,
        path,
        &format!("expected one of {}", options.join(", ")),
    ))
}

/// Expect a JSON boolean or return a typed error.
fn expect_bool(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if matches!(value, Value::Bool(_)) {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected bool"))
    }
}

/// Expect a non-negative integer.
fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

/// Ensure an object contains only allowed keys.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(invalid_field(layer, &join_path(path, key), "unknown key"));
        }
    }
    Ok(())
}

/// Join nested paths for error messages.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Build a structured invalid-field error.
fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{normalized_path}"),
        message: message.to_string(),
    }
}
