//! Schema validation helpers for Recollect JSON5 configuration.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer against the schema.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    let allowed = [
        "$schema",
        "ledger",
        "transcript",
        "query",
        "assistant",
        "storage",
    ];
    ensure_allowed_keys(map, &allowed, layer, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("ledger") {
        validate_ledger(value, layer, "ledger")?;
    }
    if let Some(value) = map.get("transcript") {
        validate_transcript(value, layer, "transcript")?;
    }
    if let Some(value) = map.get("query") {
        validate_query(value, layer, "query")?;
    }
    if let Some(value) = map.get("assistant") {
        validate_assistant(value, layer, "assistant")?;
    }
    if let Some(value) = map.get("storage") {
        validate_storage(value, layer, "storage")?;
    }

    Ok(())
}

/// Validate the "ledger" block.
fn validate_ledger(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["capacity", "storage_key"], layer, path)?;

    if let Some(value) = map.get("capacity") {
        expect_u64(value, layer, &join_path(path, "capacity"))?;
    }
    if let Some(value) = map.get("storage_key") {
        expect_string(value, layer, &join_path(path, "storage_key"))?;
    }
    Ok(())
}

/// Validate the "transcript" block.
fn validate_transcript(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["base_key", "intro_message", "encrypt", "base64_chunk_bytes"],
        layer,
        path,
    )?;

    if let Some(value) = map.get("base_key") {
        expect_string(value, layer, &join_path(path, "base_key"))?;
    }
    if let Some(value) = map.get("intro_message") {
        expect_string(value, layer, &join_path(path, "intro_message"))?;
    }
    if let Some(value) = map.get("encrypt") {
        expect_bool(value, layer, &join_path(path, "encrypt"))?;
    }
    if let Some(value) = map.get("base64_chunk_bytes") {
        expect_u64(value, layer, &join_path(path, "base64_chunk_bytes"))?;
    }
    Ok(())
}

/// Validate the "query" block.
fn validate_query(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["local_answering", "max_short_query_words"],
        layer,
        path,
    )?;

    if let Some(value) = map.get("local_answering") {
        expect_bool(value, layer, &join_path(path, "local_answering"))?;
    }
    if let Some(value) = map.get("max_short_query_words") {
        expect_u64(value, layer, &join_path(path, "max_short_query_words"))?;
    }
    Ok(())
}

/// Validate the "assistant" block.
fn validate_assistant(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["endpoint", "timeout_secs"], layer, path)?;

    if let Some(value) = map.get("endpoint") {
        let endpoint_path = join_path(path, "endpoint");
        expect_string(value, layer, &endpoint_path)?;
        let endpoint = value.as_str().unwrap_or_default();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(invalid_field(
                layer,
                &endpoint_path,
                "expected http(s) url",
            ));
        }
    }
    if let Some(value) = map.get("timeout_secs") {
        expect_u64(value, layer, &join_path(path, "timeout_secs"))?;
    }
    Ok(())
}

/// Validate the "storage" block.
fn validate_storage(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["path"], layer, path)?;

    if let Some(value) = map.get("path") {
        expect_string(value, layer, &join_path(path, "path"))?;
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

/// Expect a JSON boolean or return a typed error.
fn expect_bool(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if matches!(value, Value::Bool(_)) {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected bool"))
    }
}

/// Expect a non-negative JSON integer or return a typed error.
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

/// Join nested paths for better error messages.
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
