//! Argument helpers shared by the built-in tools.

use quill_core::error::ToolError;
use serde_json::Value;

/// Reject arguments the adapter could not decode.
pub fn ensure_decoded(args: &Value) -> Result<(), ToolError> {
    if let Some(raw) = args.get("_raw").and_then(|v| v.as_str()) {
        return Err(ToolError::InvalidArguments(format!(
            "arguments are not valid JSON: {raw}"
        )));
    }
    Ok(())
}

pub fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

pub fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}

/// Write tools must explain themselves.
pub fn require_thinking(args: &Value) -> Result<&str, ToolError> {
    args.get("thinking")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ToolError::InvalidArguments(
                "Missing 'thinking': explain why this change is needed before making it".into(),
            )
        })
}

/// Schema fragment for the `thinking` rationale.
pub fn thinking_property() -> Value {
    serde_json::json!({
        "type": "string",
        "description": "Why this change is needed and what it should achieve"
    })
}
