//! Argument extraction shared by every tool. All of these run before a tool
//! touches the OS, so a bad call never has a side effect.

use serde_json::Value;

use crate::core::ToolError;

/// A present string argument; empty strings are allowed.
pub fn required_str<'a>(args: &'a Value, key: &'static str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or(ToolError::MissingArgument(key))
}

/// A present string argument that is not blank.
pub fn required_nonblank<'a>(args: &'a Value, key: &'static str) -> Result<&'a str, ToolError> {
    let value = required_str(args, key)?;
    if value.trim().is_empty() {
        return Err(ToolError::MissingArgument(key));
    }
    Ok(value)
}

pub fn optional_str<'a>(args: &'a Value, key: &str, default: &'a str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or(default)
}

pub fn optional_bool(args: &Value, key: &str, default: bool) -> Result<bool, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => v
            .as_bool()
            .ok_or_else(|| ToolError::InvalidArgument(format!("'{key}' must be a boolean"))),
    }
}

/// Optional positive integer constrained to `min..=max`.
pub fn optional_u64(
    args: &Value,
    key: &str,
    default: u64,
    min: u64,
    max: u64,
) -> Result<u64, ToolError> {
    let parsed = match args.get(key) {
        None | Some(Value::Null) => return Ok(default),
        Some(v) => v.as_u64().ok_or_else(|| {
            ToolError::InvalidArgument(format!("'{key}' must be a positive integer"))
        })?,
    };
    if parsed < min || parsed > max {
        return Err(ToolError::InvalidArgument(format!(
            "'{key}' must be between {min} and {max}"
        )));
    }
    Ok(parsed)
}
