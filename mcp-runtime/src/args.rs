use serde_json::{Map, Value};

use crate::client::{ServiceAction, View};
use crate::registry::ToolDefinition;
use crate::tools::ToolError;

/// Reject argument keys the tool's schema does not declare.
pub fn reject_unknown_arguments(
    tool: &ToolDefinition,
    args: &Map<String, Value>,
) -> Result<(), ToolError> {
    let mut unknown: Vec<&str> = args
        .keys()
        .map(String::as_str)
        .filter(|key| !tool.accepts(key))
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    unknown.sort_unstable();
    Err(ToolError::validation(
        unknown[0],
        format!(
            "Unknown argument(s) for '{}': {}",
            tool.name,
            unknown.join(", ")
        ),
    ))
}

pub fn required_string(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    let value = args
        .get(key)
        .ok_or_else(|| ToolError::validation(key, format!("Missing required field '{key}'")))?;
    match value {
        Value::String(v) if !v.trim().is_empty() => Ok(v.clone()),
        Value::String(_) => Err(ToolError::validation(
            key,
            format!("'{key}' must not be empty"),
        )),
        _ => Err(ToolError::validation(key, format!("'{key}' must be a string"))),
    }
}

pub fn arg_optional_string(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<String>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) if v.trim().is_empty() => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.clone())),
        Some(_) => Err(ToolError::validation(key, format!("'{key}' must be a string"))),
    }
}

pub fn required_u64(args: &Map<String, Value>, key: &str) -> Result<u64, ToolError> {
    arg_optional_u64(args, key)?
        .ok_or_else(|| ToolError::validation(key, format!("Missing required field '{key}'")))
}

/// Non-negative integer. Integral floats such as `10.0` are accepted since
/// JSON clients often cannot tell the two apart.
pub fn arg_optional_u64(args: &Map<String, Value>, key: &str) -> Result<Option<u64>, ToolError> {
    let invalid = || ToolError::validation(key, format!("'{key}' must be a non-negative integer"));
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(v) = n.as_u64() {
                return Ok(Some(v));
            }
            match n.as_f64() {
                Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
                    Ok(Some(f as u64))
                }
                _ => Err(invalid()),
            }
        }
        Some(_) => Err(invalid()),
    }
}

pub fn arg_bounded_u64(
    args: &Map<String, Value>,
    key: &str,
    min: u64,
    max: u64,
) -> Result<Option<u64>, ToolError> {
    match arg_optional_u64(args, key)? {
        Some(v) if v < min || v > max => Err(ToolError::validation(
            key,
            format!("'{key}' must be between {min} and {max}"),
        )),
        other => Ok(other),
    }
}

pub fn arg_view(args: &Map<String, Value>) -> Result<Option<View>, ToolError> {
    match arg_optional_string(args, "view")? {
        None => Ok(None),
        Some(raw) => View::parse(&raw).map(Some).ok_or_else(|| {
            ToolError::validation("view", "view must be one of: summary, full")
        }),
    }
}

pub fn arg_action(args: &Map<String, Value>) -> Result<ServiceAction, ToolError> {
    let raw = required_string(args, "action")?;
    ServiceAction::parse(&raw).ok_or_else(|| {
        ToolError::validation("action", "action must be one of: start, stop, restart")
    })
}

/// Optional string array; when present it must hold at least one non-blank
/// entry.
pub fn arg_optional_non_empty_strings(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<Vec<String>>, ToolError> {
    let Some(value) = args.get(key) else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }
    let items = value
        .as_array()
        .ok_or_else(|| ToolError::validation(key, format!("'{key}' must be an array of strings")))?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let text = item
            .as_str()
            .ok_or_else(|| ToolError::validation(key, format!("'{key}' items must be strings")))?;
        let normalized = text.trim();
        if !normalized.is_empty() {
            out.push(normalized.to_string());
        }
    }
    if out.is_empty() {
        return Err(ToolError::validation(
            key,
            format!("'{key}' must contain at least one entry"),
        ));
    }
    Ok(Some(out))
}
