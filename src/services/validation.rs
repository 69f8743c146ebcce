use serde_json::{Map, Value};

use crate::errors::ToolError;

/// Tool argument checks. `label` is the human phrase used in the error,
/// e.g. "repository owner" gives "repository owner is required".
#[derive(Clone, Default)]
pub struct Validation;

impl Validation {
    pub fn new() -> Self {
        Self
    }

    pub fn ensure_string(
        &self,
        args: &Value,
        key: &str,
        label: &str,
    ) -> Result<String, ToolError> {
        let text = args
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .unwrap_or("");
        if text.is_empty() {
            return Err(ToolError::invalid_params(format!("{} is required", label))
                .with_details(serde_json::json!({ "field": key })));
        }
        Ok(text.to_string())
    }

    /// Absent, null and blank all mean "not provided".
    pub fn ensure_optional_string(
        &self,
        args: &Value,
        key: &str,
        label: &str,
    ) -> Result<Option<String>, ToolError> {
        match args.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.clone())),
            Some(_) => Err(ToolError::invalid_params(format!(
                "{} must be a string",
                label
            ))),
        }
    }

    /// Accepts integers and integer-valued floats or strings.
    pub fn ensure_positive_id(
        &self,
        args: &Value,
        key: &str,
        label: &str,
    ) -> Result<u64, ToolError> {
        let value = args.get(key).unwrap_or(&Value::Null);
        let numeric = value
            .as_i64()
            .or_else(|| {
                value
                    .as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            })
            .or_else(|| value.as_str().and_then(|s| s.trim().parse::<i64>().ok()));
        match numeric {
            Some(n) if n > 0 => Ok(n as u64),
            Some(_) => Err(ToolError::invalid_params(format!(
                "{} must be positive",
                label
            ))),
            None => Err(ToolError::invalid_params(format!("{} is required", label))
                .with_details(serde_json::json!({ "field": key }))),
        }
    }

    pub fn ensure_optional_positive_id(
        &self,
        args: &Value,
        key: &str,
        label: &str,
    ) -> Result<Option<u64>, ToolError> {
        match args.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.ensure_positive_id(args, key, label).map(Some),
        }
    }

    /// Booleans may also arrive as "true"/"false" strings.
    pub fn ensure_optional_bool(
        &self,
        args: &Value,
        key: &str,
    ) -> Result<Option<bool>, ToolError> {
        match args.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(flag)) => Ok(Some(*flag)),
            Some(Value::String(text)) => match text.trim().to_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(ToolError::invalid_params(format!(
                    "{} must be true or false",
                    key
                ))),
            },
            Some(_) => Err(ToolError::invalid_params(format!(
                "{} must be a boolean",
                key
            ))),
        }
    }

    /// A list of strings, or a single comma-separated string.
    pub fn ensure_string_list(&self, args: &Value, key: &str) -> Result<Vec<String>, ToolError> {
        let items: Vec<String> = match args.get(key) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(text)) => text.split(',').map(|s| s.to_string()).collect(),
            Some(Value::Array(values)) => values
                .iter()
                .map(|v| {
                    v.as_str().map(|s| s.to_string()).ok_or_else(|| {
                        ToolError::invalid_params(format!("{} must contain only strings", key))
                    })
                })
                .collect::<Result<_, _>>()?,
            Some(_) => {
                return Err(ToolError::invalid_params(format!(
                    "{} must be a list of strings",
                    key
                )))
            }
        };
        Ok(items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }

    pub fn ensure_optional_object(
        &self,
        args: &Value,
        key: &str,
    ) -> Result<Option<Map<String, Value>>, ToolError> {
        match args.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map.clone())),
            Some(_) => Err(ToolError::invalid_params(format!(
                "{} must be an object",
                key
            ))),
        }
    }

    pub fn ensure_one_of<'a>(
        &self,
        value: &str,
        label: &str,
        allowed: &'a [&'a str],
    ) -> Result<&'a str, ToolError> {
        allowed
            .iter()
            .find(|candidate| **candidate == value)
            .copied()
            .ok_or_else(|| {
                ToolError::invalid_params(format!(
                    "invalid {}: must be one of {}",
                    label,
                    allowed.join(", ")
                ))
            })
    }
}
