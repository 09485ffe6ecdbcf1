//! Pure, deterministic validation of raw tool configurations

use serde_json::Value;

use super::descriptor::{OptionSpec, OptionType, OptionValue, ToolConfig, ToolDescriptor};
use crate::error::ValidationError;

/// Check a raw configuration against a descriptor's option schema.
///
/// Every supplied key must exist in the schema and its value must coerce to
/// the declared type and satisfy range/allowed-value constraints. Options the
/// caller left out are filled from the schema defaults, so the returned
/// config is always complete. Unknown keys are rejected rather than ignored;
/// silently dropping them would hide typos that change scan behavior.
pub fn validate(
    descriptor: &ToolDescriptor,
    raw: &serde_json::Map<String, Value>,
) -> Result<ToolConfig, ValidationError> {
    let tool = &descriptor.name;

    for key in raw.keys() {
        if !descriptor.supported_options.contains_key(key) {
            return Err(ValidationError::UnknownOption {
                tool: tool.clone(),
                option: key.clone(),
            });
        }
    }

    let mut config = descriptor.default_config();
    for (key, spec) in &descriptor.supported_options {
        let Some(value) = raw.get(key) else { continue };
        let coerced = coerce(tool, key, spec, value)?;
        check_constraints(tool, key, spec, &coerced)?;
        config.0.insert(key.clone(), coerced);
    }

    Ok(config)
}

/// Coerce a JSON value into the declared option type. Lenient on string
/// renderings of scalars ("50" as an integer, "true" as a boolean) since
/// intent classifiers routinely emit those.
fn coerce(
    tool: &str,
    option: &str,
    spec: &OptionSpec,
    value: &Value,
) -> Result<OptionValue, ValidationError> {
    let mismatch = || ValidationError::InvalidOptionType {
        tool: tool.to_string(),
        option: option.to_string(),
        expected: spec.option_type.as_str(),
        got: json_type_name(value).to_string(),
    };

    match spec.option_type {
        OptionType::Bool => match value {
            Value::Bool(b) => Ok(OptionValue::Bool(*b)),
            Value::String(s) => match s.as_str() {
                "true" => Ok(OptionValue::Bool(true)),
                "false" => Ok(OptionValue::Bool(false)),
                _ => Err(mismatch()),
            },
            _ => Err(mismatch()),
        },
        OptionType::Int => match value {
            Value::Number(n) => n.as_i64().map(OptionValue::Int).ok_or_else(mismatch),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(OptionValue::Int)
                .map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        OptionType::Str => match value {
            Value::String(s) => Ok(OptionValue::Str(s.clone())),
            Value::Number(n) => Ok(OptionValue::Str(n.to_string())),
            _ => Err(mismatch()),
        },
        OptionType::List => match value {
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => out.push(s.clone()),
                        Value::Number(n) => out.push(n.to_string()),
                        _ => return Err(mismatch()),
                    }
                }
                Ok(OptionValue::List(out))
            }
            _ => Err(mismatch()),
        },
    }
}

fn check_constraints(
    tool: &str,
    option: &str,
    spec: &OptionSpec,
    value: &OptionValue,
) -> Result<(), ValidationError> {
    if let OptionValue::Int(n) = value {
        let min = spec.min.unwrap_or(i64::MIN);
        let max = spec.max.unwrap_or(i64::MAX);
        if *n < min || *n > max {
            return Err(ValidationError::OutOfRange {
                tool: tool.to_string(),
                option: option.to_string(),
                value: *n,
                min,
                max,
            });
        }
    }

    if let Some(allowed) = &spec.allowed_values {
        let reject = |value: &str| ValidationError::InvalidValue {
            tool: tool.to_string(),
            option: option.to_string(),
            value: value.to_string(),
        };
        match value {
            OptionValue::Str(s) => {
                if !allowed.contains(s) {
                    return Err(reject(s));
                }
            }
            OptionValue::List(items) => {
                for item in items {
                    if !allowed.contains(item) {
                        return Err(reject(item));
                    }
                }
            }
            _ => {}
        }
    }

    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
