//! Structural input validation
//!
//! Every capability declares its input contract as a JSON-schema-shaped
//! object; inputs are checked against it before the handler runs. A
//! violation names the offending field path, so callers get `a.b: expected
//! number` instead of a generic failure. Only the subset of keywords the
//! demo contracts use is understood: `type`, `properties`, `required`,
//! `enum`, `minimum`, `maximum`, and `format` is ignored on purpose.

use serde_json::Value;

use showcase_core::{CoreError, Result};

/// Validate `input` against `schema`, reporting the first violation with its
/// field path.
pub fn validate(schema: &Value, input: &Value) -> Result<()> {
    validate_at("", schema, input)
}

fn validate_at(path: &str, schema: &Value, value: &Value) -> Result<()> {
    let Some(schema) = schema.as_object() else {
        return Ok(());
    };

    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        check_type(path, expected, value)?;
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            let names: Vec<String> = allowed.iter().map(render).collect();
            return Err(CoreError::invalid_input(
                display_path(path),
                format!("must be one of: {}", names.join(", ")),
            ));
        }
    }

    if let Some(minimum) = schema.get("minimum").and_then(Value::as_f64) {
        if let Some(number) = value.as_f64() {
            if number < minimum {
                return Err(CoreError::invalid_input(
                    display_path(path),
                    format!("must be >= {}", minimum),
                ));
            }
        }
    }

    if let Some(maximum) = schema.get("maximum").and_then(Value::as_f64) {
        if let Some(number) = value.as_f64() {
            if number > maximum {
                return Err(CoreError::invalid_input(
                    display_path(path),
                    format!("must be <= {}", maximum),
                ));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        let fields = value.as_object();

        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for name in required.iter().filter_map(Value::as_str) {
                if fields.map_or(true, |f| !f.contains_key(name)) {
                    return Err(CoreError::invalid_input(
                        join_path(path, name),
                        "missing required field",
                    ));
                }
            }
        }

        if let Some(fields) = fields {
            for (name, property_schema) in properties {
                if let Some(field) = fields.get(name) {
                    validate_at(&join_path(path, name), property_schema, field)?;
                }
            }
        }
    }

    Ok(())
}

fn check_type(path: &str, expected: &str, value: &Value) -> Result<()> {
    let ok = match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(CoreError::invalid_input(
            display_path(path),
            format!("expected {}", expected),
        ))
    }
}

fn join_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "$".to_string()
    } else {
        path.to_string()
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "a": { "type": "number" },
                "b": { "type": "number" },
                "style": { "type": "string", "enum": ["casual", "formal"] },
                "age": { "type": "integer", "minimum": 18 },
            },
            "required": ["a", "b"],
        })
    }

    #[test]
    fn test_valid_input_passes() {
        assert!(validate(&schema(), &json!({"a": 1, "b": 2.5})).is_ok());
    }

    #[test]
    fn test_missing_required_field_names_path() {
        let err = validate(&schema(), &json!({"a": 1})).unwrap_err();
        match err {
            CoreError::InvalidInput { path, .. } => assert_eq!(path, "b"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wrong_type_names_path() {
        let err = validate(&schema(), &json!({"a": 1, "b": "two"})).unwrap_err();
        match err {
            CoreError::InvalidInput { path, message } => {
                assert_eq!(path, "b");
                assert!(message.contains("number"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_enum_violation() {
        let err = validate(&schema(), &json!({"a": 1, "b": 2, "style": "baroque"})).unwrap_err();
        match err {
            CoreError::InvalidInput { path, message } => {
                assert_eq!(path, "style");
                assert!(message.contains("casual"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_minimum_violation() {
        let err = validate(&schema(), &json!({"a": 1, "b": 2, "age": 12})).unwrap_err();
        match err {
            CoreError::InvalidInput { path, .. } => assert_eq!(path, "age"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nested_path_is_dotted() {
        let nested = json!({
            "type": "object",
            "properties": {
                "outer": {
                    "type": "object",
                    "properties": { "inner": { "type": "string" } },
                    "required": ["inner"],
                },
            },
            "required": ["outer"],
        });

        let err = validate(&nested, &json!({"outer": {}})).unwrap_err();
        match err {
            CoreError::InvalidInput { path, .. } => assert_eq!(path, "outer.inner"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_top_level_type_mismatch() {
        let err = validate(&schema(), &json!([1, 2])).unwrap_err();
        match err {
            CoreError::InvalidInput { path, .. } => assert_eq!(path, "$"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_schema_accepts_anything() {
        assert!(validate(&json!({}), &json!({"whatever": true})).is_ok());
        assert!(validate(&json!({"type": "object"}), &json!({})).is_ok());
    }
}
