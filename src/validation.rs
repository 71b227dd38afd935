//! Configuration validation.
//!
//! [`validate`] checks a JSON configuration against a [`Schema`]: required
//! attributes are present, values have the declared type and every attached
//! field validator accepts its value. The field validators themselves live
//! here too, together with the JSON diff suppressor.
//!
//! # Example
//!
//! ```
//! use tinkerbell_provider::schema::{Attribute, Schema};
//! use tinkerbell_provider::validation::{validate, validate_not_empty};
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string().with_validator(validate_not_empty));
//!
//! assert!(validate(&schema, &json!({"name": "sandbox"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": ""}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("name".to_string()));
//! ```

use crate::definition::Workflow;
use crate::error::ProviderError;
use crate::resources::hardware::HardwareDocument;
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed attributes are skipped (provider sets these)
/// - Attribute types must match the schema
/// - Field validators run on present, well-typed values
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return diagnostics,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value))),
            );
            return diagnostics;
        },
    };

    let mut names: Vec<&String> = schema.block.attributes.keys().collect();
    names.sort();
    for name in names {
        let attr = &schema.block.attributes[name];
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }

    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
///
/// This is a convenience wrapper around [`validate`] that returns a Result.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => match (&attr.attr_type, v) {
            (AttributeType::String, Value::String(s)) => {
                if let Some(check) = attr.validate {
                    if let Err(err) = check(s) {
                        diagnostics.push(
                            Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                                .with_detail(validation_message(err))
                                .with_attribute(path),
                        );
                    }
                }
            },
            (AttributeType::String, other) => {
                diagnostics.push(type_error(path, "string", other));
            },
        },
    }
}

/// The message of a validation failure without the variant prefix.
fn validation_message(err: ProviderError) -> String {
    match err {
        ProviderError::Validation(msg) => msg,
        other => other.to_string(),
    }
}

/// Reject empty strings.
pub fn validate_not_empty(value: &str) -> Result<(), ProviderError> {
    if value.is_empty() {
        return Err(ProviderError::Validation(
            "value must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Check that a template body is a well-formed workflow definition.
pub fn validate_template(content: &str) -> Result<(), ProviderError> {
    if content.is_empty() {
        return Err(ProviderError::Validation(
            "template content must not be empty".to_string(),
        ));
    }

    let workflow = Workflow::parse(content)
        .map_err(|e| ProviderError::Validation(format!("parsing template: {}", e)))?;

    workflow
        .validate()
        .map_err(|e| ProviderError::Validation(format!("validating template: {}", e)))
}

/// Check that a hardware payload decodes and carries an id.
pub fn validate_hardware_data(data: &str) -> Result<(), ProviderError> {
    HardwareDocument::parse(data).map(|_| ())
}

/// Check that a value is a non-empty JSON object.
pub fn validate_json_object(value: &str) -> Result<(), ProviderError> {
    validate_not_empty(value)?;

    match serde_json::from_str::<Value>(value) {
        Ok(Value::Object(_)) => Ok(()),
        Ok(other) => Err(ProviderError::Validation(format!(
            "expected a JSON object, got {}",
            value_type_name(&other)
        ))),
        Err(e) => Err(ProviderError::Validation(format!(
            "failed decoding value as JSON: {}",
            e
        ))),
    }
}

/// Treat two JSON texts as equal when they decode to the same value.
///
/// Whitespace and object key order are ignored, and numbers compare as
/// `f64` so `1` equals `1.0`. If either side fails to parse, the values are
/// considered different.
pub fn suppress_equivalent_json(old: &str, new: &str) -> bool {
    match (
        serde_json::from_str::<Value>(old),
        serde_json::from_str::<Value>(new),
    ) {
        (Ok(old), Ok(new)) => json_equal(&old, &new),
        _ => false,
    }
}

fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| json_equal(a, b))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, a)| b.get(key).is_some_and(|b| json_equal(a, b)))
        }
        _ => a == b,
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        ))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Schema};
    use serde_json::json;

    const TEMPLATE: &str = r#"
version: "0.1"
name: hello_world_workflow
global_timeout: 600
tasks:
  - name: "hello world"
    worker: "{{.device_1}}"
    actions:
      - name: "hello_world"
        image: hello-world
        timeout: 60
"#;

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        // Valid
        let diagnostics = validate(&schema, &json!({"name": "test"}));
        assert!(diagnostics.is_empty());

        // Missing required
        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));

        // Null value
        let diagnostics = validate(&schema, &json!({"name": null}));
        assert_eq!(diagnostics.len(), 1);

        // Wrong type
        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_optional_attribute() {
        let schema = Schema::v0().with_attribute("cert_url", Attribute::optional_string());

        assert!(validate(&schema, &json!({"cert_url": "http://tink:42114/cert"})).is_empty());
        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"cert_url": null})).is_empty());
        assert_eq!(validate(&schema, &json!({"cert_url": false})).len(), 1);
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = Schema::v0().with_attribute("id", Attribute::computed_string());

        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"id": 123})).is_empty());
    }

    #[test]
    fn test_validate_runs_field_validator() {
        let schema = Schema::v0().with_attribute(
            "content",
            Attribute::required_string().with_validator(validate_template),
        );

        assert!(validate(&schema, &json!({"content": TEMPLATE})).is_empty());

        let diagnostics = validate(&schema, &json!({"content": "foo: bar"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("content".to_string()));
        assert!(diagnostics[0]
            .detail
            .as_deref()
            .is_some_and(|d| d.starts_with("parsing template: ")));
    }

    #[test]
    fn test_validate_multiple_errors() {
        let schema = Schema::v0()
            .with_attribute("content", Attribute::required_string())
            .with_attribute(
                "name",
                Attribute::required_string().with_validator(validate_not_empty),
            );

        let diagnostics = validate(&schema, &json!({"name": ""}));
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].attribute, Some("content".to_string()));
        assert_eq!(diagnostics[1].attribute, Some("name".to_string()));
        assert_eq!(
            diagnostics[1].detail,
            Some("value must not be empty".to_string())
        );
    }

    #[test]
    fn test_validate_result_helper() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate_result(&schema, &json!({"name": "test"})).is_ok());
        assert!(is_valid(&schema, &json!({"name": "test"})));

        let result = validate_result(&schema, &json!({}));
        assert_eq!(result.unwrap_err().len(), 1);
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
    }

    #[test]
    fn test_validate_ignores_attributes_outside_schema() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());
        assert!(validate(&schema, &json!({"name": "t", "owner": 7})).is_empty());
    }

    #[test]
    fn test_validate_not_empty() {
        assert!(validate_not_empty("x").is_ok());
        let err = validate_not_empty("").unwrap_err();
        assert_eq!(err.to_string(), "Validation error: value must not be empty");
    }

    #[test]
    fn test_validate_template() {
        assert!(validate_template(TEMPLATE).is_ok());

        let err = validate_template("").unwrap_err();
        assert!(err.to_string().ends_with("template content must not be empty"));

        let err = validate_template("foo: bar").unwrap_err();
        assert!(err.to_string().contains("parsing template: "));

        let err = validate_template("name: no_tasks").unwrap_err();
        assert!(err.to_string().contains(
            "validating template: template must have at least one task defined"
        ));
    }

    #[test]
    fn test_validate_hardware_data() {
        assert!(validate_hardware_data(r#"{"id": "0eba0bf8-3772-4b4a-ab9f-6ebe93b90a94"}"#).is_ok());

        let err = validate_hardware_data("{not json").unwrap_err();
        assert!(err.to_string().contains("failed decoding 'data' as JSON: "));

        let err = validate_hardware_data(r#"{"metadata": {}}"#).unwrap_err();
        assert!(err.to_string().contains("ID is required in JSON data"));
    }

    #[test]
    fn test_validate_json_object() {
        assert!(validate_json_object(r#"{"device_1": "08:00:27:00:00:01"}"#).is_ok());
        assert!(validate_json_object("").is_err());
        assert!(validate_json_object("[1, 2]").is_err());
        assert!(validate_json_object("{").is_err());
    }

    #[test]
    fn test_suppress_equivalent_json() {
        assert!(suppress_equivalent_json(
            r#"{"id":"u","metadata":{"a":1,"b":2}}"#,
            "{\n  \"metadata\": {\"b\": 2, \"a\": 1},\n  \"id\": \"u\"\n}"
        ));
        assert!(!suppress_equivalent_json(r#"{"id":"u"}"#, r#"{"id":"v"}"#));
        assert!(!suppress_equivalent_json("{", "{"));
        assert!(!suppress_equivalent_json(r#"{"id":"u"}"#, "not json"));
    }

    #[test]
    fn test_suppress_equivalent_json_numbers() {
        assert!(suppress_equivalent_json(r#"{"a":1}"#, r#"{"a":1.0}"#));
        assert!(suppress_equivalent_json(r#"{"a":[1, {"b":2e0}]}"#, r#"{"a":[1.0,{"b":2}]}"#));
        assert!(!suppress_equivalent_json(r#"{"a":1}"#, r#"{"a":1.5}"#));
        assert!(!suppress_equivalent_json(r#"{"a":1}"#, r#"{"a":"1"}"#));
        assert!(!suppress_equivalent_json(r#"{"a":1}"#, r#"{"a":1,"b":null}"#));
    }
}
