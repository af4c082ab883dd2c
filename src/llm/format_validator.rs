use jsonschema::Validator;
use serde_json::Value;

use crate::errors::{Error, Result};

/// Creates a JSON Schema validator from a schema string
///
/// # Arguments
/// * `schema_content` - The JSON Schema as a string
///
/// # Returns
/// * `Result<Validator>` - The compiled validator on success, or an error
pub fn build_validator(schema_content: &str) -> Result<Validator> {
    let schema: Value = serde_json::from_str(schema_content)?;
    jsonschema::validator_for(&schema).map_err(|e| Error::Schema(e.to_string()))
}

/// Validates an already parsed value and collects every violation message
pub fn check_value(schema: &Validator, value: &Value) -> Result<()> {
    let errors: Vec<String> = schema.iter_errors(value).map(|e| e.to_string()).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCHEMA: &str = r#"{
        "type": "object",
        "required": ["name"],
        "properties": { "name": { "type": "string" } }
    }"#;

    #[test]
    fn check_value_reports_violations() {
        let validator = build_validator(SCHEMA).unwrap();
        assert!(check_value(&validator, &json!({"name": "x"})).is_ok());
        let err = check_value(&validator, &json!({})).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
