//! Staged validation of model output.
//!
//! Stages run cheapest first and each must pass before the next:
//! syntax (is it JSON), schema (required fields and their types), decode
//! (into `FactBatch`). Malformed text is never repaired locally.

use serde_json::Value;

use crate::error::ValidationError;
use crate::types::FactBatch;

/// Fields every fact must carry as strings.
const REQUIRED_STRING_FIELDS: [&str; 3] = ["title", "description", "imageUrl"];

/// Run all validation stages over the raw model text.
///
/// # Errors
/// Returns the first stage that rejected the text.
pub fn validate_response(text: &str) -> Result<FactBatch, ValidationError> {
    let value: Value = serde_json::from_str(text).map_err(ValidationError::Syntax)?;
    check_schema(&value)?;
    serde_json::from_value(value).map_err(ValidationError::Decode)
}

/// Structural check without decoding.
///
/// One bad element rejects the whole batch.
pub fn check_schema(value: &Value) -> Result<(), ValidationError> {
    let root = value
        .as_object()
        .ok_or_else(|| ValidationError::Schema("top-level value is not an object".into()))?;

    let facts = root
        .get("facts")
        .ok_or_else(|| ValidationError::Schema("missing \"facts\"".into()))?
        .as_array()
        .ok_or_else(|| ValidationError::Schema("\"facts\" is not an array".into()))?;

    for (index, element) in facts.iter().enumerate() {
        let fact = element
            .as_object()
            .ok_or_else(|| ValidationError::Schema(format!("facts[{}] is not an object", index)))?;

        for field in REQUIRED_STRING_FIELDS {
            match fact.get(field) {
                Some(Value::String(_)) => {}
                Some(other) => {
                    return Err(ValidationError::Schema(format!(
                        "facts[{}].{} is {}, expected a string",
                        index,
                        field,
                        type_name(other)
                    )))
                }
                None => {
                    return Err(ValidationError::Schema(format!(
                        "facts[{}].{} is missing",
                        index, field
                    )))
                }
            }
        }
    }

    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fact(title: &str) -> Value {
        json!({
            "title": title,
            "description": "A description.",
            "imageUrl": "https://example.com/a.jpg",
            "url": "https://example.com",
            "latitude": 48.85,
            "longitude": 2.29
        })
    }

    #[test]
    fn test_valid_batch() {
        let text = json!({ "location": "Paris", "facts": [fact("One"), fact("Two")] }).to_string();
        let batch = validate_response(&text).unwrap();
        assert_eq!(batch.location, "Paris");
        assert_eq!(batch.facts.len(), 2);
        assert_eq!(batch.facts[1].title, "Two");
        assert_eq!(batch.facts[0].coordinates(), Some((48.85, 2.29)));
    }

    #[test]
    fn test_optional_fields_unchecked() {
        let text = json!({
            "location": "Paris",
            "facts": [{ "title": "T", "description": "D", "imageUrl": "" }]
        })
        .to_string();
        let batch = validate_response(&text).unwrap();
        assert!(batch.facts[0].url.is_none());
    }

    #[test]
    fn test_truncated_json_fails_syntax() {
        let err = validate_response(r#"{"location": "Paris", "facts": [{"title": "#).unwrap_err();
        assert_eq!(err.stage(), "syntax");
    }

    #[test]
    fn test_prose_wrapper_fails_syntax() {
        let text = format!("Here are your facts:\n{}", json!({ "location": "x", "facts": [] }));
        assert_eq!(validate_response(&text).unwrap_err().stage(), "syntax");
    }

    #[test]
    fn test_non_object_root_fails_schema() {
        let err = validate_response("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ValidationError::Schema(ref m) if m.contains("top-level")));
    }

    #[test]
    fn test_missing_facts_fails_schema() {
        let err = validate_response(r#"{"location": "Paris"}"#).unwrap_err();
        assert_eq!(err.stage(), "schema");
    }

    #[test]
    fn test_one_bad_element_rejects_whole_batch() {
        for field in REQUIRED_STRING_FIELDS {
            let mut bad = fact("Bad");
            bad.as_object_mut().unwrap().remove(field);
            let text = json!({ "location": "Paris", "facts": [fact("A"), bad, fact("C")] }).to_string();

            let err = validate_response(&text).unwrap_err();
            assert!(
                matches!(err, ValidationError::Schema(ref m) if m == &format!("facts[1].{} is missing", field)),
                "unexpected error for {}: {}",
                field,
                err
            );
        }
    }

    #[test]
    fn test_wrong_field_type_fails_schema() {
        let mut bad = fact("Bad");
        bad["imageUrl"] = json!(42);
        let text = json!({ "location": "Paris", "facts": [bad] }).to_string();
        let err = validate_response(&text).unwrap_err();
        assert!(matches!(err, ValidationError::Schema(ref m) if m.contains("a number")));
    }

    #[test]
    fn test_schema_passes_but_decode_fails() {
        // Missing location and a string latitude are outside the schema check
        let text = json!({ "facts": [fact("A")] }).to_string();
        assert_eq!(validate_response(&text).unwrap_err().stage(), "decode");

        let mut odd = fact("A");
        odd["latitude"] = json!("north-ish");
        let text = json!({ "location": "Paris", "facts": [odd] }).to_string();
        assert_eq!(validate_response(&text).unwrap_err().stage(), "decode");
    }
}
