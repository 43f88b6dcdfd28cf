//! JSON-path response extraction for the declarative path (§4.2).

use std::collections::BTreeMap;

use jsonpath_rust::JsonPathQuery;
use serde_json::Value;

/// Extracts named fields from a connector's JSON response using JSONPath
/// expressions. A single match yields the scalar value; zero matches yield
/// `Value::Null`; multiple matches yield a JSON array.
pub fn extract(
    response: &Value,
    mappings: &BTreeMap<String, String>,
) -> anyhow::Result<BTreeMap<String, Value>> {
    let mut extracted = BTreeMap::new();
    for (output_name, path) in mappings {
        let matches = response
            .clone()
            .path(path)
            .map_err(|e| anyhow::anyhow!("error extracting '{output_name}' with path '{path}': {e}"))?;
        let value = match matches {
            Value::Array(items) if items.is_empty() => Value::Null,
            Value::Array(mut items) if items.len() == 1 => items.remove(0),
            other => other,
        };
        extracted.insert(output_name.clone(), value);
    }
    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_scalar_and_nested_fields() {
        let response = json!({
            "summary": "Pneumonia with respiratory symptoms",
            "icd10": {"code": "J18.9", "label": "Pneumonia, unspecified"},
            "confidence": 0.92
        });
        let mut mappings = BTreeMap::new();
        mappings.insert("summary".to_string(), "$.summary".to_string());
        mappings.insert("icd10_code".to_string(), "$.icd10.code".to_string());
        mappings.insert("icd10_label".to_string(), "$.icd10.label".to_string());

        let extracted = extract(&response, &mappings).unwrap();
        assert_eq!(
            extracted["summary"],
            json!("Pneumonia with respiratory symptoms")
        );
        assert_eq!(extracted["icd10_code"], json!("J18.9"));
        assert_eq!(extracted["icd10_label"], json!("Pneumonia, unspecified"));
    }

    #[test]
    fn missing_path_yields_null() {
        let response = json!({"summary": "x"});
        let mut mappings = BTreeMap::new();
        mappings.insert("missing".to_string(), "$.nope".to_string());
        let extracted = extract(&response, &mappings).unwrap();
        assert_eq!(extracted["missing"], Value::Null);
    }
}
