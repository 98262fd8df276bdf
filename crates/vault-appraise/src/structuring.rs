//! Structuring: turn free-form model output into a fixed-shape record.
//!
//! The remote schema contract is advisory at best, so every field is
//! re-validated here: numbers are coerced, lists default to empty, and
//! nothing downstream ever sees a missing value.

use serde_json::Value;

use crate::types::AppraiseError;

/// Fixed-shape appraisal produced by the structuring stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppraisalRecord {
    pub title: String,
    pub sub_title: String,
    pub provider: String,
    pub year: String,
    pub significance: String,
    pub estimated_value: f64,
    pub facts: Vec<String>,
    pub justification: String,
}

/// Slice out the first JSON object in `text`.
///
/// Models regularly wrap their JSON in prose or code fences; the object
/// between the outermost braces is what we want.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn string_at(obj: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| obj.get(k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Coerce whatever the model put under `estimatedValue` into a finite f64.
/// Numbers pass through; numeric strings (with optional `$`/commas) parse;
/// anything else — absent, null, "N/A" — becomes 0.
fn coerce_value(raw: Option<&Value>) -> f64 {
    match raw {
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Some(Value::String(s)) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
        }
        _ => 0.0,
    }
}

fn coerce_facts(raw: Option<&Value>) -> Vec<String> {
    match raw {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .filter(|s| !s.is_empty())
            .collect(),
        // A lone string becomes a single fact rather than being dropped.
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

impl AppraisalRecord {
    /// Decode a structuring response, tolerating prose wrapping and
    /// alternate key spellings the models drift between.
    pub fn from_json_text(text: &str) -> Result<Self, AppraiseError> {
        let json = extract_json(text)
            .ok_or_else(|| AppraiseError::MalformedResponse("no JSON object in response".into()))?;
        let obj: Value = serde_json::from_str(json)
            .map_err(|e| AppraiseError::MalformedResponse(format!("invalid JSON: {}", e)))?;

        Ok(AppraisalRecord {
            title: string_at(&obj, &["title"]),
            sub_title: string_at(&obj, &["subTitle", "sub_title"]),
            provider: string_at(&obj, &["provider", "brand"]),
            year: string_at(&obj, &["year"]),
            significance: string_at(&obj, &["significance", "keyFeatures"]),
            estimated_value: coerce_value(obj.get("estimatedValue").or_else(|| obj.get("value"))),
            facts: coerce_facts(obj.get("facts")),
            justification: string_at(&obj, &["justification", "aiJustification"]),
        })
    }
}

/// Response schema sent with the structuring request. The service is asked
/// to honor it; [`AppraisalRecord::from_json_text`] assumes it will not.
pub fn appraisal_schema() -> Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "subTitle": { "type": "STRING" },
            "provider": { "type": "STRING" },
            "year": { "type": "STRING" },
            "significance": { "type": "STRING" },
            "estimatedValue": { "type": "NUMBER" },
            "facts": { "type": "ARRAY", "items": { "type": "STRING" } },
            "justification": { "type": "STRING" }
        },
        "required": ["title", "estimatedValue"]
    })
}
