//! Best-effort recovery of the JSON verdict embedded in free text.
//!
//! Model replies wrap the object in prose or code fences. The span from the
//! first `{` to the last `}` is parsed; anything that does not come out as a
//! JSON object degrades to empty nutrients and the raw reply as the
//! analysis text. A malformed reply never fails the request.

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Nutrients {
    pub carbohydrates: Option<f64>,
    pub proteins: Option<f64>,
    pub fats: Option<f64>,
    pub calories: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JudgeVerdict {
    pub nutrients: Nutrients,
    pub full_analysis: String,
    /// False when no JSON object could be recovered.
    pub parsed: bool,
}

/// Greedy brace match: first `{` through last `}`.
pub fn extract_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

pub fn parse_judge_reply(reply: &str) -> JudgeVerdict {
    let reply = reply.trim();

    let object = extract_json_object(reply).and_then(|span| {
        serde_json::from_str::<Map<String, Value>>(span)
            .map_err(|e| tracing::warn!("⚠️ Judge JSON parsing failed: {}", e))
            .ok()
    });

    let Some(object) = object else {
        return JudgeVerdict {
            nutrients: Nutrients::default(),
            full_analysis: reply.to_string(),
            parsed: false,
        };
    };

    let full_analysis = object
        .get("fullAnalysis")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or(reply)
        .to_string();

    JudgeVerdict {
        nutrients: Nutrients {
            carbohydrates: numeric_field(&object, "carbohydrates"),
            proteins: numeric_field(&object, "proteins"),
            fats: numeric_field(&object, "fats"),
            calories: numeric_field(&object, "calories"),
        },
        full_analysis,
        parsed: true,
    }
}

/// Numbers pass through; numeric strings such as `"42"` or `"12,5"` are parsed.
fn numeric_field(object: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = match object.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_object_from_prose() {
        let reply = "Here is the estimate:\n```json\n{\"carbohydrates\": 62.5, \"proteins\": 18, \"fats\": 11, \"calories\": 430, \"fullAnalysis\": \"Pasta al pomodoro, about 250 g.\"}\n```";
        let verdict = parse_judge_reply(reply);

        assert!(verdict.parsed);
        assert_eq!(verdict.nutrients.carbohydrates, Some(62.5));
        assert_eq!(verdict.nutrients.proteins, Some(18.0));
        assert_eq!(verdict.nutrients.fats, Some(11.0));
        assert_eq!(verdict.nutrients.calories, Some(430.0));
        assert_eq!(verdict.full_analysis, "Pasta al pomodoro, about 250 g.");
    }

    #[test]
    fn test_no_json_falls_back_to_reply() {
        let verdict = parse_judge_reply("  I cannot see any food in this picture.  ");
        assert!(!verdict.parsed);
        assert_eq!(verdict.nutrients, Nutrients::default());
        assert_eq!(verdict.full_analysis, "I cannot see any food in this picture.");
    }

    #[test]
    fn test_greedy_span_across_two_objects_is_lossy() {
        // First `{` to last `}` spans both objects and is not valid JSON.
        let reply = "{\"carbohydrates\": 10} and also {\"carbohydrates\": 20}";
        let verdict = parse_judge_reply(reply);
        assert!(!verdict.parsed);
        assert_eq!(verdict.nutrients.carbohydrates, None);
        assert_eq!(verdict.full_analysis, reply);
    }

    #[test]
    fn test_missing_full_analysis_uses_reply() {
        let reply = "{\"carbohydrates\": 40, \"calories\": 300, \"fullAnalysis\": \"\"}";
        let verdict = parse_judge_reply(reply);
        assert!(verdict.parsed);
        assert_eq!(verdict.nutrients.proteins, None);
        assert_eq!(verdict.full_analysis, reply);
    }

    #[test]
    fn test_numeric_strings_and_junk_values() {
        let verdict = parse_judge_reply(
            "{\"carbohydrates\": \"55\", \"proteins\": \"12,5\", \"fats\": \"n/a\", \"calories\": null}",
        );
        assert_eq!(verdict.nutrients.carbohydrates, Some(55.0));
        assert_eq!(verdict.nutrients.proteins, Some(12.5));
        assert_eq!(verdict.nutrients.fats, None);
        assert_eq!(verdict.nutrients.calories, None);
    }

    #[test]
    fn test_extract_span() {
        assert_eq!(extract_json_object("a {\"x\": {\"y\": 1}} b"), Some("{\"x\": {\"y\": 1}}"));
        assert_eq!(extract_json_object("} reversed {"), None);
        assert_eq!(extract_json_object("no braces"), None);
    }
}
