//! Pulling a JSON object out of free-form model output.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Finds the JSON object carried by `text`.
///
/// Tries, in order: the span from the first `{` to the last `}`; the whole text with
/// Markdown code fences removed. Anything that is not a JSON object yields `None`.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Some(span) = outer_braces(text) {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(span) {
            return Some(value);
        }
    }

    let unfenced = text.replace("```json", "").replace("```", "");
    match serde_json::from_str::<Value>(unfenced.trim()) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// [`extract_json`] followed by a typed decode; shape mismatches yield `None`.
pub fn extract_as<T: DeserializeOwned>(text: &str) -> Option<T> {
    let value = extract_json(text)?;
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            tracing::debug!(error = %err, "AI JSON did not match expected shape");
            None
        }
    }
}

fn outer_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_plain_object() {
        assert_eq!(extract_json(r#"{"score": 88}"#), Some(json!({"score": 88})));
    }

    #[test]
    fn parses_object_inside_prose() {
        let text = "Sure! Here is the evaluation:\n{\"score\": 70, \"strengths\": [\"clear\"]}\nGood luck.";
        assert_eq!(
            extract_json(text),
            Some(json!({"score": 70, "strengths": ["clear"]}))
        );
    }

    #[test]
    fn parses_fenced_object() {
        let text = "```json\n{\"question\": \"Why Rust?\", \"category\": \"Motivation\"}\n```";
        assert_eq!(
            extract_json(text),
            Some(json!({"question": "Why Rust?", "category": "Motivation"}))
        );
    }

    #[test]
    fn greedy_span_spanning_two_objects_is_rejected() {
        assert_eq!(extract_json(r#"{"a": 1} and then {"b": 2}"#), None);
    }

    #[test]
    fn non_json_and_non_objects_yield_none() {
        assert_eq!(extract_json("I cannot help with that."), None);
        assert_eq!(extract_json("[1, 2, 3]"), None);
        assert_eq!(extract_json("42"), None);
        assert_eq!(extract_json("} {"), None);
        assert_eq!(extract_json(""), None);
    }

    #[test]
    fn typed_extraction_rejects_wrong_shape() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Score {
            score: u32,
        }
        assert_eq!(extract_as::<Score>(r#"{"score": 5}"#), Some(Score { score: 5 }));
        assert_eq!(extract_as::<Score>(r#"{"score": "high"}"#), None);
    }

    fn arb_object() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-zA-Z0-9 {}\\[\\]`]{0,12}".prop_map(Value::String),
        ];
        let value = leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        });
        prop::collection::btree_map("[a-z]{1,6}", value, 0..5)
            .prop_map(|m| Value::Object(m.into_iter().collect()))
    }

    proptest! {
        #[test]
        fn stringified_objects_round_trip(object in arb_object()) {
            let text = serde_json::to_string(&object).unwrap();
            prop_assert_eq!(extract_json(&text), Some(object));
        }

        #[test]
        fn objects_survive_prose_and_fences(object in arb_object(), prefix in "[a-zA-Z .:]{0,20}") {
            let pretty = serde_json::to_string_pretty(&object).unwrap();
            let fenced = format!("```json\n{pretty}\n```");
            prop_assert_eq!(extract_json(&fenced), Some(object.clone()));
            let prose = format!("{prefix}\n{pretty}\nThanks.");
            prop_assert_eq!(extract_json(&prose), Some(object));
        }
    }
}
