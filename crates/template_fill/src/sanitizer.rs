//! Completion of raw caller data into render-ready document data

use crate::value::{RawData, Value};
use std::collections::BTreeMap;

/// Placeholder name to final display string
pub type DocumentData = BTreeMap<String, String>;

fn normalize(value: Option<&Value>) -> String {
    match value {
        Some(v) if !v.is_blank() => v.to_string_value(),
        _ => String::new(),
    }
}

/// Resolve every required name to a defined string.
///
/// Absent, null, and empty values become `""`; anything else is coerced to
/// its string form. Keys outside `required` are dropped.
pub fn complete<S: AsRef<str>>(raw: &RawData, required: &[S]) -> DocumentData {
    required
        .iter()
        .map(|name| {
            let name = name.as_ref();
            (name.to_string(), normalize(raw.get(name)))
        })
        .collect()
}

/// Normalize every key present in `raw`
pub fn sanitize_all(raw: &RawData) -> DocumentData {
    raw.iter()
        .map(|(name, value)| (name.clone(), normalize(Some(value))))
        .collect()
}

/// Lift document data back into raw form
pub fn to_raw(data: &DocumentData) -> RawData {
    data.iter()
        .map(|(k, v)| (k.clone(), Value::Text(v.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_complete_fills_missing_and_empty() {
        let mut raw = RawData::new();
        raw.insert("a".into(), Value::from("x"));
        raw.insert("b".into(), Value::from(""));
        raw.insert("d".into(), Value::Null);

        let data = complete(&raw, &["a", "b", "c", "d"]);
        assert_eq!(data["a"], "x");
        assert_eq!(data["b"], "");
        assert_eq!(data["c"], "");
        assert_eq!(data["d"], "");
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn test_complete_drops_stray_keys() {
        let mut raw = RawData::new();
        raw.insert("stray".into(), Value::from("ignored"));
        raw.insert("kept".into(), Value::from(7));

        let data = complete(&raw, &["kept".to_string()]);
        assert_eq!(data.len(), 1);
        assert_eq!(data["kept"], "7");
    }

    #[test]
    fn test_sanitize_all_keeps_every_key() {
        let mut raw = RawData::new();
        raw.insert("flag".into(), Value::from(true));
        raw.insert("none".into(), Value::Null);

        let data = sanitize_all(&raw);
        assert_eq!(data["flag"], "true");
        assert_eq!(data["none"], "");
    }

    #[test]
    fn test_complete_is_idempotent() {
        let mut raw = RawData::new();
        raw.insert("a".into(), Value::from("x"));
        raw.insert("b".into(), Value::from(""));
        let required = ["a", "b", "c"];

        let once = complete(&raw, &required);
        let twice = complete(&to_raw(&once), &required);
        assert_eq!(once, twice);
    }

    proptest! {
        #[test]
        fn prop_complete_covers_required_and_is_idempotent(
            entries in proptest::collection::hash_map("[a-c]", proptest::option::of(".{0,6}"), 0..4),
            required in proptest::collection::vec("[a-e]", 0..6),
        ) {
            let raw: RawData = entries
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect();

            let once = complete(&raw, &required);
            for name in &required {
                prop_assert!(once.contains_key(name));
            }
            prop_assert_eq!(complete(&to_raw(&once), &required), once);
        }
    }
}
