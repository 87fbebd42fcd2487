//! Raw values supplied for template placeholders

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Caller-supplied values keyed by placeholder name
pub type RawData = HashMap<String, Value>;

/// A value a caller may supply for a placeholder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Text/string value
    Text(String),
    /// Numeric value
    Number(f64),
    /// Boolean value
    Boolean(bool),
    /// Date value
    Date(NaiveDate),
    /// Several values, rendered comma-separated
    List(Vec<Value>),
    /// Null/missing value
    Null,
}

impl Value {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the value renders as an empty string
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Convert to string representation
    pub fn to_string_value(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            // `Display` for f64 already drops a zero fraction and never uses
            // exponent notation, so large integral values keep every digit
            Value::Number(n) if *n == 0.0 => "0".to_string(),
            Value::Number(n) => n.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            Value::List(items) => items
                .iter()
                .map(Value::to_string_value)
                .collect::<Vec<_>>()
                .join(","),
            Value::Null => String::new(),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_string_value() {
        assert_eq!(Value::from("Ada").to_string_value(), "Ada");
        assert_eq!(Value::from(42).to_string_value(), "42");
        assert_eq!(Value::from(2.5).to_string_value(), "2.5");
        assert_eq!(Value::from(false).to_string_value(), "false");
        assert_eq!(Value::Null.to_string_value(), "");
        assert_eq!(
            Value::from(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()).to_string_value(),
            "2024-03-09"
        );
        assert_eq!(Value::from(vec!["a", "b"]).to_string_value(), "a,b");
    }

    #[test]
    fn test_large_numbers_keep_their_digits() {
        let raw: RawData =
            serde_json::from_str(r#"{"acct": 12345678901234567890, "big": 1e20, "neg": -0.0}"#).unwrap();

        assert_eq!(raw["big"].to_string_value(), "100000000000000000000");
        let acct = raw["acct"].to_string_value();
        assert_eq!(acct.len(), 20);
        assert!(acct.starts_with("1234567890123456"));
        assert_eq!(raw["neg"].to_string_value(), "0");
        assert_eq!(Value::from(-7).to_string_value(), "-7");
        assert_eq!(Value::from(1e15).to_string_value(), "1000000000000000");
    }

    #[test]
    fn test_deserialize_untagged_json() {
        let raw: RawData = serde_json::from_str(
            r#"{"name": "Ada", "age": 36, "member": true, "tags": ["x", 1], "missing": null}"#,
        )
        .unwrap();

        assert_eq!(raw["name"], Value::Text("Ada".into()));
        assert_eq!(raw["age"], Value::Number(36.0));
        assert_eq!(raw["member"], Value::Boolean(true));
        assert_eq!(raw["tags"].to_string_value(), "x,1");
        assert!(raw["missing"].is_null());
    }

    #[test]
    fn test_blank_values() {
        assert!(Value::Null.is_blank());
        assert!(Value::from("").is_blank());
        assert!(!Value::from(" ").is_blank());
        assert!(!Value::from(0).is_blank());
        assert!(Value::from(Option::<String>::None).is_null());
    }
}
