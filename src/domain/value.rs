use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

// ================================
// TermValue – typed variable values
// ================================

/// A typed value held by a variable. Every variable carries one of these
/// together with the key of the domain that produced it.
#[derive(Debug, Clone)]
pub enum TermValue {
    None,
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
}

impl TermValue {
    /// Convert TermValue → serde_json::Value
    pub fn to_value(&self) -> Value {
        match self {
            TermValue::None => Value::Null,
            TermValue::String(s) => Value::String(s.clone()),
            TermValue::Integer(i) => serde_json::json!(*i),
            TermValue::Float(f) => serde_json::json!(*f),
            TermValue::Boolean(b) => Value::Bool(*b),
            TermValue::Date(d) => Value::String(d.to_rfc3339()),
        }
    }

    /// Create TermValue from serde_json::Value
    pub fn from_value(v: &Value) -> Self {
        match v {
            Value::Null => TermValue::None,
            Value::Bool(b) => TermValue::Boolean(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    TermValue::Integer(i)
                } else {
                    TermValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => TermValue::String(s.clone()),
            other => TermValue::String(other.to_string()),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, TermValue::None)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TermValue::Integer(i) => Some(*i as f64),
            TermValue::Float(f) => Some(*f),
            TermValue::String(s) => s.parse::<f64>().ok(),
            TermValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            TermValue::Date(d) => Some(*d),
            TermValue::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|d| d.with_timezone(&Utc)),
            _ => None,
        }
    }

    pub fn to_display_string(&self) -> String {
        match self {
            TermValue::None => String::new(),
            TermValue::String(s) => s.clone(),
            TermValue::Integer(i) => i.to_string(),
            TermValue::Float(f) => f.to_string(),
            TermValue::Boolean(b) => b.to_string(),
            TermValue::Date(d) => d.to_rfc3339(),
        }
    }
}

impl PartialEq for TermValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TermValue::None, TermValue::None) => true,
            (TermValue::String(a), TermValue::String(b)) => a == b,
            (TermValue::Integer(a), TermValue::Integer(b)) => a == b,
            (TermValue::Float(a), TermValue::Float(b)) => (a - b).abs() < 1e-10,
            (TermValue::Integer(a), TermValue::Float(b))
            | (TermValue::Float(b), TermValue::Integer(a)) => (*a as f64 - b).abs() < 1e-10,
            (TermValue::Boolean(a), TermValue::Boolean(b)) => a == b,
            (TermValue::Date(a), TermValue::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Serialize for TermValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TermValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Value::deserialize(deserializer)?;
        Ok(TermValue::from_value(&v))
    }
}

impl std::fmt::Display for TermValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversion() {
        let v = TermValue::Integer(42);
        assert_eq!(v.to_value(), serde_json::json!(42));
        let back = TermValue::from_value(&serde_json::json!(42));
        assert!(matches!(back, TermValue::Integer(42)));
    }

    #[test]
    fn test_from_value_kinds() {
        assert!(matches!(
            TermValue::from_value(&serde_json::json!(null)),
            TermValue::None
        ));
        assert!(matches!(
            TermValue::from_value(&serde_json::json!(true)),
            TermValue::Boolean(true)
        ));
        assert!(matches!(
            TermValue::from_value(&serde_json::json!(3.5)),
            TermValue::Float(_)
        ));
        assert!(matches!(
            TermValue::from_value(&serde_json::json!("hi")),
            TermValue::String(_)
        ));
    }

    #[test]
    fn test_display_string() {
        assert_eq!(TermValue::None.to_display_string(), "");
        assert_eq!(TermValue::String("y".into()).to_display_string(), "y");
        assert_eq!(TermValue::Integer(7).to_display_string(), "7");
        assert_eq!(TermValue::Boolean(false).to_display_string(), "false");
    }

    #[test]
    fn test_numeric_access() {
        assert_eq!(TermValue::Integer(2).as_f64(), Some(2.0));
        assert_eq!(TermValue::String("2.5".into()).as_f64(), Some(2.5));
        assert_eq!(TermValue::String("nope".into()).as_f64(), None);
        assert_eq!(TermValue::None.as_f64(), None);
    }

    #[test]
    fn test_mixed_numeric_eq() {
        assert_eq!(TermValue::Integer(2), TermValue::Float(2.0));
        assert_ne!(TermValue::Integer(2), TermValue::Float(2.1));
        assert_ne!(TermValue::Integer(2), TermValue::String("2".into()));
    }

    #[test]
    fn test_date_access() {
        let d = TermValue::String("2024-01-01T00:00:00Z".into());
        assert!(d.as_date().is_some());
        assert!(TermValue::String("not a date".into()).as_date().is_none());
    }

    #[test]
    fn test_serde_roundtrip() {
        let v = TermValue::String("hello".into());
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"hello\"");
        let back: TermValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
