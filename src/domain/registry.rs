//! Domain registry: named, typed value domains with coercion and ordering.
//!
//! A domain is either an enumeration (optionally ordered by list position) or
//! a free-form schema validated by a structural check. Superdomains compose
//! existing domains: the union of their value lists when every parent is
//! enumerated, otherwise an "any one of" union of the parent schemas.

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;

use super::value::TermValue;
use crate::error::DomainError;

/// Well-known seed domains registered in every world.
pub const DOMAIN_STRING: &str = "string";
pub const DOMAIN_NUMBER: &str = "number";
pub const DOMAIN_DATE: &str = "date";

/// Normalize a domain key: case- and space-insensitive.
pub fn normalize_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Structural check for free-form (non-enumerated) domains.
#[derive(Debug, Clone)]
pub enum ValueSchema {
    /// Any text.
    Text,
    /// Integer or float.
    Number,
    /// RFC 3339 timestamp or `YYYY-MM-DD` date.
    Date,
    /// Text matching an anchored regular expression.
    Pattern(Regex),
    /// Union: the first alternative that coerces wins.
    AnyOf(Vec<ValueSchema>),
}

impl ValueSchema {
    /// Compile a pattern schema, anchoring the expression.
    pub fn pattern(pattern: &str) -> Result<Self, DomainError> {
        let re = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| DomainError::BadPattern {
            pattern: pattern.to_string(),
            detail: e.to_string(),
        })?;
        Ok(ValueSchema::Pattern(re))
    }

    fn coerce(&self, raw: &str) -> Result<TermValue, String> {
        match self {
            ValueSchema::Text => Ok(TermValue::String(raw.to_string())),
            ValueSchema::Number => {
                if let Ok(i) = raw.parse::<i64>() {
                    Ok(TermValue::Integer(i))
                } else {
                    raw.parse::<f64>()
                        .map(TermValue::Float)
                        .map_err(|_| "not a number".to_string())
                }
            }
            ValueSchema::Date => {
                if let Ok(d) = DateTime::parse_from_rfc3339(raw) {
                    return Ok(TermValue::Date(d.with_timezone(&Utc)));
                }
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map(|d| {
                        TermValue::Date(DateTime::from_naive_utc_and_offset(
                            d.and_hms_opt(0, 0, 0).unwrap_or_default(),
                            Utc,
                        ))
                    })
                    .map_err(|_| "not a date".to_string())
            }
            ValueSchema::Pattern(re) => {
                if re.is_match(raw) {
                    Ok(TermValue::String(raw.to_string()))
                } else {
                    Err(format!("does not match pattern {}", re.as_str()))
                }
            }
            ValueSchema::AnyOf(alternatives) => {
                for alt in alternatives {
                    if let Ok(v) = alt.coerce(raw) {
                        return Ok(v);
                    }
                }
                Err("no alternative matched".to_string())
            }
        }
    }
}

/// How a domain's values are defined.
#[derive(Debug, Clone)]
pub enum DomainKind {
    Enumerated { values: Vec<String>, ordered: bool },
    Schema(ValueSchema),
}

/// A named, typed value space attached to variables.
#[derive(Debug, Clone)]
pub struct Domain {
    pub key: String,
    pub kind: DomainKind,
    pub description: Option<String>,
}

impl Domain {
    /// Coerce raw text into this domain, with a domain-specific message on
    /// invalid input.
    pub fn coerce(&self, raw: &str) -> Result<TermValue, DomainError> {
        let raw = raw.trim();
        match &self.kind {
            DomainKind::Enumerated { values, .. } => {
                if values.iter().any(|v| v == raw) {
                    Ok(TermValue::String(raw.to_string()))
                } else {
                    Err(DomainError::Coerce {
                        domain: self.key.clone(),
                        raw: raw.to_string(),
                        detail: format!("expected one of {values:?}"),
                    })
                }
            }
            DomainKind::Schema(schema) => {
                schema.coerce(raw).map_err(|detail| DomainError::Coerce {
                    domain: self.key.clone(),
                    raw: raw.to_string(),
                    detail,
                })
            }
        }
    }

    /// Compare two values of this domain.
    ///
    /// Uses the enumeration comparator when the domain is ordered, then
    /// numeric difference, then date-time difference; anything else does not
    /// support ordering.
    pub fn compare(&self, a: &TermValue, b: &TermValue) -> Result<Ordering, DomainError> {
        if let DomainKind::Enumerated {
            values,
            ordered: true,
        } = &self.kind
        {
            let pos = |v: &TermValue| values.iter().position(|m| *m == v.to_display_string());
            if let (Some(ia), Some(ib)) = (pos(a), pos(b)) {
                return Ok(ia.cmp(&ib));
            }
        }
        if let (Some(fa), Some(fb)) = (a.as_f64(), b.as_f64()) {
            return Ok(fa.partial_cmp(&fb).unwrap_or(Ordering::Equal));
        }
        if let (Some(da), Some(db)) = (a.as_date(), b.as_date()) {
            return Ok(da.cmp(&db));
        }
        Err(DomainError::Unordered(self.key.clone()))
    }

    /// Enumerated value list, if any.
    pub fn values(&self) -> Option<&[String]> {
        match &self.kind {
            DomainKind::Enumerated { values, .. } => Some(values),
            DomainKind::Schema(_) => None,
        }
    }

    /// Whether the domain carries a position-based ordering.
    pub fn is_ordered(&self) -> bool {
        matches!(
            self.kind,
            DomainKind::Enumerated { ordered: true, .. }
        )
    }
}

/// Registry of domains, unique per world by normalized key.
#[derive(Debug, Default)]
pub struct DomainRegistry {
    domains: HashMap<String, Domain>,
}

impl DomainRegistry {
    pub fn new() -> Self {
        DomainRegistry {
            domains: HashMap::new(),
        }
    }

    /// Registry pre-seeded with the built-in `string`, `number` and `date`
    /// domains.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register_schema(DOMAIN_STRING, ValueSchema::Text, Some("any text"))
            .and_then(|_| {
                registry.register_schema(DOMAIN_NUMBER, ValueSchema::Number, Some("a number"))
            })
            .and_then(|_| {
                registry.register_schema(DOMAIN_DATE, ValueSchema::Date, Some("a date"))
            })
            .unwrap_or_else(|_| unreachable!("builtin domains are distinct"));
        registry
    }

    /// Register an enumerated domain. Fails if the key is taken.
    pub fn register_enum(
        &mut self,
        key: &str,
        values: Vec<String>,
        ordered: bool,
        description: Option<&str>,
    ) -> Result<(), DomainError> {
        self.insert(Domain {
            key: normalize_key(key),
            kind: DomainKind::Enumerated { values, ordered },
            description: description.map(str::to_string),
        })
    }

    /// Register a free-form schema domain. Fails if the key is taken.
    pub fn register_schema(
        &mut self,
        key: &str,
        schema: ValueSchema,
        description: Option<&str>,
    ) -> Result<(), DomainError> {
        self.insert(Domain {
            key: normalize_key(key),
            kind: DomainKind::Schema(schema),
            description: description.map(str::to_string),
        })
    }

    /// Register a superdomain composed of existing parents.
    ///
    /// When every parent is enumerated the new domain is the union of their
    /// value lists (unordered); otherwise its coercion is the union of the
    /// parents' schemas.
    pub fn register_superdomain(
        &mut self,
        key: &str,
        parents: &[&str],
        description: Option<&str>,
    ) -> Result<(), DomainError> {
        let mut parent_domains = Vec::with_capacity(parents.len());
        for parent in parents {
            let normalized = normalize_key(parent);
            let domain = self
                .domains
                .get(&normalized)
                .ok_or_else(|| DomainError::Unknown(normalized.clone()))?;
            parent_domains.push(domain.clone());
        }

        let all_enumerated = parent_domains
            .iter()
            .all(|d| matches!(d.kind, DomainKind::Enumerated { .. }));

        let kind = if all_enumerated {
            let mut values: Vec<String> = Vec::new();
            for domain in &parent_domains {
                if let DomainKind::Enumerated { values: vs, .. } = &domain.kind {
                    for v in vs {
                        if !values.contains(v) {
                            values.push(v.clone());
                        }
                    }
                }
            }
            if values.is_empty() {
                return Err(DomainError::EmptyUnion(normalize_key(key)));
            }
            DomainKind::Enumerated {
                values,
                ordered: false,
            }
        } else {
            let mut schemas = Vec::new();
            for domain in parent_domains {
                match domain.kind {
                    DomainKind::Schema(schema) => schemas.push(schema),
                    DomainKind::Enumerated { values, .. } => {
                        // Enumerated parents contribute their members as a
                        // pattern alternative.
                        let joined = values
                            .iter()
                            .map(|v| regex::escape(v))
                            .collect::<Vec<_>>()
                            .join("|");
                        schemas.push(ValueSchema::pattern(&joined)?);
                    }
                }
            }
            if schemas.is_empty() {
                return Err(DomainError::EmptyUnion(normalize_key(key)));
            }
            DomainKind::Schema(ValueSchema::AnyOf(schemas))
        };

        self.insert(Domain {
            key: normalize_key(key),
            kind,
            description: description.map(str::to_string),
        })
    }

    fn insert(&mut self, domain: Domain) -> Result<(), DomainError> {
        if self.domains.contains_key(&domain.key) {
            return Err(DomainError::Duplicate(domain.key));
        }
        self.domains.insert(domain.key.clone(), domain);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Domain> {
        self.domains.get(&normalize_key(key))
    }

    /// Coerce raw text into the named domain.
    pub fn coerce(&self, key: &str, raw: &str) -> Result<TermValue, DomainError> {
        self.get(key)
            .ok_or_else(|| DomainError::Unknown(normalize_key(key)))?
            .coerce(raw)
    }

    /// Compare two values under the named domain.
    pub fn compare(&self, key: &str, a: &TermValue, b: &TermValue) -> Result<Ordering, DomainError> {
        self.get(key)
            .ok_or_else(|| DomainError::Unknown(normalize_key(key)))?
            .compare(a, b)
    }

    /// All registered domain keys, for diagnostics.
    pub fn keys(&self) -> Vec<&str> {
        self.domains.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_colors() -> DomainRegistry {
        let mut r = DomainRegistry::with_builtins();
        r.register_enum(
            "color",
            vec!["a".into(), "b".into(), "c".into()],
            true,
            None,
        )
        .unwrap();
        r
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("  My  Domain "), "my domain");
        assert_eq!(normalize_key("COLOR"), "color");
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut r = registry_with_colors();
        let err = r.register_enum("Color", vec!["x".into()], false, None);
        assert!(matches!(err, Err(DomainError::Duplicate(_))));
    }

    #[test]
    fn test_enum_coerce() {
        let r = registry_with_colors();
        assert_eq!(
            r.coerce("color", "b").unwrap(),
            TermValue::String("b".into())
        );
        let err = r.coerce("color", "z").unwrap_err();
        assert!(err.to_string().contains("expected one of"));
    }

    #[test]
    fn test_number_coerce() {
        let r = DomainRegistry::with_builtins();
        assert_eq!(r.coerce("number", "42").unwrap(), TermValue::Integer(42));
        assert_eq!(r.coerce("number", "2.5").unwrap(), TermValue::Float(2.5));
        assert!(r.coerce("number", "nope").is_err());
    }

    #[test]
    fn test_date_coerce() {
        let r = DomainRegistry::with_builtins();
        assert!(matches!(
            r.coerce("date", "2024-06-01").unwrap(),
            TermValue::Date(_)
        ));
        assert!(matches!(
            r.coerce("date", "2024-06-01T10:00:00Z").unwrap(),
            TermValue::Date(_)
        ));
        assert!(r.coerce("date", "yesterday-ish").is_err());
    }

    #[test]
    fn test_unknown_domain() {
        let r = DomainRegistry::with_builtins();
        assert!(matches!(
            r.coerce("shade", "x"),
            Err(DomainError::Unknown(_))
        ));
    }

    #[test]
    fn test_ordered_compare() {
        let r = registry_with_colors();
        let a = TermValue::String("a".into());
        let c = TermValue::String("c".into());
        assert_eq!(r.compare("color", &a, &c).unwrap(), Ordering::Less);
        assert_eq!(r.compare("color", &c, &a).unwrap(), Ordering::Greater);
        assert_eq!(r.compare("color", &a, &a).unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_numeric_and_date_fallback_compare() {
        let r = DomainRegistry::with_builtins();
        assert_eq!(
            r.compare("string", &TermValue::Integer(1), &TermValue::Integer(2))
                .unwrap(),
            Ordering::Less
        );
        let d1 = TermValue::String("2024-01-01T00:00:00Z".into());
        let d2 = TermValue::String("2025-01-01T00:00:00Z".into());
        assert_eq!(r.compare("string", &d1, &d2).unwrap(), Ordering::Less);
        let err = r
            .compare(
                "string",
                &TermValue::String("x".into()),
                &TermValue::String("y".into()),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Unordered(_)));
    }

    #[test]
    fn test_superdomain_enum_union() {
        let mut r = registry_with_colors();
        r.register_enum("grey", vec!["g1".into(), "b".into()], false, None)
            .unwrap();
        r.register_superdomain("shade", &["color", "grey"], None)
            .unwrap();
        let shade = r.get("shade").unwrap();
        assert_eq!(
            shade.values().unwrap(),
            &["a".to_string(), "b".into(), "c".into(), "g1".into()]
        );
        assert!(r.coerce("shade", "g1").is_ok());
        assert!(r.coerce("shade", "nope").is_err());
    }

    #[test]
    fn test_superdomain_schema_union() {
        let mut r = registry_with_colors();
        r.register_superdomain("mixed", &["color", "number"], None)
            .unwrap();
        assert!(r.coerce("mixed", "b").is_ok());
        assert_eq!(r.coerce("mixed", "7").unwrap(), TermValue::Integer(7));
        assert!(r.coerce("mixed", "zzz").is_err());
    }

    #[test]
    fn test_superdomain_unknown_parent() {
        let mut r = DomainRegistry::with_builtins();
        assert!(matches!(
            r.register_superdomain("u", &["missing"], None),
            Err(DomainError::Unknown(_))
        ));
    }

    #[test]
    fn test_pattern_schema() {
        let mut r = DomainRegistry::with_builtins();
        r.register_schema("hex", ValueSchema::pattern("[0-9a-f]+").unwrap(), None)
            .unwrap();
        assert!(r.coerce("hex", "deadbeef").is_ok());
        assert!(r.coerce("hex", "xyz").is_err());
    }
}
