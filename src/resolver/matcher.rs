//! Step matchers, compiled once at registration time.
//!
//! A [`StepMatch`] template is compiled into a [`CompiledMatcher`] when its
//! definition is loaded; match time does no pattern construction. Three kinds
//! are supported: exact string equality, an anchored regex with named
//! captures, and GWTA phrases — leading-verb templates tolerant of a
//! `Given|When|Then|And` prefix and `the`/`I`/`I'm`/`I am` pronoun phrasing,
//! with the first letter's case made optional.

use regex::Regex;
use std::collections::HashMap;

use crate::error::StepError;

/// Domain annotation marking a placeholder as an embedded statement list.
pub const STATEMENT_DOMAIN: &str = "STATEMENT";

/// Prefix tolerated in front of every GWTA phrase.
const GWTA_PREFIX: &str = r"(?:(?:Given|When|Then|And)\s+)?(?:(?:the|I am|I'm|I)\s+)?";

/// How a step definition matches statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepMatch {
    /// Exact string equality.
    Exact(String),
    /// Anchored regular expression with named captures.
    Pattern(String),
    /// GWTA phrase template with `{name}` / `{name: domain}` placeholders.
    Gwta(String),
}

impl StepMatch {
    /// The raw template text, for diagnostic listings.
    pub fn template(&self) -> &str {
        match self {
            StepMatch::Exact(text) => text,
            StepMatch::Pattern(pattern) => pattern,
            StepMatch::Gwta(phrase) => phrase,
        }
    }
}

/// A typed placeholder extracted from a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub name: String,
    pub domain: Option<String>,
}

impl Placeholder {
    /// Whether this placeholder embeds nested statements.
    pub fn is_statement(&self) -> bool {
        self.domain.as_deref() == Some(STATEMENT_DOMAIN)
    }
}

/// A matcher compiled from a [`StepMatch`] template.
#[derive(Debug, Clone)]
pub struct CompiledMatcher {
    exact: Option<String>,
    regex: Option<Regex>,
    placeholders: Vec<Placeholder>,
}

impl CompiledMatcher {
    pub fn compile(template: &StepMatch) -> Result<Self, StepError> {
        match template {
            StepMatch::Exact(text) => Ok(CompiledMatcher {
                exact: Some(text.clone()),
                regex: None,
                placeholders: Vec::new(),
            }),
            StepMatch::Pattern(pattern) => {
                let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
                    StepError::BadPattern {
                        pattern: pattern.clone(),
                        detail: e.to_string(),
                    }
                })?;
                let placeholders = regex
                    .capture_names()
                    .flatten()
                    .map(|name| Placeholder {
                        name: name.to_string(),
                        domain: None,
                    })
                    .collect();
                Ok(CompiledMatcher {
                    exact: None,
                    regex: Some(regex),
                    placeholders,
                })
            }
            StepMatch::Gwta(phrase) => {
                let (body, placeholders) = compile_phrase(phrase)?;
                let regex = Regex::new(&format!("^{GWTA_PREFIX}{body}$")).map_err(|e| {
                    StepError::BadPattern {
                        pattern: phrase.clone(),
                        detail: e.to_string(),
                    }
                })?;
                Ok(CompiledMatcher {
                    exact: None,
                    regex: Some(regex),
                    placeholders,
                })
            }
        }
    }

    /// Test a (comment-stripped, trimmed) line, returning named captures on a
    /// match.
    pub fn matches(&self, line: &str) -> Option<HashMap<String, String>> {
        if let Some(exact) = &self.exact {
            return (line == exact).then(HashMap::new);
        }
        let regex = self.regex.as_ref()?;
        let captures = regex.captures(line)?;
        let mut named = HashMap::new();
        for placeholder in &self.placeholders {
            if let Some(m) = captures.name(&placeholder.name) {
                named.insert(placeholder.name.clone(), m.as_str().to_string());
            }
        }
        Some(named)
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }
}

/// Turn a GWTA phrase into a regex body plus its placeholders: literal text
/// is escaped (first letter case-optional), `{name}` and `{name: domain}`
/// become named capture groups. The final placeholder captures greedily, the
/// rest lazily.
fn compile_phrase(phrase: &str) -> Result<(String, Vec<Placeholder>), StepError> {
    let token = Regex::new(r"\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*(?::\s*([^}]+?)\s*)?\}")
        .unwrap_or_else(|_| unreachable!("placeholder token pattern is valid"));

    let mut body = String::new();
    let mut placeholders = Vec::new();
    let mut cursor = 0usize;
    let mut first_literal = true;

    let matches: Vec<_> = token.captures_iter(phrase).collect();
    for (i, cap) in matches.iter().enumerate() {
        let whole = cap.get(0).expect("capture 0 always present");
        let literal = &phrase[cursor..whole.start()];
        body.push_str(&escape_literal(literal, std::mem::take(&mut first_literal)));
        let name = cap[1].to_string();
        if placeholders.iter().any(|p: &Placeholder| p.name == name) {
            return Err(StepError::BadPattern {
                pattern: phrase.to_string(),
                detail: format!("duplicate placeholder '{name}'"),
            });
        }
        let last = i == matches.len() - 1 && whole.end() == phrase.len();
        body.push_str(&format!(
            "(?P<{name}>.+{})",
            if last { "" } else { "?" }
        ));
        placeholders.push(Placeholder {
            name,
            domain: cap.get(2).map(|d| d.as_str().to_string()),
        });
        cursor = whole.end();
    }
    body.push_str(&escape_literal(&phrase[cursor..], first_literal));
    Ok((body, placeholders))
}

/// Escape literal phrase text. When it begins the phrase, the first letter
/// matches either case.
fn escape_literal(literal: &str, phrase_start: bool) -> String {
    if literal.is_empty() {
        return String::new();
    }
    let mut chars = literal.chars();
    if phrase_start {
        let first = chars.next().unwrap_or_default();
        if first.is_ascii_alphabetic() {
            return format!(
                "[{}{}]{}",
                first.to_ascii_lowercase(),
                first.to_ascii_uppercase(),
                regex::escape(chars.as_str())
            );
        }
    }
    regex::escape(literal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gwta(phrase: &str) -> CompiledMatcher {
        CompiledMatcher::compile(&StepMatch::Gwta(phrase.into())).unwrap()
    }

    #[test]
    fn test_exact_match() {
        let m = CompiledMatcher::compile(&StepMatch::Exact("exact1".into())).unwrap();
        assert_eq!(m.matches("exact1"), Some(HashMap::new()));
        assert_eq!(m.matches("exact1 "), None);
        assert_eq!(m.matches("Exact1"), None);
    }

    #[test]
    fn test_pattern_named_capture() {
        let m = CompiledMatcher::compile(&StepMatch::Pattern("match(?<num>1)".into())).unwrap();
        let caps = m.matches("match1").unwrap();
        assert_eq!(caps.get("num").map(String::as_str), Some("1"));
        assert!(m.matches("match2").is_none());
    }

    #[test]
    fn test_pattern_is_anchored() {
        let m = CompiledMatcher::compile(&StepMatch::Pattern("go".into())).unwrap();
        assert!(m.matches("go").is_some());
        assert!(m.matches("lets go now").is_none());
    }

    #[test]
    fn test_gwta_plain() {
        let m = gwta("set {what} to {value}");
        let caps = m.matches("set x to y").unwrap();
        assert_eq!(caps["what"], "x");
        assert_eq!(caps["value"], "y");
    }

    #[test]
    fn test_gwta_prefixes() {
        let m = gwta("set {what} to {value}");
        for line in [
            "Given I set x to y",
            "When the set x to y",
            "Then I'm set x to y",
            "And I am set x to y",
            "Set x to y",
        ] {
            let caps = m.matches(line).unwrap_or_else(|| panic!("no match: {line}"));
            assert_eq!(caps["what"], "x", "line: {line}");
        }
    }

    #[test]
    fn test_gwta_no_partial_match() {
        let m = gwta("display {what}");
        assert!(m.matches("display x").is_some());
        assert!(m.matches("do not display x").is_none());
        assert!(m.matches("display").is_none());
    }

    #[test]
    fn test_gwta_typed_placeholders() {
        let m = gwta("wait {n: number} seconds");
        let placeholders = m.placeholders();
        assert_eq!(placeholders.len(), 1);
        assert_eq!(placeholders[0].domain.as_deref(), Some("number"));
        assert!(!placeholders[0].is_statement());
        let caps = m.matches("wait 3 seconds").unwrap();
        assert_eq!(caps["n"], "3");
    }

    #[test]
    fn test_gwta_statement_placeholder() {
        let m = gwta("ensure {outcome: STATEMENT}");
        assert!(m.placeholders()[0].is_statement());
        let caps = m.matches("ensure user is logged in").unwrap();
        assert_eq!(caps["outcome"], "user is logged in");
    }

    #[test]
    fn test_gwta_duplicate_placeholder_rejected() {
        let err = CompiledMatcher::compile(&StepMatch::Gwta("eq {a} and {a}".into()));
        assert!(matches!(err, Err(StepError::BadPattern { .. })));
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let err = CompiledMatcher::compile(&StepMatch::Pattern("(((".into()));
        assert!(matches!(err, Err(StepError::BadPattern { .. })));
    }
}
