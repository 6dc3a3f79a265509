//! Feature documents and line-level text handling.

/// An immutable source document, identified by a slash-delimited
/// hierarchical path (e.g. `/auth/login`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureDocument {
    pub path: String,
    pub text: String,
}

impl FeatureDocument {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        FeatureDocument {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// One line of an expanded feature, tagged with whether it originated from
/// background text. Background origin decides the run-scope of `waypoint`
/// registrations declared on that line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLine {
    pub text: String,
    pub background: bool,
}

/// A feature after background expansion: its own lines plus any prepended or
/// spliced background lines, in final execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedFeature {
    pub path: String,
    pub lines: Vec<FeatureLine>,
}

impl ExpandedFeature {
    pub fn from_document(doc: &FeatureDocument) -> Self {
        ExpandedFeature {
            path: doc.path.clone(),
            lines: doc
                .text
                .lines()
                .map(|l| FeatureLine {
                    text: l.to_string(),
                    background: false,
                })
                .collect(),
        }
    }

    /// The expanded text, one statement per line.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Strip a trailing `#` comment and surrounding whitespace.
pub fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => line[..pos].trim(),
        None => line.trim(),
    }
}

/// Parse an inclusion directive line: `Backgrounds: a, b` or `Scenarios: a, b`.
/// Returns the comma-separated names when the line is a directive.
pub fn parse_include_directive(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim();
    let rest = trimmed
        .strip_prefix("Backgrounds:")
        .or_else(|| trimmed.strip_prefix("Scenarios:"))?;
    Some(
        rest.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// Parent of a slash-delimited path; the root's parent is the empty string.
pub fn parent_path(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    Some(match trimmed.rfind('/') {
        Some(0) | None => "",
        Some(pos) => &trimmed[..pos],
    })
}
