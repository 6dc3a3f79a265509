//! Background expansion: hierarchical prepending and explicit inclusion.
//!
//! Two passes run before resolution. [`expand_backgrounds`] walks each
//! feature's path upward and prepends the text of documents that live at
//! ancestor levels. [`expand_features`] splices named background documents in
//! place of `Backgrounds:` / `Scenarios:` directive lines.

use super::feature::{
    parent_path, parse_include_directive, ExpandedFeature, FeatureDocument, FeatureLine,
};
use crate::error::RunError;

/// Expand hierarchical backgrounds. For each feature, walk its path upward
/// one directory level at a time; at each ancestor level, prepend (in
/// document order) the text of every other document whose path's parent is
/// that ancestor. Inputs are not mutated.
pub fn expand_backgrounds(features: &[FeatureDocument]) -> Vec<ExpandedFeature> {
    features
        .iter()
        .map(|feature| {
            let mut expanded = ExpandedFeature::from_document(feature);
            let mut ancestor = parent_path(&feature.path);
            while let Some(level) = ancestor {
                let mut block: Vec<FeatureLine> = Vec::new();
                for doc in features {
                    if doc.path != feature.path && parent_path(&doc.path) == Some(level) {
                        block.extend(doc.text.lines().map(|l| FeatureLine {
                            text: l.to_string(),
                            background: true,
                        }));
                    }
                }
                block.extend(expanded.lines);
                expanded.lines = block;
                ancestor = parent_path(level);
            }
            expanded
        })
        .collect()
}

/// Splice explicitly included backgrounds. Each name in a `Backgrounds: a, b`
/// or `Scenarios: a, b` directive must select exactly one background document
/// whose path ends in `/name` (or equals it); zero or multiple matches is a
/// hard error. The matched text is trimmed and spliced in place of the
/// directive line, one blank-line-separated block per name, in order.
pub fn expand_features(
    features: Vec<ExpandedFeature>,
    backgrounds: &[FeatureDocument],
) -> Result<Vec<ExpandedFeature>, RunError> {
    features
        .into_iter()
        .map(|feature| {
            let mut lines: Vec<FeatureLine> = Vec::with_capacity(feature.lines.len());
            for line in &feature.lines {
                let Some(names) = parse_include_directive(&line.text) else {
                    lines.push(line.clone());
                    continue;
                };
                for (i, name) in names.iter().enumerate() {
                    let matched: Vec<&FeatureDocument> = backgrounds
                        .iter()
                        .filter(|b| {
                            b.path == *name || b.path.ends_with(&format!("/{name}"))
                        })
                        .collect();
                    let doc = match matched.as_slice() {
                        [one] => one,
                        [] => {
                            return Err(RunError::Expand(format!(
                                "no background found for '{name}' in {}",
                                feature.path
                            )))
                        }
                        many => {
                            return Err(RunError::Expand(format!(
                                "{} backgrounds match '{name}' in {}",
                                many.len(),
                                feature.path
                            )))
                        }
                    };
                    if i > 0 {
                        lines.push(FeatureLine {
                            text: String::new(),
                            background: true,
                        });
                    }
                    lines.extend(doc.text.trim().lines().map(|l| FeatureLine {
                        text: l.to_string(),
                        background: true,
                    }));
                }
            }
            Ok(ExpandedFeature {
                path: feature.path,
                lines,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_backgrounds_hierarchy() {
        let features = vec![
            FeatureDocument::new("/f1", "f1_step"),
            FeatureDocument::new("/f1/l1f1", "l1f1_step"),
        ];
        let expanded = expand_backgrounds(&features);
        assert_eq!(expanded[0].text(), "f1_step");
        assert_eq!(expanded[1].text(), "f1_step\nl1f1_step");
        assert!(expanded[1].lines[0].background);
        assert!(!expanded[1].lines[1].background);
    }

    #[test]
    fn test_expand_backgrounds_two_levels() {
        let features = vec![
            FeatureDocument::new("/top", "top_step"),
            FeatureDocument::new("/top/mid", "mid_step"),
            FeatureDocument::new("/top/mid/leaf", "leaf_step"),
        ];
        let expanded = expand_backgrounds(&features);
        assert_eq!(expanded[2].text(), "top_step\nmid_step\nleaf_step");
    }

    #[test]
    fn test_expand_backgrounds_does_not_mutate_inputs() {
        let features = vec![FeatureDocument::new("/f1", "f1_step")];
        let _ = expand_backgrounds(&features);
        assert_eq!(features[0].text, "f1_step");
    }

    #[test]
    fn test_expand_features_include() {
        let features = vec![ExpandedFeature::from_document(&FeatureDocument::new(
            "/f",
            "Backgrounds: login\nset x to y",
        ))];
        let backgrounds = vec![FeatureDocument::new("/back/login", "\nopen login page\n")];
        let expanded = expand_features(features, &backgrounds).unwrap();
        assert_eq!(expanded[0].text(), "open login page\nset x to y");
        assert!(expanded[0].lines[0].background);
    }

    #[test]
    fn test_expand_features_multiple_names() {
        let features = vec![ExpandedFeature::from_document(&FeatureDocument::new(
            "/f",
            "Scenarios: a, b",
        ))];
        let backgrounds = vec![
            FeatureDocument::new("/s/a", "a_step"),
            FeatureDocument::new("/s/b", "b_step"),
        ];
        let expanded = expand_features(features, &backgrounds).unwrap();
        assert_eq!(expanded[0].text(), "a_step\n\nb_step");
    }

    #[test]
    fn test_expand_features_missing_is_error() {
        let features = vec![ExpandedFeature::from_document(&FeatureDocument::new(
            "/f",
            "Backgrounds: nope",
        ))];
        let err = expand_features(features, &[]).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_expand_features_ambiguous_is_error() {
        let features = vec![ExpandedFeature::from_document(&FeatureDocument::new(
            "/f",
            "Backgrounds: login",
        ))];
        let backgrounds = vec![
            FeatureDocument::new("/a/login", "x"),
            FeatureDocument::new("/b/login", "y"),
        ];
        assert!(expand_features(features, &backgrounds).is_err());
    }
}
