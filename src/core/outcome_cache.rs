//! Outcome cache: the virtual tier of the resolution pool, plus the
//! memo of outcomes already satisfied in the current feature.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::error::StepError;
use crate::resolver::definition::{CompiledStep, StepDefinition};
use crate::steppers::action::StepAction;

/// A registered waypoint: the phrase pattern an `ensure` can target, and
/// the statements that establish it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRecipe {
    /// Phrase pattern, possibly with `{placeholder}` tokens.
    pub name: String,
    /// `;`-separated proof statements from the declaration line.
    pub proof: String,
    /// Multi-line body when the declaration used one; takes priority over
    /// `proof` when non-empty.
    pub block: String,
    pub source_path: String,
    /// Declared in a background, so the recipe survives feature boundaries.
    pub background: bool,
}

/// A satisfied outcome, keyed by the concrete statement text.
#[derive(Debug, Clone)]
pub struct OutcomeEntry {
    pub outcome_key: String,
    /// The serialized step result of the proof run that established it.
    pub proof_result: Value,
    /// The expanded proof statements that established it.
    pub proof_steps: Vec<String>,
    /// The recipe pattern the key matched.
    pub pattern: String,
    pub when: DateTime<Utc>,
}

/// Virtual step tier and satisfaction memo.
///
/// Recipes registered at resolve time become matchable definitions; the
/// `satisfied` map is cleared at every feature start, while background
/// recipes persist across features.
#[derive(Default)]
pub struct OutcomeCache {
    recipes: Vec<Arc<CompiledStep>>,
    recipe_meta: HashMap<String, OutcomeRecipe>,
    satisfied: HashMap<String, OutcomeEntry>,
}

impl OutcomeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a recipe as a virtual step. Re-declaring the identical
    /// recipe (shared background text, or the same declaration in a later
    /// feature) re-activates its matcher; a conflicting recipe under the
    /// same name is an error.
    pub fn register(
        &mut self,
        recipe: OutcomeRecipe,
        action: Arc<dyn StepAction>,
    ) -> Result<(), StepError> {
        if let Some(existing) = self.recipe_meta.get_mut(&recipe.name) {
            if existing.proof != recipe.proof || existing.block != recipe.block {
                return Err(StepError::DuplicateOutcome(recipe.name));
            }
            existing.background |= recipe.background;
            existing.source_path = recipe.source_path;
            if self.recipes.iter().any(|s| s.def.name == recipe.name) {
                return Ok(());
            }
        } else {
            self.recipe_meta.insert(recipe.name.clone(), recipe.clone());
        }
        let mut def = StepDefinition::gwta(&recipe.name, &recipe.name, action);
        def.is_virtual = true;
        let compiled = CompiledStep::compile(self.recipes.len(), "outcomes", def)?;
        self.recipes.push(Arc::new(compiled));
        Ok(())
    }

    /// The virtual tier, consulted after the static arena.
    pub fn virtual_steps(&self) -> std::slice::Iter<'_, Arc<CompiledStep>> {
        self.recipes.iter()
    }

    pub fn recipe(&self, name: &str) -> Option<&OutcomeRecipe> {
        self.recipe_meta.get(name)
    }

    pub fn is_satisfied(&self, key: &str) -> Option<&OutcomeEntry> {
        self.satisfied.get(key)
    }

    /// Record a satisfied outcome under its concrete statement text.
    pub fn satisfy(
        &mut self,
        key: &str,
        pattern: &str,
        proof_steps: Vec<String>,
        proof_result: Value,
    ) {
        self.satisfied.insert(
            key.to_string(),
            OutcomeEntry {
                outcome_key: key.to_string(),
                proof_result,
                proof_steps,
                pattern: pattern.to_string(),
                when: Utc::now(),
            },
        );
    }

    /// Drop a satisfied entry. Returns whether anything was cached.
    pub fn forget(&mut self, key: &str) -> bool {
        self.satisfied.remove(key).is_some()
    }

    /// Feature start clears the satisfaction memo.
    pub fn start_feature(&mut self) {
        self.satisfied.clear();
    }

    /// Feature end clears the memo; entries never outlive their feature.
    pub fn end_feature(&mut self) {
        self.satisfied.clear();
    }

    /// Called after a feature's lines have all been resolved: the feature's
    /// own non-background matchers stop matching in later features. Recipe
    /// metadata stays, since registered actions consult it at execution
    /// time.
    pub fn retire_feature_recipes(&mut self, path: &str) {
        let keep: Vec<bool> = self
            .recipes
            .iter()
            .map(|step| {
                self.recipe_meta
                    .get(&step.def.name)
                    .map(|r| r.background || r.source_path != path)
                    .unwrap_or(false)
            })
            .collect();
        let mut it = keep.iter();
        self.recipes.retain(|_| *it.next().expect("mask matches"));
    }

    /// Satisfied outcomes grouped by recipe pattern, for diagnostics. Each
    /// group carries the proof result of its earliest instance.
    pub fn show_outcomes(&self) -> Value {
        let mut entries: Vec<&OutcomeEntry> = self.satisfied.values().collect();
        entries.sort_by(|a, b| a.when.cmp(&b.when));

        let mut grouped: HashMap<&str, (&OutcomeEntry, Vec<Value>)> = HashMap::new();
        for entry in entries {
            grouped
                .entry(&entry.pattern)
                .or_insert_with(|| (entry, Vec::new()))
                .1
                .push(json!({
                    "outcome": entry.outcome_key,
                    "proof": entry.proof_steps,
                    "when": entry.when.to_rfc3339(),
                }));
        }
        let mut patterns: Vec<&str> = grouped.keys().copied().collect();
        patterns.sort_unstable();
        let mut out = serde_json::Map::new();
        for pattern in patterns {
            let (first, outcomes) = &grouped[pattern];
            out.insert(
                pattern.to_string(),
                json!({
                    "result": first.proof_result,
                    "outcomes": outcomes,
                }),
            );
        }
        Value::Object(out)
    }
}

impl std::fmt::Debug for OutcomeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutcomeCache")
            .field("recipes", &self.recipe_meta.len())
            .field("satisfied", &self.satisfied.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steppers::core_steps::CommentAction;

    fn recipe(name: &str, proof: &str, background: bool) -> OutcomeRecipe {
        OutcomeRecipe {
            name: name.to_string(),
            proof: proof.to_string(),
            block: String::new(),
            source_path: "/f".to_string(),
            background,
        }
    }

    fn action() -> Arc<dyn StepAction> {
        Arc::new(CommentAction)
    }

    #[test]
    fn test_register_and_match() {
        let mut cache = OutcomeCache::new();
        cache
            .register(recipe("logged in as {user}", "open login", false), action())
            .unwrap();
        assert_eq!(cache.virtual_steps().len(), 1);
        let step = cache.virtual_steps().next().unwrap();
        assert!(step.def.is_virtual);
        assert!(step.matcher.matches("Given I am logged in as eve").is_some());
    }

    #[test]
    fn test_register_idempotent_when_identical() {
        let mut cache = OutcomeCache::new();
        cache
            .register(recipe("ready", "prepare", false), action())
            .unwrap();
        cache
            .register(recipe("ready", "prepare", false), action())
            .unwrap();
        assert_eq!(cache.virtual_steps().len(), 1);
    }

    #[test]
    fn test_register_conflict_errors() {
        let mut cache = OutcomeCache::new();
        cache
            .register(recipe("ready", "prepare", false), action())
            .unwrap();
        let err = cache.register(recipe("ready", "prepare differently", false), action());
        assert!(matches!(err, Err(StepError::DuplicateOutcome(_))));
    }

    #[test]
    fn test_satisfy_forget() {
        let mut cache = OutcomeCache::new();
        cache.satisfy(
            "logged in as eve",
            "logged in as {user}",
            vec!["open login".into()],
            Value::Null,
        );
        assert!(cache.is_satisfied("logged in as eve").is_some());
        assert!(cache.forget("logged in as eve"));
        assert!(!cache.forget("logged in as eve"));
        assert!(cache.is_satisfied("logged in as eve").is_none());
    }

    #[test]
    fn test_retire_keeps_background_and_foreign_recipes() {
        let mut cache = OutcomeCache::new();
        cache
            .register(recipe("shared", "prepare", true), action())
            .unwrap();
        cache
            .register(recipe("local", "prepare", false), action())
            .unwrap();
        let mut other = recipe("elsewhere", "prepare", false);
        other.source_path = "/g".to_string();
        cache.register(other, action()).unwrap();

        cache.retire_feature_recipes("/f");
        let names: Vec<&str> = cache
            .virtual_steps()
            .map(|s| s.def.name.as_str())
            .collect();
        assert_eq!(names, vec!["shared", "elsewhere"]);
        // Metadata survives retirement for execution-time lookups.
        assert!(cache.recipe("local").is_some());
    }

    #[test]
    fn test_redeclaration_reactivates_retired_matcher() {
        let mut cache = OutcomeCache::new();
        cache
            .register(recipe("ready", "prepare", false), action())
            .unwrap();
        cache.retire_feature_recipes("/f");
        assert_eq!(cache.virtual_steps().len(), 0);

        let mut again = recipe("ready", "prepare", false);
        again.source_path = "/g".to_string();
        cache.register(again, action()).unwrap();
        assert_eq!(cache.virtual_steps().len(), 1);
        assert_eq!(cache.recipe("ready").unwrap().source_path, "/g");
    }

    #[test]
    fn test_feature_boundaries_clear_satisfied() {
        let mut cache = OutcomeCache::new();
        cache.satisfy("shared", "shared", vec![], Value::Null);
        cache.end_feature();
        assert!(cache.is_satisfied("shared").is_none());
    }

    #[test]
    fn test_show_outcomes_groups_by_pattern() {
        let mut cache = OutcomeCache::new();
        cache.satisfy(
            "logged in as eve",
            "logged in as {user}",
            vec!["a".into()],
            json!({ "in": "logged in as eve", "seq": [1] }),
        );
        cache.satisfy(
            "logged in as bob",
            "logged in as {user}",
            vec!["b".into()],
            json!({ "in": "logged in as bob", "seq": [2] }),
        );
        let shown = cache.show_outcomes();
        let group = &shown["logged in as {user}"];
        assert_eq!(group["outcomes"].as_array().unwrap().len(), 2);
        // The group reports where its first instance was proven.
        assert_eq!(group["result"]["in"], "logged in as eve");
        assert_eq!(group["result"]["seq"][0], 1);
    }
}
