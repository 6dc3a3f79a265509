//! The world: shared mutable state threaded through resolution and
//! execution of one run.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::core::outcome_cache::OutcomeCache;
use crate::core::scope::{Origin, StepCause, VariableScope};
use crate::domain::{DomainRegistry, TermValue, DOMAIN_STRING};
use crate::error::StepError;
use crate::logger::{Logger, TracingLogger};
use crate::resolver::dequote;

/// How unmatched lines are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    /// An unmatched line aborts the run before execution.
    #[default]
    Strict,
    /// Unmatched lines resolve to a no-op comment.
    Permissive,
}

/// Tunables fixed for the lifetime of one world.
#[derive(Debug, Clone, Default)]
pub struct WorldOptions {
    pub mode: ResolveMode,
    /// Pause inserted before each step, for paced runs.
    pub step_delay: Option<Duration>,
}

/// A read-only variable installed at the start of every feature.
#[derive(Debug, Clone)]
pub struct SeedVariable {
    pub term: String,
    pub value: TermValue,
    pub domain: String,
}

impl SeedVariable {
    pub fn string(term: &str, value: &str) -> Self {
        SeedVariable {
            term: term.to_string(),
            value: TermValue::String(value.to_string()),
            domain: DOMAIN_STRING.to_string(),
        }
    }
}

/// All run state: domains, variables, the outcome cache, options and the
/// logger. One world serves one run end to end.
pub struct World {
    /// Unique tag for this world, for log correlation.
    pub tag: String,
    pub domains: DomainRegistry,
    pub scope: VariableScope,
    pub outcomes: OutcomeCache,
    pub options: WorldOptions,
    pub logger: Arc<dyn Logger>,
    pub seeds: Vec<SeedVariable>,
}

impl World {
    pub fn new(options: WorldOptions) -> Self {
        World {
            tag: Uuid::new_v4().to_string(),
            domains: DomainRegistry::with_builtins(),
            scope: VariableScope::new(),
            outcomes: OutcomeCache::new(),
            options,
            logger: Arc::new(TracingLogger),
            seeds: Vec::new(),
        }
    }

    /// Reset per-feature state and install seed variables read-only.
    pub fn start_feature(&mut self) -> Result<(), StepError> {
        self.scope.clear();
        self.outcomes.start_feature();
        let cause = StepCause::seed();
        for seed in self.seeds.clone() {
            self.scope.set_readonly(
                &seed.term,
                seed.value,
                &seed.domain,
                Origin::Env,
                &cause,
            )?;
        }
        Ok(())
    }

    pub fn end_feature(&mut self) {
        self.outcomes.end_feature();
    }

    /// Disambiguate a raw capture at execution time: a known variable wins,
    /// anything else is a (dequoted) string literal.
    pub fn value_of(&self, raw: &str) -> (TermValue, Origin, String) {
        if let Some(var) = self.scope.get(raw.trim()) {
            return (var.value.clone(), Origin::Var, var.domain.clone());
        }
        (
            TermValue::String(dequote(raw).to_string()),
            Origin::Quoted,
            DOMAIN_STRING.to_string(),
        )
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("tag", &self.tag)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_of_prefers_variable() {
        let mut world = World::new(WorldOptions::default());
        world
            .scope
            .set(
                "x",
                TermValue::Integer(3),
                "number",
                Origin::Defined,
                &StepCause::seed(),
            )
            .unwrap();
        let (value, origin, domain) = world.value_of("x");
        assert_eq!(value, TermValue::Integer(3));
        assert_eq!(origin, Origin::Var);
        assert_eq!(domain, "number");
    }

    #[test]
    fn test_value_of_falls_back_to_literal() {
        let world = World::new(WorldOptions::default());
        let (value, origin, domain) = world.value_of("\"quoted text\"");
        assert_eq!(value, TermValue::String("quoted text".into()));
        assert_eq!(origin, Origin::Quoted);
        assert_eq!(domain, DOMAIN_STRING);
    }

    #[test]
    fn test_start_feature_installs_readonly_seeds() {
        let mut world = World::new(WorldOptions::default());
        world.seeds.push(SeedVariable::string("base", "http://localhost"));
        world.start_feature().unwrap();
        let var = world.scope.get("base").unwrap();
        assert!(var.readonly);
        assert_eq!(var.origin, Origin::Env);

        // Feature restart reinstalls cleanly.
        world.start_feature().unwrap();
        assert!(world.scope.get("base").is_some());
    }
}
