//! Step definitions contributed by steppers, and their compiled form.

use std::collections::HashMap;
use std::sync::Arc;

use super::matcher::{CompiledMatcher, StepMatch};
use crate::core::world::World;
use crate::error::StepError;
use crate::steppers::action::StepAction;

/// Hook invoked while a statement is being resolved, before any step
/// executes. Used by definitions that contribute to the resolution pool
/// itself (outcome recipes, domain declarations).
pub trait ResolveHook: Send + Sync {
    fn on_resolve(
        &self,
        captures: &HashMap<String, String>,
        path: &str,
        background: bool,
        world: &mut World,
    ) -> Result<(), StepError>;
}

/// One operation exposed by a stepper.
#[derive(Clone)]
pub struct StepDefinition {
    /// Stable name, referenced by other definitions' `precludes` lists.
    pub name: String,
    pub matcher: StepMatch,
    /// Names of competing definitions this one suppresses when both match.
    pub precludes: Vec<String>,
    /// Only wins if no non-fallback definition matches.
    pub fallback: bool,
    /// Dynamically registered (outcome recipe), not statically declared.
    pub is_virtual: bool,
    /// Visible in diagnostics.
    pub expose: bool,
    pub action: Arc<dyn StepAction>,
    pub resolve_hook: Option<Arc<dyn ResolveHook>>,
}

impl StepDefinition {
    pub fn new(name: &str, matcher: StepMatch, action: Arc<dyn StepAction>) -> Self {
        StepDefinition {
            name: name.to_string(),
            matcher,
            precludes: Vec::new(),
            fallback: false,
            is_virtual: false,
            expose: false,
            action,
            resolve_hook: None,
        }
    }

    pub fn gwta(name: &str, phrase: &str, action: Arc<dyn StepAction>) -> Self {
        Self::new(name, StepMatch::Gwta(phrase.to_string()), action)
    }

    pub fn exact(name: &str, text: &str, action: Arc<dyn StepAction>) -> Self {
        Self::new(name, StepMatch::Exact(text.to_string()), action)
    }

    pub fn pattern(name: &str, pattern: &str, action: Arc<dyn StepAction>) -> Self {
        Self::new(name, StepMatch::Pattern(pattern.to_string()), action)
    }

    pub fn precludes(mut self, names: &[&str]) -> Self {
        self.precludes = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn fallback(mut self) -> Self {
        self.fallback = true;
        self
    }

    pub fn exposed(mut self) -> Self {
        self.expose = true;
        self
    }

    pub fn with_resolve_hook(mut self, hook: Arc<dyn ResolveHook>) -> Self {
        self.resolve_hook = Some(hook);
        self
    }
}

impl std::fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepDefinition")
            .field("name", &self.name)
            .field("matcher", &self.matcher)
            .field("precludes", &self.precludes)
            .field("fallback", &self.fallback)
            .field("is_virtual", &self.is_virtual)
            .finish()
    }
}

/// A definition with its matcher compiled, held in the static arena or the
/// virtual tier. `id` is a stable identifier within its tier.
#[derive(Debug, Clone)]
pub struct CompiledStep {
    pub id: usize,
    /// Name of the stepper that contributed the definition.
    pub stepper: String,
    pub def: StepDefinition,
    pub matcher: CompiledMatcher,
}

impl CompiledStep {
    pub fn compile(id: usize, stepper: &str, def: StepDefinition) -> Result<Self, StepError> {
        let matcher = CompiledMatcher::compile(&def.matcher)?;
        Ok(CompiledStep {
            id,
            stepper: stepper.to_string(),
            def,
            matcher,
        })
    }
}
