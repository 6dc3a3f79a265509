//! Variable scope: a per-execution store of typed variables with
//! append-only write provenance and scenario snapshot frames.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::domain::TermValue;
use crate::error::StepError;

/// Where a variable's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Var,
    Env,
    Defined,
    Quoted,
}

/// The statement that caused a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCause {
    pub in_line: String,
    pub seq: Vec<usize>,
}

impl StepCause {
    /// Cause for writes made outside any statement (seed variables).
    pub fn seed() -> Self {
        StepCause {
            in_line: "<seed>".to_string(),
            seq: Vec::new(),
        }
    }
}

/// One provenance record; the log per variable is append-only.
#[derive(Debug, Clone, Serialize)]
pub struct ProvenanceEntry {
    #[serde(rename = "in")]
    pub in_line: String,
    pub seq: Vec<usize>,
    pub when: DateTime<Utc>,
}

/// A typed variable with its full write history.
#[derive(Debug, Clone, Serialize)]
pub struct Variable {
    pub term: String,
    pub value: TermValue,
    pub domain: String,
    pub origin: Origin,
    pub readonly: bool,
    pub provenance: Vec<ProvenanceEntry>,
}

/// Whether `set_if_absent` wrote or kept the existing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Kept,
}

/// Key/value store of typed variables. Scenario boundaries push and pop
/// snapshot frames: writes inside a scenario do not propagate back to the
/// parent scope.
#[derive(Debug, Clone)]
pub struct VariableScope {
    frames: Vec<HashMap<String, Variable>>,
}

impl Default for VariableScope {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableScope {
    pub fn new() -> Self {
        VariableScope {
            frames: vec![HashMap::new()],
        }
    }

    fn current(&self) -> &HashMap<String, Variable> {
        self.frames.last().expect("scope always has a frame")
    }

    fn current_mut(&mut self) -> &mut HashMap<String, Variable> {
        self.frames.last_mut().expect("scope always has a frame")
    }

    /// Write a variable, overwriting any previous value and appending a
    /// provenance entry. Fails if the existing variable is read-only.
    pub fn set(
        &mut self,
        term: &str,
        value: TermValue,
        domain: &str,
        origin: Origin,
        cause: &StepCause,
    ) -> Result<(), StepError> {
        self.write(term, value, domain, origin, false, cause)
    }

    /// Write a read-only variable (seed/environment values).
    pub fn set_readonly(
        &mut self,
        term: &str,
        value: TermValue,
        domain: &str,
        origin: Origin,
        cause: &StepCause,
    ) -> Result<(), StepError> {
        self.write(term, value, domain, origin, true, cause)
    }

    fn write(
        &mut self,
        term: &str,
        value: TermValue,
        domain: &str,
        origin: Origin,
        readonly: bool,
        cause: &StepCause,
    ) -> Result<(), StepError> {
        let entry = ProvenanceEntry {
            in_line: cause.in_line.clone(),
            seq: cause.seq.clone(),
            when: Utc::now(),
        };
        match self.current_mut().get_mut(term) {
            Some(existing) => {
                if existing.readonly {
                    return Err(StepError::ReadonlyVariable(term.to_string()));
                }
                existing.value = value;
                existing.domain = domain.to_string();
                existing.origin = origin;
                existing.provenance.push(entry);
            }
            None => {
                self.current_mut().insert(
                    term.to_string(),
                    Variable {
                        term: term.to_string(),
                        value,
                        domain: domain.to_string(),
                        origin,
                        readonly,
                        provenance: vec![entry],
                    },
                );
            }
        }
        Ok(())
    }

    /// Write only when the term is currently unset; otherwise keep the
    /// existing value and report [`WriteOutcome::Kept`] without mutating.
    pub fn set_if_absent(
        &mut self,
        term: &str,
        value: TermValue,
        domain: &str,
        origin: Origin,
        cause: &StepCause,
    ) -> Result<WriteOutcome, StepError> {
        if self.current().contains_key(term) {
            return Ok(WriteOutcome::Kept);
        }
        self.set(term, value, domain, origin, cause)?;
        Ok(WriteOutcome::Written)
    }

    pub fn get(&self, term: &str) -> Option<&Variable> {
        self.current().get(term)
    }

    pub fn unset(&mut self, term: &str) {
        self.current_mut().remove(term);
    }

    /// All current variables, for diagnostics.
    pub fn all(&self) -> Vec<&Variable> {
        let mut vars: Vec<&Variable> = self.current().values().collect();
        vars.sort_by(|a, b| a.term.cmp(&b.term));
        vars
    }

    /// Reset to a single empty frame (feature start).
    pub fn clear(&mut self) {
        self.frames = vec![HashMap::new()];
    }

    /// Enter a scenario: push a frame seeded with a snapshot of current
    /// values.
    pub fn begin_scenario(&mut self) {
        let snapshot = self.current().clone();
        self.frames.push(snapshot);
    }

    /// Leave the current scenario, discarding its writes. A no-op when no
    /// scenario is active.
    pub fn end_scenario(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Repeatedly substitute every `{name}` occurrence with the named
    /// variable's display value; fails on the first unresolved placeholder.
    pub fn interpolate(&self, template: &str) -> Result<String, StepError> {
        static TOKEN: OnceLock<regex::Regex> = OnceLock::new();
        let token = TOKEN.get_or_init(|| {
            regex::Regex::new(r"\{([^{}]+)\}").expect("interpolation token pattern is valid")
        });

        let mut text = template.to_string();
        // Bounded so a self-referential value cannot loop forever.
        for _ in 0..64 {
            let Some(cap) = token.captures(&text) else {
                return Ok(text);
            };
            let name = cap[1].trim();
            let var = self
                .get(name)
                .ok_or_else(|| StepError::VariableNotFound(name.to_string()))?;
            let whole = cap.get(0).expect("capture 0 always present");
            text.replace_range(whole.range(), &var.value.to_display_string());
        }
        Err(StepError::Execution(format!(
            "interpolation did not settle: {template}"
        )))
    }
}
