//! Statement resolution: matching feature lines to step definitions.
//!
//! Candidates come from a two-tier lookup — the stepper pool's static arena
//! first, then the outcome cache's virtual tier — in fixed order. Precedence
//! then applies `precludes` filtering and fallback demotion. Exactly one
//! candidate must survive in strict mode; zero candidates degrade to a no-op
//! comment action only in permissive mode.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::core::world::{ResolveMode, World};
use crate::dsl::feature::{strip_comment, ExpandedFeature};
use crate::error::StepError;
use crate::steppers::action::StepAction;
use crate::steppers::core_steps::CommentAction;
use crate::steppers::StepperPool;

use super::definition::CompiledStep;

/// One extracted step argument.
#[derive(Debug, Clone)]
pub enum ArgValue {
    /// Raw capture, optionally annotated with a domain key. Variable-vs-
    /// literal disambiguation and coercion happen at execution time.
    Capture { raw: String, domain: Option<String> },
    /// Nested statements resolved from a `STATEMENT` placeholder.
    Statements(Vec<FeatureStep>),
}

/// Named arguments extracted from a matched statement.
#[derive(Debug, Clone, Default)]
pub struct StepArgs {
    named: HashMap<String, ArgValue>,
}

impl StepArgs {
    pub fn insert(&mut self, name: String, value: ArgValue) {
        self.named.insert(name, value);
    }

    /// Raw capture text of a named argument.
    pub fn raw(&self, name: &str) -> Result<&str, StepError> {
        match self.named.get(name) {
            Some(ArgValue::Capture { raw, .. }) => Ok(raw),
            _ => Err(StepError::MissingArgument(name.to_string())),
        }
    }

    /// Domain annotation of a named argument, if any.
    pub fn domain_of(&self, name: &str) -> Option<&str> {
        match self.named.get(name) {
            Some(ArgValue::Capture { domain, .. }) => domain.as_deref(),
            _ => None,
        }
    }

    /// Run the declared coercion of every domain-annotated capture. A known
    /// variable coerces its current value's display form; anything else
    /// coerces the (dequoted) literal. Runs at execution time so failures
    /// surface as not-ok results, not resolve aborts.
    pub fn coerce_domains(&self, world: &World) -> Result<(), StepError> {
        for arg in self.named.values() {
            let ArgValue::Capture {
                raw,
                domain: Some(domain),
            } = arg
            else {
                continue;
            };
            let (current, _, _) = world.value_of(raw);
            world
                .domains
                .coerce(domain, &current.to_display_string())?;
        }
        Ok(())
    }

    /// Nested statements of a `STATEMENT` argument.
    pub fn statements(&self, name: &str) -> Result<&[FeatureStep], StepError> {
        match self.named.get(name) {
            Some(ArgValue::Statements(steps)) => Ok(steps),
            _ => Err(StepError::MissingArgument(name.to_string())),
        }
    }

    /// All plain captures, for `{placeholder}` expansion in recipes.
    pub fn captures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.named.iter().filter_map(|(name, value)| match value {
            ArgValue::Capture { raw, .. } => Some((name.as_str(), raw.as_str())),
            ArgValue::Statements(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty()
    }
}

/// The single executable action a line resolved to.
#[derive(Clone)]
pub struct ResolvedAction {
    pub name: String,
    pub stepper: String,
    pub is_virtual: bool,
    pub args: StepArgs,
    pub exec: Arc<dyn StepAction>,
}

impl ResolvedAction {
    fn comment() -> Self {
        ResolvedAction {
            name: "comment".to_string(),
            stepper: "core".to_string(),
            is_virtual: false,
            args: StepArgs::default(),
            exec: Arc::new(CommentAction),
        }
    }
}

impl std::fmt::Debug for ResolvedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedAction")
            .field("name", &self.name)
            .field("stepper", &self.stepper)
            .field("is_virtual", &self.is_virtual)
            .finish()
    }
}

/// One resolved, executable statement. `seq` encodes nesting: each level of
/// sub-resolution appends one index.
#[derive(Debug, Clone)]
pub struct FeatureStep {
    pub path: String,
    pub in_line: String,
    pub seq: Vec<usize>,
    pub action: ResolvedAction,
}

/// Strip surrounding single or double quotes from a capture.
pub fn dequote(raw: &str) -> &str {
    let trimmed = raw.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return &trimmed[1..trimmed.len() - 1];
        }
    }
    trimmed
}

/// Resolve one line to exactly one action.
///
/// Deterministic and side-effect-free for ordinary lines; definitions with a
/// resolve hook (waypoint and domain declarations) register into the world
/// during this call so later lines of the same pass can resolve against them.
pub fn resolve_line(
    line: &str,
    path: &str,
    seq: Vec<usize>,
    background: bool,
    pool: &StepperPool,
    world: &mut World,
) -> Result<FeatureStep, StepError> {
    let stripped = strip_comment(line).to_string();
    if stripped.is_empty() {
        return Ok(FeatureStep {
            path: path.to_string(),
            in_line: stripped,
            seq,
            action: ResolvedAction::comment(),
        });
    }

    let mut candidates: Vec<(Arc<CompiledStep>, HashMap<String, String>)> = Vec::new();
    for step in pool.compiled().iter().chain(world.outcomes.virtual_steps()) {
        if let Some(captures) = step.matcher.matches(&stripped) {
            candidates.push((Arc::clone(step), captures));
        }
    }

    let survivors = apply_precedence(candidates);
    let (step, captures) = match survivors.len() {
        1 => survivors.into_iter().next().expect("one survivor"),
        0 => {
            return match world.options.mode {
                ResolveMode::Strict => Err(StepError::NoMatch(stripped)),
                ResolveMode::Permissive => Ok(FeatureStep {
                    path: path.to_string(),
                    in_line: stripped,
                    seq,
                    action: ResolvedAction::comment(),
                }),
            }
        }
        _ => {
            return Err(StepError::Ambiguous {
                line: stripped,
                candidates: survivors
                    .iter()
                    .map(|(s, _)| s.def.name.clone())
                    .collect(),
            })
        }
    };

    if let Some(hook) = &step.def.resolve_hook {
        hook.on_resolve(&captures, path, background, world)?;
    }

    let args = extract_args(&step, &captures, path, &seq, background, pool, world)?;
    Ok(FeatureStep {
        path: path.to_string(),
        in_line: stripped,
        seq,
        action: ResolvedAction {
            name: step.def.name.clone(),
            stepper: step.stepper.clone(),
            is_virtual: step.def.is_virtual,
            args,
            exec: Arc::clone(&step.def.action),
        },
    })
}

/// Resolve every line of an expanded feature, in order.
pub fn resolve_feature(
    feature: &ExpandedFeature,
    pool: &StepperPool,
    world: &mut World,
) -> Result<Vec<FeatureStep>, StepError> {
    feature
        .lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            resolve_line(&line.text, &feature.path, vec![i], line.background, pool, world)
        })
        .collect()
}

/// Apply precedence rules: precludes filtering first, then fallback demotion.
fn apply_precedence(
    candidates: Vec<(Arc<CompiledStep>, HashMap<String, String>)>,
) -> Vec<(Arc<CompiledStep>, HashMap<String, String>)> {
    let precluded: HashSet<String> = candidates
        .iter()
        .flat_map(|(step, _)| step.def.precludes.iter().cloned())
        .collect();
    let mut survivors: Vec<_> = candidates
        .into_iter()
        .filter(|(step, _)| !precluded.contains(&step.def.name))
        .collect();
    if survivors.len() > 1 && survivors.iter().any(|(step, _)| !step.def.fallback) {
        survivors.retain(|(step, _)| !step.def.fallback);
    }
    survivors
}

/// Extract typed arguments from the captures of the winning definition.
/// `STATEMENT` placeholders recursively resolve their `;`-separated sub-text
/// with one extra sequence level.
fn extract_args(
    step: &CompiledStep,
    captures: &HashMap<String, String>,
    path: &str,
    seq: &[usize],
    background: bool,
    pool: &StepperPool,
    world: &mut World,
) -> Result<StepArgs, StepError> {
    let mut args = StepArgs::default();
    for placeholder in step.matcher.placeholders() {
        let Some(raw) = captures.get(&placeholder.name) else {
            continue;
        };
        if placeholder.is_statement() {
            let mut nested = Vec::new();
            for (j, statement) in raw
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .enumerate()
            {
                let mut sub_seq = seq.to_vec();
                sub_seq.push(j);
                nested.push(resolve_line(
                    statement, path, sub_seq, background, pool, world,
                )?);
            }
            args.insert(placeholder.name.clone(), ArgValue::Statements(nested));
        } else {
            args.insert(
                placeholder.name.clone(),
                ArgValue::Capture {
                    raw: raw.clone(),
                    domain: placeholder.domain.clone(),
                },
            );
        }
    }
    Ok(args)
}
