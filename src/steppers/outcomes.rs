//! Outcomes stepper: waypoint declarations, memoized `ensure`, `forget`,
//! `waypointed` and the diagnostic outcome listing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::executor::run_feature_step;
use crate::core::outcome_cache::OutcomeRecipe;
use crate::core::step_result::ActionResult;
use crate::core::world::World;
use crate::error::StepError;
use crate::logger::{Incident, IncidentKind};
use crate::resolver::definition::{ResolveHook, StepDefinition};
use crate::resolver::{resolve_line, FeatureStep, StepArgs};

use super::action::{StepAction, StepContext};
use super::Stepper;

/// Registers the declared recipe as a virtual step while the declaration
/// line resolves, so later `ensure` lines in the same pass can match it.
struct WaypointHook;

impl ResolveHook for WaypointHook {
    fn on_resolve(
        &self,
        captures: &HashMap<String, String>,
        path: &str,
        background: bool,
        world: &mut World,
    ) -> Result<(), StepError> {
        let outcome = captures
            .get("outcome")
            .ok_or_else(|| StepError::MissingArgument("outcome".to_string()))?;
        let proof = captures
            .get("proof")
            .ok_or_else(|| StepError::MissingArgument("proof".to_string()))?;
        let recipe = OutcomeRecipe {
            name: outcome.clone(),
            proof: proof.clone(),
            block: String::new(),
            source_path: path.to_string(),
            background,
        };
        world.outcomes.register(
            recipe,
            Arc::new(OutcomeAction {
                name: outcome.clone(),
            }),
        )
    }
}

/// The declaration line itself does nothing at execution time.
struct WaypointAction;

#[async_trait]
impl StepAction for WaypointAction {
    async fn run(
        &self,
        args: &StepArgs,
        _ctx: &mut StepContext<'_>,
    ) -> Result<ActionResult, StepError> {
        let outcome = args.raw("outcome")?.to_string();
        Ok(ActionResult::ok_with(
            "waypoint",
            json!({ "outcome": outcome }),
        ))
    }
}

/// Action behind every registered virtual step: expands the recipe's
/// statements with the captured arguments, resolves them and runs them as a
/// nested sub-run. On success the expanded proof is the payload.
pub struct OutcomeAction {
    /// The recipe pattern this virtual step was compiled from.
    pub name: String,
}

#[async_trait]
impl StepAction for OutcomeAction {
    async fn run(
        &self,
        args: &StepArgs,
        ctx: &mut StepContext<'_>,
    ) -> Result<ActionResult, StepError> {
        let recipe = ctx
            .world
            .outcomes
            .recipe(&self.name)
            .ok_or_else(|| StepError::Execution(format!("unknown outcome recipe: {}", self.name)))?
            .clone();

        let statements: Vec<String> = if recipe.block.trim().is_empty() {
            recipe
                .proof
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            recipe
                .block
                .lines()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };

        let mut expanded = Vec::with_capacity(statements.len());
        for statement in statements {
            let mut text = statement;
            for (name, raw) in args.captures() {
                text = text.replace(&format!("{{{name}}}"), raw);
            }
            expanded.push(text);
        }

        for (j, statement) in expanded.iter().enumerate() {
            let mut sub_seq = ctx.seq.to_vec();
            sub_seq.push(j);
            let step = resolve_line(statement, ctx.path, sub_seq, false, ctx.pool, ctx.world)?;
            let result = run_feature_step(&step, ctx.world, ctx.pool).await;
            if !result.ok {
                return Ok(ActionResult::fail_with(
                    &self.name,
                    format!("proof step failed: {statement}"),
                    json!({ "proof": expanded, "failed": statement }),
                ));
            }
        }
        Ok(ActionResult::ok_with(
            &self.name,
            json!({ "proof": expanded }),
        ))
    }
}

fn require_virtual(step: &FeatureStep) -> Result<(), StepError> {
    if step.action.is_virtual {
        Ok(())
    } else {
        Err(StepError::NotAnOutcome(step.in_line.clone()))
    }
}

fn proof_of(result_detail: Option<&Value>) -> Vec<String> {
    result_detail
        .and_then(|d| d.get("proof"))
        .and_then(Value::as_array)
        .map(|steps| {
            steps
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// `ensure {outcome: STATEMENT}`: cache hit is an immediate success flagged
/// cached; a miss runs the proof and caches on success. A failing proof
/// surfaces without caching.
struct EnsureAction;

#[async_trait]
impl StepAction for EnsureAction {
    async fn run(
        &self,
        args: &StepArgs,
        ctx: &mut StepContext<'_>,
    ) -> Result<ActionResult, StepError> {
        let nested = args.statements("outcome")?.to_vec();
        let mut details = Vec::with_capacity(nested.len());
        for step in &nested {
            require_virtual(step)?;
            let key = step.in_line.clone();
            if ctx.world.outcomes.is_satisfied(&key).is_some() {
                ctx.world.logger.incident(Incident {
                    kind: IncidentKind::CachedOutcome,
                    details: json!({ "outcome": key }),
                });
                details.push(json!({ "outcome": key, "cached": true }));
                continue;
            }
            let result = run_feature_step(step, ctx.world, ctx.pool).await;
            let action_result = result
                .action_results
                .first()
                .ok_or_else(|| StepError::Execution("empty sub-run result".to_string()))?;
            if !result.ok {
                return Ok(ActionResult::fail_with(
                    "ensure",
                    action_result
                        .error
                        .clone()
                        .unwrap_or_else(|| "proof failed".to_string()),
                    json!({ "outcome": key }),
                ));
            }
            let proof = proof_of(action_result.detail.as_ref());
            let proof_result = serde_json::to_value(&result).unwrap_or(Value::Null);
            ctx.world
                .outcomes
                .satisfy(&key, &step.action.name, proof, proof_result);
            details.push(json!({ "outcome": key, "cached": false }));
        }
        Ok(ActionResult::ok_with("ensure", Value::Array(details)))
    }
}

/// `forget {outcome: STATEMENT}`: drops the exact cache entry; a miss is a
/// logged no-op.
struct ForgetAction;

#[async_trait]
impl StepAction for ForgetAction {
    async fn run(
        &self,
        args: &StepArgs,
        ctx: &mut StepContext<'_>,
    ) -> Result<ActionResult, StepError> {
        let nested = args.statements("outcome")?.to_vec();
        let mut details = Vec::with_capacity(nested.len());
        for step in &nested {
            require_virtual(step)?;
            let key = step.in_line.clone();
            let removed = ctx.world.outcomes.forget(&key);
            if !removed {
                ctx.world.logger.incident(Incident {
                    kind: IncidentKind::ForgetMiss,
                    details: json!({ "outcome": key }),
                });
            }
            details.push(json!({ "outcome": key, "removed": removed }));
        }
        Ok(ActionResult::ok_with("forget", Value::Array(details)))
    }
}

/// `waypointed {outcome: STATEMENT}`: pure cache query, ok iff satisfied.
struct WaypointedAction;

#[async_trait]
impl StepAction for WaypointedAction {
    async fn run(
        &self,
        args: &StepArgs,
        ctx: &mut StepContext<'_>,
    ) -> Result<ActionResult, StepError> {
        let nested = args.statements("outcome")?;
        for step in nested {
            require_virtual(step)?;
            if ctx.world.outcomes.is_satisfied(&step.in_line).is_none() {
                return Ok(ActionResult::fail(
                    "waypointed",
                    format!("outcome not satisfied: {}", step.in_line),
                ));
            }
        }
        Ok(ActionResult::ok("waypointed"))
    }
}

/// `show outcomes`: the satisfied map grouped by recipe pattern.
struct ShowOutcomesAction;

#[async_trait]
impl StepAction for ShowOutcomesAction {
    async fn run(
        &self,
        _args: &StepArgs,
        ctx: &mut StepContext<'_>,
    ) -> Result<ActionResult, StepError> {
        let shown = ctx.world.outcomes.show_outcomes();
        ctx.world.logger.info(&format!("outcomes: {shown}"));
        Ok(ActionResult::ok_with("show outcomes", shown))
    }
}

pub struct OutcomesStepper;

impl Stepper for OutcomesStepper {
    fn name(&self) -> &str {
        "outcomes"
    }

    fn steps(&self) -> Vec<StepDefinition> {
        vec![
            StepDefinition::gwta(
                "waypoint",
                "waypoint {outcome} by {proof}",
                Arc::new(WaypointAction),
            )
            .with_resolve_hook(Arc::new(WaypointHook))
            .exposed(),
            StepDefinition::gwta(
                "ensure",
                "ensure {outcome: STATEMENT}",
                Arc::new(EnsureAction),
            )
            .exposed(),
            StepDefinition::gwta(
                "forget",
                "forget {outcome: STATEMENT}",
                Arc::new(ForgetAction),
            )
            .exposed(),
            StepDefinition::gwta(
                "waypointed",
                "waypointed {outcome: STATEMENT}",
                Arc::new(WaypointedAction),
            )
            .exposed(),
            StepDefinition::exact("show outcomes", "show outcomes", Arc::new(ShowOutcomesAction)),
        ]
    }
}
