//! Core stepper: structural statements (feature and scenario markers) and
//! the shared no-op comment action.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::core::step_result::ActionResult;
use crate::error::StepError;
use crate::logger::{Incident, IncidentKind};
use crate::resolver::definition::StepDefinition;
use crate::resolver::StepArgs;

use super::action::{StepAction, StepContext};
use super::Stepper;

/// No-op action for comments, blank lines and permissive-mode misses.
pub struct CommentAction;

#[async_trait]
impl StepAction for CommentAction {
    async fn run(
        &self,
        _args: &StepArgs,
        _ctx: &mut StepContext<'_>,
    ) -> Result<ActionResult, StepError> {
        Ok(ActionResult::ok("comment"))
    }
}

/// `Feature: {name}` is a logged marker, nothing more.
struct FeatureTitleAction;

#[async_trait]
impl StepAction for FeatureTitleAction {
    async fn run(
        &self,
        args: &StepArgs,
        ctx: &mut StepContext<'_>,
    ) -> Result<ActionResult, StepError> {
        let name = args.raw("name")?.to_string();
        ctx.world.logger.info(&format!("Feature: {name}"));
        Ok(ActionResult::ok_with("feature", json!({ "name": name })))
    }
}

/// `Scenario: {name}` closes any active scenario frame and opens a new one,
/// firing the start_scenario cycle.
struct ScenarioAction;

#[async_trait]
impl StepAction for ScenarioAction {
    async fn run(
        &self,
        args: &StepArgs,
        ctx: &mut StepContext<'_>,
    ) -> Result<ActionResult, StepError> {
        let name = args.raw("name")?.to_string();
        ctx.world.scope.end_scenario();
        ctx.world.scope.begin_scenario();
        ctx.pool.start_scenario(ctx.world, &name).await?;
        ctx.world.logger.incident(Incident {
            kind: IncidentKind::ScenarioStart,
            details: json!({ "name": name, "in": ctx.in_line }),
        });
        Ok(ActionResult::ok_with("scenario", json!({ "name": name })))
    }
}

/// `show steps`: lists the exposed step definitions of the static arena.
struct ShowStepsAction;

#[async_trait]
impl StepAction for ShowStepsAction {
    async fn run(
        &self,
        _args: &StepArgs,
        ctx: &mut StepContext<'_>,
    ) -> Result<ActionResult, StepError> {
        let listed: Vec<serde_json::Value> = ctx
            .pool
            .compiled()
            .iter()
            .filter(|step| step.def.expose)
            .map(|step| {
                json!({
                    "name": step.def.name,
                    "stepper": step.stepper,
                    "phrase": step.def.matcher.template(),
                })
            })
            .collect();
        ctx.world
            .logger
            .info(&format!("{} steps exposed", listed.len()));
        Ok(ActionResult::ok_with(
            "show steps",
            serde_json::Value::Array(listed),
        ))
    }
}

pub struct CoreStepper;

impl Stepper for CoreStepper {
    fn name(&self) -> &str {
        "core"
    }

    fn steps(&self) -> Vec<StepDefinition> {
        vec![
            StepDefinition::pattern(
                "feature",
                r"Feature:\s*(?<name>.+)",
                Arc::new(FeatureTitleAction),
            ),
            StepDefinition::pattern(
                "scenario",
                r"Scenario:\s*(?<name>.+)",
                Arc::new(ScenarioAction),
            ),
            StepDefinition::exact("show steps", "show steps", Arc::new(ShowStepsAction)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_definitions_match_markers() {
        let steps = CoreStepper.steps();
        let feature = crate::resolver::definition::CompiledStep::compile(
            0,
            "core",
            steps[0].clone(),
        )
        .unwrap();
        let caps = feature.matcher.matches("Feature: login flows").unwrap();
        assert_eq!(caps["name"], "login flows");
        assert!(feature.matcher.matches("set x to y").is_none());
    }
}
