//! Sequential executor: runs resolved features in order, steps in order,
//! short-circuiting the remainder of a feature on the first failure.

use serde_json::json;

use crate::core::step_result::{ActionResult, ExecutionResult, FeatureResult, StepResult};
use crate::core::world::World;
use crate::logger::{Incident, IncidentKind};
use crate::resolver::FeatureStep;
use crate::steppers::action::StepContext;
use crate::steppers::StepperPool;

/// A feature whose every line resolved to an action.
#[derive(Debug)]
pub struct ResolvedFeature {
    pub path: String,
    pub steps: Vec<FeatureStep>,
}

pub struct Executor;

impl Executor {
    /// Run all features against one world. Every feature runs even when an
    /// earlier one failed; only steps within a failed feature are skipped.
    pub async fn execute(
        world: &mut World,
        pool: &StepperPool,
        features: &[ResolvedFeature],
    ) -> ExecutionResult {
        let mut results = Vec::with_capacity(features.len());
        for feature in features {
            results.push(Self::do_feature(feature, world, pool).await);
        }
        let ok = results.iter().all(|f| f.ok);
        ExecutionResult {
            ok,
            features: results,
            failure: None,
        }
    }

    async fn do_feature(
        feature: &ResolvedFeature,
        world: &mut World,
        pool: &StepperPool,
    ) -> FeatureResult {
        world.logger.info(&format!("feature {}", feature.path));
        if let Err(error) = world.start_feature() {
            return setup_failure(&feature.path, &error);
        }
        if let Err(error) = pool.start_feature(world).await {
            return setup_failure(&feature.path, &error);
        }

        let mut step_results = Vec::with_capacity(feature.steps.len());
        let mut ok = true;
        for (i, step) in feature.steps.iter().enumerate() {
            // The delay paces between steps; the first step starts at once.
            if i > 0 {
                if let Some(delay) = world.options.step_delay {
                    tokio::time::sleep(delay).await;
                }
            }
            let result = run_feature_step(step, world, pool).await;
            let failed = !result.ok;
            step_results.push(result);
            if failed {
                ok = false;
                pool.on_failure(step_results.last().expect("just pushed"), world)
                    .await;
                break;
            }
        }

        if let Err(error) = pool.end_feature(world).await {
            world.logger.error(&format!(
                "end feature {} failed: {error}",
                feature.path
            ));
            ok = false;
        }
        world.end_feature();
        FeatureResult {
            path: feature.path.clone(),
            ok,
            step_results,
        }
    }
}

/// Run one resolved step, converting action errors into a not-ok result.
/// Public so outcome and statement-argument actions can run sub-steps.
pub async fn run_feature_step(
    step: &FeatureStep,
    world: &mut World,
    pool: &StepperPool,
) -> StepResult {
    let logger = world.logger.clone();
    let action_result = match step.action.args.coerce_domains(world) {
        Err(error) => ActionResult::fail(&step.action.name, &error),
        Ok(()) => {
            let mut ctx = StepContext {
                world,
                pool,
                path: &step.path,
                in_line: &step.in_line,
                seq: &step.seq,
            };
            match step.action.exec.run(&step.action.args, &mut ctx).await {
                Ok(result) => result,
                Err(error) => ActionResult::fail(&step.action.name, &error),
            }
        }
    };
    if !action_result.ok {
        logger.incident(Incident {
            kind: IncidentKind::StepFailure,
            details: json!({
                "in": step.in_line,
                "seq": step.seq,
                "action": step.action.name,
                "error": action_result.error,
            }),
        });
    }
    StepResult {
        ok: action_result.ok,
        in_line: step.in_line.clone(),
        seq: step.seq.clone(),
        action_results: vec![action_result],
    }
}

fn setup_failure(path: &str, error: &dyn std::fmt::Display) -> FeatureResult {
    FeatureResult {
        path: path.to_string(),
        ok: false,
        step_results: vec![StepResult {
            ok: false,
            in_line: String::new(),
            seq: Vec::new(),
            action_results: vec![ActionResult::fail("start feature", error)],
        }],
    }
}
