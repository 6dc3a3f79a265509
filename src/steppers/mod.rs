//! Steppers: capability modules that contribute step definitions and
//! subscribe to lifecycle cycles.

pub mod action;
pub mod core_steps;
pub mod outcomes;
pub mod vars;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::core::step_result::StepResult;
use crate::core::world::World;
use crate::error::StepError;
use crate::logger::{Incident, IncidentKind};
use crate::resolver::definition::{CompiledStep, StepDefinition};

pub use action::{StepAction, StepContext};
pub use core_steps::CoreStepper;
pub use outcomes::OutcomesStepper;
pub use vars::VarsStepper;

/// A capability module. Contributes definitions at load time and may
/// override any of the lifecycle cycles, which default to no-ops.
#[async_trait]
pub trait Stepper: Send + Sync {
    fn name(&self) -> &str;
    fn steps(&self) -> Vec<StepDefinition>;

    async fn start_execution(&self, world: &mut World) -> Result<(), StepError> {
        let _ = world;
        Ok(())
    }
    async fn start_feature(&self, world: &mut World) -> Result<(), StepError> {
        let _ = world;
        Ok(())
    }
    async fn start_scenario(&self, world: &mut World, name: &str) -> Result<(), StepError> {
        let _ = (world, name);
        Ok(())
    }
    async fn end_feature(&self, world: &mut World) -> Result<(), StepError> {
        let _ = world;
        Ok(())
    }
    async fn end_execution(&self, world: &mut World) -> Result<(), StepError> {
        let _ = world;
        Ok(())
    }

    /// Notified when a step fails and its feature is being abandoned.
    async fn on_failure(&self, result: &StepResult, world: &mut World) {
        let _ = (result, world);
    }

    /// Teardown, called once per run regardless of outcome.
    async fn close(&self, world: &mut World) -> Result<(), StepError> {
        let _ = world;
        Ok(())
    }
}

/// The static arena: every definition of every stepper, compiled once at
/// load. The stepper list is fixed for the lifetime of the pool.
pub struct StepperPool {
    steppers: Vec<Arc<dyn Stepper>>,
    compiled: Vec<Arc<CompiledStep>>,
}

impl StepperPool {
    pub fn new(steppers: Vec<Arc<dyn Stepper>>) -> Result<Self, StepError> {
        let mut compiled = Vec::new();
        for stepper in &steppers {
            for def in stepper.steps() {
                let step = CompiledStep::compile(compiled.len(), stepper.name(), def)?;
                compiled.push(Arc::new(step));
            }
        }
        Ok(StepperPool { steppers, compiled })
    }

    /// The static tier of the resolution lookup, in registration order.
    pub fn compiled(&self) -> &[Arc<CompiledStep>] {
        &self.compiled
    }

    pub async fn start_execution(&self, world: &mut World) -> Result<(), StepError> {
        for stepper in &self.steppers {
            stepper.start_execution(world).await?;
        }
        Ok(())
    }

    pub async fn start_feature(&self, world: &mut World) -> Result<(), StepError> {
        for stepper in &self.steppers {
            stepper.start_feature(world).await?;
        }
        Ok(())
    }

    pub async fn start_scenario(&self, world: &mut World, name: &str) -> Result<(), StepError> {
        for stepper in &self.steppers {
            stepper.start_scenario(world, name).await?;
        }
        Ok(())
    }

    pub async fn end_feature(&self, world: &mut World) -> Result<(), StepError> {
        for stepper in &self.steppers {
            stepper.end_feature(world).await?;
        }
        Ok(())
    }

    pub async fn end_execution(&self, world: &mut World) -> Result<(), StepError> {
        for stepper in &self.steppers {
            stepper.end_execution(world).await?;
        }
        Ok(())
    }

    pub async fn on_failure(&self, result: &StepResult, world: &mut World) {
        for stepper in &self.steppers {
            stepper.on_failure(result, world).await;
        }
    }

    /// Close every stepper; failures are logged as teardown incidents and
    /// never re-raised.
    pub async fn close_all(&self, world: &mut World) {
        for stepper in &self.steppers {
            if let Err(error) = stepper.close(world).await {
                let logger = world.logger.clone();
                logger.incident(Incident {
                    kind: IncidentKind::Teardown,
                    details: json!({
                        "stepper": stepper.name(),
                        "error": error.to_string(),
                    }),
                });
            }
        }
    }
}

impl std::fmt::Debug for StepperPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepperPool")
            .field(
                "steppers",
                &self.steppers.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("compiled", &self.compiled.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steppers::core_steps::CommentAction;

    struct OneStepper;

    impl Stepper for OneStepper {
        fn name(&self) -> &str {
            "one"
        }
        fn steps(&self) -> Vec<StepDefinition> {
            vec![StepDefinition::exact("go", "go", Arc::new(CommentAction))]
        }
    }

    #[test]
    fn test_pool_compiles_definitions() {
        let pool = StepperPool::new(vec![Arc::new(OneStepper)]).unwrap();
        assert_eq!(pool.compiled().len(), 1);
        assert_eq!(pool.compiled()[0].stepper, "one");
        assert!(pool.compiled()[0].matcher.matches("go").is_some());
    }

    #[test]
    fn test_pool_rejects_bad_pattern() {
        struct BadStepper;
        impl Stepper for BadStepper {
            fn name(&self) -> &str {
                "bad"
            }
            fn steps(&self) -> Vec<StepDefinition> {
                vec![StepDefinition::pattern(
                    "broken",
                    "(((",
                    Arc::new(CommentAction),
                )]
            }
        }
        let err = StepperPool::new(vec![Arc::new(BadStepper)]);
        assert!(matches!(err, Err(StepError::BadPattern { .. })));
    }
}
