//! High-level feature runner and builder.
//!
//! [`FeatureRunner`] (constructed via [`FeatureRunnerBuilder`]) is the main
//! entry point: it wires the stepper pool, world and executor together and
//! drives the staged pipeline Options → Expand → Resolve → Execute.

use std::sync::Arc;
use std::time::Duration;

use crate::core::executor::{Executor, ResolvedFeature};
use crate::core::step_result::ExecutionResult;
use crate::core::world::{ResolveMode, SeedVariable, World, WorldOptions};
use crate::dsl::{expand_backgrounds, expand_features, FeatureDocument};
use crate::error::RunError;
use crate::logger::Logger;
use crate::resolver::resolve_feature;
use crate::steppers::{CoreStepper, OutcomesStepper, Stepper, StepperPool, VarsStepper};

/// Builder for configuring and launching a [`FeatureRunner`].
pub struct FeatureRunnerBuilder {
    steppers: Vec<Arc<dyn Stepper>>,
    options: WorldOptions,
    seeds: Vec<SeedVariable>,
    logger: Option<Arc<dyn Logger>>,
}

impl FeatureRunnerBuilder {
    /// Register an additional capability module after the built-ins.
    pub fn add_stepper(mut self, stepper: Arc<dyn Stepper>) -> Self {
        self.steppers.push(stepper);
        self
    }

    pub fn mode(mut self, mode: ResolveMode) -> Self {
        self.options.mode = mode;
        self
    }

    /// Shorthand for [`ResolveMode::Permissive`].
    pub fn permissive(self) -> Self {
        self.mode(ResolveMode::Permissive)
    }

    /// Fixed pause inserted before each step.
    pub fn step_delay(mut self, delay: Duration) -> Self {
        self.options.step_delay = Some(delay);
        self
    }

    /// Read-only variable installed at the start of every feature.
    pub fn seed(mut self, seed: SeedVariable) -> Self {
        self.seeds.push(seed);
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> Result<FeatureRunner, RunError> {
        let pool =
            StepperPool::new(self.steppers).map_err(|e| RunError::Options(e.to_string()))?;
        let mut world = World::new(self.options);
        world.seeds = self.seeds;
        if let Some(logger) = self.logger {
            world.logger = logger;
        }
        Ok(FeatureRunner { world, pool })
    }

    /// Build and run in one call; a build failure becomes an Options-stage
    /// run failure.
    pub async fn run(
        self,
        features: &[FeatureDocument],
        backgrounds: &[FeatureDocument],
    ) -> ExecutionResult {
        match self.build() {
            Ok(mut runner) => runner.run(features, backgrounds).await,
            Err(error) => ExecutionResult::failed(error),
        }
    }
}

/// Feature runner: one world, one stepper pool, one run at a time.
pub struct FeatureRunner {
    world: World,
    pool: StepperPool,
}

impl FeatureRunner {
    /// A builder pre-loaded with the built-in steppers.
    pub fn builder() -> FeatureRunnerBuilder {
        FeatureRunnerBuilder {
            steppers: vec![
                Arc::new(CoreStepper),
                Arc::new(VarsStepper),
                Arc::new(OutcomesStepper),
            ],
            options: WorldOptions::default(),
            seeds: Vec::new(),
            logger: None,
        }
    }

    /// Expand, resolve and execute the given feature documents. Any stage
    /// failure aborts the run with a stage-tagged failure and no feature
    /// results; execution-phase step failures are ordinary not-ok results.
    pub async fn run(
        &mut self,
        features: &[FeatureDocument],
        backgrounds: &[FeatureDocument],
    ) -> ExecutionResult {
        let expanded = expand_backgrounds(features);
        let expanded = match expand_features(expanded, backgrounds) {
            Ok(expanded) => expanded,
            Err(error) => return ExecutionResult::failed(error),
        };

        let mut resolved = Vec::with_capacity(expanded.len());
        for feature in &expanded {
            match resolve_feature(feature, &self.pool, &mut self.world) {
                Ok(steps) => {
                    self.world.outcomes.retire_feature_recipes(&feature.path);
                    resolved.push(ResolvedFeature {
                        path: feature.path.clone(),
                        steps,
                    });
                }
                Err(source) => {
                    return ExecutionResult::failed(RunError::Resolve {
                        path: feature.path.clone(),
                        source,
                    })
                }
            }
        }

        if let Err(error) = self.pool.start_execution(&mut self.world).await {
            self.pool.close_all(&mut self.world).await;
            return ExecutionResult::failed(RunError::Execute(error.to_string()));
        }

        let result = Executor::execute(&mut self.world, &self.pool, &resolved).await;

        if let Err(error) = self.pool.end_execution(&mut self.world).await {
            self.world
                .logger
                .error(&format!("end execution failed: {error}"));
        }
        self.pool.close_all(&mut self.world).await;
        result
    }

    /// The world, for inspection after a run.
    pub fn world(&self) -> &World {
        &self.world
    }
}
