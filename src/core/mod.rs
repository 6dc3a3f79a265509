pub mod executor;
pub mod outcome_cache;
pub mod scope;
pub mod step_result;
pub mod world;

pub use executor::{run_feature_step, Executor, ResolvedFeature};
pub use outcome_cache::{OutcomeCache, OutcomeEntry, OutcomeRecipe};
pub use scope::{Origin, ProvenanceEntry, StepCause, Variable, VariableScope, WriteOutcome};
pub use step_result::{ActionResult, ExecutionResult, FeatureResult, RunFailure, StepResult};
pub use world::{ResolveMode, SeedVariable, World, WorldOptions};
