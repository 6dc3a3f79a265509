//! # stepflow — a behavior-driven test-orchestration interpreter
//!
//! `stepflow` runs plain-prose feature documents against registered step
//! definitions:
//!
//! - **Statement resolution**: exact, regex and GWTA phrase matchers with
//!   typed placeholders, precludes/fallback precedence and hard ambiguity
//!   errors. Every line of every feature resolves before anything executes.
//! - **Typed variables**: per-world domains (enumerated, schema and
//!   superdomain unions) with coercion, ordering and write provenance.
//! - **Memoized outcomes**: `waypoint` declarations register virtual steps;
//!   `ensure` satisfies them once per feature and serves repeats from the
//!   cache, with `forget` / `waypointed` / `show outcomes` around it.
//! - **Background expansion**: hierarchical path-based prepending plus
//!   explicit `Backgrounds:` / `Scenarios:` inclusion.
//! - **Sequential execution**: steps strictly in order within a feature,
//!   short-circuiting the feature at its first failure; every feature runs.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use stepflow::{FeatureDocument, FeatureRunner};
//!
//! #[tokio::main]
//! async fn main() {
//!     let features = vec![FeatureDocument::new(
//!         "/login",
//!         "Feature: login\nset user to eve\ndisplay user",
//!     )];
//!     let result = FeatureRunner::builder().run(&features, &[]).await;
//!     println!("{}", serde_json::to_string_pretty(&result).unwrap());
//! }
//! ```

pub mod api;
pub mod core;
pub mod domain;
pub mod dsl;
pub mod error;
pub mod logger;
pub mod resolver;
pub mod steppers;

pub use crate::api::{FeatureRunner, FeatureRunnerBuilder};
pub use crate::core::{
    ActionResult, ExecutionResult, FeatureResult, Origin, ResolveMode, SeedVariable, StepResult,
    Variable, VariableScope, World, WorldOptions,
};
pub use crate::domain::{DomainRegistry, TermValue, ValueSchema};
pub use crate::dsl::{FeatureDocument, ExpandedFeature};
pub use crate::error::{DomainError, RunError, RunStage, StepError};
pub use crate::logger::{CaptureLogger, Incident, IncidentKind, LogLevel, Logger, TracingLogger};
pub use crate::resolver::{StepArgs, StepDefinition, StepMatch};
pub use crate::steppers::{StepAction, StepContext, Stepper, StepperPool};
