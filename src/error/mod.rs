//! Error types for the interpreter.
//!
//! - [`DomainError`] — Errors raised by the domain registry (registration, coercion, ordering).
//! - [`StepError`] — Errors raised during statement resolution and step execution.
//! - [`RunError`] — Top-level, stage-tagged errors that abort a run.

pub mod domain_error;
pub mod run_error;
pub mod step_error;

pub use domain_error::DomainError;
pub use run_error::{RunError, RunStage};
pub use step_error::StepError;
