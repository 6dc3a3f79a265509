//! The result tree produced by a run, serializable for external reporters.

use serde::Serialize;
use serde_json::Value;

use crate::error::{RunError, RunStage};

/// Result of one operation invocation within a step.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub ok: bool,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok(name: &str) -> Self {
        ActionResult {
            ok: true,
            name: name.to_string(),
            detail: None,
            error: None,
        }
    }

    pub fn ok_with(name: &str, detail: Value) -> Self {
        ActionResult {
            ok: true,
            name: name.to_string(),
            detail: Some(detail),
            error: None,
        }
    }

    pub fn fail(name: &str, error: impl std::fmt::Display) -> Self {
        ActionResult {
            ok: false,
            name: name.to_string(),
            detail: None,
            error: Some(error.to_string()),
        }
    }

    pub fn fail_with(name: &str, error: impl std::fmt::Display, detail: Value) -> Self {
        ActionResult {
            ok: false,
            name: name.to_string(),
            detail: Some(detail),
            error: Some(error.to_string()),
        }
    }
}

/// Result of one executed statement.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub ok: bool,
    #[serde(rename = "in")]
    pub in_line: String,
    pub seq: Vec<usize>,
    pub action_results: Vec<ActionResult>,
}

/// Result of one feature.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureResult {
    pub path: String,
    pub ok: bool,
    pub step_results: Vec<StepResult>,
}

/// A stage-tagged run abort.
#[derive(Debug, Clone, Serialize)]
pub struct RunFailure {
    pub stage: RunStage,
    pub error: String,
}

/// Result of a whole run within one world.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub ok: bool,
    pub features: Vec<FeatureResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<RunFailure>,
}

impl ExecutionResult {
    /// A run aborted before execution by a stage error.
    pub fn failed(error: RunError) -> Self {
        ExecutionResult {
            ok: false,
            features: Vec::new(),
            failure: Some(RunFailure {
                stage: error.stage(),
                error: error.to_string(),
            }),
        }
    }
}
