use super::DomainError;
use thiserror::Error;

/// Step-level errors: statement resolution, variables, outcomes, execution.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("No step definition matches: {0}")]
    NoMatch(String),
    #[error("Ambiguous statement '{line}': candidates {candidates:?}")]
    Ambiguous {
        line: String,
        candidates: Vec<String>,
    },
    #[error("Bad step pattern '{pattern}': {detail}")]
    BadPattern { pattern: String, detail: String },
    #[error("Variable not found: {0}")]
    VariableNotFound(String),
    #[error("Variable '{0}' is read-only")]
    ReadonlyVariable(String),
    #[error("Missing step argument: {0}")]
    MissingArgument(String),
    #[error("Outcome '{0}' is already registered with a different recipe")]
    DuplicateOutcome(String),
    #[error("Statement is not a declared outcome: {0}")]
    NotAnOutcome(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("Execution error: {0}")]
    Execution(String),
}
