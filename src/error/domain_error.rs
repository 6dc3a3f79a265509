use thiserror::Error;

/// Domain-registry level errors.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Domain already registered: {0}")]
    Duplicate(String),
    #[error("Unknown domain: {0}")]
    Unknown(String),
    #[error("Cannot coerce '{raw}' into domain '{domain}': {detail}")]
    Coerce {
        domain: String,
        raw: String,
        detail: String,
    },
    #[error("Domain '{0}' does not support ordering")]
    Unordered(String),
    #[error("Superdomain '{0}' would be empty")]
    EmptyUnion(String),
    #[error("Bad domain pattern '{pattern}': {detail}")]
    BadPattern { pattern: String, detail: String },
}
