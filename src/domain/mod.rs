//! Domain layer — typed value domains and their registry.
//!
//! Submodules:
//! - [`value`] — [`TermValue`], the typed value attached to variables.
//! - [`registry`] — [`DomainRegistry`] with enumerated, schema and composed domains.

pub mod registry;
pub mod value;

pub use registry::{
    normalize_key, Domain, DomainKind, DomainRegistry, ValueSchema, DOMAIN_DATE, DOMAIN_NUMBER,
    DOMAIN_STRING,
};
pub use value::TermValue;
