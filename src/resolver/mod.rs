//! Statement resolution: pattern-matching feature lines to operations.

pub mod definition;
pub mod matcher;
pub mod resolve;

pub use definition::{CompiledStep, ResolveHook, StepDefinition};
pub use matcher::{CompiledMatcher, Placeholder, StepMatch, STATEMENT_DOMAIN};
pub use resolve::{
    dequote, resolve_feature, resolve_line, ArgValue, FeatureStep, ResolvedAction, StepArgs,
};
