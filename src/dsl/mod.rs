pub mod expand;
pub mod feature;

pub use expand::{expand_backgrounds, expand_features};
pub use feature::{
    parse_include_directive, strip_comment, ExpandedFeature, FeatureDocument, FeatureLine,
};
