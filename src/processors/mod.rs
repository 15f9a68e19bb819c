//! Data processing modules.

pub mod comparison;
pub mod reduction;
pub mod repeatability;
pub mod resolver;

// Re-export key types for convenience
pub use comparison::{compare, ComparisonError, ComparisonResult, ToleranceBand, Verdict};
pub use reduction::{reduce, Channel, ReducedProfile, ReductionError};
pub use repeatability::{
    artifact_stem, AeroRepeatability, Probe, ProbePair, RepeatabilityError, RepeatabilityReport,
};
pub use resolver::{resolve_known, resolve_named, PromptError, Prompter, SchemaResolver};
