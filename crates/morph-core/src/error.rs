//! Error types for Metamorph Core
//!
//! Two layers:
//! - [`ResolutionError`]: a target's fields could not be assembled from the
//!   current instance and the provider
//! - [`MetamorphError`]: a step failed, either outright or because every
//!   candidate successor was rejected

use crate::provider::ProviderError;
use morph_types::{ConstructionError, TypeId, ValueType};
use morph_validation::Errors;
use serde::Serialize;
use std::fmt;

/// Field resolution failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolutionError {
    /// Field declares zero or both source markers
    #[error(
        "field '{field}' of {type_id}::{member} declares {declared} source markers, expected exactly one"
    )]
    AmbiguousOrMissingSource {
        /// Offending field
        field: String,
        /// Target type
        type_id: TypeId,
        /// Construction member
        member: String,
        /// Number of markers found
        declared: usize,
    },

    /// Carried field absent on the current instance and no default declared
    #[error("carried field '{field}' of {type_id} is absent from {from} and has no default")]
    MissingCarriedValue {
        /// Offending field
        field: String,
        /// Target type
        type_id: TypeId,
        /// Type of the current instance
        from: TypeId,
    },

    /// Provided scalar with neither binding key nor default
    #[error("provided {value_type} field '{field}' of {type_id} needs a binding key or a default")]
    UnkeyedScalarProvision {
        /// Offending field
        field: String,
        /// Target type
        type_id: TypeId,
        /// Declared scalar type
        value_type: ValueType,
    },

    /// Provider could not supply a value
    #[error("cannot provide field '{field}' of {type_id}: {source}")]
    ProviderResolutionFailure {
        /// Offending field
        field: String,
        /// Target type
        type_id: TypeId,
        /// Provider failure
        #[source]
        source: ProviderError,
    },
}

/// Transformation failures
#[derive(Debug, thiserror::Error)]
pub enum MetamorphError {
    /// Target fields could not be resolved
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Resolved values violate one or more validation policies
    #[error("validation of {type_id} failed: {errors}")]
    SemanticValidationFailure {
        /// Target type
        type_id: TypeId,
        /// Every violation found
        errors: Errors,
    },

    /// Target constructor rejected the resolved values
    #[error("construction of {type_id} rejected: {source}")]
    ConstructionInvariantViolation {
        /// Target type
        type_id: TypeId,
        /// Constructor failure
        #[source]
        source: ConstructionError,
    },

    /// Every candidate of a branching successor failed
    #[error("no candidate successor of {from} matched: {}", summarize(.unmatched))]
    NoCandidateMatched {
        /// Type of the current instance
        from: TypeId,
        /// One entry per attempted candidate, in declaration order
        unmatched: Vec<Unmatch>,
    },

    /// Successor names a type that is not registered
    #[error("successor type '{0}' is not registered")]
    UnknownType(TypeId),
}

impl MetamorphError {
    /// Failure category
    #[must_use]
    pub fn reason(&self) -> UnmatchReason {
        match self {
            Self::Resolution(ResolutionError::AmbiguousOrMissingSource { .. }) => {
                UnmatchReason::AmbiguousOrMissingSource
            }
            Self::Resolution(ResolutionError::MissingCarriedValue { .. }) => {
                UnmatchReason::MissingCarriedValue
            }
            Self::Resolution(
                ResolutionError::UnkeyedScalarProvision { .. }
                | ResolutionError::ProviderResolutionFailure { .. },
            ) => UnmatchReason::ProviderResolutionFailure,
            Self::SemanticValidationFailure { .. } => UnmatchReason::SemanticValidationFailure,
            Self::ConstructionInvariantViolation { .. } => {
                UnmatchReason::ConstructionInvariantViolation
            }
            Self::NoCandidateMatched { .. } => UnmatchReason::NoCandidateMatched,
            Self::UnknownType(_) => UnmatchReason::UnknownType,
        }
    }

    /// Candidates attempted before giving up, in order
    #[must_use]
    pub fn attempted(&self) -> Vec<&TypeId> {
        match self {
            Self::NoCandidateMatched { unmatched, .. } => {
                unmatched.iter().map(|u| &u.candidate).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Validation errors, if this is a validation failure
    #[must_use]
    pub fn validation_errors(&self) -> Option<&Errors> {
        match self {
            Self::SemanticValidationFailure { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

/// Category of a failed transformation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchReason {
    /// Malformed source markers
    AmbiguousOrMissingSource,
    /// Carried value absent
    MissingCarriedValue,
    /// Provider lookup failed or was impossible
    ProviderResolutionFailure,
    /// Validation policy rejected a value
    SemanticValidationFailure,
    /// Constructor rejected the values
    ConstructionInvariantViolation,
    /// Nested candidate exhaustion
    NoCandidateMatched,
    /// Target not registered
    UnknownType,
}

impl fmt::Display for UnmatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AmbiguousOrMissingSource => "ambiguous or missing source",
            Self::MissingCarriedValue => "missing carried value",
            Self::ProviderResolutionFailure => "provider resolution failure",
            Self::SemanticValidationFailure => "semantic validation failure",
            Self::ConstructionInvariantViolation => "construction invariant violation",
            Self::NoCandidateMatched => "no candidate matched",
            Self::UnknownType => "unknown type",
        };
        f.write_str(s)
    }
}

/// Why one candidate of a branching successor was rejected
#[derive(Debug)]
pub struct Unmatch {
    /// Candidate type
    pub candidate: TypeId,
    /// Failure category
    pub reason: UnmatchReason,
    /// Human-readable detail
    pub detail: String,
    /// Underlying failure
    pub error: Box<MetamorphError>,
}

impl Unmatch {
    /// Record a rejected candidate
    #[must_use]
    pub fn new(candidate: TypeId, error: MetamorphError) -> Self {
        Self {
            candidate,
            reason: error.reason(),
            detail: error.to_string(),
            error: Box::new(error),
        }
    }
}

impl fmt::Display for Unmatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.candidate, self.reason, self.detail)
    }
}

fn summarize(unmatched: &[Unmatch]) -> String {
    unmatched
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for transformations
pub type Result<T> = std::result::Result<T, MetamorphError>;
