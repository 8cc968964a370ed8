//! Successor declarations as seen by the driver

use morph_types::{Instance, SuccessorDeclaration};
use serde::Serialize;
use std::fmt;

/// Shape of a successor declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessorClass {
    /// No successor; the instance is final
    Terminal,
    /// Exactly one successor; failures propagate
    Single,
    /// Ordered candidates; first success wins
    Branching,
}

impl SuccessorClass {
    /// Classify a declaration
    ///
    /// An empty candidate list is terminal.
    #[must_use]
    pub fn of(declaration: &SuccessorDeclaration) -> Self {
        match declaration {
            SuccessorDeclaration::None => Self::Terminal,
            SuccessorDeclaration::Single(_) => Self::Single,
            SuccessorDeclaration::Candidates(targets) if targets.is_empty() => Self::Terminal,
            SuccessorDeclaration::Candidates(_) => Self::Branching,
        }
    }
}

impl fmt::Display for SuccessorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal => f.write_str("terminal"),
            Self::Single => f.write_str("single"),
            Self::Branching => f.write_str("branching"),
        }
    }
}

/// Successor declaration of an instance's type
#[inline]
#[must_use]
pub fn successor_of(instance: &Instance) -> &SuccessorDeclaration {
    instance.successor()
}

/// Classify an instance's successor declaration
#[inline]
#[must_use]
pub fn classify(instance: &Instance) -> SuccessorClass {
    SuccessorClass::of(successor_of(instance))
}
