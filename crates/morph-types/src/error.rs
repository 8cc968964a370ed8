//! Error types for type registration and construction

use crate::descriptor::TypeId;
use crate::value::{Value, ValueType};

/// Errors raised by a type's own constructor
///
/// A constructor is the final arbiter of field compatibility and business
/// invariants; any of these rejects the resolved field set.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConstructionError {
    /// Business rule rejected the resolved fields
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A field the constructor depends on is absent
    #[error("missing field '{0}'")]
    MissingField(String),

    /// A field has an incompatible runtime type
    #[error("field '{field}' expected {expected}, got {actual}")]
    FieldType {
        /// Offending field
        field: String,
        /// Expected type
        expected: ValueType,
        /// Runtime kind that was found
        actual: &'static str,
    },
}

impl ConstructionError {
    /// Create invariant violation
    #[inline]
    #[must_use]
    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation(reason.into())
    }

    /// Create field type mismatch for the given value
    #[inline]
    #[must_use]
    pub fn field_type(field: impl Into<String>, expected: ValueType, actual: &Value) -> Self {
        Self::FieldType {
            field: field.into(),
            expected,
            actual: actual.kind(),
        }
    }
}

/// Errors from the type descriptor registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Two descriptors share an identifier
    #[error("type '{0}' is already registered")]
    DuplicateType(TypeId),

    /// Identifier not registered
    #[error("unknown type '{0}'")]
    UnknownType(TypeId),

    /// Initial instance rejected by its constructor
    #[error("cannot instantiate '{type_id}': {source}")]
    Construction {
        /// Type being instantiated
        type_id: TypeId,
        /// Constructor failure
        #[source]
        source: ConstructionError,
    },
}
