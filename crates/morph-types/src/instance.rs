//! Immutable instances

use crate::descriptor::{SuccessorDeclaration, TypeDescriptor, TypeId};
use crate::value::{FieldValues, Value};
use std::fmt;
use std::sync::Arc;

/// Constructed value of a [`TypeDescriptor`]
///
/// Instances only come out of a successful construction and are never
/// mutated afterwards; each transformation step yields a new one.
#[derive(Clone)]
pub struct Instance {
    descriptor: Arc<TypeDescriptor>,
    fields: FieldValues,
}

impl Instance {
    pub(crate) fn new(descriptor: Arc<TypeDescriptor>, fields: FieldValues) -> Self {
        Self { descriptor, fields }
    }

    /// Identifier of the instance's type
    #[inline]
    #[must_use]
    pub fn type_id(&self) -> &TypeId {
        self.descriptor.id()
    }

    /// Descriptor of the instance's type
    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// Successor declared by the instance's type
    #[inline]
    #[must_use]
    pub fn successor(&self) -> &SuccessorDeclaration {
        self.descriptor.successor()
    }

    /// All field values
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &FieldValues {
        &self.fields
    }

    /// Look up a field value
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// JSON snapshot: `{"type": ..., "fields": {...}}`
    #[must_use]
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "type": self.type_id().as_str(),
            "fields": self.fields.to_json(),
        })
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", self.type_id())
            .field("fields", &self.fields)
            .finish()
    }
}
