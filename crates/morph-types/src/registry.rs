//! Type descriptor registry
//!
//! Provides [`TypeRegistry`], the read-only map from [`TypeId`] to
//! [`TypeDescriptor`] built once at startup.

use crate::descriptor::{TypeDescriptor, TypeId};
use crate::error::RegistryError;
use crate::instance::Instance;
use crate::value::FieldValues;
use indexmap::IndexMap;
use std::sync::Arc;

/// Registry of constructible types
///
/// Immutable after [`RegistryBuilder::build`]; share it behind an `Arc`
/// across independent chains.
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    types: IndexMap<TypeId, Arc<TypeDescriptor>>,
}

impl TypeRegistry {
    /// Start building a registry
    #[inline]
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Describe a type
    #[inline]
    #[must_use]
    pub fn describe(&self, id: &TypeId) -> Option<Arc<TypeDescriptor>> {
        self.types.get(id).cloned()
    }

    /// Check if a type is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &TypeId) -> bool {
        self.types.contains_key(id)
    }

    /// Number of registered types
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered identifiers in registration order
    pub fn type_ids(&self) -> impl Iterator<Item = &TypeId> {
        self.types.keys()
    }

    /// Construct an initial instance of a registered type
    ///
    /// # Errors
    /// - `RegistryError::UnknownType` if `id` is not registered
    /// - `RegistryError::Construction` if the constructor rejects `fields`
    pub fn instantiate(
        &self,
        id: &TypeId,
        fields: FieldValues,
    ) -> Result<Arc<Instance>, RegistryError> {
        let descriptor = self
            .describe(id)
            .ok_or_else(|| RegistryError::UnknownType(id.clone()))?;

        descriptor
            .construct(fields)
            .map(Arc::new)
            .map_err(|source| RegistryError::Construction {
                type_id: id.clone(),
                source,
            })
    }

    /// Successor targets that are not registered, as `(declaring, target)`
    ///
    /// Such targets fail at step time; this is a startup diagnostic.
    #[must_use]
    pub fn unresolved_successors(&self) -> Vec<(TypeId, TypeId)> {
        let mut unresolved = Vec::new();
        for descriptor in self.types.values() {
            for target in descriptor.successor().targets() {
                if !self.types.contains_key(target) {
                    unresolved.push((descriptor.id().clone(), target.clone()));
                }
            }
        }
        unresolved
    }
}

/// Builder for [`TypeRegistry`]
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    types: IndexMap<TypeId, Arc<TypeDescriptor>>,
}

impl RegistryBuilder {
    /// Register a descriptor
    ///
    /// # Errors
    /// `RegistryError::DuplicateType` if the identifier is taken
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Result<&mut Self, RegistryError> {
        let id = descriptor.id().clone();
        if self.types.contains_key(&id) {
            return Err(RegistryError::DuplicateType(id));
        }
        self.types.insert(id, Arc::new(descriptor));
        Ok(self)
    }

    /// Finish the registry
    #[must_use]
    pub fn build(self) -> TypeRegistry {
        TypeRegistry { types: self.types }
    }
}
