//! Dependency provider contract
//!
//! Provided fields are resolved through a [`DependencyProvider`] keyed by
//! `(value type, optional name)`. The engine treats it as an opaque
//! synchronous function; [`BindingTable`] is a small in-process
//! implementation with instance, per-call factory and lazy singleton bindings.

use dashmap::DashMap;
use morph_types::{Value, ValueType};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Provider lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingKey {
    /// Declared value type
    pub value_type: ValueType,
    /// Optional disambiguating name
    pub name: Option<String>,
}

impl BindingKey {
    /// Create key
    #[inline]
    #[must_use]
    pub fn new(value_type: ValueType, name: Option<&str>) -> Self {
        Self {
            value_type,
            name: name.map(str::to_string),
        }
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}#{}", self.value_type, name),
            None => write!(f, "{}", self.value_type),
        }
    }
}

/// Provider failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// Nothing bound for the key
    #[error("no binding for {0}")]
    NotBound(BindingKey),

    /// Binding exists but producing the value failed
    #[error("factory for {key} failed: {reason}")]
    Factory {
        /// Key being resolved
        key: BindingKey,
        /// Failure cause
        reason: String,
    },
}

impl ProviderError {
    /// Check for a missing binding
    #[inline]
    #[must_use]
    pub fn is_not_bound(&self) -> bool {
        matches!(self, Self::NotBound(_))
    }
}

/// External source of provided field values
pub trait DependencyProvider: Send + Sync {
    /// Resolve a value by declared type and optional binding name
    ///
    /// # Errors
    /// `ProviderError::NotBound` when nothing matches the key, or any
    /// failure while producing the value
    fn resolve(&self, value_type: &ValueType, key: Option<&str>) -> Result<Value, ProviderError>;
}

/// Value-producing factory
pub type FactoryFn = Arc<dyn Fn() -> Result<Value, String> + Send + Sync>;

enum Binding {
    Instance(Value),
    Factory(FactoryFn),
    Singleton {
        factory: FactoryFn,
        cell: OnceCell<Value>,
    },
}

/// In-process provider keyed by `(type, name)`
///
/// Safe for concurrent use; singleton factories run at most once.
#[derive(Default)]
pub struct BindingTable {
    bindings: DashMap<BindingKey, Arc<Binding>>,
}

impl BindingTable {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a fixed value
    pub fn bind_instance(
        &self,
        value_type: ValueType,
        name: Option<&str>,
        value: impl Into<Value>,
    ) -> &Self {
        self.insert(value_type, name, Binding::Instance(value.into()))
    }

    /// Bind a factory invoked on every lookup
    pub fn bind_factory<F>(&self, value_type: ValueType, name: Option<&str>, factory: F) -> &Self
    where
        F: Fn() -> Result<Value, String> + Send + Sync + 'static,
    {
        self.insert(value_type, name, Binding::Factory(Arc::new(factory)))
    }

    /// Bind a factory invoked once, on first lookup
    pub fn bind_singleton<F>(&self, value_type: ValueType, name: Option<&str>, factory: F) -> &Self
    where
        F: Fn() -> Result<Value, String> + Send + Sync + 'static,
    {
        self.insert(
            value_type,
            name,
            Binding::Singleton {
                factory: Arc::new(factory),
                cell: OnceCell::new(),
            },
        )
    }

    /// Check whether a key is bound
    #[inline]
    #[must_use]
    pub fn contains(&self, value_type: &ValueType, name: Option<&str>) -> bool {
        self.bindings
            .contains_key(&BindingKey::new(value_type.clone(), name))
    }

    /// Number of bindings
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if table is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn insert(&self, value_type: ValueType, name: Option<&str>, binding: Binding) -> &Self {
        self.bindings
            .insert(BindingKey::new(value_type, name), Arc::new(binding));
        self
    }
}

impl DependencyProvider for BindingTable {
    fn resolve(&self, value_type: &ValueType, key: Option<&str>) -> Result<Value, ProviderError> {
        let binding_key = BindingKey::new(value_type.clone(), key);
        // Clone out of the map so factories never run under a shard lock
        let binding = self
            .bindings
            .get(&binding_key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ProviderError::NotBound(binding_key.clone()))?;

        let factory_error = |reason| ProviderError::Factory {
            key: binding_key.clone(),
            reason,
        };

        match binding.as_ref() {
            Binding::Instance(value) => Ok(value.clone()),
            Binding::Factory(factory) => factory().map_err(factory_error),
            Binding::Singleton { factory, cell } => cell
                .get_or_try_init(|| factory())
                .cloned()
                .map_err(factory_error),
        }
    }
}

impl fmt::Debug for BindingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self.bindings.iter().map(|e| e.key().to_string()).collect();
        f.debug_struct("BindingTable").field("keys", &keys).finish()
    }
}
