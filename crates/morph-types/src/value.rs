//! Dynamic field values
//!
//! Provides [`Value`], the runtime representation of a single field, the
//! declared [`ValueType`] a field spec expects, and [`FieldValues`], the
//! insertion-ordered bag of named values an instance is made of.

use crate::error::ConstructionError;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Declared type of a field
///
/// Used both as the provider lookup key for provided fields and as the
/// expected shape constructors check against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Accepts any value
    Any,
    /// Boolean flag
    Bool,
    /// Signed 64-bit integer
    Int,
    /// 64-bit float
    Float,
    /// UTF-8 string
    Str,
    /// UTC timestamp
    Timestamp,
    /// Ordered list of values
    List,
    /// Nested name → value map
    Map,
    /// Injected collaborator, identified by its service name
    Service(String),
}

impl ValueType {
    /// Service type with the given name
    #[inline]
    #[must_use]
    pub fn service(name: impl Into<String>) -> Self {
        Self::Service(name.into())
    }

    /// Whether this is a scalar type
    ///
    /// Provided scalars need a binding key or a default to be resolvable.
    #[inline]
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Bool | Self::Int | Self::Float | Self::Str | Self::Timestamp
        )
    }

    /// Whether this is an injected service type
    #[inline]
    #[must_use]
    pub fn is_service(&self) -> bool {
        matches!(self, Self::Service(_))
    }

    /// Check whether a value has this type
    ///
    /// `Null` only matches `Any`; services match on their declared name.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any, _) => true,
            (Self::Bool, Value::Bool(_))
            | (Self::Int, Value::Int(_))
            | (Self::Float, Value::Float(_) | Value::Int(_))
            | (Self::Str, Value::Str(_))
            | (Self::Timestamp, Value::Timestamp(_))
            | (Self::List, Value::List(_))
            | (Self::Map, Value::Map(_)) => true,
            (Self::Service(name), Value::Service(handle)) => handle.type_name() == name,
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Str => f.write_str("str"),
            Self::Timestamp => f.write_str("timestamp"),
            Self::List => f.write_str("list"),
            Self::Map => f.write_str("map"),
            Self::Service(name) => write!(f, "service<{name}>"),
        }
    }
}

/// Shared handle to an injected collaborator
///
/// Services are opaque to the engine: they are carried and provided like any
/// other value but never validated or serialized beyond their name.
#[derive(Clone)]
pub struct ServiceHandle {
    type_name: Arc<str>,
    inner: Arc<dyn Any + Send + Sync>,
}

impl ServiceHandle {
    /// Wrap a service value
    #[must_use]
    pub fn new<T: Any + Send + Sync>(type_name: impl Into<Arc<str>>, service: T) -> Self {
        Self {
            type_name: type_name.into(),
            inner: Arc::new(service),
        }
    }

    /// Declared service name
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Borrow the service as a concrete type
    #[inline]
    #[must_use]
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Whether two handles point at the same service
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServiceHandle").field(&self.type_name).finish()
    }
}

/// Runtime field value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// String
    Str(String),
    /// UTC timestamp
    Timestamp(DateTime<Utc>),
    /// List of values
    List(Vec<Value>),
    /// Ordered map of values
    Map(IndexMap<String, Value>),
    /// Injected collaborator
    Service(ServiceHandle),
}

impl Value {
    /// Wrap a service value
    #[inline]
    #[must_use]
    pub fn service<T: Any + Send + Sync>(type_name: impl Into<Arc<str>>, service: T) -> Self {
        Self::Service(ServiceHandle::new(type_name, service))
    }

    /// Short name of the runtime kind, for diagnostics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Timestamp(_) => "timestamp",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Service(_) => "service",
        }
    }

    /// Check for `Null`
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Read as integer
    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Read as float, widening integers
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(x) => Some(*x),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Read as bool
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Read as timestamp
    #[inline]
    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Borrow as service handle
    #[inline]
    #[must_use]
    pub fn as_service(&self) -> Option<&ServiceHandle> {
        match self {
            Self::Service(s) => Some(s),
            _ => None,
        }
    }

    /// Render as JSON
    ///
    /// Timestamps become RFC 3339 strings and services become
    /// `"<service:Name>"` markers.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(x) => serde_json::Value::from(*x),
            Self::Str(s) => serde_json::Value::String(s.clone()),
            Self::Timestamp(t) => serde_json::Value::String(t.to_rfc3339()),
            Self::List(items) => items.iter().map(Self::to_json).collect(),
            Self::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Self::Service(handle) => {
                serde_json::Value::String(format!("<service:{}>", handle.type_name()))
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Service(a), Self::Service(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Timestamp(t)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            serde_json::Value::String(s) => Self::Str(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

/// Insertion-ordered bag of named field values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues {
    entries: IndexMap<String, Value>,
}

impl FieldValues {
    /// Create empty field set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[inline]
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    /// Insert or replace a value, returning the previous one
    #[inline]
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(name.into(), value.into())
    }

    /// Remove a field, keeping the order of the rest
    #[inline]
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.entries.shift_remove(name)
    }

    /// Look up a value by field name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Check whether a field is present
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no fields
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Field names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over `(name, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Fetch a field constructors depend on
    ///
    /// # Errors
    /// `ConstructionError::MissingField` if absent
    pub fn require(&self, name: &str) -> Result<&Value, ConstructionError> {
        self.get(name)
            .ok_or_else(|| ConstructionError::MissingField(name.to_string()))
    }

    /// Fetch a required string field
    ///
    /// # Errors
    /// `MissingField` if absent, `FieldType` if not a string
    pub fn require_str(&self, name: &str) -> Result<&str, ConstructionError> {
        let value = self.require(name)?;
        value
            .as_str()
            .ok_or_else(|| ConstructionError::field_type(name, ValueType::Str, value))
    }

    /// Fetch a required integer field
    ///
    /// # Errors
    /// `MissingField` if absent, `FieldType` if not an integer
    pub fn require_int(&self, name: &str) -> Result<i64, ConstructionError> {
        let value = self.require(name)?;
        value
            .as_int()
            .ok_or_else(|| ConstructionError::field_type(name, ValueType::Int, value))
    }

    /// Fetch a required service and borrow it as `T`
    ///
    /// # Errors
    /// `MissingField` if absent, `FieldType` if not a service of type `T`
    pub fn require_service<T: Any + Send + Sync>(&self, name: &str) -> Result<&T, ConstructionError> {
        let value = self.require(name)?;
        value
            .as_service()
            .and_then(ServiceHandle::downcast_ref::<T>)
            .ok_or_else(|| {
                ConstructionError::field_type(name, ValueType::service(std::any::type_name::<T>()), value)
            })
    }

    /// Render all fields as a JSON object
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for FieldValues {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
