//! Field specifications
//!
//! A [`FieldSpec`] describes one constructor input of a target type: where its
//! value comes from ([`SourceKind`]), how a provider should look it up, what to
//! fall back to, and which semantic tags qualify its validation.

use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Where a field's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Copied from the current instance's same-named field
    Carried,
    /// Supplied by the dependency provider
    Provided,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Carried => f.write_str("carried"),
            Self::Provided => f.write_str("provided"),
        }
    }
}

/// Set of source markers declared on a field
///
/// A well-formed spec has exactly one marker. Zero or two are representable
/// so the defect can be reported when the field is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceSet {
    carried: bool,
    provided: bool,
}

impl SourceSet {
    /// The single declared kind, if exactly one is set
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<SourceKind> {
        match (self.carried, self.provided) {
            (true, false) => Some(SourceKind::Carried),
            (false, true) => Some(SourceKind::Provided),
            _ => None,
        }
    }

    /// Number of declared markers (0, 1 or 2)
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        usize::from(self.carried) + usize::from(self.provided)
    }

    /// Check for a marker
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::Carried => self.carried,
            SourceKind::Provided => self.provided,
        }
    }

    fn insert(&mut self, kind: SourceKind) {
        match kind {
            SourceKind::Carried => self.carried = true,
            SourceKind::Provided => self.provided = true,
        }
    }
}

/// Constructor input of a target type
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    name: String,
    value_type: ValueType,
    sources: SourceSet,
    binding: Option<String>,
    default: Option<Value>,
    tags: BTreeSet<String>,
}

impl FieldSpec {
    /// Create a spec with no source marker yet
    #[must_use]
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            sources: SourceSet::default(),
            binding: None,
            default: None,
            tags: BTreeSet::new(),
        }
    }

    /// Create a carried field
    #[inline]
    #[must_use]
    pub fn carried(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, value_type).mark(SourceKind::Carried)
    }

    /// Create a provided field
    #[inline]
    #[must_use]
    pub fn provided(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, value_type).mark(SourceKind::Provided)
    }

    /// Add a source marker
    #[inline]
    #[must_use]
    pub fn mark(mut self, kind: SourceKind) -> Self {
        self.sources.insert(kind);
        self
    }

    /// Set the provider binding key
    #[inline]
    #[must_use]
    pub fn with_binding(mut self, key: impl Into<String>) -> Self {
        self.binding = Some(key.into());
        self
    }

    /// Set the fallback value
    #[inline]
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Add a semantic tag
    #[inline]
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Field name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared value type
    #[inline]
    #[must_use]
    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    /// Declared source markers
    #[inline]
    #[must_use]
    pub fn sources(&self) -> SourceSet {
        self.sources
    }

    /// The single source kind, if well-formed
    #[inline]
    #[must_use]
    pub fn source_kind(&self) -> Option<SourceKind> {
        self.sources.kind()
    }

    /// Provider binding key
    #[inline]
    #[must_use]
    pub fn binding(&self) -> Option<&str> {
        self.binding.as_deref()
    }

    /// Fallback value
    #[inline]
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Semantic tags
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }
}
