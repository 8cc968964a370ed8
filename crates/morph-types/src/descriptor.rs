//! Type descriptors
//!
//! A [`TypeDescriptor`] is the static, registry-resident description of a
//! constructible type: its ordered field specs, what it becomes next, and the
//! constructor that turns resolved fields into an [`Instance`].

use crate::error::ConstructionError;
use crate::field::{FieldSpec, SourceKind};
use crate::instance::Instance;
use crate::value::{FieldValues, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Stable identifier of a constructible type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(String);

impl TypeId {
    /// Create identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TypeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// What a type becomes next
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "targets", rename_all = "snake_case")]
pub enum SuccessorDeclaration {
    /// Terminal type
    #[default]
    None,
    /// Exactly one successor; failure aborts the chain
    Single(TypeId),
    /// Ordered candidates; the first that constructs wins
    Candidates(Vec<TypeId>),
}

impl SuccessorDeclaration {
    /// Check for the terminal declaration
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Declared targets in order
    #[must_use]
    pub fn targets(&self) -> &[TypeId] {
        match self {
            Self::None => &[],
            Self::Single(target) => std::slice::from_ref(target),
            Self::Candidates(targets) => targets,
        }
    }
}

/// Constructor turning resolved fields into the instance's final fields
///
/// Constructors may derive additional fields and reject the input with a
/// [`ConstructionError`].
pub type Constructor =
    Arc<dyn Fn(FieldValues) -> Result<FieldValues, ConstructionError> + Send + Sync>;

/// Default declaring member label
pub const DEFAULT_MEMBER: &str = "new";

/// Static description of a constructible type
#[derive(Clone)]
pub struct TypeDescriptor {
    id: TypeId,
    member: String,
    fields: Vec<FieldSpec>,
    successor: SuccessorDeclaration,
    constructor: Constructor,
}

impl TypeDescriptor {
    /// Start describing a type
    #[inline]
    #[must_use]
    pub fn builder(id: impl Into<TypeId>) -> DescriptorBuilder {
        DescriptorBuilder::new(id.into())
    }

    /// Type identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> &TypeId {
        &self.id
    }

    /// Name of the declaring constructor member
    #[inline]
    #[must_use]
    pub fn member(&self) -> &str {
        &self.member
    }

    /// Field specs in declaration order
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Look up a field spec by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Successor declaration
    #[inline]
    #[must_use]
    pub fn successor(&self) -> &SuccessorDeclaration {
        &self.successor
    }

    /// Names of well-formed fields of the given source kind
    #[must_use]
    pub fn field_names(&self, kind: SourceKind) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.source_kind() == Some(kind))
            .map(|f| f.name().to_string())
            .collect()
    }

    /// Check declared field types, run the constructor and seal the result
    /// into an instance
    ///
    /// Every declared field present in `values` must match its
    /// [`ValueType`](crate::ValueType). `Null` passes only for fields that
    /// declare `Null` as their default. Undeclared extras are left to the
    /// constructor.
    ///
    /// # Errors
    /// [`ConstructionError::FieldType`] on the first mismatch, otherwise
    /// whatever the constructor rejects the fields with
    pub fn construct(self: &Arc<Self>, values: FieldValues) -> Result<Instance, ConstructionError> {
        self.check_field_types(&values)?;
        let fields = (self.constructor)(values)?;
        Ok(Instance::new(Arc::clone(self), fields))
    }

    fn check_field_types(&self, values: &FieldValues) -> Result<(), ConstructionError> {
        for spec in &self.fields {
            let Some(value) = values.get(spec.name()) else {
                continue;
            };
            let null_default = value.is_null() && spec.default_value().is_some_and(Value::is_null);
            if !null_default && !spec.value_type().accepts(value) {
                return Err(ConstructionError::field_type(
                    spec.name(),
                    spec.value_type().clone(),
                    value,
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("id", &self.id)
            .field("member", &self.member)
            .field("fields", &self.fields)
            .field("successor", &self.successor)
            .finish_non_exhaustive()
    }
}

/// Builder for [`TypeDescriptor`]
pub struct DescriptorBuilder {
    id: TypeId,
    member: String,
    fields: Vec<FieldSpec>,
    successor: SuccessorDeclaration,
    constructor: Option<Constructor>,
}

impl DescriptorBuilder {
    fn new(id: TypeId) -> Self {
        Self {
            id,
            member: DEFAULT_MEMBER.to_string(),
            fields: Vec::new(),
            successor: SuccessorDeclaration::None,
            constructor: None,
        }
    }

    /// Append a field spec
    #[inline]
    #[must_use]
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Name the declaring constructor member
    #[inline]
    #[must_use]
    pub fn member(mut self, member: impl Into<String>) -> Self {
        self.member = member.into();
        self
    }

    /// Declare a single successor
    #[inline]
    #[must_use]
    pub fn becomes(mut self, target: impl Into<TypeId>) -> Self {
        self.successor = SuccessorDeclaration::Single(target.into());
        self
    }

    /// Declare ordered successor candidates
    #[must_use]
    pub fn becomes_one_of<I, T>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeId>,
    {
        self.successor =
            SuccessorDeclaration::Candidates(targets.into_iter().map(Into::into).collect());
        self
    }

    /// Set the successor declaration directly
    #[inline]
    #[must_use]
    pub fn successor(mut self, successor: SuccessorDeclaration) -> Self {
        self.successor = successor;
        self
    }

    /// Set the constructor
    #[must_use]
    pub fn constructor<F>(mut self, f: F) -> Self
    where
        F: Fn(FieldValues) -> Result<FieldValues, ConstructionError> + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(f));
        self
    }

    /// Finish the descriptor
    ///
    /// Without an explicit constructor the resolved fields are taken as-is.
    #[must_use]
    pub fn build(self) -> TypeDescriptor {
        let constructor: Constructor = match self.constructor {
            Some(constructor) => constructor,
            None => Arc::new(passthrough),
        };
        TypeDescriptor {
            id: self.id,
            member: self.member,
            fields: self.fields,
            successor: self.successor,
            constructor,
        }
    }
}

#[allow(clippy::unnecessary_wraps)]
fn passthrough(fields: FieldValues) -> Result<FieldValues, ConstructionError> {
    Ok(fields)
}
