//! Validation policies and their registry
//!
//! A [`ValidationPolicy`] groups the rules for one semantic name. Untagged
//! rules define the base contract; tagged rules narrow it and only apply when
//! the field carries every tag the rule requires.

use crate::canonical::canonical_name;
use crate::error::ValidationError;
use morph_types::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Rule check function
pub type RuleFn = Arc<dyn Fn(&Value) -> Result<(), ValidationError> + Send + Sync>;

/// One tag-qualified rule
#[derive(Clone)]
pub struct Rule {
    required_tags: BTreeSet<String>,
    check: RuleFn,
}

impl Rule {
    /// Rule that always applies
    #[must_use]
    pub fn untagged<F>(check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        Self {
            required_tags: BTreeSet::new(),
            check: Arc::new(check),
        }
    }

    /// Rule that applies only to fields carrying all `tags`
    #[must_use]
    pub fn tagged<I, T, F>(tags: I, check: F) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
        F: Fn(&Value) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        Self {
            required_tags: tags.into_iter().map(Into::into).collect(),
            check: Arc::new(check),
        }
    }

    /// Tags a field must carry for this rule to apply
    #[inline]
    #[must_use]
    pub fn required_tags(&self) -> &BTreeSet<String> {
        &self.required_tags
    }

    /// Whether the rule applies to a field with `field_tags`
    #[inline]
    #[must_use]
    pub fn applies_to(&self, field_tags: &BTreeSet<String>) -> bool {
        self.required_tags.is_subset(field_tags)
    }

    /// Run the rule
    ///
    /// # Errors
    /// The rule's own failure
    #[inline]
    pub fn check(&self, value: &Value) -> Result<(), ValidationError> {
        (self.check)(value)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("required_tags", &self.required_tags)
            .finish_non_exhaustive()
    }
}

/// Rules for one canonical semantic name
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    name: String,
    rules: Vec<Rule>,
}

impl ValidationPolicy {
    /// Create an empty policy; `name` is canonicalised
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: canonical_name(name),
            rules: Vec::new(),
        }
    }

    /// Add an untagged rule
    #[must_use]
    pub fn rule<F>(mut self, check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        self.rules.push(Rule::untagged(check));
        self
    }

    /// Add a rule that needs all `tags` on the field
    #[must_use]
    pub fn tagged_rule<I, T, F>(mut self, tags: I, check: F) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
        F: Fn(&Value) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        self.rules.push(Rule::tagged(tags, check));
        self
    }

    /// Canonical name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All rules in declaration order
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Rules that apply to a field with `field_tags`
    pub fn applicable<'a>(
        &'a self,
        field_tags: &'a BTreeSet<String>,
    ) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules.iter().filter(move |r| r.applies_to(field_tags))
    }
}

/// Lookup of validation policies by canonical name
///
/// Absence of a policy means the field is not validated.
pub trait PolicyRegistry: Send + Sync {
    /// Find the policy for a canonical name
    fn lookup(&self, canonical: &str) -> Option<Arc<ValidationPolicy>>;
}

/// In-memory policy registry
#[derive(Debug, Default, Clone)]
pub struct PolicyTable {
    policies: HashMap<String, Arc<ValidationPolicy>>,
}

impl PolicyTable {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a policy, replacing any previous one with the same name
    pub fn register(&mut self, policy: ValidationPolicy) -> &mut Self {
        self.policies
            .insert(policy.name().to_string(), Arc::new(policy));
        self
    }

    /// Builder-style register
    #[inline]
    #[must_use]
    pub fn with(mut self, policy: ValidationPolicy) -> Self {
        self.register(policy);
        self
    }

    /// Check for a policy
    #[inline]
    #[must_use]
    pub fn contains(&self, canonical: &str) -> bool {
        self.policies.contains_key(canonical)
    }

    /// Number of policies
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Check if table is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl PolicyRegistry for PolicyTable {
    fn lookup(&self, canonical: &str) -> Option<Arc<ValidationPolicy>> {
        self.policies.get(canonical).cloned()
    }
}
