//! Semantic validation pass
//!
//! Runs after field resolution: for every resolved field the validator
//! derives the canonical name, looks up a policy, and applies each rule
//! whose required tags the field carries. All failures are collected.

use crate::canonical::canonical_name;
use crate::error::{Errors, FieldViolation};
use crate::policy::PolicyRegistry;
use morph_types::{FieldValues, TypeDescriptor, Value};
use std::fmt;
use std::sync::Arc;

/// Name-derived, tag-qualified validator
#[derive(Clone)]
pub struct SemanticValidator {
    policies: Arc<dyn PolicyRegistry>,
}

impl SemanticValidator {
    /// Create validator over a policy registry
    #[inline]
    #[must_use]
    pub fn new(policies: Arc<dyn PolicyRegistry>) -> Self {
        Self { policies }
    }

    /// Validate resolved values against `target`'s field specs
    ///
    /// Injected services and fields missing from `values` are skipped;
    /// fields without a policy are not validated.
    #[must_use]
    pub fn validate(&self, target: &TypeDescriptor, values: &FieldValues) -> Errors {
        let mut violations = Vec::new();

        for spec in target.fields() {
            if spec.value_type().is_service() {
                continue;
            }
            let Some(value) = values.get(spec.name()) else {
                continue;
            };
            if matches!(value, Value::Service(_)) {
                continue;
            }

            let canonical = canonical_name(spec.name());
            let Some(policy) = self.policies.lookup(&canonical) else {
                continue;
            };

            for rule in policy.applicable(spec.tags()) {
                if let Err(error) = rule.check(value) {
                    tracing::debug!(
                        type_id = %target.id(),
                        field = spec.name(),
                        policy = %canonical,
                        %error,
                        "field rejected by validation rule"
                    );
                    violations.push(FieldViolation {
                        field: spec.name().to_string(),
                        policy: canonical.clone(),
                        required_tags: rule.required_tags().clone(),
                        error,
                    });
                }
            }
        }

        Errors::from_violations(violations)
    }
}

impl fmt::Debug for SemanticValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticValidator").finish_non_exhaustive()
    }
}
