//! Field resolution
//!
//! Assembles the constructor inputs of a target type. Every field is
//! classified before the provider is consulted, so a malformed descriptor
//! fails without side effects on the provider.

use crate::error::ResolutionError;
use crate::provider::DependencyProvider;
use morph_types::{FieldSpec, FieldValues, Instance, SourceKind, TypeDescriptor};
use std::fmt;
use std::sync::Arc;

/// Resolves a target's fields from the current instance and a provider
#[derive(Clone)]
pub struct FieldResolver {
    provider: Arc<dyn DependencyProvider>,
}

impl FieldResolver {
    /// Create resolver over a provider
    #[inline]
    #[must_use]
    pub fn new(provider: Arc<dyn DependencyProvider>) -> Self {
        Self { provider }
    }

    /// Resolve every field of `target` in declaration order
    ///
    /// Carried fields copy the same-named value from `current`, falling back to
    /// the declared default. Provided fields ask the provider by
    /// `(type, binding key)`; a missing binding falls back to the default.
    ///
    /// # Errors
    /// - `AmbiguousOrMissingSource` if any field has zero or two markers
    /// - `UnkeyedScalarProvision` for a provided scalar with no key and no default
    /// - `MissingCarriedValue` if a carried value is absent without default
    /// - `ProviderResolutionFailure` if the provider fails
    pub fn resolve(
        &self,
        current: &Instance,
        target: &TypeDescriptor,
    ) -> Result<FieldValues, ResolutionError> {
        let classified = classify(target)?;

        let mut values = FieldValues::new();
        for (spec, kind) in classified {
            let value = match kind {
                SourceKind::Carried => {
                    match current.get(spec.name()).or(spec.default_value()) {
                        Some(value) => value.clone(),
                        None => {
                            return Err(ResolutionError::MissingCarriedValue {
                                field: spec.name().to_string(),
                                type_id: target.id().clone(),
                                from: current.type_id().clone(),
                            })
                        }
                    }
                }
                SourceKind::Provided => {
                    match self.provider.resolve(spec.value_type(), spec.binding()) {
                        Ok(value) => value,
                        Err(err) if err.is_not_bound() && spec.default_value().is_some() => {
                            tracing::trace!(
                                type_id = %target.id(),
                                field = spec.name(),
                                "no binding, using declared default"
                            );
                            spec.default_value().cloned().unwrap_or_default()
                        }
                        Err(source) => {
                            return Err(ResolutionError::ProviderResolutionFailure {
                                field: spec.name().to_string(),
                                type_id: target.id().clone(),
                                source,
                            })
                        }
                    }
                }
            };
            values.insert(spec.name(), value);
        }

        Ok(values)
    }
}

/// Check every field's markers and provider key before resolving any of them
fn classify(target: &TypeDescriptor) -> Result<Vec<(&FieldSpec, SourceKind)>, ResolutionError> {
    target
        .fields()
        .iter()
        .map(|spec| {
            let kind =
                spec.source_kind()
                    .ok_or_else(|| ResolutionError::AmbiguousOrMissingSource {
                        field: spec.name().to_string(),
                        type_id: target.id().clone(),
                        member: target.member().to_string(),
                        declared: spec.sources().count(),
                    })?;

            if kind == SourceKind::Provided
                && spec.value_type().is_scalar()
                && spec.binding().is_none()
                && spec.default_value().is_none()
            {
                return Err(ResolutionError::UnkeyedScalarProvision {
                    field: spec.name().to_string(),
                    type_id: target.id().clone(),
                    value_type: spec.value_type().clone(),
                });
            }

            Ok((spec, kind))
        })
        .collect()
}

impl fmt::Debug for FieldResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldResolver").finish_non_exhaustive()
    }
}
