//! Metamorphosis driver
//!
//! Advances an instance along its declared successors until it reaches a
//! terminal type:
//!
//! - `None`: the current instance is returned as-is (same `Arc`)
//! - `Single(T)`: resolve, validate, construct; any failure aborts the chain
//! - `Candidates([T1..Tn])`: tried in order, first success wins; if all fail
//!   the ordered [`Unmatch`] list is returned as `NoCandidateMatched`
//!
//! Cycles in the successor graph are not detected.

use crate::config::EngineConfig;
use crate::error::{MetamorphError, Result, Unmatch};
use crate::provider::DependencyProvider;
use crate::recorder::{
    NoopRecorder, StepClose, StepOpen, StepOutcome, TracingRecorder, TransformationRecorder,
};
use crate::resolver::FieldResolver;
use crate::successor::{successor_of, SuccessorClass};
use morph_types::{Instance, SourceKind, SuccessorDeclaration, TypeDescriptor, TypeId, TypeRegistry};
use morph_validation::{PolicyRegistry, SemanticValidator};
use std::fmt;
use std::sync::Arc;

/// Drives instances through their successor chains
pub struct MetamorphosisDriver {
    registry: Arc<TypeRegistry>,
    resolver: FieldResolver,
    validator: Option<SemanticValidator>,
    recorder: Arc<dyn TransformationRecorder>,
}

impl MetamorphosisDriver {
    /// Start building a driver
    #[must_use]
    pub fn builder(
        registry: Arc<TypeRegistry>,
        provider: Arc<dyn DependencyProvider>,
    ) -> DriverBuilder {
        DriverBuilder {
            registry,
            provider,
            policies: None,
            recorder: None,
            config: EngineConfig::default(),
        }
    }

    /// Type registry in use
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Whether semantic validation runs before construction
    #[inline]
    #[must_use]
    pub fn validates(&self) -> bool {
        self.validator.is_some()
    }

    /// Follow successors until a terminal instance is reached
    ///
    /// A terminal input is returned unchanged.
    ///
    /// # Errors
    /// The first failing step's error
    pub fn drive(&self, instance: Arc<Instance>) -> Result<Arc<Instance>> {
        let origin = instance.type_id().clone();
        let mut current = instance;
        let mut steps = 0usize;

        while let Some(next) = self.step(&current)? {
            steps += 1;
            tracing::debug!(
                step = steps,
                from = %current.type_id(),
                to = %next.type_id(),
                "advanced"
            );
            current = next;
        }

        tracing::info!(
            from = %origin,
            terminal = %current.type_id(),
            steps,
            "metamorphosis complete"
        );
        Ok(current)
    }

    /// Advance one step
    ///
    /// Returns `None` when `current` is terminal.
    ///
    /// # Errors
    /// - single successor: the step's own error, verbatim
    /// - candidates: `NoCandidateMatched` if every candidate fails
    pub fn step(&self, current: &Arc<Instance>) -> Result<Option<Arc<Instance>>> {
        let instance: &Instance = current;
        let declaration = successor_of(instance);
        let class = SuccessorClass::of(declaration);

        match declaration {
            SuccessorDeclaration::None => Ok(None),
            SuccessorDeclaration::Single(target) => {
                self.transform(instance, target, class).map(Some)
            }
            SuccessorDeclaration::Candidates(targets) => {
                if targets.is_empty() {
                    return Ok(None);
                }
                let mut unmatched = Vec::with_capacity(targets.len());
                for target in targets {
                    match self.transform(instance, target, class) {
                        Ok(next) => {
                            tracing::debug!(
                                from = %instance.type_id(),
                                matched = %target,
                                skipped = unmatched.len(),
                                "candidate matched"
                            );
                            return Ok(Some(next));
                        }
                        Err(error) => {
                            tracing::warn!(
                                from = %instance.type_id(),
                                candidate = %target,
                                reason = %error.reason(),
                                %error,
                                "candidate unmatched"
                            );
                            unmatched.push(Unmatch::new(target.clone(), error));
                        }
                    }
                }
                Err(MetamorphError::NoCandidateMatched {
                    from: instance.type_id().clone(),
                    unmatched,
                })
            }
        }
    }

    /// One recorded transformation attempt
    fn transform(
        &self,
        current: &Instance,
        target: &TypeId,
        class: SuccessorClass,
    ) -> Result<Arc<Instance>> {
        let descriptor = self.registry.describe(target);
        let (carried, provided) = descriptor
            .as_ref()
            .map(|d| {
                (
                    d.field_names(SourceKind::Carried),
                    d.field_names(SourceKind::Provided),
                )
            })
            .unwrap_or_default();

        self.recorder.on_step_open(&StepOpen {
            from: current.type_id().clone(),
            to: target.clone(),
            carried,
            provided,
        });

        let result = match descriptor {
            Some(descriptor) => self.attempt(current, &descriptor),
            None => Err(MetamorphError::UnknownType(target.clone())),
        };

        let outcome = match &result {
            Ok(next) => StepOutcome::Constructed {
                snapshot: next.snapshot(),
            },
            Err(error) => StepOutcome::Failed {
                reason: error.reason(),
                message: error.to_string(),
            },
        };
        self.recorder.on_step_close(&StepClose {
            from: current.type_id().clone(),
            to: target.clone(),
            outcome,
            successor: class,
        });

        result
    }

    /// Resolve, validate and construct a single target
    fn attempt(&self, current: &Instance, target: &Arc<TypeDescriptor>) -> Result<Arc<Instance>> {
        let values = self.resolver.resolve(current, target)?;

        if let Some(validator) = &self.validator {
            let errors = validator.validate(target, &values);
            if !errors.is_empty() {
                return Err(MetamorphError::SemanticValidationFailure {
                    type_id: target.id().clone(),
                    errors,
                });
            }
        }

        target
            .construct(values)
            .map(Arc::new)
            .map_err(|source| MetamorphError::ConstructionInvariantViolation {
                type_id: target.id().clone(),
                source,
            })
    }
}

impl fmt::Debug for MetamorphosisDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetamorphosisDriver")
            .field("types", &self.registry.len())
            .field("validates", &self.validates())
            .finish_non_exhaustive()
    }
}

/// Builder for [`MetamorphosisDriver`]
pub struct DriverBuilder {
    registry: Arc<TypeRegistry>,
    provider: Arc<dyn DependencyProvider>,
    policies: Option<Arc<dyn PolicyRegistry>>,
    recorder: Option<Arc<dyn TransformationRecorder>>,
    config: EngineConfig,
}

impl DriverBuilder {
    /// Validate against these policies (unless disabled in config)
    #[must_use]
    pub fn policies(mut self, policies: Arc<dyn PolicyRegistry>) -> Self {
        self.policies = Some(policies);
        self
    }

    /// Report steps to this recorder
    #[must_use]
    pub fn recorder(mut self, recorder: Arc<dyn TransformationRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Apply engine configuration
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the driver
    #[must_use]
    pub fn build(self) -> MetamorphosisDriver {
        let validator = if self.config.semantic_validation {
            self.policies.map(SemanticValidator::new)
        } else {
            None
        };

        let recorder: Arc<dyn TransformationRecorder> = match self.recorder {
            Some(recorder) => recorder,
            None if self.config.trace_steps => Arc::new(TracingRecorder),
            None => Arc::new(NoopRecorder),
        };

        MetamorphosisDriver {
            registry: self.registry,
            resolver: FieldResolver::new(self.provider),
            validator,
            recorder,
        }
    }
}

impl fmt::Debug for DriverBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnmatchReason;
    use crate::provider::BindingTable;
    use crate::recorder::JournalRecorder;
    use morph_types::{ConstructionError, FieldSpec, FieldValues, ValueType};
    use morph_validation::{rules, PolicyTable, ValidationPolicy};

    fn registry(types: Vec<TypeDescriptor>) -> Arc<TypeRegistry> {
        let mut builder = TypeRegistry::builder();
        for descriptor in types {
            builder.register(descriptor).unwrap();
        }
        Arc::new(builder.build())
    }

    fn driver(registry: Arc<TypeRegistry>) -> MetamorphosisDriver {
        MetamorphosisDriver::builder(registry, Arc::new(BindingTable::new())).build()
    }

    fn seed(registry: &TypeRegistry, id: &str, fields: FieldValues) -> Arc<Instance> {
        registry.instantiate(&id.into(), fields).unwrap()
    }

    #[test]
    fn terminal_instance_is_returned_unchanged() {
        let registry = registry(vec![TypeDescriptor::builder("Done")
            .field(FieldSpec::carried("n", ValueType::Int))
            .build()]);
        let start = seed(&registry, "Done", FieldValues::new().with("n", 1));

        let driver = driver(Arc::clone(&registry));
        assert!(driver.step(&start).unwrap().is_none());

        let end = driver.drive(Arc::clone(&start)).unwrap();
        assert!(Arc::ptr_eq(&start, &end));
    }

    #[test]
    fn unknown_successor_fails_the_step() {
        let registry = registry(vec![TypeDescriptor::builder("Orphan").becomes("Ghost").build()]);
        let start = seed(&registry, "Orphan", FieldValues::new());

        let err = driver(Arc::clone(&registry)).drive(start).unwrap_err();
        assert!(matches!(err, MetamorphError::UnknownType(ref id) if id.as_str() == "Ghost"));
    }

    #[test]
    fn constructor_rejection_propagates_on_single() {
        let registry = registry(vec![
            TypeDescriptor::builder("Draft")
                .field(FieldSpec::carried("total", ValueType::Int))
                .becomes("Invoice")
                .build(),
            TypeDescriptor::builder("Invoice")
                .field(FieldSpec::carried("total", ValueType::Int))
                .constructor(|values| {
                    if values.require_int("total")? <= 0 {
                        return Err(ConstructionError::invariant("total must be positive"));
                    }
                    Ok(values)
                })
                .build(),
        ]);
        let start = seed(&registry, "Draft", FieldValues::new().with("total", 0));

        let err = driver(Arc::clone(&registry)).drive(start).unwrap_err();
        assert_eq!(err.reason(), UnmatchReason::ConstructionInvariantViolation);
        assert_eq!(
            err.to_string(),
            "construction of Invoice rejected: invariant violated: total must be positive"
        );
    }

    #[test]
    fn validation_can_be_disabled_by_config() {
        let types = || {
            registry(vec![
                TypeDescriptor::builder("Person")
                    .field(FieldSpec::carried("age", ValueType::Int))
                    .becomes("Teen")
                    .build(),
                TypeDescriptor::builder("Teen")
                    .field(FieldSpec::carried("age", ValueType::Int).with_tag("teen"))
                    .build(),
            ])
        };
        let policies: Arc<dyn PolicyRegistry> = Arc::new(PolicyTable::new().with(
            ValidationPolicy::new("age").tagged_rule(["teen"], rules::range(13.0, 19.0)),
        ));

        let strict = types();
        let start = seed(&strict, "Person", FieldValues::new().with("age", 25));
        let validating = MetamorphosisDriver::builder(strict, Arc::new(BindingTable::new()))
            .policies(Arc::clone(&policies))
            .build();
        assert!(validating.validates());
        let err = validating.drive(start).unwrap_err();
        assert_eq!(err.validation_errors().map(|e| e.len()), Some(1));

        let lax = types();
        let start = seed(&lax, "Person", FieldValues::new().with("age", 25));
        let permissive = MetamorphosisDriver::builder(lax, Arc::new(BindingTable::new()))
            .policies(policies)
            .config(EngineConfig::new().with_semantic_validation(false))
            .build();
        assert!(!permissive.validates());
        assert_eq!(permissive.drive(start).unwrap().type_id().as_str(), "Teen");
    }

    #[test]
    fn failed_attempts_are_recorded() {
        let registry = registry(vec![
            TypeDescriptor::builder("A").becomes_one_of(["Missing", "B"]).build(),
            TypeDescriptor::builder("B").build(),
        ]);
        let journal = Arc::new(JournalRecorder::new());
        let driver = MetamorphosisDriver::builder(Arc::clone(&registry), Arc::new(BindingTable::new()))
            .recorder(journal.clone())
            .build();

        let end = driver.drive(seed(&registry, "A", FieldValues::new())).unwrap();
        assert_eq!(end.type_id().as_str(), "B");

        let outcomes: Vec<bool> = journal
            .entries()
            .into_iter()
            .filter_map(|entry| match entry.event {
                crate::recorder::JournalEvent::Close(close) => Some(close.outcome.is_constructed()),
                crate::recorder::JournalEvent::Open(_) => None,
            })
            .collect();
        assert_eq!(outcomes, vec![false, true]);
        assert_eq!(journal.len(), 4);
    }
}
