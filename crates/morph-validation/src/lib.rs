//! Metamorph Semantic Validation
//!
//! Opt-in validation keyed by a field's semantic name and qualified by its
//! tags.
//!
//! # Overview
//!
//! - [`canonical_name`]: `email_address` / `emailAddress` → `EmailAddress`
//! - [`ValidationPolicy`]: untagged base rules plus tag-qualified narrowing rules
//! - [`PolicyRegistry`] / [`PolicyTable`]: lookup by canonical name; a miss
//!   means "not validated"
//! - [`SemanticValidator`]: applies every matching rule and returns one
//!   [`Errors`] set
//!
//! # Example
//!
//! ```rust
//! use morph_types::{FieldSpec, FieldValues, TypeDescriptor, ValueType};
//! use morph_validation::{rules, PolicyTable, SemanticValidator, ValidationPolicy};
//! use std::sync::Arc;
//!
//! let policies = PolicyTable::new().with(
//!     ValidationPolicy::new("age")
//!         .rule(rules::non_negative())
//!         .tagged_rule(["teen"], rules::range(13.0, 19.0)),
//! );
//! let validator = SemanticValidator::new(Arc::new(policies));
//!
//! let target = TypeDescriptor::builder("Teenager")
//!     .field(FieldSpec::carried("age", ValueType::Int).with_tag("teen"))
//!     .build();
//!
//! let errors = validator.validate(&target, &FieldValues::new().with("age", 25));
//! assert_eq!(errors.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod canonical;
mod error;
mod policy;
pub mod rules;
mod validator;

// Re-exports
pub use canonical::canonical_name;
pub use error::{Errors, FieldViolation, ValidationError};
pub use policy::{PolicyRegistry, PolicyTable, Rule, RuleFn, ValidationPolicy};
pub use validator::SemanticValidator;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
