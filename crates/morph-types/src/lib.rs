//! Metamorph Type System
//!
//! Static type metadata and immutable instances for metamorphic chains.
//!
//! # Overview
//!
//! - **Value** / **FieldValues**: dynamic field values, insertion-ordered
//! - **FieldSpec**: one constructor input, tagged [`SourceKind::Carried`] or
//!   [`SourceKind::Provided`]
//! - **TypeDescriptor**: ordered field specs, a [`SuccessorDeclaration`] and a
//!   constructor
//! - **TypeRegistry**: read-only `TypeId → TypeDescriptor` map built at startup
//! - **Instance**: immutable result of a successful construction
//!
//! # Example
//!
//! ```rust
//! use morph_types::{FieldSpec, FieldValues, TypeDescriptor, TypeId, TypeRegistry, ValueType};
//!
//! let mut builder = TypeRegistry::builder();
//! builder
//!     .register(
//!         TypeDescriptor::builder("Draft")
//!             .field(FieldSpec::carried("title", ValueType::Str))
//!             .becomes("Published")
//!             .build(),
//!     )
//!     .unwrap();
//! let registry = builder.build();
//!
//! let draft = registry
//!     .instantiate(&TypeId::new("Draft"), FieldValues::new().with("title", "Hello"))
//!     .unwrap();
//! assert_eq!(draft.get("title").and_then(|v| v.as_str()), Some("Hello"));
//! ```

#![warn(missing_docs)]

pub mod descriptor;
pub mod error;
pub mod field;
pub mod instance;
pub mod registry;
pub mod value;

// Re-exports
pub use descriptor::{
    Constructor, DescriptorBuilder, SuccessorDeclaration, TypeDescriptor, TypeId, DEFAULT_MEMBER,
};
pub use error::{ConstructionError, RegistryError};
pub use field::{FieldSpec, SourceKind, SourceSet};
pub use instance::Instance;
pub use registry::{RegistryBuilder, TypeRegistry};
pub use value::{FieldValues, ServiceHandle, Value, ValueType};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for describing types
    pub use crate::{
        ConstructionError, FieldSpec, FieldValues, Instance, SourceKind, SuccessorDeclaration,
        TypeDescriptor, TypeId, TypeRegistry, Value, ValueType,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
