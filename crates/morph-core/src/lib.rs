//! Metamorph Core
//!
//! Drives typed instances through declared successor chains.
//!
//! # Architecture
//!
//! ```text
//! MetamorphosisDriver
//!   ├── successor_of / SuccessorClass   (what comes next)
//!   ├── FieldResolver                   (carried + provided fields)
//!   │     └── DependencyProvider        (BindingTable)
//!   ├── SemanticValidator               (optional, policy-driven)
//!   ├── TypeDescriptor::construct       (constructor invariants)
//!   └── TransformationRecorder          (Noop / Tracing / Journal)
//! ```
//!
//! # Example
//!
//! ```rust
//! use morph_core::prelude::*;
//! use std::sync::Arc;
//!
//! let mut builder = TypeRegistry::builder();
//! builder
//!     .register(
//!         TypeDescriptor::builder("Draft")
//!             .field(FieldSpec::carried("title", ValueType::Str))
//!             .becomes("Published")
//!             .build(),
//!     )
//!     .unwrap()
//!     .register(
//!         TypeDescriptor::builder("Published")
//!             .field(FieldSpec::carried("title", ValueType::Str))
//!             .field(FieldSpec::provided("channel", ValueType::Str).with_binding("channel"))
//!             .build(),
//!     )
//!     .unwrap();
//! let registry = Arc::new(builder.build());
//!
//! let provider = BindingTable::new();
//! provider.bind_instance(ValueType::Str, Some("channel"), "blog");
//!
//! let driver = MetamorphosisDriver::builder(Arc::clone(&registry), Arc::new(provider)).build();
//! let draft = registry
//!     .instantiate(&"Draft".into(), FieldValues::new().with("title", "Hello"))
//!     .unwrap();
//!
//! let published = driver.drive(draft).unwrap();
//! assert_eq!(published.type_id().as_str(), "Published");
//! assert_eq!(published.get("channel"), Some(&Value::from("blog")));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod driver;
pub mod error;
pub mod provider;
pub mod recorder;
pub mod resolver;
pub mod successor;
pub mod telemetry;

// Re-exports
pub use config::{ConfigError, EngineConfig, TelemetryConfig};
pub use driver::{DriverBuilder, MetamorphosisDriver};
pub use error::{MetamorphError, ResolutionError, Result, Unmatch, UnmatchReason};
pub use provider::{BindingKey, BindingTable, DependencyProvider, FactoryFn, ProviderError};
pub use recorder::{
    JournalEntry, JournalError, JournalEvent, JournalRecorder, NoopRecorder, StepClose, StepOpen,
    StepOutcome, TracingRecorder, TransformationRecorder,
};
pub use resolver::FieldResolver;
pub use successor::{classify, successor_of, SuccessorClass};
pub use telemetry::{init_tracing, TelemetryError};

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        BindingTable, DependencyProvider, EngineConfig, MetamorphError, MetamorphosisDriver,
        TransformationRecorder,
    };
    pub use morph_types::prelude::*;
    pub use morph_validation::{rules, PolicyTable, ValidationPolicy};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
