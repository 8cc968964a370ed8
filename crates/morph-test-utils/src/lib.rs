//! Testing utilities for the Metamorph workspace
//!
//! Shared type graphs, providers and policies.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use morph_core::{BindingTable, MetamorphosisDriver};
use morph_types::{
    ConstructionError, DescriptorBuilder, FieldSpec, FieldValues, Instance, TypeDescriptor,
    TypeRegistry, Value, ValueType,
};
use morph_validation::{rules, PolicyTable, ValidationPolicy};
use std::sync::Arc;
use uuid::Uuid;

pub const USER: &str = "User";
pub const REGISTERED_USER: &str = "RegisteredUser";
pub const ACTIVE_USER: &str = "ActiveUser";

pub const APPLICANT: &str = "Applicant";
pub const TEEN_MEMBER: &str = "TeenMember";
pub const ADULT_MEMBER: &str = "AdultMember";

pub const ID_PREFIX: &str = "user_";

/// Injected id source
#[derive(Debug, Clone)]
pub struct IdGenerator {
    prefix: String,
}

impl IdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn generate(&self) -> String {
        format!("{}{}", self.prefix, Uuid::new_v4().simple())
    }
}

/// Injected time source, optionally frozen
#[derive(Debug, Clone, Copy, Default)]
pub struct Clock {
    fixed: Option<DateTime<Utc>>,
}

impl Clock {
    pub fn system() -> Self {
        Self::default()
    }

    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self { fixed: Some(at) }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.fixed.unwrap_or_else(Utc::now)
    }
}

fn user_fields(descriptor: DescriptorBuilder) -> DescriptorBuilder {
    descriptor
        .field(FieldSpec::carried("name", ValueType::Str))
        .field(FieldSpec::carried("email", ValueType::Str))
        .field(FieldSpec::carried("age", ValueType::Int))
}

/// `User → RegisteredUser → ActiveUser`
///
/// - `RegisteredUser` derives `id` from the injected [`IdGenerator`]
/// - `ActiveUser` stamps `activated_at` from the injected [`Clock`] unless a
///   timestamp was carried over
pub fn user_lifecycle() -> Arc<TypeRegistry> {
    let mut builder = TypeRegistry::builder();
    builder
        .register(user_fields(TypeDescriptor::builder(USER)).becomes(REGISTERED_USER).build())
        .unwrap()
        .register(
            user_fields(TypeDescriptor::builder(REGISTERED_USER))
                .member("register")
                .field(FieldSpec::provided(
                    "id_generator",
                    ValueType::service("IdGenerator"),
                ))
                .becomes(ACTIVE_USER)
                .constructor(|mut values| {
                    let id = values
                        .require_service::<IdGenerator>("id_generator")?
                        .generate();
                    values.remove("id_generator");
                    values.insert("id", id);
                    Ok(values)
                })
                .build(),
        )
        .unwrap()
        .register(
            user_fields(TypeDescriptor::builder(ACTIVE_USER))
                .member("activate")
                .field(FieldSpec::carried("id", ValueType::Str))
                .field(FieldSpec::carried("activated_at", ValueType::Timestamp).with_default(Value::Null))
                .field(FieldSpec::provided("clock", ValueType::service("Clock")))
                .constructor(activate)
                .build(),
        )
        .unwrap();
    Arc::new(builder.build())
}

fn activate(mut values: FieldValues) -> Result<FieldValues, ConstructionError> {
    if !values.require_str("id")?.starts_with(ID_PREFIX) {
        return Err(ConstructionError::invariant(format!(
            "id must start with '{ID_PREFIX}'"
        )));
    }
    let now = values.require_service::<Clock>("clock")?.now();
    values.remove("clock");
    if values.get("activated_at").map_or(true, Value::is_null) {
        values.insert("activated_at", now);
    }
    Ok(values)
}

/// `Applicant → [TeenMember, AdultMember]`, selected by tagged age rules
pub fn membership() -> Arc<TypeRegistry> {
    let mut builder = TypeRegistry::builder();
    builder
        .register(
            TypeDescriptor::builder(APPLICANT)
                .field(FieldSpec::carried("name", ValueType::Str))
                .field(FieldSpec::carried("age", ValueType::Int))
                .becomes_one_of([TEEN_MEMBER, ADULT_MEMBER])
                .build(),
        )
        .unwrap()
        .register(
            TypeDescriptor::builder(TEEN_MEMBER)
                .field(FieldSpec::carried("name", ValueType::Str))
                .field(FieldSpec::carried("age", ValueType::Int).with_tag("teen"))
                .build(),
        )
        .unwrap()
        .register(
            TypeDescriptor::builder(ADULT_MEMBER)
                .field(FieldSpec::carried("name", ValueType::Str))
                .field(FieldSpec::carried("age", ValueType::Int).with_tag("adult"))
                .build(),
        )
        .unwrap();
    Arc::new(builder.build())
}

/// Provider with an `IdGenerator` singleton and the given clock
pub fn user_provider_with_clock(clock: Clock) -> BindingTable {
    let table = BindingTable::new();
    table
        .bind_singleton(ValueType::service("IdGenerator"), None, || {
            Ok(Value::service("IdGenerator", IdGenerator::new(ID_PREFIX)))
        })
        .bind_instance(ValueType::service("Clock"), None, Value::service("Clock", clock));
    table
}

/// Provider with an `IdGenerator` singleton and the system clock
pub fn user_provider() -> BindingTable {
    user_provider_with_clock(Clock::system())
}

/// Age, email and name policies
///
/// `age` is non-negative; `teen` narrows it to 13–19 and `adult` to 18+.
pub fn user_policies() -> PolicyTable {
    PolicyTable::new()
        .with(
            ValidationPolicy::new("age")
                .rule(rules::non_negative())
                .tagged_rule(["teen"], rules::range(13.0, 19.0))
                .tagged_rule(["adult"], rules::min(18.0)),
        )
        .with(ValidationPolicy::new("email").rule(rules::email()))
        .with(ValidationPolicy::new("name").rule(rules::non_empty()))
}

/// Validating driver over `registry` with the user provider and policies
pub fn driver_for(registry: Arc<TypeRegistry>) -> MetamorphosisDriver {
    MetamorphosisDriver::builder(registry, Arc::new(user_provider()))
        .policies(Arc::new(user_policies()))
        .build()
}

pub fn new_user(registry: &TypeRegistry, name: &str, email: &str, age: i64) -> Arc<Instance> {
    registry
        .instantiate(
            &USER.into(),
            FieldValues::new()
                .with("name", name)
                .with("email", email)
                .with("age", age),
        )
        .unwrap()
}

pub fn new_applicant(registry: &TypeRegistry, name: &str, age: i64) -> Arc<Instance> {
    registry
        .instantiate(
            &APPLICANT.into(),
            FieldValues::new().with("name", name).with("age", age),
        )
        .unwrap()
}
