use chrono::{TimeZone, Utc};
use morph_core::prelude::*;
use morph_core::{BindingTable, MetamorphError, ResolutionError, UnmatchReason};
use morph_test_utils::{
    driver_for, membership, new_applicant, new_user, user_lifecycle, user_policies,
    user_provider_with_clock, Clock, IdGenerator, ACTIVE_USER, ADULT_MEMBER, REGISTERED_USER, TEEN_MEMBER,
};
use morph_validation::ValidationError;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn registry(types: Vec<TypeDescriptor>) -> Arc<TypeRegistry> {
    let mut builder = TypeRegistry::builder();
    for descriptor in types {
        builder.register(descriptor).unwrap();
    }
    Arc::new(builder.build())
}

fn plain_driver(registry: Arc<TypeRegistry>, provider: BindingTable) -> MetamorphosisDriver {
    MetamorphosisDriver::builder(registry, Arc::new(provider)).build()
}

#[test]
fn test_user_becomes_active_user() {
    let registry = user_lifecycle();
    let driver = driver_for(Arc::clone(&registry));
    let john = new_user(&registry, "John", "john@example.com", 25);

    let active = driver.drive(john).unwrap();

    assert_eq!(active.type_id().as_str(), ACTIVE_USER);
    assert_eq!(active.get("name"), Some(&Value::from("John")));
    assert_eq!(active.get("email"), Some(&Value::from("john@example.com")));
    assert_eq!(active.get("age"), Some(&Value::from(25)));

    let id = active.get("id").and_then(Value::as_str).unwrap();
    assert!(id.starts_with("user_"), "unexpected id {id}");
    assert!(active.get("activated_at").and_then(Value::as_timestamp).is_some());

    // injected services do not survive construction
    assert!(active.get("id_generator").is_none());
    assert!(active.get("clock").is_none());
}

#[test]
fn test_step_by_step_chain() {
    let registry = user_lifecycle();
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let driver = MetamorphosisDriver::builder(
        Arc::clone(&registry),
        Arc::new(user_provider_with_clock(Clock::fixed(at))),
    )
    .policies(Arc::new(user_policies()))
    .build();

    let user = new_user(&registry, "John", "john@example.com", 30);
    let registered = driver.step(&user).unwrap().unwrap();
    assert_eq!(registered.type_id().as_str(), REGISTERED_USER);
    assert!(registered.get("activated_at").is_none());

    let active = driver.step(&registered).unwrap().unwrap();
    assert_eq!(active.get("id"), registered.get("id"));
    assert_eq!(active.get("activated_at"), Some(&Value::from(at)));

    assert!(driver.step(&active).unwrap().is_none());
}

#[test]
fn test_terminal_input_is_identity() {
    let registry = user_lifecycle();
    let driver = driver_for(Arc::clone(&registry));
    let active = driver
        .drive(new_user(&registry, "John", "john@example.com", 30))
        .unwrap();

    let again = driver.drive(Arc::clone(&active)).unwrap();
    assert!(Arc::ptr_eq(&active, &again));
}

#[test]
fn test_linear_chain_preserves_carried_data() {
    let registry = registry(vec![
        TypeDescriptor::builder("Order")
            .field(FieldSpec::carried("sku", ValueType::Str))
            .field(FieldSpec::carried("qty", ValueType::Int))
            .becomes("PaidOrder")
            .build(),
        TypeDescriptor::builder("PaidOrder")
            .field(FieldSpec::carried("sku", ValueType::Str))
            .field(FieldSpec::carried("qty", ValueType::Int))
            .becomes("ShippedOrder")
            .build(),
        TypeDescriptor::builder("ShippedOrder")
            .field(FieldSpec::carried("sku", ValueType::Str))
            .field(FieldSpec::carried("qty", ValueType::Int))
            .build(),
    ]);
    let order = registry
        .instantiate(
            &"Order".into(),
            FieldValues::new().with("sku", "A-1").with("qty", 3),
        )
        .unwrap();

    let shipped = plain_driver(Arc::clone(&registry), BindingTable::new())
        .drive(Arc::clone(&order))
        .unwrap();

    assert_eq!(shipped.type_id().as_str(), "ShippedOrder");
    assert_eq!(shipped.fields(), order.fields());
}

#[test]
fn test_default_fallback_for_carried_field() {
    let registry = registry(vec![
        TypeDescriptor::builder("Lead")
            .field(FieldSpec::carried("name", ValueType::Str))
            .becomes("Customer")
            .build(),
        TypeDescriptor::builder("Customer")
            .field(FieldSpec::carried("name", ValueType::Str))
            .field(FieldSpec::carried("tier", ValueType::Str).with_default("bronze"))
            .build(),
    ]);
    let lead = registry
        .instantiate(&"Lead".into(), FieldValues::new().with("name", "Ada"))
        .unwrap();

    let customer = plain_driver(Arc::clone(&registry), BindingTable::new())
        .drive(lead)
        .unwrap();
    assert_eq!(customer.get("tier"), Some(&Value::from("bronze")));
}

#[test]
fn test_missing_carried_value_propagates_verbatim() {
    let registry = registry(vec![
        TypeDescriptor::builder("Lead")
            .field(FieldSpec::carried("name", ValueType::Str))
            .becomes("Customer")
            .build(),
        TypeDescriptor::builder("Customer")
            .field(FieldSpec::carried("name", ValueType::Str))
            .field(FieldSpec::carried("tier", ValueType::Str))
            .build(),
    ]);
    let lead = registry
        .instantiate(&"Lead".into(), FieldValues::new().with("name", "Ada"))
        .unwrap();

    let err = plain_driver(Arc::clone(&registry), BindingTable::new())
        .drive(lead)
        .unwrap_err();
    assert!(matches!(
        err,
        MetamorphError::Resolution(ResolutionError::MissingCarriedValue { ref field, .. })
            if field == "tier"
    ));
}

#[test]
fn test_branch_order_first_success_wins() {
    let registry = registry(vec![
        TypeDescriptor::builder("Seed")
            .field(FieldSpec::carried("n", ValueType::Int))
            .becomes_one_of(["Left", "Right"])
            .build(),
        TypeDescriptor::builder("Left")
            .field(FieldSpec::carried("n", ValueType::Int))
            .build(),
        TypeDescriptor::builder("Right")
            .field(FieldSpec::carried("n", ValueType::Int))
            .build(),
    ]);
    let driver = plain_driver(Arc::clone(&registry), BindingTable::new());

    for _ in 0..5 {
        let seed = registry
            .instantiate(&"Seed".into(), FieldValues::new().with("n", 1))
            .unwrap();
        assert_eq!(driver.drive(seed).unwrap().type_id().as_str(), "Left");
    }
}

#[test]
fn test_type_mismatch_falls_through_to_next_candidate() {
    let registry = registry(vec![
        TypeDescriptor::builder("Seed")
            .field(FieldSpec::carried("age", ValueType::Any))
            .becomes_one_of(["NumericAge", "TextAge"])
            .build(),
        TypeDescriptor::builder("NumericAge")
            .field(FieldSpec::carried("age", ValueType::Int))
            .build(),
        TypeDescriptor::builder("TextAge")
            .field(FieldSpec::carried("age", ValueType::Str))
            .build(),
    ]);
    let driver = plain_driver(Arc::clone(&registry), BindingTable::new());
    let seed = |age: Value| {
        registry
            .instantiate(&"Seed".into(), FieldValues::new().with("age", age))
            .unwrap()
    };

    let text = driver.drive(seed(Value::from("twenty"))).unwrap();
    assert_eq!(text.type_id().as_str(), "TextAge");
    assert_eq!(text.get("age"), Some(&Value::from("twenty")));

    let numeric = driver.drive(seed(Value::from(20))).unwrap();
    assert_eq!(numeric.type_id().as_str(), "NumericAge");

    let err = driver.drive(seed(Value::from(true))).unwrap_err();
    let MetamorphError::NoCandidateMatched { unmatched, .. } = &err else {
        panic!("expected NoCandidateMatched, got {err}");
    };
    assert_eq!(unmatched.len(), 2);
    for entry in unmatched {
        assert_eq!(entry.reason, UnmatchReason::ConstructionInvariantViolation);
    }
    assert!(matches!(
        unmatched[0].error.as_ref(),
        MetamorphError::ConstructionInvariantViolation {
            source: ConstructionError::FieldType { field, .. },
            ..
        } if field == "age"
    ));
}

#[test]
fn test_exhaustive_branch_failure_on_missing_carried_values() {
    let registry = registry(vec![
        TypeDescriptor::builder("Parcel")
            .field(FieldSpec::carried("weight", ValueType::Int))
            .becomes_one_of(["Letter", "Freight"])
            .build(),
        TypeDescriptor::builder("Letter")
            .field(FieldSpec::carried("weight", ValueType::Int))
            .field(FieldSpec::carried("stamp", ValueType::Str))
            .build(),
        TypeDescriptor::builder("Freight")
            .field(FieldSpec::carried("weight", ValueType::Int))
            .field(FieldSpec::carried("pallet", ValueType::Str))
            .build(),
    ]);
    let parcel = registry
        .instantiate(&"Parcel".into(), FieldValues::new().with("weight", 12))
        .unwrap();

    let err = plain_driver(Arc::clone(&registry), BindingTable::new())
        .drive(parcel)
        .unwrap_err();

    assert_eq!(err.reason(), UnmatchReason::NoCandidateMatched);
    assert_eq!(
        err.attempted().iter().map(|t| t.as_str()).collect::<Vec<_>>(),
        vec!["Letter", "Freight"]
    );
    let MetamorphError::NoCandidateMatched { unmatched, .. } = &err else {
        panic!("expected NoCandidateMatched, got {err}");
    };
    let missing: Vec<&str> = unmatched
        .iter()
        .map(|entry| {
            assert_eq!(entry.reason, UnmatchReason::MissingCarriedValue);
            match entry.error.as_ref() {
                MetamorphError::Resolution(ResolutionError::MissingCarriedValue {
                    field, ..
                }) => field.as_str(),
                other => panic!("unexpected error {other}"),
            }
        })
        .collect();
    assert_eq!(missing, vec!["stamp", "pallet"]);
}

#[test]
fn test_validation_selects_branch() {
    let registry = membership();
    let driver = driver_for(Arc::clone(&registry));

    let teen = driver.drive(new_applicant(&registry, "Sam", 16)).unwrap();
    assert_eq!(teen.type_id().as_str(), TEEN_MEMBER);

    let adult = driver.drive(new_applicant(&registry, "Ada", 25)).unwrap();
    assert_eq!(adult.type_id().as_str(), ADULT_MEMBER);
    assert_eq!(adult.get("age"), Some(&Value::from(25)));
}

#[test]
fn test_exhaustive_branch_failure_lists_every_candidate() {
    let registry = membership();
    let driver = driver_for(Arc::clone(&registry));

    let err = driver.drive(new_applicant(&registry, "Tim", 8)).unwrap_err();

    let MetamorphError::NoCandidateMatched { from, unmatched } = &err else {
        panic!("expected NoCandidateMatched, got {err}");
    };
    assert_eq!(from.as_str(), "Applicant");
    assert_eq!(
        err.attempted().iter().map(|t| t.as_str()).collect::<Vec<_>>(),
        vec![TEEN_MEMBER, ADULT_MEMBER]
    );
    for entry in unmatched {
        assert_eq!(entry.reason, UnmatchReason::SemanticValidationFailure);
    }

    let teen_errors = unmatched[0].error.validation_errors().unwrap();
    assert_eq!(
        teen_errors.iter().next().unwrap().error,
        ValidationError::BelowMinimum {
            min: 13.0,
            actual: 8.0
        }
    );
}

#[test]
fn test_validation_hierarchy_on_single_successor() {
    let registry = registry(vec![
        TypeDescriptor::builder("Person")
            .field(FieldSpec::carried("age", ValueType::Int))
            .becomes("Teenager")
            .build(),
        TypeDescriptor::builder("Teenager")
            .field(FieldSpec::carried("age", ValueType::Int).with_tag("teen"))
            .build(),
    ]);
    let driver = MetamorphosisDriver::builder(Arc::clone(&registry), Arc::new(BindingTable::new()))
        .policies(Arc::new(user_policies()))
        .build();
    let person = |age: i64| {
        registry
            .instantiate(&"Person".into(), FieldValues::new().with("age", age))
            .unwrap()
    };

    assert_eq!(driver.drive(person(16)).unwrap().type_id().as_str(), "Teenager");

    let err = driver.drive(person(25)).unwrap_err();
    assert_eq!(err.reason(), UnmatchReason::SemanticValidationFailure);
    let errors = err.validation_errors().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors.iter().next().unwrap().error,
        ValidationError::AboveMaximum {
            max: 19.0,
            actual: 25.0
        }
    );
}

#[test]
fn test_classification_defect_reported_before_construction() {
    let provider_calls = Arc::new(AtomicUsize::new(0));
    let constructor_calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&provider_calls);
    let provider = BindingTable::new();
    provider.bind_factory(ValueType::Str, Some("region"), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Value::from("eu"))
    });

    let built = Arc::clone(&constructor_calls);
    let registry = registry(vec![
        TypeDescriptor::builder("Draft")
            .field(FieldSpec::carried("title", ValueType::Str))
            .becomes("Filed")
            .build(),
        TypeDescriptor::builder("Filed")
            .member("file")
            .field(FieldSpec::provided("region", ValueType::Str).with_binding("region"))
            .field(FieldSpec::new("title", ValueType::Str))
            .constructor(move |values| {
                built.fetch_add(1, Ordering::SeqCst);
                Ok(values)
            })
            .build(),
    ]);
    let draft = registry
        .instantiate(&"Draft".into(), FieldValues::new().with("title", "Q3"))
        .unwrap();

    let err = plain_driver(Arc::clone(&registry), provider)
        .drive(draft)
        .unwrap_err();

    assert_eq!(err.reason(), UnmatchReason::AmbiguousOrMissingSource);
    assert_eq!(
        err.to_string(),
        "field 'title' of Filed::file declares 0 source markers, expected exactly one"
    );
    assert_eq!(provider_calls.load(Ordering::SeqCst), 0);
    assert_eq!(constructor_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_provided_scalar_without_key_is_rejected() {
    let registry = registry(vec![
        TypeDescriptor::builder("Visitor").becomes("Session").build(),
        TypeDescriptor::builder("Session")
            .field(FieldSpec::provided("token", ValueType::Str))
            .build(),
    ]);
    let visitor = registry
        .instantiate(&"Visitor".into(), FieldValues::new())
        .unwrap();

    let err = plain_driver(Arc::clone(&registry), BindingTable::new())
        .drive(visitor)
        .unwrap_err();
    assert!(matches!(
        err,
        MetamorphError::Resolution(ResolutionError::UnkeyedScalarProvision { .. })
    ));
    assert_eq!(err.reason(), UnmatchReason::ProviderResolutionFailure);
}

#[test]
fn test_constructor_invariant_on_active_user() {
    let registry = user_lifecycle();
    let driver = driver_for(Arc::clone(&registry));

    // skip registration so the id never came from the generator
    let forged = registry
        .instantiate(
            &REGISTERED_USER.into(),
            FieldValues::new()
                .with("name", "Eve")
                .with("email", "eve@example.com")
                .with("age", 40)
                .with(
                    "id_generator",
                    Value::service("IdGenerator", morph_test_utils::IdGenerator::new("admin_")),
                ),
        )
        .unwrap();

    let err = driver.drive(forged).unwrap_err();
    assert_eq!(err.reason(), UnmatchReason::ConstructionInvariantViolation);
    assert!(err.to_string().contains("id must start with 'user_'"));
}

#[test]
fn test_carried_activation_timestamp_is_kept() {
    let registry = user_lifecycle();
    let earlier = Utc.with_ymd_and_hms(2023, 1, 2, 9, 30, 0).unwrap();
    let later = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let driver = MetamorphosisDriver::builder(
        Arc::clone(&registry),
        Arc::new(user_provider_with_clock(Clock::fixed(later))),
    )
    .policies(Arc::new(user_policies()))
    .build();

    let registered = registry
        .instantiate(
            &REGISTERED_USER.into(),
            FieldValues::new()
                .with("name", "John")
                .with("email", "john@example.com")
                .with("age", 25)
                .with("id_generator", Value::service("IdGenerator", IdGenerator::new("user_")))
                .with("activated_at", earlier),
        )
        .unwrap();
    assert_eq!(registered.get("activated_at"), Some(&Value::from(earlier)));

    let active = driver.drive(registered).unwrap();
    assert_eq!(active.type_id().as_str(), ACTIVE_USER);
    assert_eq!(active.get("activated_at"), Some(&Value::from(earlier)));
}
