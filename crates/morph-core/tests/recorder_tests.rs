use mockall::{mock, predicate::function, Sequence};
use morph_core::prelude::*;
use morph_core::{
    JournalEvent, JournalRecorder, StepClose, StepOpen, StepOutcome, SuccessorClass,
    UnmatchReason,
};
use morph_test_utils::{
    driver_for, membership, new_applicant, new_user, user_lifecycle, user_policies, user_provider,
};
use std::sync::Arc;

mock! {
    pub Recorder {}

    impl TransformationRecorder for Recorder {
        fn on_step_open(&self, event: &StepOpen);
        fn on_step_close(&self, event: &StepClose);
    }
}

fn recorded_driver(registry: Arc<TypeRegistry>, recorder: Arc<dyn TransformationRecorder>) -> MetamorphosisDriver {
    MetamorphosisDriver::builder(registry, Arc::new(user_provider()))
        .policies(Arc::new(user_policies()))
        .recorder(recorder)
        .build()
}

#[test]
fn test_recorder_sees_each_step_in_order() {
    let mut recorder = MockRecorder::new();
    let mut seq = Sequence::new();

    recorder
        .expect_on_step_open()
        .with(function(|e: &StepOpen| {
            e.from.as_str() == "User"
                && e.to.as_str() == "RegisteredUser"
                && e.carried == ["name", "email", "age"]
                && e.provided == ["id_generator"]
        }))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    recorder
        .expect_on_step_close()
        .with(function(|e: &StepClose| {
            e.to.as_str() == "RegisteredUser"
                && e.successor == SuccessorClass::Single
                && matches!(&e.outcome, StepOutcome::Constructed { snapshot }
                    if snapshot["type"] == "RegisteredUser")
        }))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    recorder
        .expect_on_step_open()
        .with(function(|e: &StepOpen| {
            e.to.as_str() == "ActiveUser" && e.provided == ["clock"]
        }))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    recorder
        .expect_on_step_close()
        .with(function(|e: &StepClose| {
            e.to.as_str() == "ActiveUser" && e.outcome.is_constructed()
        }))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());

    let registry = user_lifecycle();
    let driver = recorded_driver(Arc::clone(&registry), Arc::new(recorder));
    driver
        .drive(new_user(&registry, "John", "john@example.com", 30))
        .unwrap();
}

#[test]
fn test_recorder_sees_failed_candidates() {
    let mut recorder = MockRecorder::new();
    recorder.expect_on_step_open().times(2).return_const(());
    recorder
        .expect_on_step_close()
        .with(function(|e: &StepClose| {
            e.successor == SuccessorClass::Branching
                && matches!(
                    &e.outcome,
                    StepOutcome::Failed {
                        reason: UnmatchReason::SemanticValidationFailure,
                        ..
                    }
                )
        }))
        .times(2)
        .return_const(());

    let registry = membership();
    let driver = recorded_driver(Arc::clone(&registry), Arc::new(recorder));
    assert!(driver.drive(new_applicant(&registry, "Tim", 8)).is_err());
}

#[test]
fn test_terminal_input_records_nothing() {
    let mut recorder = MockRecorder::new();
    recorder.expect_on_step_open().never();
    recorder.expect_on_step_close().never();

    let registry = user_lifecycle();
    let active = driver_for(Arc::clone(&registry))
        .drive(new_user(&registry, "John", "john@example.com", 30))
        .unwrap();

    let driver = recorded_driver(Arc::clone(&registry), Arc::new(recorder));
    let same = driver.drive(Arc::clone(&active)).unwrap();
    assert!(Arc::ptr_eq(&active, &same));
}

#[test]
fn test_journal_chain_over_full_drive() {
    let journal = Arc::new(JournalRecorder::new());
    let registry = membership();
    let driver = recorded_driver(Arc::clone(&registry), journal.clone());

    driver.drive(new_applicant(&registry, "Ada", 25)).unwrap();

    // TeenMember fails validation, AdultMember is built
    let kinds: Vec<&str> = journal
        .entries()
        .iter()
        .map(|entry| match &entry.event {
            JournalEvent::Open(_) => "open",
            JournalEvent::Close(close) if close.outcome.is_constructed() => "built",
            JournalEvent::Close(_) => "failed",
        })
        .collect();
    assert_eq!(kinds, vec!["open", "failed", "open", "built"]);
    assert!(journal.verify_integrity().is_ok());

    let exported = journal.to_json();
    assert_eq!(exported.as_array().map(Vec::len), Some(4));
    assert_eq!(exported[3]["event"]["outcome"]["snapshot"]["type"], "AdultMember");
}
