//! Bankruptcy filing, decisions and the discharge sweep.

mod common;

use banksim_core::{error::SimError, model::BankruptcyStatus};
use common::{advance_days, build, funded_client, slot};
use rust_decimal_macros::dec;

#[test]
fn approval_flags_the_client_until_discharge() {
    let engine = build();
    let client = funded_client(&engine, "Ben Okafor", dec!(0));
    advance_days(&engine, 2);

    let application = engine
        .file_bankruptcy(client.client_id, Some("  medical debt "))
        .unwrap();
    assert_eq!(application.status, BankruptcyStatus::Pending);
    assert_eq!(application.filed_day, 2);
    assert_eq!(application.notes.as_deref(), Some("medical debt"));

    let approved = engine
        .decide_bankruptcy(application.application_id, BankruptcyStatus::Approved)
        .unwrap();
    assert_eq!(approved.status, BankruptcyStatus::Approved);
    assert_eq!(approved.discharge_at, Some(86));

    let client = engine.client(client.client_id).unwrap();
    assert!(client.bankrupt);
    assert_eq!(client.bankrupt_until, Some(86));
    assert_eq!(client.purchase_block_reason.as_deref(), Some("Bankruptcy"));
}

#[test]
fn sweep_finishes_applications_once_discharge_day_arrives() {
    let engine = build();
    let client = funded_client(&engine, "Ben Okafor", dec!(0));
    let application = engine.file_bankruptcy(client.client_id, None).unwrap();
    engine
        .decide_bankruptcy(application.application_id, BankruptcyStatus::Approved)
        .unwrap();

    assert!(engine.sweep_bankruptcies(slot(), 83.99).unwrap().is_empty());
    assert!(engine.client(client.client_id).unwrap().bankrupt);

    let finished = engine.sweep_bankruptcies(slot(), 84.0).unwrap();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].status, BankruptcyStatus::Finished);

    let client = engine.client(client.client_id).unwrap();
    assert!(!client.bankrupt);
    assert_eq!(client.bankrupt_until, None);
    assert_eq!(client.purchase_block_reason, None);

    assert!(engine.sweep_bankruptcies(slot(), 100.0).unwrap().is_empty());
}

#[test]
fn run_day_discharges_through_the_sweep() {
    let engine = build();
    let client = funded_client(&engine, "Ben Okafor", dec!(0));
    let application = engine.file_bankruptcy(client.client_id, None).unwrap();
    engine
        .decide_bankruptcy(application.application_id, BankruptcyStatus::Approved)
        .unwrap();

    advance_days(&engine, 84);
    let report = engine.run_day(slot()).unwrap();
    assert_eq!(report.days_rolled.len(), 84);
    assert_eq!(report.discharged.len(), 1);
    assert!(!engine.client(client.client_id).unwrap().bankrupt);
}

#[test]
fn denial_clears_the_flag_and_schedules_nothing() {
    let engine = build();
    let client = funded_client(&engine, "Ben Okafor", dec!(0));
    let application = engine.file_bankruptcy(client.client_id, None).unwrap();
    let denied = engine
        .decide_bankruptcy(application.application_id, BankruptcyStatus::Denied)
        .unwrap();
    assert_eq!(denied.status, BankruptcyStatus::Denied);
    assert_eq!(denied.discharge_at, None);
    assert!(!engine.client(client.client_id).unwrap().bankrupt);
}

#[test]
fn deciding_twice_is_an_invalid_transition() {
    let engine = build();
    let client = funded_client(&engine, "Ben Okafor", dec!(0));
    let application = engine.file_bankruptcy(client.client_id, None).unwrap();
    engine
        .decide_bankruptcy(application.application_id, BankruptcyStatus::Denied)
        .unwrap();

    let err = engine
        .decide_bankruptcy(application.application_id, BankruptcyStatus::Approved)
        .unwrap_err();
    assert!(matches!(err, SimError::InvalidTransition { .. }));
    assert!(!engine.client(client.client_id).unwrap().bankrupt);
}

#[test]
fn decision_must_approve_or_deny() {
    let engine = build();
    let client = funded_client(&engine, "Ben Okafor", dec!(0));
    let application = engine.file_bankruptcy(client.client_id, None).unwrap();
    assert!(matches!(
        engine
            .decide_bankruptcy(application.application_id, BankruptcyStatus::Finished)
            .unwrap_err(),
        SimError::Validation(_)
    ));
}

#[test]
fn bankrupt_client_cannot_file_again() {
    let engine = build();
    let client = funded_client(&engine, "Ben Okafor", dec!(0));
    let application = engine.file_bankruptcy(client.client_id, None).unwrap();
    engine
        .decide_bankruptcy(application.application_id, BankruptcyStatus::Approved)
        .unwrap();
    assert!(engine.file_bankruptcy(client.client_id, None).is_err());
}
