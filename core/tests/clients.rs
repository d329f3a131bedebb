//! Client cash movement and ledger queries.

mod common;

use banksim_core::{error::SimError, model::TransactionType};
use common::{build, funded_client, slot};
use rust_decimal_macros::dec;

#[test]
fn client_names_are_validated() {
    let engine = build();
    assert!(matches!(
        engine.create_client(slot(), "   ").unwrap_err(),
        SimError::Validation(_)
    ));
    let long = "x".repeat(81);
    assert!(engine.create_client(slot(), &long).is_err());

    let client = engine.create_client(slot(), "  Ada Park ").unwrap();
    assert_eq!(client.name, "Ada Park");
    assert_eq!(client.checking, dec!(0.00));
}

#[test]
fn deposit_and_withdraw_post_ledger_rows() {
    let engine = build();
    let client = funded_client(&engine, "Ada Park", dec!(1000.00));
    let client = engine.withdraw(client.client_id, dec!(250.00)).unwrap();
    assert_eq!(client.checking, dec!(750.00));
    assert_eq!(client.daily_withdrawn, dec!(250.00));

    let txns = engine.transactions(client.client_id).unwrap();
    assert_eq!(txns.len(), 2);
    assert!(txns.iter().all(|t| t.game_day == 0));
    assert!(txns.iter().any(|t| t.kind == TransactionType::Deposit && t.amount == dec!(1000.00)));
    assert!(txns
        .iter()
        .any(|t| t.kind == TransactionType::Withdrawal && t.amount == dec!(250.00)));
}

#[test]
fn deposit_over_the_maximum_is_rejected() {
    let engine = build();
    let client = funded_client(&engine, "Ada Park", dec!(0));
    let err = engine
        .deposit(client.client_id, dec!(1000000.01))
        .unwrap_err();
    assert!(matches!(err, SimError::LimitExceeded(_)));
    assert!(engine.transactions(client.client_id).unwrap().is_empty());
}

#[test]
fn withdraw_more_than_checking_is_insufficient_funds() {
    let engine = build();
    let client = funded_client(&engine, "Ada Park", dec!(100.00));
    let err = engine.withdraw(client.client_id, dec!(100.01)).unwrap_err();
    assert!(matches!(err, SimError::InsufficientFunds(_)));
    assert_eq!(engine.client(client.client_id).unwrap().checking, dec!(100.00));
}

#[test]
fn savings_moves_between_balances() {
    let engine = build();
    let client = funded_client(&engine, "Ada Park", dec!(1000.00));
    let client = engine.savings_deposit(client.client_id, dec!(400.00)).unwrap();
    assert_eq!(client.checking, dec!(600.00));
    assert_eq!(client.savings, dec!(400.00));

    let client = engine.savings_withdraw(client.client_id, dec!(150.00)).unwrap();
    assert_eq!(client.checking, dec!(750.00));
    assert_eq!(client.savings, dec!(250.00));

    assert!(matches!(
        engine.savings_withdraw(client.client_id, dec!(250.01)).unwrap_err(),
        SimError::InsufficientFunds(_)
    ));
}

#[test]
fn monthly_cashflow_splits_income_and_spending() {
    let engine = build();
    let client = funded_client(&engine, "Ada Park", dec!(1000.00));
    engine.withdraw(client.client_id, dec!(200.00)).unwrap();

    let flow = engine.monthly_cashflow(client.client_id, 1, 1).unwrap();
    assert_eq!(flow.game_day, 0);
    assert_eq!(flow.income, dec!(1000.00));
    assert_eq!(flow.spending, dec!(200.00));
    assert_eq!(flow.net, dec!(800.00));
    assert_eq!(flow.spending_pct, Some(dec!(20.00)));

    let empty = engine.monthly_cashflow(client.client_id, 1, 2).unwrap();
    assert_eq!(empty.income, dec!(0.00));
    assert_eq!(empty.spending_pct, None);
}

#[test]
fn monthly_cashflow_rejects_out_of_range_months() {
    let engine = build();
    let client = funded_client(&engine, "Ada Park", dec!(0));
    assert!(engine.monthly_cashflow(client.client_id, 1, 13).is_err());
    assert!(engine.monthly_cashflow(client.client_id, 0, 1).is_err());
}

#[test]
fn unknown_client_is_not_found() {
    let engine = build();
    assert!(matches!(
        engine.deposit(404, dec!(10)).unwrap_err(),
        SimError::NotFound { .. }
    ));
}
