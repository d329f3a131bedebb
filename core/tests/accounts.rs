//! Slot lifecycle and investments.

mod common;

use banksim_core::{error::SimError, model::InvestmentEventType};
use common::{advance_days, build, funded_client, slot};
use rust_decimal_macros::dec;

#[test]
fn new_slot_opens_with_starting_position() {
    let engine = build();
    let account = engine.account_state(slot()).unwrap();
    assert_eq!(account.liquid_cash, dec!(100000.00));
    assert_eq!(account.invested, dec!(0.00));
    assert_eq!(account.asset_price, dec!(4500.00));
    assert_eq!(account.game_day, 0.0);
    assert_eq!(account.next_growth_day, 11);
    assert_eq!(account.next_dividend_day, 11);
}

#[test]
fn invest_then_divest_same_day_nets_to_zero() {
    let engine = build();
    engine.invest(slot(), dec!(10000.00)).unwrap();
    let account = engine.divest(slot(), dec!(10000.00)).unwrap();

    assert_eq!(account.invested, dec!(0.00));
    assert_eq!(account.liquid_cash, dec!(100000.00));

    let kinds: Vec<_> = engine
        .investment_events(slot())
        .unwrap()
        .into_iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(kinds.len(), 2);
    assert!(kinds.contains(&InvestmentEventType::Invest));
    assert!(kinds.contains(&InvestmentEventType::Divest));
}

#[test]
fn invest_beyond_liquid_cash_is_rejected_without_side_effects() {
    let engine = build();
    let err = engine.invest(slot(), dec!(100000.01)).unwrap_err();
    assert!(matches!(err, SimError::InsufficientFunds(_)));

    let account = engine.account_state(slot()).unwrap();
    assert_eq!(account.liquid_cash, dec!(100000.00));
    assert!(engine.investment_events(slot()).unwrap().is_empty());
}

#[test]
fn divest_beyond_invested_is_rejected() {
    let engine = build();
    engine.invest(slot(), dec!(500.00)).unwrap();
    let err = engine.divest(slot(), dec!(500.01)).unwrap_err();
    assert!(matches!(err, SimError::LimitExceeded(_)));
}

#[test]
fn non_positive_amounts_are_validation_errors() {
    let engine = build();
    assert!(matches!(
        engine.invest(slot(), dec!(0)).unwrap_err(),
        SimError::Validation(_)
    ));
    assert!(matches!(
        engine.divest(slot(), dec!(-5)).unwrap_err(),
        SimError::Validation(_)
    ));
}

#[test]
fn negative_mortgage_rate_is_rejected() {
    let engine = build();
    assert!(engine.set_mortgage_rate(slot(), dec!(-0.01)).is_err());
    let account = engine.set_mortgage_rate(slot(), dec!(0.045)).unwrap();
    assert_eq!(account.mortgage_rate, dec!(0.045));
}

#[test]
fn restarting_a_slot_wipes_clients_and_history() {
    let engine = build();
    funded_client(&engine, "Ada Park", dec!(100.00));
    engine.invest(slot(), dec!(1000.00)).unwrap();
    advance_days(&engine, 3);
    engine.account_state(slot()).unwrap();

    let account = engine.start_slot(slot()).unwrap();
    assert_eq!(account.liquid_cash, dec!(100000.00));
    assert_eq!(account.game_day, 0.0);
    assert!(engine.list_clients(slot()).unwrap().is_empty());
    assert!(engine.investment_events(slot()).unwrap().is_empty());
}
