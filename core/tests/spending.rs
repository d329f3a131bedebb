//! Discretionary spending: once per client per day, never overdrawn.

mod common;

use banksim_core::{
    config::{SimConfig, SpendingCategory},
    model::TransactionType,
    rng::SequenceRng,
};
use common::{build, build_with, employed_client, funded_client};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn single_category_config() -> SimConfig {
    let mut config = SimConfig::default_test();
    config.spending.categories = vec![SpendingCategory {
        name: "Groceries".to_string(),
        min_pct: 0.10,
        max_pct: 0.20,
        variability: 0.0,
        active: true,
    }];
    config
}

fn spending_total(txns: &[banksim_core::model::Transaction]) -> Decimal {
    txns.iter().map(|t| t.amount).sum()
}

#[test]
fn second_generation_for_the_same_day_is_empty() {
    let engine = build();
    let client = employed_client(&engine, "Ada Park", dec!(10000.00), dec!(60000));

    let first = engine.generate_spending(client.client_id, 0).unwrap();
    assert!(!first.is_empty());
    let ledger_after_first = engine.transactions(client.client_id).unwrap().len();

    let second = engine.generate_spending(client.client_id, 0).unwrap();
    assert!(second.is_empty());
    assert_eq!(engine.transactions(client.client_id).unwrap().len(), ledger_after_first);
}

#[test]
fn fixed_draws_give_exact_installments() {
    let engine = build_with(single_category_config());
    let client = employed_client(&engine, "Ada Park", dec!(10000.00), dec!(60000));

    // pct = 0.10 + 0.5 * 0.10 = 0.15 of 5000.00; four equal weights.
    let mut rng = SequenceRng::new(vec![0.5]);
    let posted = engine
        .generate_spending_with(client.client_id, 0, &mut rng)
        .unwrap();

    let amounts: Vec<_> = posted.iter().map(|t| t.amount).collect();
    assert_eq!(amounts, vec![dec!(187.50); 4]);
    assert!(posted.iter().all(|t| t.kind == TransactionType::Spending));
    assert!(posted.iter().all(|t| t.description.as_deref() == Some("Groceries")));
    assert_eq!(engine.client(client.client_id).unwrap().checking, dec!(9250.00));
}

#[test]
fn stale_mandatory_spend_is_recalculated_first() {
    let engine = build_with(single_category_config());
    let client = employed_client(&engine, "Ada Park", dec!(10000.00), dec!(60000));
    engine
        .store()
        .update_mandatory_spend(client.client_id, dec!(3000.00))
        .unwrap();

    let mut rng = SequenceRng::new(vec![0.5]);
    let posted = engine
        .generate_spending_with(client.client_id, 0, &mut rng)
        .unwrap();

    assert_eq!(spending_total(&posted), dec!(750.00));
    assert_eq!(engine.client(client.client_id).unwrap().mandatory_spend, dec!(0.00));
}

#[test]
fn spending_is_capped_at_the_checking_balance() {
    let engine = build_with(single_category_config());
    let client = employed_client(&engine, "Ada Park", dec!(100.00), dec!(60000));

    let mut rng = SequenceRng::new(vec![0.5]);
    let posted = engine
        .generate_spending_with(client.client_id, 0, &mut rng)
        .unwrap();

    assert_eq!(spending_total(&posted), dec!(100.00));
    assert!(posted.iter().all(|t| t.amount > Decimal::ZERO));
    assert_eq!(engine.client(client.client_id).unwrap().checking, dec!(0.00));
}

#[test]
fn no_disposable_income_means_no_spending() {
    let engine = build();
    let client = employed_client(&engine, "Ben Okafor", dec!(5000.00), dec!(12000));
    let rental = engine.create_rental("Flat", dec!(1500.00)).unwrap();
    engine.assign_rental(client.client_id, rental.rental_id).unwrap();

    assert!(engine.generate_spending(client.client_id, 0).unwrap().is_empty());
    assert_eq!(engine.client(client.client_id).unwrap().checking, dec!(5000.00));
}

#[test]
fn client_without_income_spends_nothing() {
    let engine = build();
    let client = funded_client(&engine, "Ben Okafor", dec!(5000.00));
    assert!(engine.generate_spending(client.client_id, 0).unwrap().is_empty());
}

#[test]
fn inactive_categories_are_skipped() {
    let engine = build();
    let client = employed_client(&engine, "Ada Park", dec!(50000.00), dec!(120000));
    let posted = engine.generate_spending(client.client_id, 0).unwrap();
    assert!(posted
        .iter()
        .all(|t| t.description.as_deref() != Some("Travel")));
}

#[test]
fn same_seed_same_spending() {
    let a = build();
    let b = build();
    let client_a = employed_client(&a, "Ada Park", dec!(10000.00), dec!(60000));
    let client_b = employed_client(&b, "Ada Park", dec!(10000.00), dec!(60000));

    let spent_a: Vec<_> = a
        .generate_spending(client_a.client_id, 3)
        .unwrap()
        .into_iter()
        .map(|t| (t.description, t.amount))
        .collect();
    let spent_b: Vec<_> = b
        .generate_spending(client_b.client_id, 3)
        .unwrap()
        .into_iter()
        .map(|t| (t.description, t.amount))
        .collect();
    assert_eq!(spent_a, spent_b);
}
