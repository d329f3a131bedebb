//! Rebuilding per-mortgage totals from unlinked payment rows.

mod common;

use banksim_core::{
    config::{SimConfig, SpendingCategory},
    engine::SimEngine,
    model::{Client, Mortgage, MortgageStatus},
    rng::SequenceRng,
};
use common::{advance_days, build, build_with, employed_client, funded_client, slot};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Accept a ten-year mortgage sized so its monthly payment is `monthly`.
fn accepted_mortgage(engine: &SimEngine, client: &Client, price: Decimal, monthly: Decimal) -> Mortgage {
    let property = engine.create_property(slot(), "House", price).unwrap();
    let down = price - monthly * Decimal::from(120);
    let mortgage = engine
        .apply_mortgage(client.client_id, property.property_id, down, 10)
        .unwrap();
    let mortgage = engine
        .decide_mortgage(mortgage.mortgage_id, MortgageStatus::Accepted)
        .unwrap();
    assert_eq!(mortgage.monthly_payment, Some(monthly));
    mortgage
}

fn total_paid(engine: &SimEngine, mortgage_id: i64) -> Decimal {
    engine.store().mortgage(mortgage_id).unwrap().total_paid
}

#[test]
fn payment_goes_to_the_closest_monthly_amount() {
    let engine = build();
    let client = funded_client(&engine, "Cy Lindqvist", dec!(200000.00));
    let large = accepted_mortgage(&engine, &client, dec!(200000.00), dec!(1200.00));
    let small = accepted_mortgage(&engine, &client, dec!(150000.00), dec!(900.00));

    // Paid against the wrong mortgage; the ledger row carries no link.
    engine.pay_mortgage(large.mortgage_id, dec!(895.00)).unwrap();
    assert_eq!(total_paid(&engine, large.mortgage_id), dec!(56895.00));

    let reconciled = engine.reconcile_mortgages(slot()).unwrap();
    assert_eq!(reconciled.len(), 2);
    assert_eq!(total_paid(&engine, large.mortgage_id), dec!(56000.00));
    assert_eq!(total_paid(&engine, small.mortgage_id), dec!(42895.00));
}

#[test]
fn reconciling_twice_changes_nothing() {
    let engine = build();
    let client = funded_client(&engine, "Cy Lindqvist", dec!(200000.00));
    let large = accepted_mortgage(&engine, &client, dec!(200000.00), dec!(1200.00));
    let small = accepted_mortgage(&engine, &client, dec!(150000.00), dec!(900.00));
    engine.pay_mortgage(large.mortgage_id, dec!(1200.00)).unwrap();
    engine.pay_mortgage(small.mortgage_id, dec!(900.00)).unwrap();

    let first = engine.reconcile_mortgages(slot()).unwrap();
    let second = engine.reconcile_mortgages(slot()).unwrap();
    let totals = |ms: &[Mortgage]| {
        let mut t: Vec<_> = ms.iter().map(|m| (m.mortgage_id, m.total_paid)).collect();
        t.sort();
        t
    };
    assert_eq!(totals(&first), totals(&second));
    assert_eq!(total_paid(&engine, large.mortgage_id), dec!(57200.00));
    assert_eq!(total_paid(&engine, small.mortgage_id), dec!(42900.00));
}

#[test]
fn payment_before_a_mortgage_started_stays_with_the_earlier_one() {
    let engine = build();
    let client = funded_client(&engine, "Cy Lindqvist", dec!(200000.00));
    let early = accepted_mortgage(&engine, &client, dec!(200000.00), dec!(1200.00));

    advance_days(&engine, 1);
    engine.pay_mortgage(early.mortgage_id, dec!(900.00)).unwrap();

    advance_days(&engine, 2);
    let late = accepted_mortgage(&engine, &client, dec!(150000.00), dec!(900.00));
    assert_eq!(late.start_payment_day, Some(3));

    engine.reconcile_mortgages(slot()).unwrap();
    assert_eq!(total_paid(&engine, early.mortgage_id), dec!(56900.00));
    assert_eq!(total_paid(&engine, late.mortgage_id), dec!(42000.00));
}

#[test]
fn clients_are_reconciled_independently() {
    let engine = build();
    let cy = funded_client(&engine, "Cy Lindqvist", dec!(100000.00));
    let dee = funded_client(&engine, "Dee Moreno", dec!(100000.00));
    let cy_mortgage = accepted_mortgage(&engine, &cy, dec!(150000.00), dec!(900.00));
    let dee_mortgage = accepted_mortgage(&engine, &dee, dec!(200000.00), dec!(1200.00));
    engine.pay_mortgage(dee_mortgage.mortgage_id, dec!(900.00)).unwrap();

    engine.reconcile_mortgages(slot()).unwrap();
    assert_eq!(total_paid(&engine, cy_mortgage.mortgage_id), dec!(42000.00));
    assert_eq!(total_paid(&engine, dee_mortgage.mortgage_id), dec!(56900.00));
}

#[test]
fn slot_without_mortgages_reconciles_to_nothing() {
    let engine = build();
    funded_client(&engine, "Ada Park", dec!(10.00));
    assert!(engine.reconcile_mortgages(slot()).unwrap().is_empty());
}

#[test]
fn paid_off_by_reconcile_frees_income_for_spending() {
    let mut config = SimConfig::default_test();
    config.spending.categories = vec![SpendingCategory {
        name: "Groceries".to_string(),
        min_pct: 0.10,
        max_pct: 0.20,
        variability: 0.0,
        active: true,
    }];
    let engine = build_with(config);
    let client = employed_client(&engine, "Cy Lindqvist", dec!(300000.00), dec!(60000));
    let mortgage = accepted_mortgage(&engine, &client, dec!(200000.00), dec!(1200.00));

    engine.pay_mortgage(mortgage.mortgage_id, dec!(144000.00)).unwrap();
    assert_eq!(engine.client(client.client_id).unwrap().mandatory_spend, dec!(0.00));

    // Stored total drifted behind the ledger.
    engine
        .store()
        .update_mortgage_total_paid(mortgage.mortgage_id, dec!(56000.00))
        .unwrap();
    engine.recalc_mandatory_spend(client.client_id).unwrap();
    assert_eq!(engine.client(client.client_id).unwrap().mandatory_spend, dec!(1200.00));

    engine.reconcile_mortgages(slot()).unwrap();
    assert_eq!(total_paid(&engine, mortgage.mortgage_id), dec!(200000.00));
    assert_eq!(engine.client(client.client_id).unwrap().mandatory_spend, dec!(0.00));

    // pct = 0.15 of the full 5000.00 monthly income.
    let mut rng = SequenceRng::new(vec![0.5]);
    let posted = engine
        .generate_spending_with(client.client_id, 0, &mut rng)
        .unwrap();
    let spent: Decimal = posted.iter().map(|t| t.amount).sum();
    assert_eq!(spent, dec!(750.00));
}
