//! Mortgage ledger reconciliation.
//!
//! MORTGAGE_PAYMENT rows are not linked to a mortgage. When a client has
//! held more than one mortgage, `total_paid` per mortgage is rebuilt from the
//! ledger by nearest-amount matching:
//!
//!   - each mortgage's running total starts at its down payment
//!   - a client's mortgages are ordered by start day (unset last), then by
//!     creation time
//!   - payments are replayed in (game day, creation time) order
//!   - a payment may go to a mortgage that has started by the payment's day
//!     (or has no start day), has a monthly payment, and is not yet paid off
//!   - the candidate with the monthly payment closest to the amount wins;
//!     on a tie the earliest start day wins
//!   - totals are clamped to the property price
//!   - a client whose totals changed has its mandatory spend recalculated
//!
//! This is a heuristic. Two mortgages with the same monthly payment in the
//! same window resolve to the earlier one, always.

use crate::{
    error::SimResult,
    mandatory_spend::MandatorySpendAggregator,
    model::{Mortgage, MortgageStatus, Transaction, TransactionType},
    money,
    store::SimStore,
    types::{Day, EntityId, SlotKey},
};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A mortgage being rebuilt: its schedule facts plus the running total.
#[derive(Debug, Clone)]
pub struct MortgageTally {
    pub mortgage_id: EntityId,
    pub start_payment_day: Option<Day>,
    pub monthly_payment: Option<Decimal>,
    pub property_price: Decimal,
    pub paid: Decimal,
}

impl MortgageTally {
    pub fn seeded(m: &Mortgage) -> Self {
        Self {
            mortgage_id: m.mortgage_id,
            start_payment_day: m.start_payment_day,
            monthly_payment: m.monthly_payment,
            property_price: m.property_price,
            paid: m.down_payment,
        }
    }

    fn accepts(&self, day: Day) -> bool {
        self.start_payment_day.map_or(true, |start| start <= day)
            && self.monthly_payment.is_some()
            && self.paid < self.property_price
    }
}

/// Start day ascending with unset days last, then creation time.
pub fn schedule_order(a: &Mortgage, b: &Mortgage) -> Ordering {
    match (a.start_payment_day, b.start_payment_day) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then(a.created_at.cmp(&b.created_at))
    .then(a.mortgage_id.cmp(&b.mortgage_id))
}

/// Index of the tally a payment should be credited to, if any.
/// `tallies` must already be in schedule order.
pub fn select_candidate(tallies: &[MortgageTally], day: Day, amount: Decimal) -> Option<usize> {
    let mut best: Option<(usize, Decimal)> = None;
    for (i, tally) in tallies.iter().enumerate() {
        if !tally.accepts(day) {
            continue;
        }
        let Some(monthly) = tally.monthly_payment else {
            continue;
        };
        let diff = (amount - monthly).abs();
        best = match best {
            None => Some((i, diff)),
            Some((_, best_diff)) if diff < best_diff => Some((i, diff)),
            Some((b, best_diff)) if diff == best_diff => {
                let earlier = match (tallies[b].start_payment_day, tally.start_payment_day) {
                    (None, _) => true,
                    (Some(current), Some(candidate)) => candidate < current,
                    (Some(_), None) => false,
                };
                if earlier {
                    Some((i, diff))
                } else {
                    Some((b, best_diff))
                }
            }
            keep => keep,
        };
    }
    best.map(|(i, _)| i)
}

/// Replay a client's payments onto its tallies and clamp the results.
pub fn replay_payments(tallies: &mut [MortgageTally], payments: &[Transaction]) {
    for txn in payments {
        match select_candidate(tallies, txn.game_day, txn.amount) {
            Some(i) => tallies[i].paid += txn.amount,
            None => log::debug!(
                "day={} reconcile: payment {} of {} matched no mortgage",
                txn.game_day,
                txn.txn_id,
                txn.amount
            ),
        }
    }
    for tally in tallies.iter_mut() {
        tally.paid = money::round(tally.paid.min(tally.property_price));
    }
}

pub struct MortgageReconciliationSubsystem<'a> {
    store: &'a SimStore,
}

impl<'a> MortgageReconciliationSubsystem<'a> {
    pub fn new(store: &'a SimStore) -> Self {
        Self { store }
    }

    /// Rebuild `total_paid` for every accepted mortgage under the slot.
    /// Returns the mortgages as persisted.
    pub fn reconcile(&self, key: SlotKey) -> SimResult<Vec<Mortgage>> {
        self.store.atomic(|store| {
            let account = store.account(key)?;
            let mut by_client: BTreeMap<EntityId, Vec<Mortgage>> = BTreeMap::new();
            for m in store.mortgages_for_account(account.account_id, MortgageStatus::Accepted)? {
                by_client.entry(m.client_id).or_default().push(m);
            }
            if by_client.is_empty() {
                return Ok(Vec::new());
            }

            let client_ids: Vec<EntityId> = by_client.keys().copied().collect();
            let mut payments: BTreeMap<EntityId, Vec<Transaction>> = BTreeMap::new();
            for txn in store.transactions_for_clients(&client_ids, &[TransactionType::MortgagePayment])? {
                payments.entry(txn.client_id).or_default().push(txn);
            }

            let mut reconciled = Vec::new();
            let mut changed = 0usize;
            for (client_id, mut mortgages) in by_client {
                mortgages.sort_by(schedule_order);
                let mut tallies: Vec<MortgageTally> =
                    mortgages.iter().map(MortgageTally::seeded).collect();
                let client_payments = payments.remove(&client_id).unwrap_or_default();
                replay_payments(&mut tallies, &client_payments);

                let mut client_changed = false;
                for (mut mortgage, tally) in mortgages.into_iter().zip(tallies) {
                    if mortgage.total_paid != tally.paid {
                        store.update_mortgage_total_paid(mortgage.mortgage_id, tally.paid)?;
                        mortgage.total_paid = tally.paid;
                        client_changed = true;
                        changed += 1;
                    }
                    reconciled.push(mortgage);
                }
                if client_changed {
                    MandatorySpendAggregator::new(store).recalc(client_id)?;
                }
            }
            log::info!(
                "slot {key}: reconciled {} mortgage(s), {changed} total(s) changed",
                reconciled.len()
            );
            Ok(reconciled)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn tally(id: EntityId, start: Option<Day>, monthly: Decimal, price: Decimal) -> MortgageTally {
        MortgageTally {
            mortgage_id: id,
            start_payment_day: start,
            monthly_payment: Some(monthly),
            property_price: price,
            paid: Decimal::ZERO,
        }
    }

    fn payment(day: Day, amount: Decimal) -> Transaction {
        Transaction::new(1, TransactionType::MortgagePayment, amount, day, Utc::now())
    }

    #[test]
    fn nearest_monthly_payment_wins() {
        let tallies = vec![
            tally(1, Some(0), dec!(1200.00), dec!(200000.00)),
            tally(2, Some(0), dec!(900.00), dec!(150000.00)),
        ];
        assert_eq!(select_candidate(&tallies, 5, dec!(895.00)), Some(1));
        assert_eq!(select_candidate(&tallies, 5, dec!(1100.00)), Some(0));
    }

    #[test]
    fn tie_goes_to_earliest_start() {
        let tallies = vec![
            tally(1, Some(2), dec!(900.00), dec!(150000.00)),
            tally(2, Some(1), dec!(900.00), dec!(150000.00)),
        ];
        assert_eq!(select_candidate(&tallies, 5, dec!(900.00)), Some(1));
    }

    #[test]
    fn tie_prefers_a_start_day_over_none() {
        let tallies = vec![
            tally(1, None, dec!(900.00), dec!(150000.00)),
            tally(2, Some(3), dec!(900.00), dec!(150000.00)),
        ];
        assert_eq!(select_candidate(&tallies, 5, dec!(900.00)), Some(1));
    }

    #[test]
    fn mortgage_not_yet_started_is_skipped() {
        let tallies = vec![
            tally(1, Some(0), dec!(1200.00), dec!(200000.00)),
            tally(2, Some(10), dec!(900.00), dec!(150000.00)),
        ];
        assert_eq!(select_candidate(&tallies, 5, dec!(900.00)), Some(0));
    }

    #[test]
    fn paid_off_mortgage_is_skipped() {
        let mut tallies = vec![
            tally(1, Some(0), dec!(1200.00), dec!(200000.00)),
            tally(2, Some(0), dec!(900.00), dec!(1000.00)),
        ];
        tallies[1].paid = dec!(1000.00);
        assert_eq!(select_candidate(&tallies, 5, dec!(900.00)), Some(0));
    }

    #[test]
    fn no_candidate_when_nothing_started() {
        let tallies = vec![tally(1, Some(9), dec!(900.00), dec!(1000.00))];
        assert_eq!(select_candidate(&tallies, 5, dec!(900.00)), None);
    }

    #[test]
    fn replay_clamps_to_price() {
        let mut tallies = vec![tally(1, Some(0), dec!(600.00), dec!(1000.00))];
        replay_payments(
            &mut tallies,
            &[payment(1, dec!(600.00)), payment(2, dec!(600.00)), payment(3, dec!(600.00))],
        );
        // Third payment finds the mortgage paid off and is not credited.
        assert_eq!(tallies[0].paid, dec!(1000.00));
    }
}
