//! Living arrangements and the rent catch-up loop.
//!
//! Rent is the mirror of payroll: each renting client carries a
//! `next_rent_day` cursor, and every rent day at or before the requested day
//! is charged separately. A short balance is drained to zero and recorded as
//! PAYMENT_FAILED for the partial amount. Checking never goes negative.

use crate::{
    clock::ClockEngine,
    config::SimConfig,
    error::{SimError, SimResult},
    mandatory_spend::MandatorySpendAggregator,
    model::{ClientLiving, LivingKind, Property, PropertyStatus, Rental, Transaction, TransactionType},
    money,
    store::SimStore,
    types::{whole_day, Day, EntityId, GameDay, SlotKey},
};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;

/// Amount debited against a due rent and the ledger type it is recorded as.
pub fn settle_rent(checking: Decimal, due: Decimal) -> (Decimal, TransactionType) {
    let paid = money::round(checking.min(due).max(Decimal::ZERO));
    if paid == due {
        (paid, TransactionType::RentPayment)
    } else {
        (paid, TransactionType::PaymentFailed)
    }
}

pub struct RentSubsystem<'a> {
    store: &'a SimStore,
    config: &'a SimConfig,
    time: &'a SafeTimeProvider,
}

impl<'a> RentSubsystem<'a> {
    pub fn new(store: &'a SimStore, config: &'a SimConfig, time: &'a SafeTimeProvider) -> Self {
        Self {
            store,
            config,
            time,
        }
    }

    fn period(&self) -> Day {
        self.config.credit.repayment_period_days
    }

    // ── Catalogue ─────────────────────────────────────────────────

    pub fn create_rental(&self, name: &str, monthly_rent: Decimal) -> SimResult<Rental> {
        if name.trim().is_empty() {
            return Err(SimError::validation("rental name is required"));
        }
        money::require_positive(monthly_rent, "monthly rent")?;
        let rental_id = self
            .store
            .insert_rental(name.trim(), money::round(monthly_rent))?;
        self.store.rental(rental_id)
    }

    pub fn create_property(&self, key: SlotKey, name: &str, price: Decimal) -> SimResult<Property> {
        if name.trim().is_empty() {
            return Err(SimError::validation("property name is required"));
        }
        money::require_positive(price, "property price")?;
        let account = self.store.account(key)?;
        let property_id =
            self.store
                .insert_property(account.account_id, name.trim(), money::round(price))?;
        self.store.property(property_id)
    }

    // ── Assignment ────────────────────────────────────────────────

    /// Rent a place. The first charge falls one repayment period after today.
    pub fn assign_rental(&self, client_id: EntityId, rental_id: EntityId) -> SimResult<ClientLiving> {
        self.store.atomic(|store| {
            let clock = ClockEngine::new(store, &self.config.clock, self.time);
            let (_, account) = clock.advance_for_client(client_id)?;
            let rental = store.rental(rental_id)?;
            let living = ClientLiving {
                client_id,
                kind: LivingKind::Rental,
                rental_id: Some(rental.rental_id),
                property_id: None,
                monthly_rent: rental.monthly_rent,
                next_rent_day: Some(whole_day(account.game_day) + self.period()),
            };
            self.replace_living(store, &living)
        })
    }

    /// Live in a property the client owns. No rent.
    pub fn assign_owned_property(
        &self,
        client_id: EntityId,
        property_id: EntityId,
    ) -> SimResult<ClientLiving> {
        self.store.atomic(|store| {
            let property = store.property(property_id)?;
            if property.status != PropertyStatus::Owned || property.owner_client_id != Some(client_id)
            {
                return Err(SimError::validation(format!(
                    "property {property_id} is not owned by client {client_id}"
                )));
            }
            let living = ClientLiving {
                client_id,
                kind: LivingKind::Owned,
                rental_id: None,
                property_id: Some(property_id),
                monthly_rent: money::round(Decimal::ZERO),
                next_rent_day: None,
            };
            self.replace_living(store, &living)
        })
    }

    pub fn clear_living(&self, client_id: EntityId) -> SimResult<ClientLiving> {
        self.store.atomic(|store| {
            store.client(client_id)?;
            let living = ClientLiving {
                client_id,
                kind: LivingKind::None,
                rental_id: None,
                property_id: None,
                monthly_rent: money::round(Decimal::ZERO),
                next_rent_day: None,
            };
            self.replace_living(store, &living)
        })
    }

    fn replace_living(&self, store: &SimStore, living: &ClientLiving) -> SimResult<ClientLiving> {
        store.save_client_living(living)?;
        MandatorySpendAggregator::new(store).recalc(living.client_id)?;
        log::info!(
            "client {}: living set to {} (rent {})",
            living.client_id,
            living.kind,
            living.monthly_rent
        );
        store.client_living(living.client_id)
    }

    // ── Rent catch-up ─────────────────────────────────────────────

    /// Charge every rent day at or before `as_of` for renters under the slot.
    pub fn charge_rent(&self, key: SlotKey, as_of: GameDay) -> SimResult<Vec<Transaction>> {
        if !as_of.is_finite() {
            return Err(SimError::validation(format!("rent day {as_of} is not finite")));
        }
        let account = self.store.account(key)?;
        let mut posted = Vec::new();
        for client_id in self.store.rent_paying_client_ids(account.account_id)? {
            posted.extend(self.charge_client(client_id, as_of)?);
        }
        if !posted.is_empty() {
            log::info!(
                "slot {key}: rent posted {} charge(s) up to day {as_of:.3}",
                posted.len()
            );
        }
        Ok(posted)
    }

    fn charge_client(&self, client_id: EntityId, as_of: GameDay) -> SimResult<Vec<Transaction>> {
        self.store.atomic(|store| {
            let living = store.client_living(client_id)?;
            let due = living.monthly_rent;
            if due <= Decimal::ZERO {
                return Ok(Vec::new());
            }
            let Some(mut next_rent_day) = living.next_rent_day else {
                let first = whole_day(as_of) + self.period();
                log::warn!("client {client_id}: no rent cursor, first rent day set to {first}");
                store.update_next_rent_day(client_id, Some(first))?;
                return Ok(Vec::new());
            };

            let mut posted = Vec::new();
            while as_of >= next_rent_day as GameDay {
                let checking = store.client(client_id)?.checking;
                let (paid, kind) = settle_rent(checking, due);
                store.update_checking(client_id, money::round(checking - paid))?;
                let txn = Transaction::new(client_id, kind, paid, next_rent_day, self.time.now());
                store.insert_transaction(&txn)?;
                if kind == TransactionType::PaymentFailed {
                    log::warn!(
                        "day={next_rent_day} rent: client {client_id} paid {paid} of {due}"
                    );
                } else {
                    log::debug!("day={next_rent_day} rent: client {client_id} paid {paid}");
                }
                posted.push(txn);
                next_rent_day += self.period();
            }
            if !posted.is_empty() {
                store.update_next_rent_day(client_id, Some(next_rent_day))?;
            }
            Ok(posted)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn full_payment_is_rent_payment() {
        assert_eq!(
            settle_rent(dec!(1000.00), dec!(50.00)),
            (dec!(50.00), TransactionType::RentPayment)
        );
    }

    #[test]
    fn short_balance_is_partial_failed_payment() {
        assert_eq!(
            settle_rent(dec!(30.00), dec!(50.00)),
            (dec!(30.00), TransactionType::PaymentFailed)
        );
    }

    #[test]
    fn empty_balance_pays_nothing() {
        assert_eq!(
            settle_rent(dec!(0.00), dec!(50.00)),
            (dec!(0.00), TransactionType::PaymentFailed)
        );
    }
}
