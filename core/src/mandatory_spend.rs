//! Mandatory spend: the monthly total a client is obliged to pay.
//!
//! Counts approved loans, accepted mortgages on a property the client still
//! owns that are not yet paid off, and the current rent. The total is cached
//! on the client and written only when it changes, so `recalc` can be called
//! after any obligation change without churning the row.

use crate::{
    error::SimResult,
    model::{ClientLiving, Loan, LoanStatus, Mortgage, MortgageStatus, Property, PropertyStatus},
    money,
    store::SimStore,
    types::EntityId,
};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MandatorySpend {
    pub total: Decimal,
    /// False when the cached value already matched and nothing was written.
    pub persisted: bool,
}

/// Whether a mortgage still counts toward the client's obligations.
pub fn mortgage_counts(client_id: EntityId, mortgage: &Mortgage, property: &Property) -> bool {
    mortgage.status == MortgageStatus::Accepted
        && mortgage.monthly_payment.is_some()
        && property.status == PropertyStatus::Owned
        && property.owner_client_id == Some(client_id)
        && !mortgage.is_paid_off()
}

/// Sum a client's obligations. Pure.
pub fn mandatory_total(
    client_id: EntityId,
    loans: &[Loan],
    mortgages: &[(Mortgage, Property)],
    living: Option<&ClientLiving>,
) -> Decimal {
    let loans: Decimal = loans
        .iter()
        .filter(|l| l.status == LoanStatus::Approved)
        .filter_map(|l| l.monthly_payment)
        .sum();
    let mortgages: Decimal = mortgages
        .iter()
        .filter(|(m, p)| mortgage_counts(client_id, m, p))
        .filter_map(|(m, _)| m.monthly_payment)
        .sum();
    let rent = living
        .map(|l| l.monthly_rent.max(Decimal::ZERO))
        .unwrap_or(Decimal::ZERO);
    money::round(loans + mortgages + rent)
}

pub struct MandatorySpendAggregator<'a> {
    store: &'a SimStore,
}

impl<'a> MandatorySpendAggregator<'a> {
    pub fn new(store: &'a SimStore) -> Self {
        Self { store }
    }

    pub fn recalc(&self, client_id: EntityId) -> SimResult<MandatorySpend> {
        self.store.atomic(|store| {
            let client = store.client(client_id)?;
            let loans = store.loans_for_client(client_id)?;
            let mortgages = store
                .mortgages_for_client(client_id)?
                .into_iter()
                .map(|m| {
                    let property = store.property(m.property_id)?;
                    Ok((m, property))
                })
                .collect::<SimResult<Vec<_>>>()?;
            let living = store.client_living(client_id)?;

            let total = mandatory_total(client_id, &loans, &mortgages, Some(&living));
            if total == client.mandatory_spend {
                return Ok(MandatorySpend {
                    total,
                    persisted: false,
                });
            }
            store.update_mandatory_spend(client_id, total)?;
            log::debug!(
                "client {client_id}: mandatory spend {} -> {total}",
                client.mandatory_spend
            );
            Ok(MandatorySpend {
                total,
                persisted: true,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LivingKind;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn loan(status: LoanStatus, payment: Decimal) -> Loan {
        Loan {
            loan_id: 1,
            client_id: 7,
            amount: dec!(36000),
            term_years: 3,
            status,
            monthly_payment: Some(payment),
            next_payment_day: Some(1),
            created_at: Utc::now(),
        }
    }

    fn mortgage(total_paid: Decimal) -> Mortgage {
        Mortgage {
            mortgage_id: 1,
            client_id: 7,
            property_id: 3,
            property_price: dec!(200000.00),
            down_payment: dec!(20000.00),
            loan_amount: dec!(180000.00),
            interest_rate: Decimal::ZERO,
            term_years: 15,
            status: MortgageStatus::Accepted,
            monthly_payment: Some(dec!(1000.00)),
            next_payment_day: Some(1),
            start_payment_day: Some(0),
            total_paid,
            payments_made: 0,
            created_at: Utc::now(),
        }
    }

    fn owned_property(owner: EntityId) -> Property {
        Property {
            property_id: 3,
            account_id: 1,
            name: "Maple Street".into(),
            price: dec!(200000.00),
            status: PropertyStatus::Owned,
            owner_client_id: Some(owner),
        }
    }

    fn rental(rent: Decimal) -> ClientLiving {
        ClientLiving {
            client_id: 7,
            kind: LivingKind::Rental,
            rental_id: Some(1),
            property_id: None,
            monthly_rent: rent,
            next_rent_day: Some(1),
        }
    }

    #[test]
    fn sums_every_obligation() {
        let total = mandatory_total(
            7,
            &[loan(LoanStatus::Approved, dec!(250.00))],
            &[(mortgage(dec!(20000.00)), owned_property(7))],
            Some(&rental(dec!(800.00))),
        );
        assert_eq!(total, dec!(2050.00));
    }

    #[test]
    fn pending_loans_do_not_count() {
        let total = mandatory_total(7, &[loan(LoanStatus::Pending, dec!(250.00))], &[], None);
        assert_eq!(total, dec!(0.00));
    }

    #[test]
    fn paid_off_mortgage_stops_counting() {
        let total = mandatory_total(
            7,
            &[],
            &[(mortgage(dec!(200000.00)), owned_property(7))],
            None,
        );
        assert_eq!(total, dec!(0.00));
    }

    #[test]
    fn mortgage_on_property_owned_by_someone_else_does_not_count() {
        let total = mandatory_total(
            7,
            &[],
            &[(mortgage(dec!(20000.00)), owned_property(8))],
            None,
        );
        assert_eq!(total, dec!(0.00));
    }
}
