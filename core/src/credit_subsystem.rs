//! Loans and mortgages.
//!
//! Applications start PENDING and are decided exactly once. Approving a loan
//! disburses it into checking; accepting a mortgage takes the down payment,
//! hands the property to the client and starts the payment schedule.
//! Every decision or payment refreshes the client's mandatory spend.

use crate::{
    clock::ClockEngine,
    config::SimConfig,
    error::{SimError, SimResult},
    mandatory_spend::MandatorySpendAggregator,
    model::{
        Loan, LoanStatus, Mortgage, MortgageStatus, PropertyStatus, Transaction, TransactionType,
    },
    money,
    store::SimStore,
    types::{whole_day, Day, EntityId},
};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;

/// Level monthly payment over the whole term.
pub fn monthly_installment(principal: Decimal, term_years: i64, days_per_year: i64) -> Decimal {
    let months = Decimal::from(term_years * days_per_year);
    if months <= Decimal::ZERO {
        return money::round(principal);
    }
    money::round(principal / months)
}

pub struct CreditSubsystem<'a> {
    store: &'a SimStore,
    config: &'a SimConfig,
    time: &'a SafeTimeProvider,
}

impl<'a> CreditSubsystem<'a> {
    pub fn new(store: &'a SimStore, config: &'a SimConfig, time: &'a SafeTimeProvider) -> Self {
        Self {
            store,
            config,
            time,
        }
    }

    fn clock(&self) -> ClockEngine<'a> {
        ClockEngine::new(self.store, &self.config.clock, self.time)
    }

    fn post(
        &self,
        store: &SimStore,
        client_id: EntityId,
        kind: TransactionType,
        amount: Decimal,
        day: Day,
    ) -> SimResult<()> {
        let txn = Transaction::new(client_id, kind, amount, day, self.time.now());
        store.insert_transaction(&txn)?;
        log::info!("day={day} credit: client {client_id} {kind} {amount}");
        Ok(())
    }

    // ── Loans ─────────────────────────────────────────────────────

    pub fn apply_loan(&self, client_id: EntityId, amount: Decimal, term_years: i64) -> SimResult<Loan> {
        money::require_positive(amount, "loan amount")?;
        let credit = &self.config.credit;
        if !(credit.loan_min_term_years..=credit.loan_max_term_years).contains(&term_years) {
            return Err(SimError::validation(format!(
                "loan term must be between {} and {} years",
                credit.loan_min_term_years, credit.loan_max_term_years
            )));
        }
        self.store.atomic(|store| {
            self.clock().advance_for_client(client_id)?;
            let loan_id =
                store.insert_loan(client_id, money::round(amount), term_years, self.time.now())?;
            log::info!("client {client_id}: applied for loan {loan_id} of {amount}");
            store.loan(loan_id)
        })
    }

    pub fn decide_loan(&self, loan_id: EntityId, decision: LoanStatus) -> SimResult<Loan> {
        if decision == LoanStatus::Pending {
            return Err(SimError::validation("a loan decision must approve or reject"));
        }
        self.store.atomic(|store| {
            let mut loan = store.loan(loan_id)?;
            if loan.status != LoanStatus::Pending {
                return Err(SimError::InvalidTransition {
                    entity: "loan",
                    id: loan_id.to_string(),
                    from: loan.status.to_string(),
                    to: decision.to_string(),
                });
            }
            let (client, account) = self.clock().advance_for_client(loan.client_id)?;
            loan.status = decision;

            if decision == LoanStatus::Approved {
                let today = whole_day(account.game_day);
                store.update_checking(client.client_id, money::round(client.checking + loan.amount))?;
                self.post(store, client.client_id, TransactionType::LoanDisbursement, loan.amount, today)?;
                loan.monthly_payment = Some(monthly_installment(
                    loan.amount,
                    loan.term_years,
                    self.config.clock.days_per_year,
                ));
                loan.next_payment_day = Some(today + self.config.credit.repayment_period_days);
            }
            store.save_loan(&loan)?;
            MandatorySpendAggregator::new(store).recalc(loan.client_id)?;
            log::info!("loan {loan_id}: {decision}");
            Ok(loan)
        })
    }

    pub fn loans(&self, client_id: EntityId) -> SimResult<Vec<Loan>> {
        self.store.loans_for_client(client_id)
    }

    // ── Mortgages ─────────────────────────────────────────────────

    pub fn apply_mortgage(
        &self,
        client_id: EntityId,
        property_id: EntityId,
        down_payment: Decimal,
        term_years: i64,
    ) -> SimResult<Mortgage> {
        let credit = &self.config.credit;
        if !(credit.mortgage_min_term_years..=credit.mortgage_max_term_years).contains(&term_years) {
            return Err(SimError::validation(format!(
                "mortgage term must be between {} and {} years",
                credit.mortgage_min_term_years, credit.mortgage_max_term_years
            )));
        }
        if down_payment < Decimal::ZERO {
            return Err(SimError::validation("down payment must not be negative"));
        }
        let down_payment = money::round(down_payment);
        self.store.atomic(|store| {
            let (_, account) = self.clock().advance_for_client(client_id)?;
            let property = store.property(property_id)?;
            if property.status != PropertyStatus::Available {
                return Err(SimError::validation(format!(
                    "property {property_id} is not available"
                )));
            }
            if down_payment > property.price {
                return Err(SimError::validation("down payment exceeds the property price"));
            }
            let mortgage = Mortgage {
                mortgage_id: 0,
                client_id,
                property_id,
                property_price: property.price,
                down_payment,
                loan_amount: money::round(property.price - down_payment),
                interest_rate: account.mortgage_rate,
                term_years,
                status: MortgageStatus::Pending,
                monthly_payment: None,
                next_payment_day: None,
                start_payment_day: None,
                total_paid: money::round(Decimal::ZERO),
                payments_made: 0,
                created_at: self.time.now(),
            };
            let mortgage_id = store.insert_mortgage(&mortgage)?;
            log::info!("client {client_id}: applied for mortgage {mortgage_id} on property {property_id}");
            store.mortgage(mortgage_id)
        })
    }

    pub fn decide_mortgage(&self, mortgage_id: EntityId, decision: MortgageStatus) -> SimResult<Mortgage> {
        if decision == MortgageStatus::Pending {
            return Err(SimError::validation("a mortgage decision must accept or reject"));
        }
        self.store.atomic(|store| {
            let mut mortgage = store.mortgage(mortgage_id)?;
            if mortgage.status != MortgageStatus::Pending {
                return Err(SimError::InvalidTransition {
                    entity: "mortgage",
                    id: mortgage_id.to_string(),
                    from: mortgage.status.to_string(),
                    to: decision.to_string(),
                });
            }
            let (client, account) = self.clock().advance_for_client(mortgage.client_id)?;

            if decision == MortgageStatus::Accepted {
                let property = store.property(mortgage.property_id)?;
                if property.status != PropertyStatus::Available {
                    return Err(SimError::validation(format!(
                        "property {} is no longer available",
                        property.property_id
                    )));
                }
                if client.checking < mortgage.down_payment {
                    return Err(SimError::InsufficientFunds(format!(
                        "down payment {} exceeds checking {}",
                        mortgage.down_payment, client.checking
                    )));
                }

                let today = whole_day(account.game_day);
                if mortgage.down_payment > Decimal::ZERO {
                    store.update_checking(
                        client.client_id,
                        money::round(client.checking - mortgage.down_payment),
                    )?;
                    self.post(
                        store,
                        client.client_id,
                        TransactionType::MortgageDownPayment,
                        mortgage.down_payment,
                        today,
                    )?;
                }
                store.update_property_owner(
                    property.property_id,
                    PropertyStatus::Owned,
                    Some(client.client_id),
                )?;
                mortgage.monthly_payment = Some(monthly_installment(
                    mortgage.loan_amount,
                    mortgage.term_years,
                    self.config.clock.days_per_year,
                ));
                mortgage.start_payment_day = Some(today);
                mortgage.next_payment_day = Some(today + self.config.credit.repayment_period_days);
                mortgage.total_paid = mortgage.down_payment;
            }
            mortgage.status = decision;
            store.save_mortgage(&mortgage)?;
            MandatorySpendAggregator::new(store).recalc(mortgage.client_id)?;
            log::info!("mortgage {mortgage_id}: {decision}");
            Ok(mortgage)
        })
    }

    /// Pay toward an accepted mortgage. The amount is capped at what is left
    /// to pay; the capped amount is what gets debited and recorded.
    pub fn pay_mortgage(&self, mortgage_id: EntityId, amount: Decimal) -> SimResult<Mortgage> {
        money::require_positive(amount, "mortgage payment")?;
        let amount = money::round(amount);
        self.store.atomic(|store| {
            let mut mortgage = store.mortgage(mortgage_id)?;
            if mortgage.status != MortgageStatus::Accepted {
                return Err(SimError::validation(format!(
                    "mortgage {mortgage_id} is {}, not ACCEPTED",
                    mortgage.status
                )));
            }
            let remaining = mortgage.remaining();
            if remaining <= Decimal::ZERO {
                return Err(SimError::validation(format!(
                    "mortgage {mortgage_id} is already paid off"
                )));
            }
            let (client, account) = self.clock().advance_for_client(mortgage.client_id)?;
            if amount > client.checking {
                return Err(SimError::InsufficientFunds(format!(
                    "cannot pay {amount}, checking is {}",
                    client.checking
                )));
            }

            let paid = amount.min(remaining);
            let today = whole_day(account.game_day);
            store.update_checking(client.client_id, money::round(client.checking - paid))?;
            self.post(store, client.client_id, TransactionType::MortgagePayment, paid, today)?;
            mortgage.total_paid = money::round(mortgage.total_paid + paid);
            mortgage.payments_made += 1;
            mortgage.next_payment_day = Some(today + self.config.credit.repayment_period_days);
            store.save_mortgage(&mortgage)?;
            MandatorySpendAggregator::new(store).recalc(mortgage.client_id)?;
            Ok(mortgage)
        })
    }

    pub fn mortgages(&self, client_id: EntityId) -> SimResult<Vec<Mortgage>> {
        self.store.mortgages_for_client(client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn installment_spreads_principal_over_term() {
        assert_eq!(monthly_installment(dec!(36000), 3, 12), dec!(1000.00));
        assert_eq!(monthly_installment(dec!(180000), 15, 12), dec!(1000.00));
        assert_eq!(monthly_installment(dec!(10000), 3, 12), dec!(277.78));
    }
}
