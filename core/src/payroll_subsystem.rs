//! Payroll: jobs, assignments and the payday catch-up loop.
//!
//! Each primary client job carries its own `next_payday` cursor. A run pays
//! every payday at or before the requested day, one month's salary per
//! payday, each as its own PAYROLL_DEPOSIT. Skipped days are never merged.
//! Non-primary jobs never pay.

use crate::{
    clock::ClockEngine,
    config::SimConfig,
    error::{SimError, SimResult},
    model::{ClientJob, Job, Transaction, TransactionType},
    money,
    store::SimStore,
    types::{whole_day, EntityId, GameDay, SlotKey},
};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;

/// One month of an annual salary.
pub fn monthly_pay(annual_salary: Decimal, days_per_year: i64) -> Decimal {
    money::round(annual_salary / Decimal::from(days_per_year))
}

pub struct PayrollSubsystem<'a> {
    store: &'a SimStore,
    config: &'a SimConfig,
    time: &'a SafeTimeProvider,
}

impl<'a> PayrollSubsystem<'a> {
    pub fn new(store: &'a SimStore, config: &'a SimConfig, time: &'a SafeTimeProvider) -> Self {
        Self {
            store,
            config,
            time,
        }
    }

    // ── Jobs ──────────────────────────────────────────────────────

    pub fn create_job(
        &self,
        title: &str,
        employer: &str,
        annual_salary: Decimal,
        pay_cycle_days: i64,
    ) -> SimResult<Job> {
        if title.trim().is_empty() || employer.trim().is_empty() {
            return Err(SimError::validation("job title and employer are required"));
        }
        money::require_positive(annual_salary, "annual salary")?;
        if pay_cycle_days <= 0 {
            return Err(SimError::validation("pay cycle must be at least one day"));
        }
        let job_id = self.store.insert_job(
            title.trim(),
            employer.trim(),
            money::round(annual_salary),
            pay_cycle_days,
        )?;
        self.store.job(job_id)
    }

    /// Put a client in a job. The first payday is the next whole day.
    /// A primary assignment demotes the client's other primary jobs.
    pub fn assign_job(&self, client_id: EntityId, job_id: EntityId, primary: bool) -> SimResult<ClientJob> {
        self.store.atomic(|store| {
            let clock = ClockEngine::new(store, &self.config.clock, self.time);
            let (_, account) = clock.advance_for_client(client_id)?;
            store.job(job_id)?;

            let next_payday = whole_day(account.game_day) as GameDay + 1.0;
            let client_job_id = store.insert_client_job(client_id, job_id, primary, next_payday)?;
            if primary {
                let demoted = store.demote_primary_jobs(client_id, client_job_id)?;
                if demoted > 0 {
                    log::info!("client {client_id}: demoted {demoted} primary job(s)");
                }
            }
            self.recalc_monthly_income(client_id)?;
            log::info!(
                "client {client_id}: assigned job {job_id} (primary={primary}, next_payday={next_payday})"
            );
            store.client_job(client_job_id)
        })
    }

    /// Recompute the cached monthly income from primary salaries.
    pub fn recalc_monthly_income(&self, client_id: EntityId) -> SimResult<Decimal> {
        let annual: Decimal = self.store.primary_salaries(client_id)?.into_iter().sum();
        let income = monthly_pay(annual, self.config.clock.days_per_year);
        self.store.update_monthly_income(client_id, income)?;
        Ok(income)
    }

    // ── Payday catch-up ───────────────────────────────────────────

    /// Pay every primary job under the slot up to `as_of`.
    pub fn run_payroll(&self, key: SlotKey, as_of: GameDay) -> SimResult<Vec<Transaction>> {
        if !as_of.is_finite() {
            return Err(SimError::validation(format!("payroll day {as_of} is not finite")));
        }
        let account = self.store.account(key)?;
        let mut posted = Vec::new();
        for client_job_id in self.store.primary_client_job_ids(account.account_id)? {
            posted.extend(self.pay_job(client_job_id, as_of)?);
        }
        if !posted.is_empty() {
            log::info!(
                "slot {key}: payroll posted {} payment(s) up to day {as_of:.3}",
                posted.len()
            );
        }
        Ok(posted)
    }

    /// Catch one job up. The cursor is re-read inside the transaction, so a
    /// concurrent duplicate run finds nothing left to pay.
    fn pay_job(&self, client_job_id: EntityId, as_of: GameDay) -> SimResult<Vec<Transaction>> {
        self.store.atomic(|store| {
            let client_job = store.client_job(client_job_id)?;
            if !client_job.primary {
                return Ok(Vec::new());
            }
            let Some(mut next_payday) = client_job.next_payday else {
                let first = whole_day(as_of) as GameDay + 1.0;
                log::warn!(
                    "client job {client_job_id}: no payday cursor, first payday set to {first}"
                );
                store.update_next_payday(client_job_id, first)?;
                return Ok(Vec::new());
            };

            let job = store.job(client_job.job_id)?;
            let pay = monthly_pay(job.annual_salary, self.config.clock.days_per_year);
            let client_id = client_job.client_id;
            let mut posted = Vec::new();
            while next_payday <= as_of {
                let day = whole_day(next_payday);
                let checking = store.client(client_id)?.checking;
                store.update_checking(client_id, money::round(checking + pay))?;
                let txn = Transaction::new(
                    client_id,
                    TransactionType::PayrollDeposit,
                    pay,
                    day,
                    self.time.now(),
                )
                .with_description(format!("{} ({})", job.title, job.employer));
                store.insert_transaction(&txn)?;
                log::debug!("day={day} payroll: paid {pay} to client {client_id}");
                posted.push(txn);
                next_payday += 1.0;
            }
            if !posted.is_empty() {
                store.update_next_payday(client_job_id, next_payday)?;
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
    fn monthly_pay_rounds_half_up() {
        assert_eq!(monthly_pay(dec!(36500), 12), dec!(3041.67));
        assert_eq!(monthly_pay(dec!(60000), 12), dec!(5000.00));
    }
}
