//! Discretionary spending generator.
//!
//! For one client and one game day, spends part of the client's disposable
//! income (monthly income minus mandatory spend) across the active spending
//! categories. Each category samples a percentage, swings it by its
//! variability, caps the target at the running checking balance and splits
//! it into installments, each posted as its own SPENDING transaction.
//!
//! RULES:
//!   - At most one generation per (client, day). The existence check and the
//!     writes share one transaction.
//!   - Categories run in configured order against a running balance. The
//!     balance never goes negative.
//!   - Mandatory spend is recalculated before disposable income is taken.
//!   - All draws come from the injected `RandomSource`.

use crate::{
    config::{SimConfig, SpendingCategory},
    error::SimResult,
    mandatory_spend::MandatorySpendAggregator,
    model::{Transaction, TransactionType},
    money,
    payroll_subsystem::monthly_pay,
    rng::RandomSource,
    store::SimStore,
    types::{Day, EntityId},
};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;

/// Sample the share of disposable income a category takes today.
pub fn sample_pct(category: &SpendingCategory, rng: &mut dyn RandomSource) -> f64 {
    let base = rng.uniform(category.min_pct, category.max_pct);
    let swing = rng.uniform(-category.variability, category.variability);
    (base * (1.0 + swing)).max(0.0)
}

/// Split `total` into `parts` installments with random weights in
/// [0.5, 1.5). Portions are rounded; the last absorbs the remainder.
/// Zero parts is treated as one.
pub fn split_installments(total: Decimal, parts: usize, rng: &mut dyn RandomSource) -> Vec<Decimal> {
    let parts = parts.max(1);
    let weights: Vec<f64> = (0..parts).map(|_| 0.5 + rng.next_f64()).collect();
    let weight_sum: f64 = weights.iter().sum();

    let mut portions = Vec::with_capacity(parts);
    let mut allocated = Decimal::ZERO;
    for w in &weights[..parts - 1] {
        let portion = money::round(total * money::ratio(w / weight_sum));
        allocated += portion;
        portions.push(portion);
    }
    portions.push(money::round(total - allocated));
    portions
}

pub struct SpendingSubsystem<'a> {
    store: &'a SimStore,
    config: &'a SimConfig,
    time: &'a SafeTimeProvider,
}

impl<'a> SpendingSubsystem<'a> {
    pub fn new(store: &'a SimStore, config: &'a SimConfig, time: &'a SafeTimeProvider) -> Self {
        Self {
            store,
            config,
            time,
        }
    }

    /// Generate the client's discretionary spending for `day`. Returns the
    /// posted transactions, or nothing if this day was already generated.
    pub fn generate(
        &self,
        client_id: EntityId,
        day: Day,
        rng: &mut dyn RandomSource,
    ) -> SimResult<Vec<Transaction>> {
        self.store.atomic(|store| {
            if store.transaction_exists(client_id, TransactionType::Spending, day)? {
                log::debug!("day={day} spending: client {client_id} already generated");
                return Ok(Vec::new());
            }

            let mandatory = MandatorySpendAggregator::new(store).recalc(client_id)?.total;
            let client = store.client(client_id)?;
            let income = self.monthly_income(store, client_id, client.monthly_income)?;
            let disposable = (income - mandatory).max(Decimal::ZERO);
            let parts = self.config.spending.events_per_month;

            let mut balance = client.checking;
            let mut posted = Vec::new();
            for category in self.config.spending.categories.iter().filter(|c| c.active) {
                let pct = sample_pct(category, rng);
                let target = money::round(disposable * money::ratio(pct));
                let available = target.min(balance);
                if available <= Decimal::ZERO {
                    continue;
                }

                let mut remaining = available;
                for split in split_installments(available, parts, rng) {
                    let amount = money::round(split.min(remaining).min(balance));
                    if amount <= Decimal::ZERO {
                        continue;
                    }
                    remaining -= amount;
                    balance = money::round(balance - amount);
                    let txn = Transaction::new(
                        client_id,
                        TransactionType::Spending,
                        amount,
                        day,
                        self.time.now(),
                    )
                    .with_description(category.name.clone());
                    store.insert_transaction(&txn)?;
                    posted.push(txn);
                }
            }

            if !posted.is_empty() {
                store.update_checking(client_id, balance)?;
                log::info!(
                    "day={day} spending: client {client_id} spent {} across {} installment(s)",
                    money::round(client.checking - balance),
                    posted.len()
                );
            }
            Ok(posted)
        })
    }

    /// Cached monthly income, rebuilt from primary salaries when unset.
    fn monthly_income(
        &self,
        store: &SimStore,
        client_id: EntityId,
        cached: Decimal,
    ) -> SimResult<Decimal> {
        if cached > Decimal::ZERO {
            return Ok(cached);
        }
        let annual: Decimal = store.primary_salaries(client_id)?.into_iter().sum();
        let income = monthly_pay(annual, self.config.clock.days_per_year);
        if income > Decimal::ZERO {
            store.update_monthly_income(client_id, income)?;
        }
        Ok(income)
    }
}
