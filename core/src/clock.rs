//! Lazy game clock.
//!
//! There is no ticking thread. Every read of an account first calls
//! `advance`, which converts the wall time elapsed since `last_observed_at`
//! into fractional game days and replays each crossed whole day, in order:
//!   1. monthly growth on liquid cash
//!   2. on a year boundary: investment growth, then dividend
//!   3. daily withdrawal counters reset
//!
//! RULES:
//!   - The cursor is read, rolled and written inside one store transaction.
//!     A racing duplicate call sees the advanced cursor and rolls nothing.
//!   - A missing `last_observed_at` counts as "now": zero elapsed.
//!   - Wall time moving backwards never rewinds the cursor.

use crate::{
    config::ClockConfig,
    error::SimResult,
    model::{Account, Client, InvestmentEventType},
    money,
    store::SimStore,
    types::{whole_day, Day, EntityId, GameDay, SlotKey},
};
use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;

/// Game days elapsed between two wall-clock instants.
pub fn elapsed_game_days(
    last_observed_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    ms_per_game_day: i64,
) -> GameDay {
    let Some(last) = last_observed_at else {
        return 0.0;
    };
    let elapsed_ms = (now - last).num_milliseconds();
    if elapsed_ms <= 0 || ms_per_game_day <= 0 {
        return 0.0;
    }
    elapsed_ms as f64 / ms_per_game_day as f64
}

/// True when `day` is the last day of a game year.
pub fn is_year_boundary(day: Day, days_per_year: i64) -> bool {
    days_per_year > 0 && (day + 1) % days_per_year == 0
}

/// Result of one `advance` call.
#[derive(Debug, Clone)]
pub struct Advance {
    pub account: Account,
    /// Whole days rolled by this call, ascending. Empty when nothing crossed.
    pub days_rolled: Vec<Day>,
}

pub struct ClockEngine<'a> {
    store: &'a SimStore,
    config: &'a ClockConfig,
    time: &'a SafeTimeProvider,
}

impl<'a> ClockEngine<'a> {
    pub fn new(store: &'a SimStore, config: &'a ClockConfig, time: &'a SafeTimeProvider) -> Self {
        Self {
            store,
            config,
            time,
        }
    }

    pub fn advance(&self, key: SlotKey) -> SimResult<Advance> {
        self.store.atomic(|store| {
            let account = store.account(key)?;
            self.catch_up(store, account)
        })
    }

    pub fn advance_account(&self, account_id: EntityId) -> SimResult<Advance> {
        self.store.atomic(|store| {
            let account = store.account_by_id(account_id)?;
            self.catch_up(store, account)
        })
    }

    /// Advance the account that owns `client_id`, then return the client as
    /// it stands after any daily resets, with the advanced account.
    pub fn advance_for_client(&self, client_id: EntityId) -> SimResult<(Client, Account)> {
        self.store.atomic(|store| {
            let account_id = store.client(client_id)?.account_id;
            let account = store.account_by_id(account_id)?;
            let advanced = self.catch_up(store, account)?;
            Ok((store.client(client_id)?, advanced.account))
        })
    }

    fn catch_up(&self, store: &SimStore, mut account: Account) -> SimResult<Advance> {
        let now = self.time.now();
        if account.last_observed_at.is_none() {
            log::warn!(
                "account {}: no last observation, treating as now",
                account.account_id
            );
        }

        let elapsed =
            elapsed_game_days(account.last_observed_at, now, self.config.ms_per_game_day);
        let prev_day = whole_day(account.game_day);
        account.game_day += elapsed;
        account.last_observed_at = Some(match account.last_observed_at {
            Some(last) if last > now => last,
            _ => now,
        });
        let curr_day = whole_day(account.game_day);

        let mut days_rolled = Vec::new();
        for day in (prev_day + 1)..=curr_day {
            self.roll_day(store, &mut account, day, now)?;
            days_rolled.push(day);
        }

        store.save_account(&account)?;
        if !days_rolled.is_empty() {
            log::debug!(
                "account {}: rolled days {}..={} (game_day={:.3})",
                account.account_id,
                prev_day + 1,
                curr_day,
                account.game_day
            );
        }
        Ok(Advance {
            account,
            days_rolled,
        })
    }

    fn roll_day(
        &self,
        store: &SimStore,
        account: &mut Account,
        day: Day,
        now: DateTime<Utc>,
    ) -> SimResult<()> {
        if account.liquid_cash > Decimal::ZERO {
            let growth = money::apply_rate(account.liquid_cash, account.cash_growth_rate);
            account.liquid_cash = money::round(account.liquid_cash + growth);
        }

        if is_year_boundary(day, self.config.days_per_year) {
            if account.invested > Decimal::ZERO {
                let growth = money::apply_rate(account.invested, self.config.annual_growth_rate);
                account.invested = money::round(account.invested + growth);
                store.insert_investment_event(
                    account.account_id,
                    InvestmentEventType::Growth,
                    growth,
                    day,
                    now,
                )?;
                log::info!(
                    "day={day} clock: investment growth {growth} on account {}",
                    account.account_id
                );
            }
            account.next_growth_day = day + self.config.days_per_year;

            if account.invested > Decimal::ZERO {
                let dividend = money::apply_rate(account.invested, self.config.annual_dividend_rate);
                account.liquid_cash = money::round(account.liquid_cash + dividend);
                store.insert_investment_event(
                    account.account_id,
                    InvestmentEventType::Dividend,
                    dividend,
                    day,
                    now,
                )?;
                log::info!(
                    "day={day} clock: dividend {dividend} on account {}",
                    account.account_id
                );
            }
            account.next_dividend_day = day + self.config.days_per_year;
        }

        store.reset_daily_withdrawn(account.account_id)?;
        Ok(())
    }
}
