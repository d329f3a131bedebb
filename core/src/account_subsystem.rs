//! Slot lifecycle and investments.
//!
//! One account ("bank state") exists per (owner, slot). Starting a slot
//! creates it or wipes it back to the opening position. Investments move
//! money between liquid cash and the invested pool, and every move lands in
//! the investment event ledger.

use crate::{
    clock::ClockEngine,
    config::SimConfig,
    error::{SimError, SimResult},
    model::{Account, InvestmentEvent, InvestmentEventType},
    money,
    store::SimStore,
    types::{whole_day, SlotKey},
};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;

pub struct AccountSubsystem<'a> {
    store: &'a SimStore,
    config: &'a SimConfig,
    time: &'a SafeTimeProvider,
}

impl<'a> AccountSubsystem<'a> {
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

    /// Create the slot's account, or reset an existing one and drop all of
    /// its clients and investment history.
    pub fn start_slot(&self, key: SlotKey) -> SimResult<Account> {
        self.store.atomic(|store| {
            let existing = store.find_account(key)?;
            let mut account = Account {
                account_id: 0,
                owner_id: key.owner_id,
                slot_id: key.slot_id,
                liquid_cash: money::round(self.config.banking.starting_cash),
                invested: money::round(Decimal::ZERO),
                asset_price: money::round(self.config.banking.initial_asset_price),
                cash_growth_rate: self.config.clock.monthly_cash_growth,
                mortgage_rate: Decimal::ZERO,
                game_day: 0.0,
                last_observed_at: Some(self.time.now()),
                next_dividend_day: self.config.clock.days_per_year - 1,
                next_growth_day: self.config.clock.days_per_year - 1,
            };
            account.account_id = store.upsert_account(&account)?;
            if existing.is_some() {
                store.clear_account_state(account.account_id)?;
                log::info!("slot {key}: reset account {}", account.account_id);
            } else {
                log::info!("slot {key}: started account {}", account.account_id);
            }
            Ok(account)
        })
    }

    /// Catch the clock up and return the current bank state.
    pub fn account_state(&self, key: SlotKey) -> SimResult<Account> {
        Ok(self.clock().advance(key)?.account)
    }

    pub fn set_mortgage_rate(&self, key: SlotKey, rate: Decimal) -> SimResult<Account> {
        if rate < Decimal::ZERO {
            return Err(SimError::validation("mortgage rate must not be negative"));
        }
        self.store.atomic(|store| {
            let mut account = self.clock().advance(key)?.account;
            account.mortgage_rate = rate;
            store.save_account(&account)?;
            Ok(account)
        })
    }

    pub fn invest(&self, key: SlotKey, amount: Decimal) -> SimResult<Account> {
        money::require_positive(amount, "investment amount")?;
        let amount = money::round(amount);
        self.store.atomic(|store| {
            let mut account = self.clock().advance(key)?.account;
            if amount > account.liquid_cash {
                return Err(SimError::InsufficientFunds(format!(
                    "cannot invest {amount}, liquid cash is {}",
                    account.liquid_cash
                )));
            }
            account.liquid_cash = money::round(account.liquid_cash - amount);
            account.invested = money::round(account.invested + amount);
            store.save_account(&account)?;
            store.insert_investment_event(
                account.account_id,
                InvestmentEventType::Invest,
                amount,
                whole_day(account.game_day),
                self.time.now(),
            )?;
            log::info!("slot {key}: invested {amount}");
            Ok(account)
        })
    }

    pub fn divest(&self, key: SlotKey, amount: Decimal) -> SimResult<Account> {
        money::require_positive(amount, "divestment amount")?;
        let amount = money::round(amount);
        self.store.atomic(|store| {
            let mut account = self.clock().advance(key)?.account;
            if amount > account.invested {
                return Err(SimError::LimitExceeded(format!(
                    "cannot divest {amount}, invested is {}",
                    account.invested
                )));
            }
            account.invested = money::round(account.invested - amount);
            account.liquid_cash = money::round(account.liquid_cash + amount);
            store.save_account(&account)?;
            store.insert_investment_event(
                account.account_id,
                InvestmentEventType::Divest,
                amount,
                whole_day(account.game_day),
                self.time.now(),
            )?;
            log::info!("slot {key}: divested {amount}");
            Ok(account)
        })
    }

    /// Newest first.
    pub fn investment_events(&self, key: SlotKey) -> SimResult<Vec<InvestmentEvent>> {
        let account = self.clock().advance(key)?.account;
        self.store.investment_events(account.account_id)
    }
}
