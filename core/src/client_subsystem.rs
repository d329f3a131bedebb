//! Clients and their cash movements.
//!
//! Every operation catches the owning account's clock up first, so daily
//! withdrawal counters are already reset when limits are checked, and the
//! resulting transaction is stamped with the current whole game day.

use crate::{
    clock::ClockEngine,
    config::SimConfig,
    error::{SimError, SimResult},
    model::{Client, MonthlyCashflow, Transaction, TransactionType},
    money,
    store::SimStore,
    types::{whole_day, Day, EntityId, SlotKey},
};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;

pub struct ClientSubsystem<'a> {
    store: &'a SimStore,
    config: &'a SimConfig,
    time: &'a SafeTimeProvider,
}

impl<'a> ClientSubsystem<'a> {
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

    pub fn create_client(&self, key: SlotKey, name: &str) -> SimResult<Client> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SimError::validation("client name is required"));
        }
        if name.chars().count() > self.config.banking.max_client_name_len {
            return Err(SimError::validation(format!(
                "client name must be at most {} characters",
                self.config.banking.max_client_name_len
            )));
        }
        self.store.atomic(|store| {
            let account = self.clock().advance(key)?.account;
            let client_id = store.insert_client(account.account_id, name, self.time.now())?;
            log::info!("slot {key}: created client {client_id} '{name}'");
            store.client(client_id)
        })
    }

    pub fn client(&self, client_id: EntityId) -> SimResult<Client> {
        Ok(self.clock().advance_for_client(client_id)?.0)
    }

    pub fn clients(&self, key: SlotKey) -> SimResult<Vec<Client>> {
        let account = self.clock().advance(key)?.account;
        self.store.clients_for_account(account.account_id)
    }

    pub fn deposit(&self, client_id: EntityId, amount: Decimal) -> SimResult<Client> {
        money::require_positive(amount, "deposit amount")?;
        if amount > self.config.banking.max_deposit {
            return Err(SimError::LimitExceeded(format!(
                "deposit {amount} exceeds the maximum of {}",
                self.config.banking.max_deposit
            )));
        }
        let amount = money::round(amount);
        self.store.atomic(|store| {
            let (client, account) = self.clock().advance_for_client(client_id)?;
            let checking = money::round(client.checking + amount);
            store.update_checking(client_id, checking)?;
            self.post(store, client_id, TransactionType::Deposit, amount, whole_day(account.game_day))?;
            store.client(client_id)
        })
    }

    pub fn withdraw(&self, client_id: EntityId, amount: Decimal) -> SimResult<Client> {
        money::require_positive(amount, "withdrawal amount")?;
        let amount = money::round(amount);
        self.store.atomic(|store| {
            let (client, account) = self.clock().advance_for_client(client_id)?;
            if amount > client.checking {
                return Err(SimError::InsufficientFunds(format!(
                    "cannot withdraw {amount}, checking is {}",
                    client.checking
                )));
            }
            let remaining_today =
                self.config.banking.daily_withdrawal_limit - client.daily_withdrawn;
            if amount > remaining_today {
                return Err(SimError::LimitExceeded(format!(
                    "withdrawal {amount} exceeds the remaining daily limit of {}",
                    remaining_today.max(Decimal::ZERO)
                )));
            }
            store.update_client_balances(
                client_id,
                money::round(client.checking - amount),
                client.savings,
                money::round(client.daily_withdrawn + amount),
            )?;
            self.post(store, client_id, TransactionType::Withdrawal, amount, whole_day(account.game_day))?;
            store.client(client_id)
        })
    }

    /// Move money from checking into savings.
    pub fn savings_deposit(&self, client_id: EntityId, amount: Decimal) -> SimResult<Client> {
        money::require_positive(amount, "savings deposit amount")?;
        let amount = money::round(amount);
        self.store.atomic(|store| {
            let (client, account) = self.clock().advance_for_client(client_id)?;
            if amount > client.checking {
                return Err(SimError::InsufficientFunds(format!(
                    "cannot move {amount} to savings, checking is {}",
                    client.checking
                )));
            }
            store.update_client_balances(
                client_id,
                money::round(client.checking - amount),
                money::round(client.savings + amount),
                client.daily_withdrawn,
            )?;
            let day = whole_day(account.game_day);
            self.post(store, client_id, TransactionType::SavingsDeposit, amount, day)?;
            store.client(client_id)
        })
    }

    /// Move money from savings back into checking.
    pub fn savings_withdraw(&self, client_id: EntityId, amount: Decimal) -> SimResult<Client> {
        money::require_positive(amount, "savings withdrawal amount")?;
        let amount = money::round(amount);
        self.store.atomic(|store| {
            let (client, account) = self.clock().advance_for_client(client_id)?;
            if amount > client.savings {
                return Err(SimError::InsufficientFunds(format!(
                    "cannot withdraw {amount} from savings, savings is {}",
                    client.savings
                )));
            }
            store.update_client_balances(
                client_id,
                money::round(client.checking + amount),
                money::round(client.savings - amount),
                client.daily_withdrawn,
            )?;
            let day = whole_day(account.game_day);
            self.post(store, client_id, TransactionType::SavingsWithdrawal, amount, day)?;
            store.client(client_id)
        })
    }

    /// Newest first.
    pub fn transactions(&self, client_id: EntityId) -> SimResult<Vec<Transaction>> {
        self.clock().advance_for_client(client_id)?;
        self.store.transactions_for_client(client_id)
    }

    /// Income and spending for one game month. `month` is 1-based within
    /// the game year.
    pub fn monthly_cashflow(
        &self,
        client_id: EntityId,
        year: i64,
        month: i64,
    ) -> SimResult<MonthlyCashflow> {
        if year < 1 {
            return Err(SimError::validation("year must be at least 1"));
        }
        let days_per_year = self.config.clock.days_per_year;
        if !(1..=days_per_year).contains(&month) {
            return Err(SimError::validation(format!(
                "month must be between 1 and {days_per_year}"
            )));
        }
        self.clock().advance_for_client(client_id)?;

        let game_day: Day = (year - 1) * days_per_year + (month - 1);
        let mut income = Decimal::ZERO;
        let mut spending = Decimal::ZERO;
        for (kind, amount) in self.store.amounts_by_kind(client_id, game_day, game_day)? {
            if kind.is_income() {
                income += amount;
            } else {
                spending += amount;
            }
        }
        let income = money::round(income);
        let spending = money::round(spending);
        let spending_pct = (income > Decimal::ZERO)
            .then(|| money::round(spending / income * Decimal::ONE_HUNDRED));

        Ok(MonthlyCashflow {
            client_id,
            year,
            month,
            game_day,
            income,
            spending,
            net: money::round(income - spending),
            spending_pct,
        })
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
        log::info!("day={day} client {client_id}: {kind} {amount}");
        Ok(())
    }
}
