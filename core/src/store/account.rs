use super::{decimal_at, money, opt_timestamp_at, timestamp_at, SimStore};
use crate::{
    error::{SimError, SimResult},
    model::{Account, InvestmentEvent, InvestmentEventType},
    types::{Day, EntityId, SlotKey},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;

const ACCOUNT_COLUMNS: &str = "account_id, owner_id, slot_id, liquid_cash, invested, asset_price,
     cash_growth_rate, mortgage_rate, game_day, last_observed_at, next_dividend_day, next_growth_day";

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        account_id: row.get(0)?,
        owner_id: row.get(1)?,
        slot_id: row.get(2)?,
        liquid_cash: decimal_at(row, 3)?,
        invested: decimal_at(row, 4)?,
        asset_price: decimal_at(row, 5)?,
        cash_growth_rate: decimal_at(row, 6)?,
        mortgage_rate: decimal_at(row, 7)?,
        game_day: row.get(8)?,
        last_observed_at: opt_timestamp_at(row, 9)?,
        next_dividend_day: row.get(10)?,
        next_growth_day: row.get(11)?,
    })
}

impl SimStore {
    // ── Account ───────────────────────────────────────────────────

    /// Insert or overwrite the bank state for a slot. Returns its id.
    pub fn upsert_account(&self, a: &Account) -> SimResult<EntityId> {
        self.conn.execute(
            "INSERT INTO account (
                owner_id, slot_id, liquid_cash, invested, asset_price, cash_growth_rate,
                mortgage_rate, game_day, last_observed_at, next_dividend_day, next_growth_day
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT (owner_id, slot_id) DO UPDATE SET
                liquid_cash = excluded.liquid_cash,
                invested = excluded.invested,
                asset_price = excluded.asset_price,
                cash_growth_rate = excluded.cash_growth_rate,
                mortgage_rate = excluded.mortgage_rate,
                game_day = excluded.game_day,
                last_observed_at = excluded.last_observed_at,
                next_dividend_day = excluded.next_dividend_day,
                next_growth_day = excluded.next_growth_day",
            params![
                a.owner_id,
                a.slot_id,
                money(&a.liquid_cash),
                money(&a.invested),
                money(&a.asset_price),
                money(&a.cash_growth_rate),
                money(&a.mortgage_rate),
                a.game_day,
                a.last_observed_at.map(|t| t.timestamp_millis()),
                a.next_dividend_day,
                a.next_growth_day,
            ],
        )?;
        let id = self.conn.query_row(
            "SELECT account_id FROM account WHERE owner_id = ?1 AND slot_id = ?2",
            params![a.owner_id, a.slot_id],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn find_account(&self, key: SlotKey) -> SimResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE owner_id = ?1 AND slot_id = ?2");
        let account = self
            .conn
            .query_row(&sql, params![key.owner_id, key.slot_id], account_from_row)
            .optional()?;
        Ok(account)
    }

    pub fn account(&self, key: SlotKey) -> SimResult<Account> {
        self.find_account(key)?
            .ok_or_else(|| SimError::not_found("account", key))
    }

    pub fn account_by_id(&self, account_id: EntityId) -> SimResult<Account> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE account_id = ?1");
        self.conn
            .query_row(&sql, params![account_id], account_from_row)
            .optional()?
            .ok_or_else(|| SimError::not_found("account", account_id))
    }

    /// Persist every mutable column of an existing account.
    pub fn save_account(&self, a: &Account) -> SimResult<()> {
        self.conn.execute(
            "UPDATE account SET
                liquid_cash = ?1, invested = ?2, asset_price = ?3, cash_growth_rate = ?4,
                mortgage_rate = ?5, game_day = ?6, last_observed_at = ?7,
                next_dividend_day = ?8, next_growth_day = ?9
             WHERE account_id = ?10",
            params![
                money(&a.liquid_cash),
                money(&a.invested),
                money(&a.asset_price),
                money(&a.cash_growth_rate),
                money(&a.mortgage_rate),
                a.game_day,
                a.last_observed_at.map(|t| t.timestamp_millis()),
                a.next_dividend_day,
                a.next_growth_day,
                a.account_id,
            ],
        )?;
        Ok(())
    }

    /// Drop every client (and through cascades their ledger, jobs, living,
    /// credit and bankruptcy rows), the slot's investment events, and free
    /// its properties.
    pub fn clear_account_state(&self, account_id: EntityId) -> SimResult<()> {
        self.conn.execute(
            "DELETE FROM client WHERE account_id = ?1",
            params![account_id],
        )?;
        self.conn.execute(
            "DELETE FROM investment_event WHERE account_id = ?1",
            params![account_id],
        )?;
        self.conn.execute(
            "UPDATE property SET status = 'AVAILABLE', owner_client_id = NULL
             WHERE account_id = ?1",
            params![account_id],
        )?;
        Ok(())
    }

    // ── Investment events ─────────────────────────────────────────

    pub fn insert_investment_event(
        &self,
        account_id: EntityId,
        kind: InvestmentEventType,
        amount: Decimal,
        game_day: Day,
        created_at: DateTime<Utc>,
    ) -> SimResult<EntityId> {
        self.conn.execute(
            "INSERT INTO investment_event (account_id, kind, amount, game_day, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                account_id,
                kind,
                money(&amount),
                game_day,
                created_at.timestamp_millis()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Newest first.
    pub fn investment_events(&self, account_id: EntityId) -> SimResult<Vec<InvestmentEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, account_id, kind, amount, game_day, created_at
             FROM investment_event WHERE account_id = ?1
             ORDER BY game_day DESC, event_id DESC",
        )?;
        let rows = stmt.query_map(params![account_id], |row| {
            Ok(InvestmentEvent {
                event_id: row.get(0)?,
                account_id: row.get(1)?,
                kind: row.get(2)?,
                amount: decimal_at(row, 3)?,
                game_day: row.get(4)?,
                created_at: timestamp_at(row, 5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
