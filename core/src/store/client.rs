use super::{decimal_at, money, timestamp_at, SimStore};
use crate::{
    error::{SimError, SimResult},
    model::Client,
    types::{Day, EntityId},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;

const CLIENT_COLUMNS: &str = "client_id, account_id, name, checking, savings, daily_withdrawn,
     monthly_income, mandatory_spend, bankrupt, bankrupt_until, purchase_block_reason, created_at";

fn client_from_row(row: &Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        client_id: row.get(0)?,
        account_id: row.get(1)?,
        name: row.get(2)?,
        checking: decimal_at(row, 3)?,
        savings: decimal_at(row, 4)?,
        daily_withdrawn: decimal_at(row, 5)?,
        monthly_income: decimal_at(row, 6)?,
        mandatory_spend: decimal_at(row, 7)?,
        bankrupt: row.get::<_, i32>(8)? != 0,
        bankrupt_until: row.get(9)?,
        purchase_block_reason: row.get(10)?,
        created_at: timestamp_at(row, 11)?,
    })
}

impl SimStore {
    // ── Client ────────────────────────────────────────────────────

    pub fn insert_client(
        &self,
        account_id: EntityId,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> SimResult<EntityId> {
        self.conn.execute(
            "INSERT INTO client (account_id, name, created_at) VALUES (?1, ?2, ?3)",
            params![account_id, name, created_at.timestamp_millis()],
        )?;
        let client_id = self.conn.last_insert_rowid();
        self.conn.execute(
            "INSERT INTO client_living (client_id) VALUES (?1)",
            params![client_id],
        )?;
        Ok(client_id)
    }

    pub fn client(&self, client_id: EntityId) -> SimResult<Client> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM client WHERE client_id = ?1");
        self.conn
            .query_row(&sql, params![client_id], client_from_row)
            .optional()?
            .ok_or_else(|| SimError::not_found("client", client_id))
    }

    pub fn clients_for_account(&self, account_id: EntityId) -> SimResult<Vec<Client>> {
        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM client WHERE account_id = ?1 ORDER BY client_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![account_id], client_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn client_ids_for_account(&self, account_id: EntityId) -> SimResult<Vec<EntityId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT client_id FROM client WHERE account_id = ?1 ORDER BY client_id")?;
        let rows = stmt.query_map(params![account_id], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn update_client_balances(
        &self,
        client_id: EntityId,
        checking: Decimal,
        savings: Decimal,
        daily_withdrawn: Decimal,
    ) -> SimResult<()> {
        self.conn.execute(
            "UPDATE client SET checking = ?1, savings = ?2, daily_withdrawn = ?3
             WHERE client_id = ?4",
            params![
                money(&checking),
                money(&savings),
                money(&daily_withdrawn),
                client_id
            ],
        )?;
        Ok(())
    }

    pub fn update_checking(&self, client_id: EntityId, checking: Decimal) -> SimResult<()> {
        self.conn.execute(
            "UPDATE client SET checking = ?1 WHERE client_id = ?2",
            params![money(&checking), client_id],
        )?;
        Ok(())
    }

    pub fn update_monthly_income(&self, client_id: EntityId, income: Decimal) -> SimResult<()> {
        self.conn.execute(
            "UPDATE client SET monthly_income = ?1 WHERE client_id = ?2",
            params![money(&income), client_id],
        )?;
        Ok(())
    }

    pub fn update_mandatory_spend(&self, client_id: EntityId, total: Decimal) -> SimResult<()> {
        self.conn.execute(
            "UPDATE client SET mandatory_spend = ?1 WHERE client_id = ?2",
            params![money(&total), client_id],
        )?;
        Ok(())
    }

    /// Set or clear the bankruptcy flag and its purchasing block.
    pub fn update_client_bankruptcy(
        &self,
        client_id: EntityId,
        bankrupt: bool,
        until: Option<Day>,
        reason: Option<&str>,
    ) -> SimResult<()> {
        self.conn.execute(
            "UPDATE client SET bankrupt = ?1, bankrupt_until = ?2, purchase_block_reason = ?3
             WHERE client_id = ?4",
            params![if bankrupt { 1 } else { 0 }, until, reason, client_id],
        )?;
        Ok(())
    }

    /// Zero the daily withdrawal counter of every client under an account.
    pub fn reset_daily_withdrawn(&self, account_id: EntityId) -> SimResult<usize> {
        let n = self.conn.execute(
            "UPDATE client SET daily_withdrawn = '0.00' WHERE account_id = ?1",
            params![account_id],
        )?;
        Ok(n)
    }
}
