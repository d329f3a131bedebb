use super::{timestamp_at, SimStore};
use crate::{
    error::{SimError, SimResult},
    model::{BankruptcyApplication, BankruptcyStatus},
    types::{Day, EntityId},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

const APPLICATION_COLUMNS: &str =
    "application_id, client_id, status, notes, filed_day, discharge_at, created_at";

fn application_from_row(row: &Row<'_>) -> rusqlite::Result<BankruptcyApplication> {
    Ok(BankruptcyApplication {
        application_id: row.get(0)?,
        client_id: row.get(1)?,
        status: row.get(2)?,
        notes: row.get(3)?,
        filed_day: row.get(4)?,
        discharge_at: row.get(5)?,
        created_at: timestamp_at(row, 6)?,
    })
}

impl SimStore {
    // ── Bankruptcy ────────────────────────────────────────────────

    pub fn insert_bankruptcy_application(
        &self,
        client_id: EntityId,
        notes: Option<&str>,
        filed_day: Day,
        created_at: DateTime<Utc>,
    ) -> SimResult<EntityId> {
        self.conn.execute(
            "INSERT INTO bankruptcy_application (client_id, status, notes, filed_day, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                client_id,
                BankruptcyStatus::Pending,
                notes,
                filed_day,
                created_at.timestamp_millis()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn bankruptcy_application(&self, application_id: EntityId) -> SimResult<BankruptcyApplication> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM bankruptcy_application WHERE application_id = ?1"
        );
        self.conn
            .query_row(&sql, params![application_id], application_from_row)
            .optional()?
            .ok_or_else(|| SimError::not_found("bankruptcy application", application_id))
    }

    /// Applications in `status` whose client belongs to the account.
    pub fn bankruptcy_applications_for_account(
        &self,
        account_id: EntityId,
        status: BankruptcyStatus,
    ) -> SimResult<Vec<BankruptcyApplication>> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM bankruptcy_application
             WHERE status = ?2
               AND client_id IN (SELECT client_id FROM client WHERE account_id = ?1)
             ORDER BY application_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![account_id, status], application_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn update_bankruptcy_application(
        &self,
        application_id: EntityId,
        status: BankruptcyStatus,
        discharge_at: Option<Day>,
    ) -> SimResult<()> {
        self.conn.execute(
            "UPDATE bankruptcy_application SET status = ?1, discharge_at = ?2
             WHERE application_id = ?3",
            params![status, discharge_at, application_id],
        )?;
        Ok(())
    }
}
