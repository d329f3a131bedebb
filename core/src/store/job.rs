use super::{decimal_at, money, SimStore};
use crate::{
    error::{SimError, SimResult},
    model::{ClientJob, Job},
    types::{EntityId, GameDay},
};
use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<Job> {
    Ok(Job {
        job_id: row.get(0)?,
        title: row.get(1)?,
        employer: row.get(2)?,
        annual_salary: decimal_at(row, 3)?,
        pay_cycle_days: row.get(4)?,
    })
}

fn client_job_from_row(row: &Row<'_>) -> rusqlite::Result<ClientJob> {
    Ok(ClientJob {
        client_job_id: row.get(0)?,
        client_id: row.get(1)?,
        job_id: row.get(2)?,
        primary: row.get::<_, i32>(3)? != 0,
        next_payday: row.get(4)?,
    })
}

impl SimStore {
    // ── Jobs ──────────────────────────────────────────────────────

    pub fn insert_job(
        &self,
        title: &str,
        employer: &str,
        annual_salary: Decimal,
        pay_cycle_days: i64,
    ) -> SimResult<EntityId> {
        self.conn.execute(
            "INSERT INTO job (title, employer, annual_salary, pay_cycle_days)
             VALUES (?1, ?2, ?3, ?4)",
            params![title, employer, money(&annual_salary), pay_cycle_days],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn job(&self, job_id: EntityId) -> SimResult<Job> {
        self.conn
            .query_row(
                "SELECT job_id, title, employer, annual_salary, pay_cycle_days
                 FROM job WHERE job_id = ?1",
                params![job_id],
                job_from_row,
            )
            .optional()?
            .ok_or_else(|| SimError::not_found("job", job_id))
    }

    // ── Client jobs ───────────────────────────────────────────────

    pub fn insert_client_job(
        &self,
        client_id: EntityId,
        job_id: EntityId,
        primary: bool,
        next_payday: GameDay,
    ) -> SimResult<EntityId> {
        self.conn.execute(
            "INSERT INTO client_job (client_id, job_id, is_primary, next_payday)
             VALUES (?1, ?2, ?3, ?4)",
            params![client_id, job_id, if primary { 1 } else { 0 }, next_payday],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn client_job(&self, client_job_id: EntityId) -> SimResult<ClientJob> {
        self.conn
            .query_row(
                "SELECT client_job_id, client_id, job_id, is_primary, next_payday
                 FROM client_job WHERE client_job_id = ?1",
                params![client_job_id],
                client_job_from_row,
            )
            .optional()?
            .ok_or_else(|| SimError::not_found("client job", client_job_id))
    }

    pub fn client_jobs(&self, client_id: EntityId) -> SimResult<Vec<ClientJob>> {
        let mut stmt = self.conn.prepare(
            "SELECT client_job_id, client_id, job_id, is_primary, next_payday
             FROM client_job WHERE client_id = ?1 ORDER BY client_job_id",
        )?;
        let rows = stmt.query_map(params![client_id], client_job_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Ids of every primary job held by a client under this account.
    pub fn primary_client_job_ids(&self, account_id: EntityId) -> SimResult<Vec<EntityId>> {
        let mut stmt = self.conn.prepare(
            "SELECT cj.client_job_id
             FROM client_job cj
             JOIN client c ON c.client_id = cj.client_id
             WHERE c.account_id = ?1 AND cj.is_primary = 1
             ORDER BY cj.client_job_id",
        )?;
        let rows = stmt.query_map(params![account_id], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Clear the primary flag on every job of `client_id` except `keep`.
    pub fn demote_primary_jobs(&self, client_id: EntityId, keep: EntityId) -> SimResult<usize> {
        let n = self.conn.execute(
            "UPDATE client_job SET is_primary = 0
             WHERE client_id = ?1 AND client_job_id <> ?2 AND is_primary = 1",
            params![client_id, keep],
        )?;
        Ok(n)
    }

    pub fn update_next_payday(&self, client_job_id: EntityId, next_payday: GameDay) -> SimResult<()> {
        self.conn.execute(
            "UPDATE client_job SET next_payday = ?1 WHERE client_job_id = ?2",
            params![next_payday, client_job_id],
        )?;
        Ok(())
    }

    /// Annual salaries of the client's primary jobs.
    pub fn primary_salaries(&self, client_id: EntityId) -> SimResult<Vec<Decimal>> {
        let mut stmt = self.conn.prepare(
            "SELECT j.annual_salary
             FROM client_job cj JOIN job j ON j.job_id = cj.job_id
             WHERE cj.client_id = ?1 AND cj.is_primary = 1",
        )?;
        let rows = stmt.query_map(params![client_id], |row| decimal_at(row, 0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
