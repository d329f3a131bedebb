//! SQLite persistence layer.
//!
//! RULE: Only store/*.rs talks to the database.
//! Subsystems call store methods. They never execute SQL directly.

mod account;
mod bankruptcy;
mod client;
mod credit;
mod job;
mod ledger;
mod living;

use crate::error::SimResult;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use std::cell::Cell;
use std::str::FromStr;
use std::time::Duration;

/// How long a writer waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SimStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
    in_tx: Cell<bool>,
}

impl SimStore {
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
            in_tx: Cell::new(false),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: None,
            in_tx: Cell::new(false),
        })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new in-memory database (isolated).
    /// For file-based databases, this opens the same file.
    pub fn reopen(&self) -> SimResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_clients.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_jobs_living.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_credit.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/005_bankruptcy.sql"))?;
        Ok(())
    }

    /// Run `f` inside one `BEGIN IMMEDIATE` transaction.
    ///
    /// The write lock is taken up front, so two callers racing on the same
    /// cursor serialise: the second one reads the already-advanced state.
    /// Nested calls join the outer transaction.
    pub fn atomic<T>(&self, f: impl FnOnce(&Self) -> SimResult<T>) -> SimResult<T> {
        if self.in_tx.get() {
            return f(self);
        }
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        self.in_tx.set(true);
        let result = f(self);
        self.in_tx.set(false);
        match result {
            Ok(value) => {
                if let Err(e) = self.conn.execute_batch("COMMIT") {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    return Err(e.into());
                }
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.conn.execute_batch("ROLLBACK") {
                    log::warn!("rollback failed after {e}: {rollback_err}");
                }
                Err(e)
            }
        }
    }
}

// ── Row helpers ───────────────────────────────────────────────────

fn conversion_error(
    idx: usize,
    ty: Type,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

pub(crate) fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text).map_err(|e| conversion_error(idx, Type::Text, e))
}

pub(crate) fn opt_decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| Decimal::from_str(&t).map_err(|e| conversion_error(idx, Type::Text, e)))
        .transpose()
}

#[derive(Debug, thiserror::Error)]
#[error("timestamp {0} out of range")]
struct BadTimestamp(i64);

pub(crate) fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| conversion_error(idx, Type::Integer, BadTimestamp(millis)))
}

pub(crate) fn opt_timestamp_at(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let millis: Option<i64> = row.get(idx)?;
    millis
        .map(|m| {
            Utc.timestamp_millis_opt(m)
                .single()
                .ok_or_else(|| conversion_error(idx, Type::Integer, BadTimestamp(m)))
        })
        .transpose()
}

pub(crate) fn money(d: &Decimal) -> String {
    d.to_string()
}

pub(crate) fn opt_money(d: &Option<Decimal>) -> Option<String> {
    d.as_ref().map(Decimal::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_timestamp_is_a_conversion_error() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn
            .query_row("SELECT ?1", [i64::MAX], |row| timestamp_at(row, 0))
            .unwrap_err();
        match err {
            rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, inner) => {
                assert_eq!(inner.to_string(), format!("timestamp {} out of range", i64::MAX));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn null_timestamp_reads_as_none() {
        let conn = Connection::open_in_memory().unwrap();
        let value = conn
            .query_row("SELECT NULL", [], |row| opt_timestamp_at(row, 0))
            .unwrap();
        assert_eq!(value, None);
    }
}
