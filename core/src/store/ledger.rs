use super::{decimal_at, money, timestamp_at, SimStore};
use crate::{
    error::SimResult,
    model::{Transaction, TransactionType},
    types::{Day, EntityId},
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Row};
use rust_decimal::Decimal;

const TXN_COLUMNS: &str = "txn_id, client_id, kind, amount, game_day, description, created_at";

fn txn_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        txn_id: row.get(0)?,
        client_id: row.get(1)?,
        kind: row.get(2)?,
        amount: decimal_at(row, 3)?,
        game_day: row.get(4)?,
        description: row.get(5)?,
        created_at: timestamp_at(row, 6)?,
    })
}

fn placeholders(start: usize, n: usize) -> String {
    (start..start + n)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl SimStore {
    // ── Ledger ────────────────────────────────────────────────────
    //
    // Append-only: there is no update or delete for ledger rows. They
    // disappear only when their client is removed by a slot reset.

    pub fn insert_transaction(&self, t: &Transaction) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO ledger_txn (txn_id, client_id, kind, amount, game_day, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &t.txn_id,
                t.client_id,
                t.kind,
                money(&t.amount),
                t.game_day,
                &t.description,
                t.created_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    /// Newest first.
    pub fn transactions_for_client(&self, client_id: EntityId) -> SimResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TXN_COLUMNS} FROM ledger_txn WHERE client_id = ?1
             ORDER BY game_day DESC, created_at DESC, rowid DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![client_id], txn_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn transaction_exists(
        &self,
        client_id: EntityId,
        kind: TransactionType,
        game_day: Day,
    ) -> SimResult<bool> {
        let found: i64 = self.conn.query_row(
            "SELECT EXISTS (
                SELECT 1 FROM ledger_txn WHERE client_id = ?1 AND kind = ?2 AND game_day = ?3
             )",
            params![client_id, kind, game_day],
            |row| row.get(0),
        )?;
        Ok(found != 0)
    }

    /// Transactions of any of `client_ids` with any of `kinds`, oldest first
    /// by (game day, creation time, insertion order).
    pub fn transactions_for_clients(
        &self,
        client_ids: &[EntityId],
        kinds: &[TransactionType],
    ) -> SimResult<Vec<Transaction>> {
        if client_ids.is_empty() || kinds.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {TXN_COLUMNS} FROM ledger_txn
             WHERE client_id IN ({}) AND kind IN ({})
             ORDER BY game_day ASC, created_at ASC, rowid ASC",
            placeholders(1, client_ids.len()),
            placeholders(1 + client_ids.len(), kinds.len()),
        );
        let values = client_ids
            .iter()
            .map(|id| Value::Integer(*id))
            .chain(kinds.iter().map(|k| Value::Text(k.as_str().to_string())));
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), txn_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Per-kind amounts posted for a client between two days (inclusive).
    /// Summation happens in decimal, not in SQLite floats.
    pub fn amounts_by_kind(
        &self,
        client_id: EntityId,
        from_day: Day,
        to_day: Day,
    ) -> SimResult<Vec<(TransactionType, Decimal)>> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, amount FROM ledger_txn
             WHERE client_id = ?1 AND game_day BETWEEN ?2 AND ?3",
        )?;
        let rows = stmt.query_map(params![client_id, from_day, to_day], |row| {
            Ok((row.get::<_, TransactionType>(0)?, decimal_at(row, 1)?))
        })?;
        let mut totals: Vec<(TransactionType, Decimal)> = Vec::new();
        for row in rows {
            let (kind, amount) = row?;
            match totals.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, total)) => *total += amount,
                None => totals.push((kind, amount)),
            }
        }
        Ok(totals)
    }
}
