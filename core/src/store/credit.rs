use super::{decimal_at, money, opt_decimal_at, opt_money, timestamp_at, SimStore};
use crate::{
    error::{SimError, SimResult},
    model::{Loan, LoanStatus, Mortgage, MortgageStatus},
    types::EntityId,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;

const LOAN_COLUMNS: &str =
    "loan_id, client_id, amount, term_years, status, monthly_payment, next_payment_day, created_at";

const MORTGAGE_COLUMNS: &str = "mortgage_id, client_id, property_id, property_price, down_payment,
     loan_amount, interest_rate, term_years, status, monthly_payment, next_payment_day,
     start_payment_day, total_paid, payments_made, created_at";

fn loan_from_row(row: &Row<'_>) -> rusqlite::Result<Loan> {
    Ok(Loan {
        loan_id: row.get(0)?,
        client_id: row.get(1)?,
        amount: decimal_at(row, 2)?,
        term_years: row.get(3)?,
        status: row.get(4)?,
        monthly_payment: opt_decimal_at(row, 5)?,
        next_payment_day: row.get(6)?,
        created_at: timestamp_at(row, 7)?,
    })
}

fn mortgage_from_row(row: &Row<'_>) -> rusqlite::Result<Mortgage> {
    Ok(Mortgage {
        mortgage_id: row.get(0)?,
        client_id: row.get(1)?,
        property_id: row.get(2)?,
        property_price: decimal_at(row, 3)?,
        down_payment: decimal_at(row, 4)?,
        loan_amount: decimal_at(row, 5)?,
        interest_rate: decimal_at(row, 6)?,
        term_years: row.get(7)?,
        status: row.get(8)?,
        monthly_payment: opt_decimal_at(row, 9)?,
        next_payment_day: row.get(10)?,
        start_payment_day: row.get(11)?,
        total_paid: decimal_at(row, 12)?,
        payments_made: row.get(13)?,
        created_at: timestamp_at(row, 14)?,
    })
}

impl SimStore {
    // ── Loans ─────────────────────────────────────────────────────

    pub fn insert_loan(
        &self,
        client_id: EntityId,
        amount: Decimal,
        term_years: i64,
        created_at: DateTime<Utc>,
    ) -> SimResult<EntityId> {
        self.conn.execute(
            "INSERT INTO loan (client_id, amount, term_years, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                client_id,
                money(&amount),
                term_years,
                LoanStatus::Pending,
                created_at.timestamp_millis()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn loan(&self, loan_id: EntityId) -> SimResult<Loan> {
        let sql = format!("SELECT {LOAN_COLUMNS} FROM loan WHERE loan_id = ?1");
        self.conn
            .query_row(&sql, params![loan_id], loan_from_row)
            .optional()?
            .ok_or_else(|| SimError::not_found("loan", loan_id))
    }

    pub fn loans_for_client(&self, client_id: EntityId) -> SimResult<Vec<Loan>> {
        let sql = format!("SELECT {LOAN_COLUMNS} FROM loan WHERE client_id = ?1 ORDER BY loan_id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![client_id], loan_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn save_loan(&self, l: &Loan) -> SimResult<()> {
        self.conn.execute(
            "UPDATE loan SET status = ?1, monthly_payment = ?2, next_payment_day = ?3
             WHERE loan_id = ?4",
            params![
                l.status,
                opt_money(&l.monthly_payment),
                l.next_payment_day,
                l.loan_id
            ],
        )?;
        Ok(())
    }

    // ── Mortgages ─────────────────────────────────────────────────

    pub fn insert_mortgage(&self, m: &Mortgage) -> SimResult<EntityId> {
        self.conn.execute(
            "INSERT INTO mortgage (
                client_id, property_id, property_price, down_payment, loan_amount,
                interest_rate, term_years, status, total_paid, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                m.client_id,
                m.property_id,
                money(&m.property_price),
                money(&m.down_payment),
                money(&m.loan_amount),
                m.interest_rate.to_string(),
                m.term_years,
                m.status,
                money(&m.total_paid),
                m.created_at.timestamp_millis(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn mortgage(&self, mortgage_id: EntityId) -> SimResult<Mortgage> {
        let sql = format!("SELECT {MORTGAGE_COLUMNS} FROM mortgage WHERE mortgage_id = ?1");
        self.conn
            .query_row(&sql, params![mortgage_id], mortgage_from_row)
            .optional()?
            .ok_or_else(|| SimError::not_found("mortgage", mortgage_id))
    }

    pub fn mortgages_for_client(&self, client_id: EntityId) -> SimResult<Vec<Mortgage>> {
        let sql = format!(
            "SELECT {MORTGAGE_COLUMNS} FROM mortgage WHERE client_id = ?1 ORDER BY mortgage_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![client_id], mortgage_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Mortgages of every client under an account with the given status.
    pub fn mortgages_for_account(
        &self,
        account_id: EntityId,
        status: MortgageStatus,
    ) -> SimResult<Vec<Mortgage>> {
        let sql = format!(
            "SELECT {MORTGAGE_COLUMNS} FROM mortgage
             WHERE status = ?2
               AND client_id IN (SELECT client_id FROM client WHERE account_id = ?1)
             ORDER BY mortgage_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![account_id, status], mortgage_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn save_mortgage(&self, m: &Mortgage) -> SimResult<()> {
        self.conn.execute(
            "UPDATE mortgage SET
                status = ?1, monthly_payment = ?2, next_payment_day = ?3,
                start_payment_day = ?4, total_paid = ?5, payments_made = ?6
             WHERE mortgage_id = ?7",
            params![
                m.status,
                opt_money(&m.monthly_payment),
                m.next_payment_day,
                m.start_payment_day,
                money(&m.total_paid),
                m.payments_made,
                m.mortgage_id,
            ],
        )?;
        Ok(())
    }

    pub fn update_mortgage_total_paid(
        &self,
        mortgage_id: EntityId,
        total_paid: Decimal,
    ) -> SimResult<()> {
        self.conn.execute(
            "UPDATE mortgage SET total_paid = ?1 WHERE mortgage_id = ?2",
            params![money(&total_paid), mortgage_id],
        )?;
        Ok(())
    }
}
