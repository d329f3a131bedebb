//! Persistent records of the simulation.
//!
//! Records are plain data. Only `store/*.rs` knows how they map onto rows;
//! subsystems read and write them through `SimStore`.

use crate::types::{Day, EntityId, GameDay, OwnerId, SlotId};
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Declares a status/kind enum stored as SCREAMING_SNAKE_CASE text.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let text = value.as_str()?;
                Self::parse(text).ok_or_else(|| {
                    FromSqlError::Other(
                        format!("unknown {} '{}'", stringify!($name), text).into(),
                    )
                })
            }
        }
    };
}

text_enum!(
    /// Ledger entry kinds.
    TransactionType {
        Deposit => "DEPOSIT",
        Withdrawal => "WITHDRAWAL",
        SavingsDeposit => "SAVINGS_DEPOSIT",
        SavingsWithdrawal => "SAVINGS_WITHDRAWAL",
        PayrollDeposit => "PAYROLL_DEPOSIT",
        RentPayment => "RENT_PAYMENT",
        PaymentFailed => "PAYMENT_FAILED",
        Spending => "SPENDING",
        LoanDisbursement => "LOAN_DISBURSEMENT",
        MortgageDownPayment => "MORTGAGE_DOWN_PAYMENT",
        MortgageDownPaymentFunding => "MORTGAGE_DOWN_PAYMENT_FUNDING",
        MortgagePayment => "MORTGAGE_PAYMENT",
        PropertySale => "PROPERTY_SALE",
    }
);

impl TransactionType {
    /// Kinds that count as income in cashflow reports. Everything else is spending.
    pub const INCOME: [TransactionType; 6] = [
        Self::Deposit,
        Self::PayrollDeposit,
        Self::SavingsDeposit,
        Self::LoanDisbursement,
        Self::MortgageDownPaymentFunding,
        Self::PropertySale,
    ];

    pub fn is_income(&self) -> bool {
        Self::INCOME.contains(self)
    }
}

text_enum!(
    InvestmentEventType {
        Invest => "INVEST",
        Divest => "DIVEST",
        Growth => "GROWTH",
        Dividend => "DIVIDEND",
    }
);

text_enum!(
    LoanStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
);

text_enum!(
    MortgageStatus {
        Pending => "PENDING",
        Accepted => "ACCEPTED",
        Rejected => "REJECTED",
    }
);

text_enum!(
    PropertyStatus {
        Available => "AVAILABLE",
        Owned => "OWNED",
    }
);

text_enum!(
    LivingKind {
        None => "NONE",
        Rental => "RENTAL",
        Owned => "OWNED",
    }
);

text_enum!(
    BankruptcyStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Denied => "DENIED",
        Finished => "FINISHED",
    }
);

/// Bank state for one (owner, slot). The clock cursor lives here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_id: EntityId,
    pub owner_id: OwnerId,
    pub slot_id: SlotId,
    pub liquid_cash: Decimal,
    pub invested: Decimal,
    pub asset_price: Decimal,
    /// Monthly growth applied to liquid cash on every crossed day.
    pub cash_growth_rate: Decimal,
    pub mortgage_rate: Decimal,
    pub game_day: GameDay,
    pub last_observed_at: Option<DateTime<Utc>>,
    pub next_dividend_day: Day,
    pub next_growth_day: Day,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub client_id: EntityId,
    pub account_id: EntityId,
    pub name: String,
    pub checking: Decimal,
    pub savings: Decimal,
    pub daily_withdrawn: Decimal,
    pub monthly_income: Decimal,
    pub mandatory_spend: Decimal,
    pub bankrupt: bool,
    pub bankrupt_until: Option<Day>,
    pub purchase_block_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: EntityId,
    pub title: String,
    pub employer: String,
    pub annual_salary: Decimal,
    pub pay_cycle_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientJob {
    pub client_job_id: EntityId,
    pub client_id: EntityId,
    pub job_id: EntityId,
    pub primary: bool,
    pub next_payday: Option<GameDay>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rental {
    pub rental_id: EntityId,
    pub name: String,
    pub monthly_rent: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub property_id: EntityId,
    pub account_id: EntityId,
    pub name: String,
    pub price: Decimal,
    pub status: PropertyStatus,
    pub owner_client_id: Option<EntityId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientLiving {
    pub client_id: EntityId,
    pub kind: LivingKind,
    pub rental_id: Option<EntityId>,
    pub property_id: Option<EntityId>,
    pub monthly_rent: Decimal,
    pub next_rent_day: Option<Day>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: EntityId,
    pub client_id: EntityId,
    pub amount: Decimal,
    pub term_years: i64,
    pub status: LoanStatus,
    pub monthly_payment: Option<Decimal>,
    pub next_payment_day: Option<Day>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mortgage {
    pub mortgage_id: EntityId,
    pub client_id: EntityId,
    pub property_id: EntityId,
    pub property_price: Decimal,
    pub down_payment: Decimal,
    pub loan_amount: Decimal,
    pub interest_rate: Decimal,
    pub term_years: i64,
    pub status: MortgageStatus,
    pub monthly_payment: Option<Decimal>,
    pub next_payment_day: Option<Day>,
    pub start_payment_day: Option<Day>,
    pub total_paid: Decimal,
    pub payments_made: i64,
    pub created_at: DateTime<Utc>,
}

impl Mortgage {
    pub fn remaining(&self) -> Decimal {
        (self.property_price - self.total_paid).max(Decimal::ZERO)
    }

    pub fn is_paid_off(&self) -> bool {
        self.total_paid >= self.property_price
    }
}

/// Immutable ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub txn_id: String,
    pub client_id: EntityId,
    pub kind: TransactionType,
    pub amount: Decimal,
    pub game_day: Day,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        client_id: EntityId,
        kind: TransactionType,
        amount: Decimal,
        game_day: Day,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            txn_id: uuid::Uuid::new_v4().to_string(),
            client_id,
            kind,
            amount,
            game_day,
            description: None,
            created_at,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentEvent {
    pub event_id: EntityId,
    pub account_id: EntityId,
    pub kind: InvestmentEventType,
    pub amount: Decimal,
    pub game_day: Day,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankruptcyApplication {
    pub application_id: EntityId,
    pub client_id: EntityId,
    pub status: BankruptcyStatus,
    pub notes: Option<String>,
    pub filed_day: Day,
    pub discharge_at: Option<Day>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCashflow {
    pub client_id: EntityId,
    pub year: i64,
    pub month: i64,
    pub game_day: Day,
    pub income: Decimal,
    pub spending: Decimal,
    pub net: Decimal,
    /// Spending as a percentage of income; absent when there was no income.
    pub spending_pct: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_enums_round_trip_their_labels() {
        assert_eq!(TransactionType::PaymentFailed.as_str(), "PAYMENT_FAILED");
        assert_eq!(
            TransactionType::parse("MORTGAGE_PAYMENT"),
            Some(TransactionType::MortgagePayment)
        );
        assert_eq!(BankruptcyStatus::parse("finished"), None);
    }

    #[test]
    fn income_kinds_are_classified() {
        assert!(TransactionType::PayrollDeposit.is_income());
        assert!(!TransactionType::RentPayment.is_income());
        assert!(!TransactionType::Spending.is_income());
    }
}
