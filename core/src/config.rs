use crate::types::Day;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Game clock tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Real milliseconds per game day. One game day is one in-game month.
    pub ms_per_game_day: i64,
    /// Game days per game year; growth and dividends fire on year boundaries.
    pub days_per_year: i64,
    pub monthly_cash_growth: Decimal,
    pub annual_growth_rate: Decimal,
    pub annual_dividend_rate: Decimal,
}

/// Account and client money rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankingConfig {
    pub starting_cash: Decimal,
    pub initial_asset_price: Decimal,
    pub daily_withdrawal_limit: Decimal,
    pub max_deposit: Decimal,
    pub max_client_name_len: usize,
}

/// Loan, mortgage and bankruptcy rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditConfig {
    pub repayment_period_days: Day,
    pub loan_min_term_years: i64,
    pub loan_max_term_years: i64,
    pub mortgage_min_term_years: i64,
    pub mortgage_max_term_years: i64,
    pub bankruptcy_discharge_days: Day,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingCategory {
    pub name: String,
    pub min_pct: f64,
    pub max_pct: f64,
    /// Symmetric swing applied to the sampled percentage.
    pub variability: f64,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingConfig {
    pub events_per_month: usize,
    pub categories: Vec<SpendingCategory>,
}

#[derive(Debug, Clone, Deserialize)]
struct SimulationFile {
    clock: ClockConfig,
    banking: BankingConfig,
    credit: CreditConfig,
    events_per_month: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct CategoriesFile {
    categories: Vec<SpendingCategory>,
}

/// Top-level config loaded from data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub clock: ClockConfig,
    pub banking: BankingConfig,
    pub credit: CreditConfig,
    pub spending: SpendingConfig,
}

impl SimConfig {
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/simulation.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: SimulationFile = serde_json::from_str(&content)?;

        let categories_path = format!("{data_dir}/spending/categories.json");
        let categories_content = std::fs::read_to_string(&categories_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {categories_path}: {e}"))?;
        let categories_file: CategoriesFile = serde_json::from_str(&categories_content)?;

        let config = Self {
            clock: file.clock,
            banking: file.banking,
            credit: file.credit,
            spending: SpendingConfig {
                events_per_month: file.events_per_month,
                categories: categories_file.categories,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the clock and generators cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.clock.ms_per_game_day <= 0 {
            anyhow::bail!("clock.ms_per_game_day must be positive");
        }
        if self.clock.days_per_year <= 0 {
            anyhow::bail!("clock.days_per_year must be positive");
        }
        if self.credit.repayment_period_days <= 0 {
            anyhow::bail!("credit.repayment_period_days must be positive");
        }
        if self.spending.events_per_month == 0 {
            anyhow::bail!("events_per_month must be at least 1");
        }
        for c in &self.spending.categories {
            if c.min_pct < 0.0 || c.max_pct < c.min_pct || c.variability < 0.0 {
                anyhow::bail!("spending category '{}' has an invalid range", c.name);
            }
        }
        Ok(())
    }

    /// Minimal config for unit tests. Mirrors data/simulation.json.
    pub fn default_test() -> Self {
        let category = |name: &str, min_pct: f64, max_pct: f64, variability: f64, active: bool| {
            SpendingCategory {
                name: name.to_string(),
                min_pct,
                max_pct,
                variability,
                active,
            }
        };

        Self {
            clock: ClockConfig {
                ms_per_game_day: 60_000,
                days_per_year: 12,
                monthly_cash_growth: Decimal::new(25, 3),
                annual_growth_rate: Decimal::new(10, 2),
                annual_dividend_rate: Decimal::new(3, 2),
            },
            banking: BankingConfig {
                starting_cash: Decimal::new(100_000_00, 2),
                initial_asset_price: Decimal::new(4500_00, 2),
                daily_withdrawal_limit: Decimal::new(500_00, 2),
                max_deposit: Decimal::new(1_000_000_00, 2),
                max_client_name_len: 80,
            },
            credit: CreditConfig {
                repayment_period_days: 1,
                loan_min_term_years: 3,
                loan_max_term_years: 15,
                mortgage_min_term_years: 5,
                mortgage_max_term_years: 30,
                bankruptcy_discharge_days: 84,
            },
            spending: SpendingConfig {
                events_per_month: 4,
                categories: vec![
                    category("Groceries", 0.10, 0.15, 0.10, true),
                    category("Dining", 0.05, 0.10, 0.25, true),
                    category("Entertainment", 0.03, 0.08, 0.30, true),
                    category("Transportation", 0.05, 0.10, 0.15, true),
                    category("Shopping", 0.05, 0.12, 0.30, true),
                    category("Travel", 0.00, 0.10, 0.50, false),
                ],
            },
        }
    }
}
