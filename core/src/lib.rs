//! banksim-core: a lazily clocked banking simulation.
//!
//! Nothing here runs on its own. Callers pull the simulation forward through
//! [`engine::SimEngine`]; every read first catches the owning account up to
//! the injected wall clock.

pub mod account_subsystem;
pub mod bankruptcy_subsystem;
pub mod client_subsystem;
pub mod clock;
pub mod config;
pub mod credit_subsystem;
pub mod engine;
pub mod error;
pub mod mandatory_spend;
pub mod model;
pub mod money;
pub mod mortgage_reconciliation_subsystem;
pub mod payroll_subsystem;
pub mod rent_subsystem;
pub mod rng;
pub mod spending_subsystem;
pub mod store;
pub mod types;

pub use hourglass_rs::{SafeTimeProvider, TimeSource};
