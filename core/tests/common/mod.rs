//! Shared fixtures: an in-memory store, the default config and a test clock
//! pinned to 2024-01-01 that only moves when a test moves it.

#![allow(dead_code)]

use banksim_core::{
    config::SimConfig, engine::SimEngine, model::Client, store::SimStore, types::SlotKey,
    SafeTimeProvider, TimeSource,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;

pub const SEED: u64 = 42;

pub fn slot() -> SlotKey {
    SlotKey::new(1, 1)
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn test_clock(at: DateTime<Utc>) -> SafeTimeProvider {
    SafeTimeProvider::new(TimeSource::Test(at))
}

/// Engine over a fresh in-memory store with slot 1/1 started at the epoch.
pub fn build() -> SimEngine {
    build_with(SimConfig::default_test())
}

pub fn build_with(config: SimConfig) -> SimEngine {
    let store = SimStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    let engine = SimEngine::new(store, config, test_clock(epoch()), SEED).expect("engine");
    engine.start_slot(slot()).expect("start slot");
    engine
}

/// Move the wall clock forward by whole game days.
pub fn advance_days(engine: &SimEngine, days: i64) {
    advance_ms(engine, engine.config.clock.ms_per_game_day * days);
}

pub fn advance_ms(engine: &SimEngine, ms: i64) {
    engine
        .time()
        .test_control()
        .expect("test clock")
        .advance(Duration::milliseconds(ms));
}

/// A client with `checking` already deposited.
pub fn funded_client(engine: &SimEngine, name: &str, checking: Decimal) -> Client {
    let client = engine.create_client(slot(), name).expect("create client");
    if checking > Decimal::ZERO {
        engine.deposit(client.client_id, checking).expect("deposit");
    }
    engine.client(client.client_id).expect("reload client")
}

/// A client earning `annual_salary` from one primary job.
pub fn employed_client(
    engine: &SimEngine,
    name: &str,
    checking: Decimal,
    annual_salary: Decimal,
) -> Client {
    let client = funded_client(engine, name, checking);
    let job = engine
        .create_job("Clerk", "Acme", annual_salary, 1)
        .expect("create job");
    engine
        .assign_job(client.client_id, job.job_id, true)
        .expect("assign job");
    engine.client(client.client_id).expect("reload client")
}
