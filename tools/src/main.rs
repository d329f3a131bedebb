//! sim-runner: headless orchestrator for the banking simulation.
//!
//! The core never advances on its own; this binary is the caller that pulls
//! it forward. It drives a controllable clock one game day at a time and
//! runs the daily sequence (payroll, rent, spending, bankruptcy sweep).
//!
//! Usage:
//!   sim-runner --seed 12345 --days 36 --db run.db
//!   sim-runner --seed 12345 --ipc-mode

use anyhow::Result;
use banksim_core::{
    config::SimConfig,
    engine::SimEngine,
    model::{BankruptcyStatus, Client, LoanStatus, MortgageStatus, TransactionType},
    rng::{RandomSource, SubsystemSlot},
    store::SimStore,
    types::{EntityId, SlotKey},
};
use chrono::{Duration, TimeZone, Utc};
use hourglass_rs::{SafeTimeProvider, TimeSource};
use rust_decimal::Decimal;
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Advance { days: u64 },
    Command {
        cmd: String,
        payload: serde_json::Value,
    },
    Quit,
}

#[derive(serde::Deserialize)]
struct ClientAmount {
    client_id: EntityId,
    amount: Decimal,
}

#[derive(serde::Deserialize)]
struct SlotAmount {
    amount: Decimal,
}

#[derive(serde::Deserialize)]
struct MortgagePayment {
    mortgage_id: EntityId,
    amount: Decimal,
}

#[derive(serde::Deserialize)]
struct BankruptcyDecision {
    application_id: EntityId,
    decision: BankruptcyStatus,
}

#[derive(serde::Serialize)]
struct UiState {
    game_day: f64,
    liquid_cash: Decimal,
    invested: Decimal,
    asset_price: Decimal,
    next_growth_day: i64,
    clients: Vec<Client>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let days = parse_arg(&args, "--days", 36u64);
    let owner = parse_arg(&args, "--owner", 1i64);
    let slot = parse_arg(&args, "--slot", 1i64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str())
        .unwrap_or("./data");

    if !ipc_mode {
        println!("Banking simulation: sim-runner");
        println!("  seed:      {seed}");
        println!("  days:      {days}");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let config = SimConfig::load(data_dir)?;
    let store = if db == ":memory:" {
        SimStore::in_memory()?
    } else {
        SimStore::open(db)?
    };
    store.migrate()?;

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_else(Utc::now),
    ));
    let day_length = Duration::milliseconds(config.clock.ms_per_game_day);

    let engine = SimEngine::new(store, config, time, seed)?;
    let Some(control) = engine.time().test_control() else {
        anyhow::bail!("runner clock is not controllable");
    };
    let key = SlotKey::new(owner, slot);
    engine.start_slot(key)?;

    if ipc_mode {
        run_ipc_loop(&engine, key, |n| {
            for _ in 0..n {
                control.advance(day_length);
            }
        })?;
        return Ok(());
    }

    let clients = seed_demo(&engine, key)?;
    let mut rng = engine.rng_bank.for_subsystem(SubsystemSlot::Runner);
    for _ in 0..days {
        control.advance(day_length);
        let report = engine.run_day(key)?;
        log::debug!(
            "day {:.0}: {} rolled, {} payroll, {} rent, {} spending",
            report.game_day,
            report.days_rolled.len(),
            report.payroll.len(),
            report.rent.len(),
            report.spending.len()
        );

        // Occasional cash withdrawals within the daily limit.
        for &client_id in &clients {
            if rng.next_f64() < 0.3 {
                let amount = Decimal::from((rng.next_f64() * 400.0) as i64 + 20);
                if let Err(e) = engine.withdraw(client_id, amount) {
                    log::debug!("client {client_id}: withdrawal of {amount} refused: {e}");
                }
            }
        }
    }

    let reconciled = engine.reconcile_mortgages(key)?;
    print_summary(&engine, key, days, &clients, reconciled.len())?;
    Ok(())
}

/// A small population: two renters with jobs, one homeowner with a mortgage.
fn seed_demo(engine: &SimEngine, key: SlotKey) -> Result<Vec<EntityId>> {
    let analyst = engine.create_job("Analyst", "Northwind", Decimal::from(60_000), 1)?;
    let barista = engine.create_job("Barista", "Bean There", Decimal::from(30_000), 1)?;
    let engineer = engine.create_job("Engineer", "Contoso", Decimal::from(96_000), 1)?;
    let studio = engine.create_rental("Studio", Decimal::from(1_200))?;
    let flat = engine.create_rental("Two-bed flat", Decimal::from(1_800))?;
    let house = engine.create_property(key, "Maple Street", Decimal::from(240_000))?;

    let ada = engine.create_client(key, "Ada Park")?;
    engine.deposit(ada.client_id, Decimal::from(5_000))?;
    engine.assign_job(ada.client_id, analyst.job_id, true)?;
    engine.assign_rental(ada.client_id, flat.rental_id)?;

    let ben = engine.create_client(key, "Ben Okafor")?;
    engine.deposit(ben.client_id, Decimal::from(800))?;
    engine.assign_job(ben.client_id, barista.job_id, true)?;
    engine.assign_rental(ben.client_id, studio.rental_id)?;
    let loan = engine.apply_loan(ben.client_id, Decimal::from(9_000), 3)?;
    engine.decide_loan(loan.loan_id, LoanStatus::Approved)?;

    let cy = engine.create_client(key, "Cy Lindqvist")?;
    engine.deposit(cy.client_id, Decimal::from(60_000))?;
    engine.assign_job(cy.client_id, engineer.job_id, true)?;
    let mortgage =
        engine.apply_mortgage(cy.client_id, house.property_id, Decimal::from(48_000), 20)?;
    engine.decide_mortgage(mortgage.mortgage_id, MortgageStatus::Accepted)?;
    engine.assign_owned_property(cy.client_id, house.property_id)?;

    Ok(vec![ada.client_id, ben.client_id, cy.client_id])
}

fn run_ipc_loop(engine: &SimEngine, key: SlotKey, advance_days: impl Fn(u64)) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Advance { days } => {
                for _ in 0..days {
                    advance_days(1);
                    engine.run_day(key)?;
                }
                let state = build_ui_state(engine, key)?;
                writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
            }
            IpcCommand::GetState => {
                let state = build_ui_state(engine, key)?;
                writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
            }
            IpcCommand::Command { cmd, payload } => {
                if let Err(e) = handle_command(engine, key, &cmd, payload) {
                    let err_json = serde_json::json!({ "error": e.to_string() });
                    writeln!(stdout, "{}", err_json)?;
                } else {
                    let state = build_ui_state(engine, key)?;
                    writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
                }
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(
    engine: &SimEngine,
    key: SlotKey,
    cmd: &str,
    payload: serde_json::Value,
) -> Result<()> {
    match cmd {
        "create_client" => {
            let name = payload["name"].as_str().unwrap_or_default();
            engine.create_client(key, name)?;
        }
        "deposit" => {
            let p: ClientAmount = serde_json::from_value(payload)?;
            engine.deposit(p.client_id, p.amount)?;
        }
        "withdraw" => {
            let p: ClientAmount = serde_json::from_value(payload)?;
            engine.withdraw(p.client_id, p.amount)?;
        }
        "invest" => {
            let p: SlotAmount = serde_json::from_value(payload)?;
            engine.invest(key, p.amount)?;
        }
        "divest" => {
            let p: SlotAmount = serde_json::from_value(payload)?;
            engine.divest(key, p.amount)?;
        }
        "pay_mortgage" => {
            let p: MortgagePayment = serde_json::from_value(payload)?;
            engine.pay_mortgage(p.mortgage_id, p.amount)?;
        }
        "reconcile_mortgages" => {
            engine.reconcile_mortgages(key)?;
        }
        "file_bankruptcy" => {
            let client_id = payload["client_id"].as_i64().unwrap_or_default();
            engine.file_bankruptcy(client_id, payload["notes"].as_str())?;
        }
        "decide_bankruptcy" => {
            let p: BankruptcyDecision = serde_json::from_value(payload)?;
            engine.decide_bankruptcy(p.application_id, p.decision)?;
        }
        _ => log::warn!("Unknown command: {}", cmd),
    }
    Ok(())
}

fn build_ui_state(engine: &SimEngine, key: SlotKey) -> Result<UiState> {
    let account = engine.account_state(key)?;
    let clients = engine.list_clients(key)?;
    Ok(UiState {
        game_day: account.game_day,
        liquid_cash: account.liquid_cash,
        invested: account.invested,
        asset_price: account.asset_price,
        next_growth_day: account.next_growth_day,
        clients,
    })
}

fn print_summary(
    engine: &SimEngine,
    key: SlotKey,
    days: u64,
    clients: &[EntityId],
    reconciled: usize,
) -> Result<()> {
    let account = engine.account_state(key)?;

    println!("=== RUN SUMMARY ===");
    println!("  slot:            {key}");
    println!("  days run:        {days}");
    println!("  game day:        {:.2}", account.game_day);
    println!("  liquid cash:     {}", account.liquid_cash);
    println!("  invested:        {}", account.invested);
    println!("  mortgages recon: {reconciled}");

    println!();
    println!("=== CLIENTS ===");
    for &client_id in clients {
        let client = engine.client(client_id)?;
        let txns = engine.transactions(client_id)?;
        let count = |kind: TransactionType| txns.iter().filter(|t| t.kind == kind).count();
        println!(
            "  {:<14} | checking {:>10} | payroll {:>3} | rent {:>3} | failed {:>3} | spending {:>4}",
            client.name,
            client.checking,
            count(TransactionType::PayrollDeposit),
            count(TransactionType::RentPayment),
            count(TransactionType::PaymentFailed),
            count(TransactionType::Spending),
        );
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
