//! The simulation engine: one handle over the store, config, wall clock
//! and RNG bank, exposing every core operation.
//!
//! RUN_DAY ORDER (fixed, documented, never reordered):
//!   1. Clock catch-up      (growth, dividends, withdrawal resets)
//!   2. Payroll             (every payday up to today)
//!   3. Rent                (every rent day up to today)
//!   4. Spending            (each client, once per day)
//!   5. Bankruptcy sweep    (discharges due today)
//!
//! RULES:
//!   - Nothing advances on its own. Every step is pulled by a caller.
//!   - All randomness flows through the RngBank.
//!   - Owner and slot are always passed explicitly; there is no ambient
//!     "current user".

use crate::{
    account_subsystem::AccountSubsystem,
    bankruptcy_subsystem::BankruptcySubsystem,
    client_subsystem::ClientSubsystem,
    clock::{Advance, ClockEngine},
    config::SimConfig,
    credit_subsystem::CreditSubsystem,
    error::SimResult,
    mandatory_spend::{MandatorySpend, MandatorySpendAggregator},
    model::{
        Account, BankruptcyApplication, BankruptcyStatus, Client, ClientJob, ClientLiving,
        InvestmentEvent, Job, Loan, LoanStatus, MonthlyCashflow, Mortgage, MortgageStatus,
        Property, Rental, Transaction,
    },
    mortgage_reconciliation_subsystem::MortgageReconciliationSubsystem,
    payroll_subsystem::PayrollSubsystem,
    rent_subsystem::RentSubsystem,
    rng::{RandomSource, RngBank, SubsystemSlot},
    spending_subsystem::SpendingSubsystem,
    store::SimStore,
    types::{whole_day, Day, EntityId, GameDay, SlotKey},
};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;

/// Everything one `run_day` call did.
#[derive(Debug, Clone)]
pub struct DayReport {
    pub game_day: GameDay,
    pub days_rolled: Vec<Day>,
    pub payroll: Vec<Transaction>,
    pub rent: Vec<Transaction>,
    pub spending: Vec<Transaction>,
    pub discharged: Vec<BankruptcyApplication>,
}

pub struct SimEngine {
    pub config: SimConfig,
    pub rng_bank: RngBank,
    store: SimStore,
    time: SafeTimeProvider,
}

impl SimEngine {
    pub fn new(
        store: SimStore,
        config: SimConfig,
        time: SafeTimeProvider,
        seed: u64,
    ) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rng_bank: RngBank::new(seed),
            store,
            time,
        })
    }

    pub fn store(&self) -> &SimStore {
        &self.store
    }

    pub fn time(&self) -> &SafeTimeProvider {
        &self.time
    }

    fn clock(&self) -> ClockEngine<'_> {
        ClockEngine::new(&self.store, &self.config.clock, &self.time)
    }

    fn accounts(&self) -> AccountSubsystem<'_> {
        AccountSubsystem::new(&self.store, &self.config, &self.time)
    }

    fn clients(&self) -> ClientSubsystem<'_> {
        ClientSubsystem::new(&self.store, &self.config, &self.time)
    }

    fn payroll(&self) -> PayrollSubsystem<'_> {
        PayrollSubsystem::new(&self.store, &self.config, &self.time)
    }

    fn rent(&self) -> RentSubsystem<'_> {
        RentSubsystem::new(&self.store, &self.config, &self.time)
    }

    fn credit(&self) -> CreditSubsystem<'_> {
        CreditSubsystem::new(&self.store, &self.config, &self.time)
    }

    fn bankruptcy(&self) -> BankruptcySubsystem<'_> {
        BankruptcySubsystem::new(&self.store, &self.config, &self.time)
    }

    // ── Core operations ───────────────────────────────────────────

    pub fn advance(&self, key: SlotKey) -> SimResult<Advance> {
        self.clock().advance(key)
    }

    pub fn run_payroll(&self, key: SlotKey, as_of: GameDay) -> SimResult<Vec<Transaction>> {
        self.payroll().run_payroll(key, as_of)
    }

    pub fn charge_rent(&self, key: SlotKey, as_of: GameDay) -> SimResult<Vec<Transaction>> {
        self.rent().charge_rent(key, as_of)
    }

    pub fn recalc_mandatory_spend(&self, client_id: EntityId) -> SimResult<MandatorySpend> {
        MandatorySpendAggregator::new(&self.store).recalc(client_id)
    }

    /// Generate spending with the engine's deterministic per-client stream.
    pub fn generate_spending(&self, client_id: EntityId, day: Day) -> SimResult<Vec<Transaction>> {
        let mut rng = self
            .rng_bank
            .for_client_day(SubsystemSlot::Spending, client_id, day);
        self.generate_spending_with(client_id, day, &mut rng)
    }

    pub fn generate_spending_with(
        &self,
        client_id: EntityId,
        day: Day,
        rng: &mut dyn RandomSource,
    ) -> SimResult<Vec<Transaction>> {
        SpendingSubsystem::new(&self.store, &self.config, &self.time).generate(client_id, day, rng)
    }

    pub fn reconcile_mortgages(&self, key: SlotKey) -> SimResult<Vec<Mortgage>> {
        MortgageReconciliationSubsystem::new(&self.store).reconcile(key)
    }

    pub fn sweep_bankruptcies(
        &self,
        key: SlotKey,
        current_day: GameDay,
    ) -> SimResult<Vec<BankruptcyApplication>> {
        self.bankruptcy().sweep(key, current_day)
    }

    /// One orchestrator pass over a slot at its freshly advanced day.
    pub fn run_day(&self, key: SlotKey) -> SimResult<DayReport> {
        let advance = self.advance(key)?;
        let game_day = advance.account.game_day;
        let today = whole_day(game_day);

        let payroll = self.run_payroll(key, game_day)?;
        let rent = self.charge_rent(key, game_day)?;
        let mut spending = Vec::new();
        for client_id in self.store.client_ids_for_account(advance.account.account_id)? {
            spending.extend(self.generate_spending(client_id, today)?);
        }
        let discharged = self.sweep_bankruptcies(key, game_day)?;

        log::info!(
            "day={today} slot {key}: {} payroll, {} rent, {} spending, {} discharged",
            payroll.len(),
            rent.len(),
            spending.len(),
            discharged.len()
        );
        Ok(DayReport {
            game_day,
            days_rolled: advance.days_rolled,
            payroll,
            rent,
            spending,
            discharged,
        })
    }

    // ── Slot and investments ──────────────────────────────────────

    pub fn start_slot(&self, key: SlotKey) -> SimResult<Account> {
        self.accounts().start_slot(key)
    }

    pub fn account_state(&self, key: SlotKey) -> SimResult<Account> {
        self.accounts().account_state(key)
    }

    pub fn set_mortgage_rate(&self, key: SlotKey, rate: Decimal) -> SimResult<Account> {
        self.accounts().set_mortgage_rate(key, rate)
    }

    pub fn invest(&self, key: SlotKey, amount: Decimal) -> SimResult<Account> {
        self.accounts().invest(key, amount)
    }

    pub fn divest(&self, key: SlotKey, amount: Decimal) -> SimResult<Account> {
        self.accounts().divest(key, amount)
    }

    pub fn investment_events(&self, key: SlotKey) -> SimResult<Vec<InvestmentEvent>> {
        self.accounts().investment_events(key)
    }

    // ── Clients ───────────────────────────────────────────────────

    pub fn create_client(&self, key: SlotKey, name: &str) -> SimResult<Client> {
        self.clients().create_client(key, name)
    }

    pub fn client(&self, client_id: EntityId) -> SimResult<Client> {
        self.clients().client(client_id)
    }

    pub fn list_clients(&self, key: SlotKey) -> SimResult<Vec<Client>> {
        self.clients().clients(key)
    }

    pub fn deposit(&self, client_id: EntityId, amount: Decimal) -> SimResult<Client> {
        self.clients().deposit(client_id, amount)
    }

    pub fn withdraw(&self, client_id: EntityId, amount: Decimal) -> SimResult<Client> {
        self.clients().withdraw(client_id, amount)
    }

    pub fn savings_deposit(&self, client_id: EntityId, amount: Decimal) -> SimResult<Client> {
        self.clients().savings_deposit(client_id, amount)
    }

    pub fn savings_withdraw(&self, client_id: EntityId, amount: Decimal) -> SimResult<Client> {
        self.clients().savings_withdraw(client_id, amount)
    }

    pub fn transactions(&self, client_id: EntityId) -> SimResult<Vec<Transaction>> {
        self.clients().transactions(client_id)
    }

    pub fn monthly_cashflow(
        &self,
        client_id: EntityId,
        year: i64,
        month: i64,
    ) -> SimResult<MonthlyCashflow> {
        self.clients().monthly_cashflow(client_id, year, month)
    }

    // ── Jobs and living ───────────────────────────────────────────

    pub fn create_job(
        &self,
        title: &str,
        employer: &str,
        annual_salary: Decimal,
        pay_cycle_days: i64,
    ) -> SimResult<Job> {
        self.payroll()
            .create_job(title, employer, annual_salary, pay_cycle_days)
    }

    pub fn assign_job(&self, client_id: EntityId, job_id: EntityId, primary: bool) -> SimResult<ClientJob> {
        self.payroll().assign_job(client_id, job_id, primary)
    }

    pub fn create_rental(&self, name: &str, monthly_rent: Decimal) -> SimResult<Rental> {
        self.rent().create_rental(name, monthly_rent)
    }

    pub fn create_property(&self, key: SlotKey, name: &str, price: Decimal) -> SimResult<Property> {
        self.rent().create_property(key, name, price)
    }

    pub fn assign_rental(&self, client_id: EntityId, rental_id: EntityId) -> SimResult<ClientLiving> {
        self.rent().assign_rental(client_id, rental_id)
    }

    pub fn assign_owned_property(
        &self,
        client_id: EntityId,
        property_id: EntityId,
    ) -> SimResult<ClientLiving> {
        self.rent().assign_owned_property(client_id, property_id)
    }

    pub fn clear_living(&self, client_id: EntityId) -> SimResult<ClientLiving> {
        self.rent().clear_living(client_id)
    }

    // ── Credit ────────────────────────────────────────────────────

    pub fn apply_loan(&self, client_id: EntityId, amount: Decimal, term_years: i64) -> SimResult<Loan> {
        self.credit().apply_loan(client_id, amount, term_years)
    }

    pub fn decide_loan(&self, loan_id: EntityId, decision: LoanStatus) -> SimResult<Loan> {
        self.credit().decide_loan(loan_id, decision)
    }

    pub fn apply_mortgage(
        &self,
        client_id: EntityId,
        property_id: EntityId,
        down_payment: Decimal,
        term_years: i64,
    ) -> SimResult<Mortgage> {
        self.credit()
            .apply_mortgage(client_id, property_id, down_payment, term_years)
    }

    pub fn decide_mortgage(&self, mortgage_id: EntityId, decision: MortgageStatus) -> SimResult<Mortgage> {
        self.credit().decide_mortgage(mortgage_id, decision)
    }

    pub fn pay_mortgage(&self, mortgage_id: EntityId, amount: Decimal) -> SimResult<Mortgage> {
        self.credit().pay_mortgage(mortgage_id, amount)
    }

    pub fn mortgages(&self, client_id: EntityId) -> SimResult<Vec<Mortgage>> {
        self.credit().mortgages(client_id)
    }

    pub fn loans(&self, client_id: EntityId) -> SimResult<Vec<Loan>> {
        self.credit().loans(client_id)
    }

    // ── Bankruptcy ────────────────────────────────────────────────

    pub fn file_bankruptcy(
        &self,
        client_id: EntityId,
        notes: Option<&str>,
    ) -> SimResult<BankruptcyApplication> {
        self.bankruptcy().file(client_id, notes)
    }

    pub fn decide_bankruptcy(
        &self,
        application_id: EntityId,
        decision: BankruptcyStatus,
    ) -> SimResult<BankruptcyApplication> {
        self.bankruptcy().decide(application_id, decision)
    }
}
