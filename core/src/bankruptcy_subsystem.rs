//! Bankruptcy filing, decisions and the discharge sweep.
//!
//! Lifecycle: PENDING → APPROVED → FINISHED, or PENDING → DENIED.
//! Approval flags the client bankrupt and blocks purchases until the
//! discharge day; the sweep finishes the application once that day arrives.

use crate::{
    clock::ClockEngine,
    config::SimConfig,
    error::{SimError, SimResult},
    model::{BankruptcyApplication, BankruptcyStatus},
    store::SimStore,
    types::{whole_day, Day, EntityId, GameDay, SlotKey},
};
use hourglass_rs::SafeTimeProvider;

pub const BLOCK_REASON: &str = "Bankruptcy";

pub struct BankruptcySubsystem<'a> {
    store: &'a SimStore,
    config: &'a SimConfig,
    time: &'a SafeTimeProvider,
}

impl<'a> BankruptcySubsystem<'a> {
    pub fn new(store: &'a SimStore, config: &'a SimConfig, time: &'a SafeTimeProvider) -> Self {
        Self {
            store,
            config,
            time,
        }
    }

    pub fn file(&self, client_id: EntityId, notes: Option<&str>) -> SimResult<BankruptcyApplication> {
        self.store.atomic(|store| {
            let clock = ClockEngine::new(store, &self.config.clock, self.time);
            let (client, account) = clock.advance_for_client(client_id)?;
            if client.bankrupt {
                return Err(SimError::validation(format!(
                    "client {client_id} is already bankrupt"
                )));
            }
            let notes = notes.map(str::trim).filter(|n| !n.is_empty());
            let filed_day = whole_day(account.game_day);
            let application_id =
                store.insert_bankruptcy_application(client_id, notes, filed_day, self.time.now())?;
            log::info!("day={filed_day} bankruptcy: client {client_id} filed application {application_id}");
            store.bankruptcy_application(application_id)
        })
    }

    pub fn decide(
        &self,
        application_id: EntityId,
        decision: BankruptcyStatus,
    ) -> SimResult<BankruptcyApplication> {
        if !matches!(decision, BankruptcyStatus::Approved | BankruptcyStatus::Denied) {
            return Err(SimError::validation(
                "a bankruptcy decision must approve or deny",
            ));
        }
        self.store.atomic(|store| {
            let application = store.bankruptcy_application(application_id)?;
            if application.status != BankruptcyStatus::Pending {
                return Err(SimError::InvalidTransition {
                    entity: "bankruptcy application",
                    id: application_id.to_string(),
                    from: application.status.to_string(),
                    to: decision.to_string(),
                });
            }
            let client_id = application.client_id;
            if decision == BankruptcyStatus::Approved {
                let discharge_at = self.discharge_day(application.filed_day);
                store.update_bankruptcy_application(application_id, decision, Some(discharge_at))?;
                store.update_client_bankruptcy(client_id, true, Some(discharge_at), Some(BLOCK_REASON))?;
                log::info!(
                    "bankruptcy: application {application_id} approved, client {client_id} discharged at day {discharge_at}"
                );
            } else {
                store.update_bankruptcy_application(application_id, decision, None)?;
                store.update_client_bankruptcy(client_id, false, None, None)?;
                log::info!("bankruptcy: application {application_id} denied");
            }
            store.bankruptcy_application(application_id)
        })
    }

    /// Finish every approved application under the slot whose discharge day
    /// has arrived. Returns the finished applications.
    pub fn sweep(&self, key: SlotKey, current_day: GameDay) -> SimResult<Vec<BankruptcyApplication>> {
        self.store.atomic(|store| {
            let account = store.account(key)?;
            let mut finished = Vec::new();
            for mut application in
                store.bankruptcy_applications_for_account(account.account_id, BankruptcyStatus::Approved)?
            {
                let Some(discharge_at) = application.discharge_at else {
                    continue;
                };
                if current_day < discharge_at as GameDay {
                    continue;
                }
                store.update_bankruptcy_application(
                    application.application_id,
                    BankruptcyStatus::Finished,
                    Some(discharge_at),
                )?;
                store.update_client_bankruptcy(application.client_id, false, None, None)?;
                log::info!(
                    "day={} bankruptcy: client {} discharged",
                    whole_day(current_day),
                    application.client_id
                );
                application.status = BankruptcyStatus::Finished;
                finished.push(application);
            }
            Ok(finished)
        })
    }

    pub fn discharge_day(&self, filed_day: Day) -> Day {
        filed_day + self.config.credit.bankruptcy_discharge_days
    }
}
