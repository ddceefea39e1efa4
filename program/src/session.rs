// Draw Lottery - Session
//
// Couples one run controller with the store. Draws hold the controller lock
// for their whole duration. Saves and deletes copy what they need, release
// the lock and finish on a spawned task, so drawing never waits on the
// network. Each persistence outcome is reported once on the event channel
// and never touches the controller.
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::controller::RunController;
use crate::error::{LotteryError, LotteryResult};
use crate::gateway::LotteryGateway;
use crate::processor::{ProcessOutcome, Processor};
use crate::state::{ParticipantId, Prize, RunPhase};

/// Outcome of a background persistence call
#[derive(Clone, Debug, PartialEq)]
pub enum PersistenceEvent {
    Saved { id: String },
    SaveFailed { id: String, error: LotteryError },
    Deleted { id: String },
    DeleteFailed { id: String, error: LotteryError },
}

pub struct LotterySession {
    controller: Arc<Mutex<RunController>>,
    gateway: LotteryGateway,
    events: mpsc::UnboundedSender<PersistenceEvent>,
}

impl LotterySession {
    /// Build a session and the receiver its persistence outcomes arrive on
    pub fn new(
        controller: RunController,
        gateway: LotteryGateway,
    ) -> (Self, mpsc::UnboundedReceiver<PersistenceEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let session = Self {
            controller: Arc::new(Mutex::new(controller)),
            gateway,
            events,
        };
        (session, receiver)
    }

    pub fn controller(&self) -> Arc<Mutex<RunController>> {
        Arc::clone(&self.controller)
    }

    pub fn gateway(&self) -> &LotteryGateway {
        &self.gateway
    }

    /// Apply one packed instruction under the controller lock
    pub async fn dispatch(&self, instruction_data: &[u8]) -> LotteryResult<ProcessOutcome> {
        let mut controller = self.controller.lock().await;
        Processor::process(&mut controller, instruction_data)
    }

    pub async fn draw(&self, participant_id: ParticipantId) -> LotteryResult<Prize> {
        let mut controller = self.controller.lock().await;
        controller.request_draw(participant_id)
    }

    /// Save the finalized or loaded run under its token.
    ///
    /// Fails immediately when there is nothing to save or no authenticated
    /// token; otherwise the request runs in the background.
    pub async fn spawn_save(&self, auth_token: Option<String>) -> LotteryResult<JoinHandle<()>> {
        let (id, run) = {
            let controller = self.controller.lock().await;
            controller.finalized_snapshot().ok_or_else(|| {
                warn!("Save requested before the run was finalized");
                LotteryError::InvalidPhase {
                    expected: RunPhase::Finalized,
                    actual: controller.phase(),
                }
            })?
        };

        if auth_token.as_deref().map_or(true, |t| t.trim().is_empty()) {
            warn!("Save requested without an authenticated token");
            return Err(LotteryError::AuthRequired);
        }

        let gateway = self.gateway.clone();
        let events = self.events.clone();
        Ok(tokio::spawn(async move {
            let event = match gateway.save(&id, &run, auth_token.as_deref()).await {
                Ok(receipt) => PersistenceEvent::Saved { id: receipt.id },
                Err(error) => {
                    warn!("Save failed: {}", error);
                    PersistenceEvent::SaveFailed { id, error }
                }
            };
            Self::report(&events, event);
        }))
    }

    /// Delete a stored run in the background
    pub fn spawn_delete(&self, id: String, auth_token: Option<String>) -> JoinHandle<()> {
        let gateway = self.gateway.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let event = match gateway.delete(&id, auth_token.as_deref()).await {
                Ok(()) => PersistenceEvent::Deleted { id },
                Err(error) => {
                    warn!("Delete failed: {}", error);
                    PersistenceEvent::DeleteFailed { id, error }
                }
            };
            Self::report(&events, event);
        })
    }

    /// Fetch a stored run and browse it, replacing whatever was loaded
    pub async fn load_remote(&self, id: &str) -> LotteryResult<()> {
        let run = self.gateway.get(id).await?;
        let mut controller = self.controller.lock().await;
        controller.load_historical(run)?;
        info!("Loaded stored lottery into history view");
        Ok(())
    }

    fn report(events: &mpsc::UnboundedSender<PersistenceEvent>, event: PersistenceEvent) {
        if events.send(event).is_err() {
            debug!("Persistence event dropped, receiver closed");
        }
    }
}
