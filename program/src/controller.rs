// Draw Lottery - Run Controller
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::codec;
use crate::engine;
use crate::error::{LotteryError, LotteryResult};
use crate::state::{ParticipantId, Prize, PrizeId, Run, RunPhase};

/// One successful draw, as shown in the live results feed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawRecord {
    pub participant_id: ParticipantId,
    pub participant_name: String,
    pub prize_id: PrizeId,
    pub prize_name: String,
    pub drawn_at: DateTime<Utc>,
}

/// Owns the authoritative run and moves it through its lifecycle:
/// Configuration -> Active -> Finalized, with History entered only by loading
/// an existing run. Every mutation takes `&mut self`, so draws against one
/// controller are serialized.
pub struct RunController {
    phase: RunPhase,
    run: Run,
    token: Option<String>,
    draw_log: Vec<DrawRecord>,
    rng: StdRng,
}

impl Default for RunController {
    fn default() -> Self {
        Self::new()
    }
}

impl RunController {
    /// Start in Configuration with an empty run
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible draws for a given seed
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            phase: RunPhase::Configuration,
            run: Run::new(),
            token: None,
            draw_log: Vec::new(),
            rng,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn run(&self) -> &Run {
        &self.run
    }

    /// Token of the finalized or loaded run
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Draws made since activation, oldest first
    pub fn draw_log(&self) -> &[DrawRecord] {
        &self.draw_log
    }

    /// The read-only result with its token, once finalized or loaded
    pub fn finalized_snapshot(&self) -> Option<(String, Run)> {
        if !self.phase.is_read_only() {
            return None;
        }
        self.token
            .as_ref()
            .map(|token| (token.clone(), self.run.clone()))
    }

    fn require_phase(&self, expected: RunPhase) -> LotteryResult<()> {
        if self.phase != expected {
            warn!(
                "Rejected operation: requires {} phase, controller is in {}",
                expected, self.phase
            );
            return Err(LotteryError::InvalidPhase {
                expected,
                actual: self.phase,
            });
        }
        Ok(())
    }

    pub fn add_participant(&mut self, name: &str, max_draws: u32) -> LotteryResult<ParticipantId> {
        self.require_phase(RunPhase::Configuration)?;
        let id = self.run.add_participant(name, max_draws)?;
        info!("Participant {} added with {} draws", id, max_draws);
        Ok(id)
    }

    pub fn add_prize(&mut self, name: &str) -> LotteryResult<PrizeId> {
        self.require_phase(RunPhase::Configuration)?;
        let id = self.run.add_prize(name)?;
        info!("Prize {} added", id);
        Ok(id)
    }

    pub fn remove_participant(&mut self, participant_id: ParticipantId) -> LotteryResult<()> {
        self.require_phase(RunPhase::Configuration)?;
        self.run.remove_participant(participant_id)?;
        info!("Participant {} removed", participant_id);
        Ok(())
    }

    pub fn remove_prize(&mut self, prize_id: PrizeId) -> LotteryResult<()> {
        self.require_phase(RunPhase::Configuration)?;
        self.run.remove_prize(prize_id)?;
        info!("Prize {} removed", prize_id);
        Ok(())
    }

    pub fn toggle_exclusion(
        &mut self,
        participant_id: ParticipantId,
        prize_name: &str,
    ) -> LotteryResult<bool> {
        self.require_phase(RunPhase::Configuration)?;
        self.run.toggle_exclusion(participant_id, prize_name)
    }

    /// Configuration -> Active. Needs at least one participant and one prize.
    pub fn activate(&mut self) -> LotteryResult<()> {
        self.require_phase(RunPhase::Configuration)?;

        if self.run.participants.is_empty() {
            warn!("Activation rejected: no participants registered");
            return Err(LotteryError::Validation(
                "At least one participant is required".into(),
            ));
        }
        if self.run.prizes.is_empty() {
            warn!("Activation rejected: no prizes registered");
            return Err(LotteryError::Validation(
                "At least one prize is required".into(),
            ));
        }

        self.run.created_at = Utc::now();
        self.draw_log.clear();
        self.phase = RunPhase::Active;
        info!(
            "Run activated: {} participants, {} prizes",
            self.run.participants.len(),
            self.run.prizes.len()
        );
        Ok(())
    }

    /// Draw one prize for a participant. Exhausting every draw does not
    /// finalize the run.
    pub fn request_draw(&mut self, participant_id: ParticipantId) -> LotteryResult<Prize> {
        self.require_phase(RunPhase::Active)?;

        let (next, prize) = engine::draw(&self.run, participant_id, &mut self.rng)?;
        self.run = next;

        let participant_name = self
            .run
            .participant(participant_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        info!("{} won {}", participant_name, prize.name);
        self.draw_log.push(DrawRecord {
            participant_id,
            participant_name,
            prize_id: prize.id,
            prize_name: prize.name.clone(),
            drawn_at: Utc::now(),
        });
        Ok(prize)
    }

    /// True once no further draw can succeed
    pub fn is_complete(&self) -> bool {
        self.run.participants.iter().all(|participant| {
            !participant.has_draws_remaining()
                || engine::eligible_indices(&self.run, participant).is_empty()
        })
    }

    /// Active -> Finalized. Returns the shareable token.
    pub fn finalize(&mut self) -> LotteryResult<String> {
        self.require_phase(RunPhase::Active)?;

        let token = codec::encode(&self.run)?;
        self.token = Some(token.clone());
        self.phase = RunPhase::Finalized;
        info!(
            "Run finalized: {} of {} prizes drawn",
            self.run.drawn_count(),
            self.run.prizes.len()
        );
        Ok(token)
    }

    /// Any phase -> Configuration with a new empty run
    pub fn restart(&mut self) {
        self.run = Run::new();
        self.token = None;
        self.draw_log.clear();
        self.phase = RunPhase::Configuration;
        info!("Run restarted");
    }

    /// Any phase -> History, replacing the current run. An invalid run is
    /// rejected and the controller keeps its prior state.
    pub fn load_historical(&mut self, run: Run) -> LotteryResult<()> {
        run.validate()
            .map_err(|e| LotteryError::Decode(e.to_string()))?;
        let token = codec::encode(&run)?;
        self.enter_history(run, token);
        Ok(())
    }

    /// Decode a token and browse the run it carries
    pub fn load_token(&mut self, token: &str) -> LotteryResult<()> {
        let run = codec::decode(token).map_err(|e| {
            warn!("Token rejected: {}", e);
            e
        })?;
        self.enter_history(run, token.trim().to_string());
        Ok(())
    }

    fn enter_history(&mut self, run: Run, token: String) {
        if self.phase == RunPhase::Active {
            warn!("Discarding active run to load a historical one");
        }
        self.run = run;
        self.token = Some(token);
        self.draw_log.clear();
        self.phase = RunPhase::History;
        info!(
            "Loaded historical run created at {}",
            self.run.created_at.to_rfc3339()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_controller() -> (RunController, ParticipantId) {
        let mut controller = RunController::with_seed(21);
        let id = controller.add_participant("Dana", 2).unwrap();
        controller.add_prize("Mug").unwrap();
        controller.add_prize("Pen").unwrap();
        controller.activate().unwrap();
        (controller, id)
    }

    #[test]
    fn activation_requires_participants_and_prizes() {
        let mut controller = RunController::with_seed(1);
        assert!(matches!(controller.activate(), Err(LotteryError::Validation(_))));
        controller.add_participant("Dana", 1).unwrap();
        assert!(matches!(controller.activate(), Err(LotteryError::Validation(_))));
        assert_eq!(controller.phase(), RunPhase::Configuration);
    }

    #[test]
    fn configuration_is_locked_after_activation() {
        let (mut controller, dana) = active_controller();
        assert!(matches!(
            controller.add_prize("Late"),
            Err(LotteryError::InvalidPhase { .. })
        ));
        assert!(controller.toggle_exclusion(dana, "Mug").is_err());
        assert!(controller.remove_participant(dana).is_err());
        assert_eq!(controller.run().prizes.len(), 2);
    }

    #[test]
    fn draws_require_active_phase() {
        let mut controller = RunController::with_seed(2);
        let dana = controller.add_participant("Dana", 1).unwrap();
        controller.add_prize("Mug").unwrap();
        assert!(matches!(
            controller.request_draw(dana),
            Err(LotteryError::InvalidPhase { .. })
        ));
    }

    #[test]
    fn draw_log_tracks_each_success() {
        let (mut controller, dana) = active_controller();
        let first = controller.request_draw(dana).unwrap();
        let second = controller.request_draw(dana).unwrap();
        let log: Vec<_> = controller.draw_log().iter().map(|r| r.prize_id).collect();
        assert_eq!(log, vec![first.id, second.id]);
        assert!(controller.is_complete());
        assert_eq!(controller.phase(), RunPhase::Active);
    }

    #[test]
    fn finalize_produces_decodable_token() {
        let (mut controller, dana) = active_controller();
        controller.request_draw(dana).unwrap();
        let token = controller.finalize().unwrap();

        assert_eq!(controller.phase(), RunPhase::Finalized);
        assert_eq!(controller.token(), Some(token.as_str()));
        assert_eq!(&codec::decode(&token).unwrap(), controller.run());
        assert!(controller.request_draw(dana).is_err());
    }

    #[test]
    fn restart_returns_to_empty_configuration() {
        let (mut controller, _) = active_controller();
        controller.finalize().unwrap();
        controller.restart();
        assert_eq!(controller.phase(), RunPhase::Configuration);
        assert!(controller.run().participants.is_empty());
        assert!(controller.token().is_none());
        assert!(controller.finalized_snapshot().is_none());
    }

    #[test]
    fn bad_token_keeps_prior_state() {
        let (mut controller, dana) = active_controller();
        controller.request_draw(dana).unwrap();
        let before = controller.run().clone();

        assert!(controller.load_token("LOTTERY-v1.garbage").is_err());
        assert_eq!(controller.phase(), RunPhase::Active);
        assert_eq!(controller.run(), &before);
    }

    #[test]
    fn loading_token_enters_history() {
        let (mut source, dana) = active_controller();
        source.request_draw(dana).unwrap();
        let token = source.finalize().unwrap();

        let (mut viewer, _) = active_controller();
        viewer.load_token(&token).unwrap();
        assert_eq!(viewer.phase(), RunPhase::History);
        assert_eq!(viewer.run(), source.run());
        assert!(viewer.draw_log().is_empty());
        let (snapshot_token, snapshot_run) = viewer.finalized_snapshot().unwrap();
        assert_eq!(snapshot_token, token);
        assert_eq!(&snapshot_run, source.run());
    }
}
