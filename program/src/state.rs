// Draw Lottery - State
use std::collections::{BTreeSet, HashMap, HashSet};
use std::convert::TryFrom;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LotteryError, LotteryResult};
use crate::utils::normalize_name;

pub type ParticipantId = u64;
pub type PrizeId = u64;

/// Lifecycle phase of the run owned by a controller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RunPhase {
    /// Participants, prizes and exclusions may be edited
    Configuration,
    /// Draws are being made
    Active,
    /// Drawing stopped by the user, token computed
    Finalized,
    /// Read-only view of a decoded or persisted run
    History,
}

impl RunPhase {
    /// Finalized and History both expose a read-only result
    pub fn is_read_only(&self) -> bool {
        matches!(self, RunPhase::Finalized | RunPhase::History)
    }
}

impl TryFrom<u8> for RunPhase {
    type Error = &'static str;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(RunPhase::Configuration),
            1 => Ok(RunPhase::Active),
            2 => Ok(RunPhase::Finalized),
            3 => Ok(RunPhase::History),
            _ => Err("Invalid run phase"),
        }
    }
}

impl From<RunPhase> for u8 {
    fn from(phase: RunPhase) -> Self {
        match phase {
            RunPhase::Configuration => 0,
            RunPhase::Active => 1,
            RunPhase::Finalized => 2,
            RunPhase::History => 3,
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Configuration => "Configuration",
            RunPhase::Active => "Active",
            RunPhase::Finalized => "Finalized",
            RunPhase::History => "History",
        };
        f.write_str(name)
    }
}

/// An entrant entitled to a fixed number of draws
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Unique within the run
    pub id: ParticipantId,
    /// Display name
    pub name: String,
    /// Number of draws granted at registration
    pub max_draws: u32,
    /// Always `max_draws - won_prizes.len()`
    pub remaining_draws: u32,
    /// Names of won prizes in draw order
    pub won_prizes: Vec<String>,
    /// Prize names this participant may never receive. Matched by display name.
    pub excluded_prize_names: BTreeSet<String>,
}

impl Participant {
    pub fn new(id: ParticipantId, name: String, max_draws: u32) -> Self {
        Self {
            id,
            name,
            max_draws,
            remaining_draws: max_draws,
            won_prizes: Vec::new(),
            excluded_prize_names: BTreeSet::new(),
        }
    }

    pub fn has_draws_remaining(&self) -> bool {
        self.remaining_draws > 0
    }

    pub fn excludes(&self, prize_name: &str) -> bool {
        self.excluded_prize_names.contains(prize_name)
    }
}

/// An item that can be drawn at most once
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prize {
    /// Unique within the run
    pub id: PrizeId,
    /// Display name, also the key exclusions match on
    pub name: String,
    /// Set once, never cleared
    pub is_drawn: bool,
    /// Winner of the prize, present iff `is_drawn`
    pub drawn_by_participant_id: Option<ParticipantId>,
}

impl Prize {
    pub fn new(id: PrizeId, name: String) -> Self {
        Self {
            id,
            name,
            is_drawn: false,
            drawn_by_participant_id: None,
        }
    }
}

/// One lottery configuration plus its evolving draw state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    /// Stamped again when the run is activated
    pub created_at: DateTime<Utc>,
    /// Registration order
    pub participants: Vec<Participant>,
    /// Registration order
    pub prizes: Vec<Prize>,
}

impl Default for Run {
    fn default() -> Self {
        Self::new()
    }
}

impl Run {
    /// Create an empty run
    pub fn new() -> Self {
        Self {
            created_at: Utc::now(),
            participants: Vec::new(),
            prizes: Vec::new(),
        }
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn participant_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id == id)
    }

    pub fn prize(&self, id: PrizeId) -> Option<&Prize> {
        self.prizes.iter().find(|p| p.id == id)
    }

    /// Number of prizes already drawn
    pub fn drawn_count(&self) -> usize {
        self.prizes.iter().filter(|p| p.is_drawn).count()
    }

    /// Sum of every participant's won prizes
    pub fn total_won(&self) -> usize {
        self.participants.iter().map(|p| p.won_prizes.len()).sum()
    }

    fn next_participant_id(&self) -> ParticipantId {
        self.participants.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    fn next_prize_id(&self) -> PrizeId {
        self.prizes.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    /// Register a participant with a positive draw allowance
    pub fn add_participant(&mut self, name: &str, max_draws: u32) -> LotteryResult<ParticipantId> {
        let name = normalize_name(name)
            .ok_or_else(|| LotteryError::Validation("Participant name must not be empty".into()))?;
        if max_draws < 1 {
            return Err(LotteryError::Validation(
                "Participant must be granted at least one draw".into(),
            ));
        }

        let id = self.next_participant_id();
        self.participants.push(Participant::new(id, name, max_draws));
        Ok(id)
    }

    /// Register a prize
    pub fn add_prize(&mut self, name: &str) -> LotteryResult<PrizeId> {
        let name = normalize_name(name)
            .ok_or_else(|| LotteryError::Validation("Prize name must not be empty".into()))?;

        let id = self.next_prize_id();
        self.prizes.push(Prize::new(id, name));
        Ok(id)
    }

    pub fn remove_participant(&mut self, id: ParticipantId) -> LotteryResult<Participant> {
        let index = self
            .participants
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| LotteryError::Validation(format!("Unknown participant {}", id)))?;
        Ok(self.participants.remove(index))
    }

    /// Remove a prize and purge its name from exclusion sets.
    ///
    /// The purge is skipped while another prize still carries the same name,
    /// since that prize is still covered by the exclusion.
    pub fn remove_prize(&mut self, id: PrizeId) -> LotteryResult<Prize> {
        let index = self
            .prizes
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| LotteryError::Validation(format!("Unknown prize {}", id)))?;
        let removed = self.prizes.remove(index);

        if !self.prizes.iter().any(|p| p.name == removed.name) {
            for participant in self.participants.iter_mut() {
                participant.excluded_prize_names.remove(&removed.name);
            }
        }
        Ok(removed)
    }

    /// Flip whether `prize_name` is excluded for a participant.
    /// Returns `true` when the name is now excluded.
    pub fn toggle_exclusion(
        &mut self,
        participant_id: ParticipantId,
        prize_name: &str,
    ) -> LotteryResult<bool> {
        if !self.prizes.iter().any(|p| p.name == prize_name) {
            return Err(LotteryError::Validation(format!(
                "No prize named {:?}",
                prize_name
            )));
        }
        let participant = self.participant_mut(participant_id).ok_or_else(|| {
            LotteryError::Validation(format!("Unknown participant {}", participant_id))
        })?;

        if participant.excluded_prize_names.remove(prize_name) {
            Ok(false)
        } else {
            participant.excluded_prize_names.insert(prize_name.to_string());
            Ok(true)
        }
    }

    /// Check every structural invariant of a run
    pub fn validate(&self) -> LotteryResult<()> {
        let invalid = |msg: String| Err(LotteryError::Validation(msg));

        let mut participant_ids = HashSet::new();
        for participant in &self.participants {
            if !participant_ids.insert(participant.id) {
                return invalid(format!("Duplicate participant id {}", participant.id));
            }
            if participant.name.trim().is_empty() {
                return invalid(format!("Participant {} has an empty name", participant.id));
            }
            if participant.max_draws < 1 {
                return invalid(format!("Participant {} has no draws granted", participant.id));
            }
            let won = participant.won_prizes.len() as u64;
            if won > participant.max_draws as u64
                || participant.remaining_draws as u64 + won != participant.max_draws as u64
            {
                return invalid(format!(
                    "Participant {} draw counts are inconsistent",
                    participant.id
                ));
            }
            if let Some(name) = participant
                .won_prizes
                .iter()
                .find(|name| participant.excludes(name))
            {
                return invalid(format!(
                    "Participant {} holds excluded prize {:?}",
                    participant.id, name
                ));
            }
        }

        let mut prize_ids = HashSet::new();
        let mut names_by_winner: HashMap<ParticipantId, Vec<&str>> = HashMap::new();
        for prize in &self.prizes {
            if !prize_ids.insert(prize.id) {
                return invalid(format!("Duplicate prize id {}", prize.id));
            }
            if prize.name.trim().is_empty() {
                return invalid(format!("Prize {} has an empty name", prize.id));
            }
            match (prize.is_drawn, prize.drawn_by_participant_id) {
                (true, Some(winner)) => {
                    if !participant_ids.contains(&winner) {
                        return invalid(format!(
                            "Prize {} is attributed to unknown participant {}",
                            prize.id, winner
                        ));
                    }
                    names_by_winner.entry(winner).or_default().push(&prize.name);
                }
                (false, None) => {}
                _ => {
                    return invalid(format!(
                        "Prize {} drawn flag disagrees with its winner",
                        prize.id
                    ))
                }
            }
        }

        if self.drawn_count() != self.total_won() {
            return invalid("Drawn prizes do not match prizes won".into());
        }

        // Each participant's won names must be exactly the prizes attributed to them
        for participant in &self.participants {
            let mut attributed = names_by_winner.remove(&participant.id).unwrap_or_default();
            let mut won: Vec<&str> = participant.won_prizes.iter().map(String::as_str).collect();
            attributed.sort_unstable();
            won.sort_unstable();
            if attributed != won {
                return invalid(format!(
                    "Participant {} won prizes disagree with prize attribution",
                    participant.id
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured_run() -> Run {
        let mut run = Run::new();
        run.add_participant("Alice", 2).unwrap();
        run.add_participant("Bob", 1).unwrap();
        run.add_prize("P1").unwrap();
        run.add_prize("P2").unwrap();
        run.add_prize("P3").unwrap();
        run
    }

    #[test]
    fn run_phase_round_trips_through_u8() {
        for phase in [
            RunPhase::Configuration,
            RunPhase::Active,
            RunPhase::Finalized,
            RunPhase::History,
        ] {
            assert_eq!(RunPhase::try_from(u8::from(phase)), Ok(phase));
        }
        assert!(RunPhase::try_from(9).is_err());
    }

    #[test]
    fn add_participant_rejects_empty_name_and_zero_draws() {
        let mut run = Run::new();
        assert!(matches!(
            run.add_participant("   ", 1),
            Err(LotteryError::Validation(_))
        ));
        assert!(matches!(
            run.add_participant("Alice", 0),
            Err(LotteryError::Validation(_))
        ));
        assert!(run.participants.is_empty());
    }

    #[test]
    fn add_participant_trims_and_assigns_fresh_ids() {
        let mut run = Run::new();
        let a = run.add_participant("  Alice ", 3).unwrap();
        let b = run.add_participant("Bob", 1).unwrap();
        assert_ne!(a, b);
        let alice = run.participant(a).unwrap();
        assert_eq!(alice.name, "Alice");
        assert_eq!(alice.remaining_draws, 3);
        assert!(alice.won_prizes.is_empty());

        run.remove_participant(a).unwrap();
        let c = run.add_participant("Carol", 1).unwrap();
        assert_ne!(c, b);
    }

    #[test]
    fn add_prize_rejects_empty_name() {
        let mut run = Run::new();
        assert!(matches!(run.add_prize(""), Err(LotteryError::Validation(_))));
        assert!(run.prizes.is_empty());
    }

    #[test]
    fn toggle_exclusion_flips_membership() {
        let mut run = configured_run();
        let alice = run.participants[0].id;
        assert!(run.toggle_exclusion(alice, "P3").unwrap());
        assert!(run.participant(alice).unwrap().excludes("P3"));
        assert!(!run.toggle_exclusion(alice, "P3").unwrap());
        assert!(!run.participant(alice).unwrap().excludes("P3"));
    }

    #[test]
    fn toggle_exclusion_requires_known_prize_and_participant() {
        let mut run = configured_run();
        let alice = run.participants[0].id;
        assert!(run.toggle_exclusion(alice, "Nope").is_err());
        assert!(run.toggle_exclusion(999, "P1").is_err());
    }

    #[test]
    fn remove_prize_purges_exclusions() {
        let mut run = configured_run();
        let alice = run.participants[0].id;
        run.toggle_exclusion(alice, "P3").unwrap();
        let p3 = run.prizes[2].id;

        run.remove_prize(p3).unwrap();
        assert!(!run.participant(alice).unwrap().excludes("P3"));
        assert_eq!(run.prizes.len(), 2);
    }

    #[test]
    fn remove_prize_keeps_exclusion_while_name_is_still_in_use() {
        let mut run = configured_run();
        let duplicate = run.add_prize("P3").unwrap();
        let alice = run.participants[0].id;
        run.toggle_exclusion(alice, "P3").unwrap();

        run.remove_prize(duplicate).unwrap();
        assert!(run.participant(alice).unwrap().excludes("P3"));
    }

    #[test]
    fn remove_unknown_entries_fails() {
        let mut run = configured_run();
        assert!(run.remove_participant(42).is_err());
        assert!(run.remove_prize(42).is_err());
    }

    #[test]
    fn validate_accepts_fresh_run() {
        assert!(configured_run().validate().is_ok());
        assert!(Run::new().validate().is_ok());
    }

    #[test]
    fn validate_rejects_drawn_flag_without_winner() {
        let mut run = configured_run();
        run.prizes[0].is_drawn = true;
        assert!(run.validate().is_err());
    }

    #[test]
    fn validate_rejects_inconsistent_draw_counts() {
        let mut run = configured_run();
        run.participants[0].remaining_draws = 1;
        assert!(run.validate().is_err());
    }

    #[test]
    fn validate_rejects_excluded_win() {
        let mut run = configured_run();
        let alice = run.participants[0].id;
        run.prizes[2].is_drawn = true;
        run.prizes[2].drawn_by_participant_id = Some(alice);
        run.participants[0].won_prizes.push("P3".into());
        run.participants[0].remaining_draws = 1;
        assert!(run.validate().is_ok());

        run.participants[0].excluded_prize_names.insert("P3".into());
        assert!(run.validate().is_err());
    }

    #[test]
    fn validate_rejects_win_not_backed_by_prize() {
        let mut run = configured_run();
        run.participants[1].won_prizes.push("P1".into());
        run.participants[1].remaining_draws = 0;
        assert!(run.validate().is_err());
    }
}
