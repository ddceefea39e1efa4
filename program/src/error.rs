// Draw Lottery - Errors
use thiserror::Error;

use crate::state::{ParticipantId, RunPhase};

/// Errors that may be returned by the lottery engine and its store client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LotteryError {
    /// Illegal configuration mutation or activation precondition failure
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Operation is not legal in the controller's current phase
    #[error("Operation requires the {expected} phase, run is in {actual}")]
    InvalidPhase {
        expected: RunPhase,
        actual: RunPhase,
    },

    /// Draw requested for a participant that has used every draw
    #[error("Participant {participant_id} has no draws remaining")]
    NoDrawsRemaining { participant_id: ParticipantId },

    /// No undrawn prize is outside the participant's exclusions
    #[error("No eligible prize for participant {participant_id}")]
    NoEligiblePrize { participant_id: ParticipantId },

    /// Token or persisted record failed format or invariant checks
    #[error("Failed to decode run: {0}")]
    Decode(String),

    /// Write or delete attempted without an authenticated caller token
    #[error("An authenticated token is required for this operation")]
    AuthRequired,

    /// The store has no lottery under this id
    #[error("Lottery {0} not found")]
    NotFound(String),

    /// Transport failure or an unsuccessful store response
    #[error("Network error: {0}")]
    Network(String),
}

impl LotteryError {
    /// Errors raised by an illegal local transition. The run is untouched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LotteryError::Validation(_)
                | LotteryError::InvalidPhase { .. }
                | LotteryError::NoDrawsRemaining { .. }
        )
    }

    /// Persistence failures the user may retry by repeating the action
    pub fn is_retryable(&self) -> bool {
        matches!(self, LotteryError::Network(_))
    }
}

impl From<reqwest::Error> for LotteryError {
    fn from(e: reqwest::Error) -> Self {
        LotteryError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for LotteryError {
    fn from(e: serde_json::Error) -> Self {
        LotteryError::Decode(e.to_string())
    }
}

impl From<base64::DecodeError> for LotteryError {
    fn from(e: base64::DecodeError) -> Self {
        LotteryError::Decode(e.to_string())
    }
}

pub type LotteryResult<T> = Result<T, LotteryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_class_groups_local_transition_errors() {
        assert!(LotteryError::Validation("empty name".into()).is_validation());
        assert!(LotteryError::NoDrawsRemaining { participant_id: 1 }.is_validation());
        assert!(LotteryError::InvalidPhase {
            expected: RunPhase::Active,
            actual: RunPhase::Configuration,
        }
        .is_validation());
        assert!(!LotteryError::NoEligiblePrize { participant_id: 1 }.is_validation());
        assert!(!LotteryError::AuthRequired.is_validation());
    }

    #[test]
    fn only_network_errors_are_retryable() {
        assert!(LotteryError::Network("timeout".into()).is_retryable());
        assert!(!LotteryError::AuthRequired.is_retryable());
        assert!(!LotteryError::Decode("bad tag".into()).is_retryable());
    }
}
