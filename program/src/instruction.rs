// Draw Lottery - Instructions
use borsh::{BorshDeserialize, BorshSerialize};

use crate::error::{LotteryError, LotteryResult};
use crate::state::{ParticipantId, PrizeId};

/// Intents a host UI dispatches against a run controller
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum RunInstruction {
    /// Register a participant (Configuration only)
    AddParticipant {
        /// Display name, must not be blank
        name: String,
        /// Draw allowance, at least 1
        max_draws: u32,
    },

    /// Register a prize (Configuration only)
    AddPrize {
        /// Display name, must not be blank
        name: String,
    },

    /// Configuration only
    RemoveParticipant { participant_id: ParticipantId },

    /// Configuration only. Purges the prize name from exclusion sets.
    RemovePrize { prize_id: PrizeId },

    /// Flip an exclusion for one participant (Configuration only)
    ToggleExclusion {
        participant_id: ParticipantId,
        /// Exclusions match prizes by this name
        prize_name: String,
    },

    /// Start drawing
    Activate,

    /// Draw one prize for a participant (Active only)
    Draw { participant_id: ParticipantId },

    /// Stop drawing and compute the shareable token
    Finalize,

    /// Discard everything and start a new configuration
    Restart,

    /// Browse the run packed in a token
    LoadToken { token: String },
}

impl RunInstruction {
    /// Unpacks a byte buffer into a RunInstruction
    pub fn unpack(input: &[u8]) -> LotteryResult<Self> {
        Self::try_from_slice(input)
            .map_err(|_| LotteryError::Validation("Invalid instruction data".into()))
    }

    /// Packs a RunInstruction into a byte buffer
    pub fn pack(&self) -> LotteryResult<Vec<u8>> {
        self.try_to_vec()
            .map_err(|e| LotteryError::Validation(format!("Failed to pack instruction: {}", e)))
    }

    /// Name used when logging the dispatched instruction
    pub fn name(&self) -> &'static str {
        match self {
            RunInstruction::AddParticipant { .. } => "Add Participant",
            RunInstruction::AddPrize { .. } => "Add Prize",
            RunInstruction::RemoveParticipant { .. } => "Remove Participant",
            RunInstruction::RemovePrize { .. } => "Remove Prize",
            RunInstruction::ToggleExclusion { .. } => "Toggle Exclusion",
            RunInstruction::Activate => "Activate",
            RunInstruction::Draw { .. } => "Draw",
            RunInstruction::Finalize => "Finalize",
            RunInstruction::Restart => "Restart",
            RunInstruction::LoadToken { .. } => "Load Token",
        }
    }
}
