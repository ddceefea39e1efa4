// Draw Lottery - Processor
use tracing::info;

use crate::controller::RunController;
use crate::error::LotteryResult;
use crate::instruction::RunInstruction;
use crate::state::{ParticipantId, Prize, PrizeId};

/// Result of applying one instruction
#[derive(Clone, Debug, PartialEq)]
pub enum ProcessOutcome {
    /// The run or phase changed with nothing further to report
    Updated,
    /// A participant was added
    ParticipantAdded(ParticipantId),
    /// A prize was added
    PrizeAdded(PrizeId),
    /// Exclusion toggled; `true` when the name is now excluded
    ExclusionToggled(bool),
    /// A draw succeeded
    Drawn(Prize),
    /// The run was finalized with this token
    Finalized(String),
}

pub struct Processor;

impl Processor {
    /// Decode packed instruction data and apply it
    pub fn process(
        controller: &mut RunController,
        instruction_data: &[u8],
    ) -> LotteryResult<ProcessOutcome> {
        let instruction = RunInstruction::unpack(instruction_data)?;
        Self::process_instruction(controller, instruction)
    }

    pub fn process_instruction(
        controller: &mut RunController,
        instruction: RunInstruction,
    ) -> LotteryResult<ProcessOutcome> {
        info!("Instruction: {}", instruction.name());

        match instruction {
            RunInstruction::AddParticipant { name, max_draws } => controller
                .add_participant(&name, max_draws)
                .map(ProcessOutcome::ParticipantAdded),
            RunInstruction::AddPrize { name } => {
                controller.add_prize(&name).map(ProcessOutcome::PrizeAdded)
            }
            RunInstruction::RemoveParticipant { participant_id } => {
                controller.remove_participant(participant_id)?;
                Ok(ProcessOutcome::Updated)
            }
            RunInstruction::RemovePrize { prize_id } => {
                controller.remove_prize(prize_id)?;
                Ok(ProcessOutcome::Updated)
            }
            RunInstruction::ToggleExclusion {
                participant_id,
                prize_name,
            } => controller
                .toggle_exclusion(participant_id, &prize_name)
                .map(ProcessOutcome::ExclusionToggled),
            RunInstruction::Activate => {
                controller.activate()?;
                Ok(ProcessOutcome::Updated)
            }
            RunInstruction::Draw { participant_id } => controller
                .request_draw(participant_id)
                .map(ProcessOutcome::Drawn),
            RunInstruction::Finalize => controller.finalize().map(ProcessOutcome::Finalized),
            RunInstruction::Restart => {
                controller.restart();
                Ok(ProcessOutcome::Updated)
            }
            RunInstruction::LoadToken { token } => {
                controller.load_token(&token)?;
                Ok(ProcessOutcome::Updated)
            }
        }
    }
}
