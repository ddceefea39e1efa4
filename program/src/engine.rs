// Draw Lottery - Draw Engine
use rand::Rng;
use tracing::{debug, warn};

use crate::error::{LotteryError, LotteryResult};
use crate::state::{Participant, ParticipantId, Prize, Run};
use crate::utils::random_index;

/// Positions in `run.prizes` of prizes the participant may still receive
pub fn eligible_indices(run: &Run, participant: &Participant) -> Vec<usize> {
    run.prizes
        .iter()
        .enumerate()
        .filter(|(_, prize)| !prize.is_drawn && !participant.excludes(&prize.name))
        .map(|(index, _)| index)
        .collect()
}

/// Prizes the participant may still receive, in registration order
pub fn eligible_prizes<'a>(run: &'a Run, participant: &Participant) -> Vec<&'a Prize> {
    eligible_indices(run, participant)
        .into_iter()
        .map(|index| &run.prizes[index])
        .collect()
}

/// Draw one prize for a participant.
///
/// The input run is never modified. On success the returned run carries the
/// allocation and the drawn prize is returned alongside it; on any error the
/// caller keeps using the run it passed in.
pub fn draw<R: Rng + ?Sized>(
    run: &Run,
    participant_id: ParticipantId,
    rng: &mut R,
) -> LotteryResult<(Run, Prize)> {
    let participant = run.participant(participant_id).ok_or_else(|| {
        LotteryError::Validation(format!("Unknown participant {}", participant_id))
    })?;

    if !participant.has_draws_remaining() {
        warn!("Participant {} has no draws remaining", participant_id);
        return Err(LotteryError::NoDrawsRemaining { participant_id });
    }

    let eligible = eligible_indices(run, participant);
    let pick = match random_index(rng, eligible.len()) {
        Some(pick) => eligible[pick],
        None => {
            debug!("No eligible prize for participant {}", participant_id);
            return Err(LotteryError::NoEligiblePrize { participant_id });
        }
    };

    let mut next = run.clone();
    let prize = &mut next.prizes[pick];
    prize.is_drawn = true;
    prize.drawn_by_participant_id = Some(participant_id);
    let drawn = prize.clone();

    let winner = next
        .participant_mut(participant_id)
        .ok_or_else(|| LotteryError::Validation(format!("Unknown participant {}", participant_id)))?;
    winner.won_prizes.push(drawn.name.clone());
    winner.remaining_draws -= 1;

    debug!(
        "Participant {} drew prize {} {:?} from {} eligible",
        participant_id,
        drawn.id,
        drawn.name,
        eligible.len()
    );
    Ok((next, drawn))
}
