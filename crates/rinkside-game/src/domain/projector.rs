//! Deterministic projection of scoring actions onto the Game aggregate.
//!
//! Both entry points are pure: they take the current aggregate and return
//! the next one, or a typed rejection. Transactionality and row locking
//! live in the store adapter, not here.

use chrono::{DateTime, Utc};

use rinkside_core::error::{CoreError, FieldViolation, codes};

use super::aggregates::{Game, GameStatus, Side};
use super::events::{EventType, GameAction, GoalScoredPayload};

fn reject_if_final(game: &Game) -> Result<(), CoreError> {
    if game.status == GameStatus::Final {
        return Err(CoreError::conflict(
            codes::GAME_ALREADY_FINALIZED,
            format!("game {} is already finalized", game.id),
        ));
    }
    Ok(())
}

fn side_for_team(game: &Game, team_id: uuid::Uuid) -> Result<Side, CoreError> {
    game.side_of(team_id).ok_or_else(|| {
        CoreError::validation_fields(
            codes::INVALID_PAYLOAD,
            format!("team {team_id} is not part of game {}", game.id),
            vec![FieldViolation::new(
                "team_id",
                "team does not play in this game",
            )],
        )
    })
}

/// Applies one non-reversal action to the aggregate.
///
/// # Errors
///
/// `GAME_ALREADY_FINALIZED` when the game is final; payload-level
/// rejections for teams outside the game.
pub fn apply(game: &Game, action: &GameAction, now: DateTime<Utc>) -> Result<Game, CoreError> {
    reject_if_final(game)?;

    let mut next = game.clone();
    next.updated_at = now;

    match action {
        GameAction::GameStarted(_) => {
            next.status = GameStatus::Live;
        }
        GameAction::GoalScored(goal) => {
            let side = side_for_team(game, goal.team_id)?;
            *next.score_of_mut(side) += 1;
        }
        // The aggregate does not yet track penalty or shot counters;
        // these events advance `updated_at` only and live on in the log.
        GameAction::PenaltyAssessed(penalty) => {
            side_for_team(game, penalty.team_id)?;
        }
        GameAction::ShotOnGoal(shot) => {
            side_for_team(game, shot.team_id)?;
        }
        GameAction::PeriodEnded(_) => {}
        GameAction::GameFinalized(finalized) => {
            next.status = GameStatus::Final;
            next.home_score = finalized.final_home_score;
            next.away_score = finalized.final_away_score;
        }
        GameAction::GameCancelled(_) => {
            next.status = GameStatus::Cancelled;
        }
        GameAction::ScoreCorrected(corrected) => {
            next.home_score = corrected.new_home_score;
            next.away_score = corrected.new_away_score;
        }
        GameAction::EventReversal(_) => {
            return Err(CoreError::Internal(
                "reversals must be applied through apply_reversal".into(),
            ));
        }
    }

    Ok(next)
}

/// Applies a reversal of a previously stored action.
///
/// The caller has already resolved the target event and checked that it
/// exists and is not yet reversed; this function enforces the reversible
/// type set and computes the inverse effect.
///
/// # Errors
///
/// `GAME_ALREADY_FINALIZED` when the game is final (reversal after
/// finalization is unsupported), `EVENT_NOT_REVERSIBLE` for types outside
/// the reversible set, `SCORE_WOULD_GO_NEGATIVE` when undoing a goal
/// from a zero score.
pub fn apply_reversal(
    game: &Game,
    target_type: EventType,
    target_action: &GameAction,
    now: DateTime<Utc>,
) -> Result<Game, CoreError> {
    reject_if_final(game)?;

    if !target_type.is_reversible() {
        return Err(CoreError::conflict(
            codes::EVENT_NOT_REVERSIBLE,
            format!("events of type {target_type} cannot be reversed"),
        ));
    }

    let mut next = game.clone();
    next.updated_at = now;

    match target_action {
        GameAction::GoalScored(goal) => {
            reverse_goal(game, &mut next, goal)?;
        }
        // Penalty and shot reversals have no aggregate counters to undo
        // yet; the reversal event itself is the durable audit record, and
        // the aggregate still takes an `updated_at` touch.
        GameAction::PenaltyAssessed(_) | GameAction::ShotOnGoal(_) => {}
        _ => {
            // Unreachable while is_reversible() and the payload union stay
            // in sync; surfaced as corrupt state rather than a panic.
            return Err(CoreError::Internal(format!(
                "reversible type {target_type} carried a mismatched payload"
            )));
        }
    }

    Ok(next)
}

fn reverse_goal(game: &Game, next: &mut Game, goal: &GoalScoredPayload) -> Result<(), CoreError> {
    let side = side_for_team(game, goal.team_id)?;
    if game.score_of(side) == 0 {
        return Err(CoreError::conflict(
            codes::SCORE_WOULD_GO_NEGATIVE,
            format!("Cannot reverse goal: {} score is already 0", side.label()),
        ));
    }
    *next.score_of_mut(side) -= 1;
    Ok(())
}
