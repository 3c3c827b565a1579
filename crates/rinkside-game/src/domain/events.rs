//! Scoring event types and their typed payloads.
//!
//! Payloads travel as JSON at the store boundary and as the [`GameAction`]
//! tagged union inside the domain, so the projector and validator get
//! exhaustive-match safety over the closed event set.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rinkside_core::error::{CoreError, codes};

/// The closed set of scoring event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Puck drop; the game goes live.
    GameStarted,
    /// A goal was scored.
    GoalScored,
    /// A penalty was assessed.
    PenaltyAssessed,
    /// A shot on goal was recorded.
    ShotOnGoal,
    /// A period ended.
    PeriodEnded,
    /// The game was finalized with authoritative scores.
    GameFinalized,
    /// The game was cancelled.
    GameCancelled,
    /// A score correction was applied.
    ScoreCorrected,
    /// A prior event was reversed.
    EventReversal,
}

impl EventType {
    /// Wire form of the discriminant.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GameStarted => "GAME_STARTED",
            Self::GoalScored => "GOAL_SCORED",
            Self::PenaltyAssessed => "PENALTY_ASSESSED",
            Self::ShotOnGoal => "SHOT_ON_GOAL",
            Self::PeriodEnded => "PERIOD_ENDED",
            Self::GameFinalized => "GAME_FINALIZED",
            Self::GameCancelled => "GAME_CANCELLED",
            Self::ScoreCorrected => "SCORE_CORRECTED",
            Self::EventReversal => "EVENT_REVERSAL",
        }
    }

    /// Parses the wire form.
    ///
    /// # Errors
    ///
    /// `UNKNOWN_EVENT_TYPE` for anything outside the closed set.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw {
            "GAME_STARTED" => Ok(Self::GameStarted),
            "GOAL_SCORED" => Ok(Self::GoalScored),
            "PENALTY_ASSESSED" => Ok(Self::PenaltyAssessed),
            "SHOT_ON_GOAL" => Ok(Self::ShotOnGoal),
            "PERIOD_ENDED" => Ok(Self::PeriodEnded),
            "GAME_FINALIZED" => Ok(Self::GameFinalized),
            "GAME_CANCELLED" => Ok(Self::GameCancelled),
            "SCORE_CORRECTED" => Ok(Self::ScoreCorrected),
            "EVENT_REVERSAL" => Ok(Self::EventReversal),
            other => Err(CoreError::validation(
                codes::UNKNOWN_EVENT_TYPE,
                format!("unknown event type: {other}"),
            )),
        }
    }

    /// Whether events of this type may be targeted by a reversal.
    #[must_use]
    pub fn is_reversible(self) -> bool {
        matches!(
            self,
            Self::GoalScored | Self::PenaltyAssessed | Self::ShotOnGoal
        )
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of `GAME_STARTED`. No required fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameStartedPayload {}

/// Payload of `GOAL_SCORED`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalScoredPayload {
    /// The scoring team.
    pub team_id: Uuid,
    /// The scoring player.
    pub player_id: Uuid,
    /// Period number, 1-based.
    pub period: u32,
    /// Game clock at the goal, `MM:SS` zero-padded.
    pub time_remaining: String,
    /// Credited assist, when any.
    #[serde(default)]
    pub assist_player_id: Option<Uuid>,
}

/// Payload of `PENALTY_ASSESSED`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PenaltyAssessedPayload {
    /// The penalized team.
    pub team_id: Uuid,
    /// The penalized player.
    pub player_id: Uuid,
    /// Period number, 1-based.
    pub period: u32,
    /// Game clock at the call, `MM:SS` zero-padded.
    pub time_remaining: String,
    /// Infraction name, e.g. `"tripping"`.
    pub infraction: String,
    /// Penalty length in minutes.
    pub minutes: u32,
}

/// Payload of `SHOT_ON_GOAL`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShotOnGoalPayload {
    /// The shooting team.
    pub team_id: Uuid,
    /// The shooting player.
    pub player_id: Uuid,
    /// Period number, 1-based.
    pub period: u32,
}

/// Payload of `PERIOD_ENDED`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodEndedPayload {
    /// The period that just ended, 1-based.
    pub period: u32,
}

/// Payload of `GAME_FINALIZED`. Additional properties are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameFinalizedPayload {
    /// Authoritative final home score.
    pub final_home_score: u32,
    /// Authoritative final away score.
    pub final_away_score: u32,
}

/// Payload of `GAME_CANCELLED`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameCancelledPayload {
    /// Free-form cancellation reason.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Payload of `SCORE_CORRECTED`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreCorrectedPayload {
    /// Home score being corrected away from.
    pub previous_home_score: u32,
    /// Away score being corrected away from.
    pub previous_away_score: u32,
    /// Corrected home score.
    pub new_home_score: u32,
    /// Corrected away score.
    pub new_away_score: u32,
    /// Why the correction was made. Never empty.
    pub reason: String,
}

/// Payload of `EVENT_REVERSAL`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventReversalPayload {
    /// The event being reversed.
    pub reversed_event_id: Uuid,
    /// Free-form reversal reason.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Type-tagged payload union over the closed event set.
#[derive(Debug, Clone)]
pub enum GameAction {
    /// See [`GameStartedPayload`].
    GameStarted(GameStartedPayload),
    /// See [`GoalScoredPayload`].
    GoalScored(GoalScoredPayload),
    /// See [`PenaltyAssessedPayload`].
    PenaltyAssessed(PenaltyAssessedPayload),
    /// See [`ShotOnGoalPayload`].
    ShotOnGoal(ShotOnGoalPayload),
    /// See [`PeriodEndedPayload`].
    PeriodEnded(PeriodEndedPayload),
    /// See [`GameFinalizedPayload`].
    GameFinalized(GameFinalizedPayload),
    /// See [`GameCancelledPayload`].
    GameCancelled(GameCancelledPayload),
    /// See [`ScoreCorrectedPayload`].
    ScoreCorrected(ScoreCorrectedPayload),
    /// See [`EventReversalPayload`].
    EventReversal(EventReversalPayload),
}

impl GameAction {
    /// The event type this action belongs to.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        match self {
            Self::GameStarted(_) => EventType::GameStarted,
            Self::GoalScored(_) => EventType::GoalScored,
            Self::PenaltyAssessed(_) => EventType::PenaltyAssessed,
            Self::ShotOnGoal(_) => EventType::ShotOnGoal,
            Self::PeriodEnded(_) => EventType::PeriodEnded,
            Self::GameFinalized(_) => EventType::GameFinalized,
            Self::GameCancelled(_) => EventType::GameCancelled,
            Self::ScoreCorrected(_) => EventType::ScoreCorrected,
            Self::EventReversal(_) => EventType::EventReversal,
        }
    }

    /// Deserializes a stored payload back into a typed action.
    ///
    /// Stored events passed validation on the way in, so a decode failure
    /// here is an infrastructure problem, not the caller's.
    ///
    /// # Errors
    ///
    /// `CoreError::Internal` when the stored payload does not match the
    /// schema implied by its event type.
    pub fn from_stored(
        event_type: EventType,
        payload: &serde_json::Value,
    ) -> Result<Self, CoreError> {
        fn decode<T: serde::de::DeserializeOwned>(
            event_type: EventType,
            payload: &serde_json::Value,
        ) -> Result<T, CoreError> {
            serde_json::from_value(payload.clone()).map_err(|e| {
                CoreError::Internal(format!("stored {event_type} payload is undecodable: {e}"))
            })
        }

        Ok(match event_type {
            EventType::GameStarted => Self::GameStarted(decode(event_type, payload)?),
            EventType::GoalScored => Self::GoalScored(decode(event_type, payload)?),
            EventType::PenaltyAssessed => Self::PenaltyAssessed(decode(event_type, payload)?),
            EventType::ShotOnGoal => Self::ShotOnGoal(decode(event_type, payload)?),
            EventType::PeriodEnded => Self::PeriodEnded(decode(event_type, payload)?),
            EventType::GameFinalized => Self::GameFinalized(decode(event_type, payload)?),
            EventType::GameCancelled => Self::GameCancelled(decode(event_type, payload)?),
            EventType::ScoreCorrected => Self::ScoreCorrected(decode(event_type, payload)?),
            EventType::EventReversal => Self::EventReversal(decode(event_type, payload)?),
        })
    }
}
