//! The Game aggregate.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use rinkside_core::error::CoreError;

/// Lifecycle of a game. Transitions are monotonic except through the
/// explicit reversal/correction paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GameStatus {
    /// Created, not yet started.
    Scheduled,
    /// In progress; scoring events apply.
    Live,
    /// Finalized with authoritative scores; new events are rejected.
    Final,
    /// Pushed to a later date.
    Postponed,
    /// Will not be played.
    Cancelled,
}

impl GameStatus {
    /// Storage form of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Live => "LIVE",
            Self::Final => "FINAL",
            Self::Postponed => "POSTPONED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses the storage form.
    ///
    /// # Errors
    ///
    /// `CoreError::Internal` — an unknown status in storage is corrupt
    /// data, not caller input.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw {
            "SCHEDULED" => Ok(Self::Scheduled),
            "LIVE" => Ok(Self::Live),
            "FINAL" => Ok(Self::Final),
            "POSTPONED" => Ok(Self::Postponed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(CoreError::Internal(format!("unknown game status: {other}"))),
        }
    }

    /// Client-facing vocabulary used in snapshots.
    #[must_use]
    pub fn public_label(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Live => "in_progress",
            Self::Final => "final",
            Self::Postponed | Self::Cancelled => "postponed",
        }
    }
}

/// The authoritative mutable record for a game. Owned exclusively by the
/// projector; tenant scope is reachable transitively through
/// `season → league`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    /// Game identifier.
    pub id: Uuid,
    /// Season the game belongs to.
    pub season_id: Uuid,
    /// Home side.
    pub home_team_id: Uuid,
    /// Away side.
    pub away_team_id: Uuid,
    /// Scheduled start.
    pub scheduled_at: DateTime<Utc>,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Current home score.
    pub home_score: u32,
    /// Current away score.
    pub away_score: u32,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last projector touch.
    pub updated_at: DateTime<Utc>,
}

/// Which side of the game a team plays on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The home team.
    Home,
    /// The away team.
    Away,
}

impl Side {
    /// Label used in error messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Away => "away",
        }
    }
}

impl Game {
    /// Resolves a team id to the side it plays on in this game.
    #[must_use]
    pub fn side_of(&self, team_id: Uuid) -> Option<Side> {
        if team_id == self.home_team_id {
            Some(Side::Home)
        } else if team_id == self.away_team_id {
            Some(Side::Away)
        } else {
            None
        }
    }

    /// Score of the given side.
    #[must_use]
    pub fn score_of(&self, side: Side) -> u32 {
        match side {
            Side::Home => self.home_score,
            Side::Away => self.away_score,
        }
    }

    /// Mutable score of the given side.
    pub fn score_of_mut(&mut self, side: Side) -> &mut u32 {
        match side {
            Side::Home => &mut self.home_score,
            Side::Away => &mut self.away_score,
        }
    }
}
