//! League table row types.

use serde::Serialize;
use uuid::Uuid;

/// Outcome of one finalized game from a single team's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    /// Higher score.
    Win,
    /// Lower score.
    Loss,
    /// Equal scores.
    Tie,
}

impl GameResult {
    /// Single-letter form used in streak notation.
    #[must_use]
    pub fn letter(self) -> char {
        match self {
            Self::Win => 'W',
            Self::Loss => 'L',
            Self::Tie => 'T',
        }
    }
}

/// One derived standings row per `(season_id, team_id)`.
///
/// Invariants: `games_played == wins + losses + ties`,
/// `points == wins * 3 + ties`, and
/// `goal_differential == goals_for - goals_against`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TeamStanding {
    /// Season this row belongs to.
    pub season_id: Uuid,
    /// Team this row belongs to.
    pub team_id: Uuid,
    /// Wins accumulated over finalized games.
    pub wins: u32,
    /// Losses accumulated over finalized games.
    pub losses: u32,
    /// Ties accumulated over finalized games.
    pub ties: u32,
    /// Total finalized games: `wins + losses + ties`.
    pub games_played: u32,
    /// League points: three per win, one per tie.
    pub points: u32,
    /// Goals scored.
    pub goals_for: u32,
    /// Goals conceded.
    pub goals_against: u32,
    /// `goals_for - goals_against`.
    pub goal_differential: i64,
    /// Consecutive identical results ending at the most recent game,
    /// formatted `<W|L|T><count>`. Absent for a team with no games.
    pub streak: Option<String>,
}

impl TeamStanding {
    /// A zeroed row for a team with no finalized games yet.
    #[must_use]
    pub fn zeroed(season_id: Uuid, team_id: Uuid) -> Self {
        Self {
            season_id,
            team_id,
            wins: 0,
            losses: 0,
            ties: 0,
            games_played: 0,
            points: 0,
            goals_for: 0,
            goals_against: 0,
            goal_differential: 0,
            streak: None,
        }
    }
}
