// Persisted rows: teams, roster players, lines, games, lineups, tally points,
// and the throw events consumed by analytics.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{Player, Side, TallyEvent};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

/// A player row as stored for a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterPlayer {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub jersey_number: Option<u32>,
}

impl RosterPlayer {
    /// This player as a participant on `side` of a tally game.
    pub fn on_side(&self, side: Side) -> Player {
        Player {
            id: self.id.clone(),
            name: self.name.clone(),
            team: side,
            jersey_number: self.jersey_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlayer {
    pub name: String,
    pub jersey_number: Option<u32>,
}

/// A saved group of players that usually take the field together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRecord {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub description: String,
    pub player_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLine {
    pub team_id: String,
    pub name: String,
    pub description: String,
    pub player_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Games
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: String,
    pub team_id: Option<String>,
    pub opponent: String,
    /// ISO date, `YYYY-MM-DD`.
    pub game_date: Option<String>,
    pub game_type: Option<String>,
    pub final_score_us: Option<u32>,
    pub final_score_them: Option<u32>,
    pub event_log: Vec<TallyEvent>,
    pub created_at: String,
}

impl GameRecord {
    /// True only when our score is strictly higher. Missing scores count as 0.
    pub fn is_win(&self) -> bool {
        self.final_score_us.unwrap_or(0) > self.final_score_them.unwrap_or(0)
    }

    /// The lineup that won a tally game, or `None` on a tie.
    pub fn winning_lineup(&self) -> Option<LineupTeam> {
        let us = self.final_score_us.unwrap_or(0);
        let them = self.final_score_them.unwrap_or(0);
        match us.cmp(&them) {
            std::cmp::Ordering::Greater => Some(LineupTeam::Dark),
            std::cmp::Ordering::Less => Some(LineupTeam::Light),
            std::cmp::Ordering::Equal => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGame {
    pub team_id: Option<String>,
    pub opponent: String,
    pub game_date: Option<String>,
    pub game_type: Option<String>,
    pub final_score_us: Option<u32>,
    pub final_score_them: Option<u32>,
    pub event_log: Vec<TallyEvent>,
}

// ---------------------------------------------------------------------------
// Lineups
// ---------------------------------------------------------------------------

/// Stored lineup label. Side A plays as Dark, side B as Light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineupTeam {
    Dark,
    Light,
}

impl LineupTeam {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineupTeam::Dark => "Dark",
            LineupTeam::Light => "Light",
        }
    }

    pub fn side(self) -> Side {
        match self {
            LineupTeam::Dark => Side::A,
            LineupTeam::Light => Side::B,
        }
    }
}

impl From<Side> for LineupTeam {
    fn from(side: Side) -> Self {
        match side {
            Side::A => LineupTeam::Dark,
            Side::B => LineupTeam::Light,
        }
    }
}

impl fmt::Display for LineupTeam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineupTeam {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Dark" => Ok(LineupTeam::Dark),
            "Light" => Ok(LineupTeam::Light),
            other => Err(format!("unknown lineup team: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupRecord {
    pub id: String,
    pub game_id: String,
    pub team: LineupTeam,
    pub player_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineup {
    pub game_id: String,
    pub team: LineupTeam,
    pub player_ids: Vec<String>,
}

/// One point credited to one player for winning a tally game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyPointRecord {
    pub id: String,
    pub game_id: String,
    pub player_id: String,
}

// ---------------------------------------------------------------------------
// Throw events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThrowResult {
    Completion,
    Turnover,
    Goal,
}

impl ThrowResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThrowResult::Completion => "completion",
            ThrowResult::Turnover => "turnover",
            ThrowResult::Goal => "goal",
        }
    }
}

impl FromStr for ThrowResult {
    type Err = String;

    /// Stored rows use mixed case ("Goal", "completion"), so matching ignores
    /// case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "completion" => Ok(ThrowResult::Completion),
            "turnover" => Ok(ThrowResult::Turnover),
            "goal" => Ok(ThrowResult::Goal),
            other => Err(format!("unknown throw result: {other}")),
        }
    }
}

/// One throw: who threw, who (if anyone) received, and how it ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrowEvent {
    pub id: String,
    pub game_id: String,
    pub thrower_id: String,
    pub receiver_id: Option<String>,
    pub result: ThrowResult,
    pub point_number: Option<u32>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewThrowEvent {
    pub game_id: String,
    pub thrower_id: String,
    pub receiver_id: Option<String>,
    pub result: ThrowResult,
    pub point_number: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(us: Option<u32>, them: Option<u32>) -> GameRecord {
        GameRecord {
            id: "g".into(),
            team_id: None,
            opponent: "x".into(),
            game_date: None,
            game_type: None,
            final_score_us: us,
            final_score_them: them,
            event_log: Vec::new(),
            created_at: String::new(),
        }
    }

    #[test]
    fn tie_is_not_a_win() {
        assert!(!game(Some(5), Some(5)).is_win());
        assert!(game(Some(6), Some(5)).is_win());
        assert!(!game(None, None).is_win());
    }

    #[test]
    fn winning_lineup_maps_sides() {
        assert_eq!(game(Some(7), Some(3)).winning_lineup(), Some(LineupTeam::Dark));
        assert_eq!(game(Some(2), Some(3)).winning_lineup(), Some(LineupTeam::Light));
        assert_eq!(game(Some(3), Some(3)).winning_lineup(), None);
        assert_eq!(LineupTeam::from(Side::B).side(), Side::B);
    }

    #[test]
    fn throw_result_parse_ignores_case() {
        assert_eq!("Goal".parse::<ThrowResult>(), Ok(ThrowResult::Goal));
        assert_eq!("TURNOVER".parse::<ThrowResult>(), Ok(ThrowResult::Turnover));
        assert!("drop".parse::<ThrowResult>().is_err());
    }
}
