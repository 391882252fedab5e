// Event log model: players, sides, and the tally events produced by the
// recorder.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// One of the two sides in a tally game. Assigned per game by the session
/// orchestrator; it is not a property of the persisted player row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::A, Side::B];

    /// The opposing side.
    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::A => "A",
            Side::B => "B",
        }
    }

    /// Parse "a"/"b" (any case).
    pub fn from_str_side(s: &str) -> Option<Side> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Side::A),
            "B" => Some(Side::B),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A player taking part in the current game, tagged with their side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub team: Side,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jersey_number: Option<u32>,
}

impl Player {
    pub fn new(id: impl Into<String>, name: impl Into<String>, team: Side) -> Self {
        Player {
            id: id.into(),
            name: name.into(),
            team,
            jersey_number: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// The three buttons on the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Score,
    Defend,
    Turnover,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Score => "score",
            EventKind::Defend => "defend",
            EventKind::Turnover => "turnover",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How possession was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnoverType {
    Throwing,
    Catching,
    Skip,
}

impl TurnoverType {
    pub const ALL: [TurnoverType; 3] = [
        TurnoverType::Throwing,
        TurnoverType::Catching,
        TurnoverType::Skip,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TurnoverType::Throwing => "Throwing",
            TurnoverType::Catching => "Catching",
            TurnoverType::Skip => "Skip",
        }
    }

    /// Case-insensitive parse of a turnover type name.
    pub fn from_str_type(s: &str) -> Option<TurnoverType> {
        TurnoverType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for TurnoverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TallyEvent
// ---------------------------------------------------------------------------

/// Type-specific payload of a tally event. Serialized with a `type` tag and
/// the field names used by stored snapshots (`turnoverPlayer`,
/// `turnoverType`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventDetail {
    Score {
        #[serde(default)]
        assister: Option<Player>,
        scorer: Player,
    },
    Defend {
        defender: Player,
    },
    Turnover {
        #[serde(rename = "turnoverPlayer")]
        player: Player,
        #[serde(rename = "turnoverType")]
        turnover_type: TurnoverType,
    },
}

/// One entry in the live event log.
///
/// `team` is always the side of the primary actor (scorer, defender, or
/// turnover player). The constructors derive it; there is no way to set it
/// independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyEvent {
    #[serde(flatten)]
    detail: EventDetail,
    team: Side,
    timestamp: i64,
}

impl TallyEvent {
    pub fn score(assister: Option<Player>, scorer: Player, timestamp: i64) -> Self {
        let team = scorer.team;
        TallyEvent {
            detail: EventDetail::Score { assister, scorer },
            team,
            timestamp,
        }
    }

    pub fn defend(defender: Player, timestamp: i64) -> Self {
        let team = defender.team;
        TallyEvent {
            detail: EventDetail::Defend { defender },
            team,
            timestamp,
        }
    }

    pub fn turnover(player: Player, turnover_type: TurnoverType, timestamp: i64) -> Self {
        let team = player.team;
        TallyEvent {
            detail: EventDetail::Turnover {
                player,
                turnover_type,
            },
            team,
            timestamp,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self.detail {
            EventDetail::Score { .. } => EventKind::Score,
            EventDetail::Defend { .. } => EventKind::Defend,
            EventDetail::Turnover { .. } => EventKind::Turnover,
        }
    }

    pub fn team(&self) -> Side {
        self.team
    }

    /// Epoch milliseconds at creation.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn detail(&self) -> &EventDetail {
        &self.detail
    }

    /// The player whose side the event is credited to.
    pub fn actor(&self) -> &Player {
        match &self.detail {
            EventDetail::Score { scorer, .. } => scorer,
            EventDetail::Defend { defender } => defender,
            EventDetail::Turnover { player, .. } => player,
        }
    }

    /// False only for deserialized events whose stored `team` disagrees with
    /// the actor's side.
    pub fn is_consistent(&self) -> bool {
        self.team == self.actor().team
    }
}

impl fmt::Display for TallyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            EventDetail::Score { assister, scorer } => match assister {
                Some(a) => write!(f, "Score: {} → {} [{}]", a.name, scorer.name, self.team),
                None => write!(f, "Score: No Assister → {} [{}]", scorer.name, self.team),
            },
            EventDetail::Defend { defender } => {
                write!(f, "Defend: {} [{}]", defender.name, self.team)
            }
            EventDetail::Turnover {
                player,
                turnover_type,
            } => write!(f, "Turnover: {} ({}) [{}]", player.name, turnover_type, self.team),
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
