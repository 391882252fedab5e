// Messages between the front-end and the app loop.

use ultitally_core::model::{Side, TallyEvent};
use ultitally_core::tally::Tallies;

use crate::dashboard::Dashboard;
use crate::session::{Assignment, GameSettings, PassCommand, RecorderCommand, TeamMethod};

/// Commands sent from the front-end to the app loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    ChooseMethod(TeamMethod),
    /// Apply a saved line by id.
    ApplyLine(String),
    /// Assign a player, named by id or by case-insensitive name.
    Assign {
        player: String,
        assignment: Assignment,
    },
    ConfirmTeams,
    Back,
    Configure(GameSettings),
    StartGame,
    Recorder(RecorderCommand),
    /// Pass tracking. A tapped player may be named by id or by
    /// case-insensitive name.
    Pass(PassCommand),
    PauseClock,
    ResumeClock,
    Save,
    Discard,
    RefreshStats,
    Status,
    Quit,
}

/// A read-only view of one side for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideView {
    pub side: Side,
    pub players: Vec<String>,
    pub score: u32,
}

/// Everything the front-end shows about the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub step: String,
    pub sides: Vec<SideView>,
    pub absent: Vec<String>,
    /// Saved lines as `(id, name)`.
    pub lines: Vec<(String, String)>,
    pub tallies: Tallies,
    pub clock: String,
    pub clock_running: bool,
    pub score_cap_reached: bool,
    /// Prompt of the open entry, if any.
    pub prompt: Option<String>,
    /// Picker rows for the open entry, with the highlighted index.
    pub options: Vec<String>,
    pub highlight: usize,
    pub recent: Vec<String>,
    pub last_event: Option<TallyEvent>,
    pub point_number: u32,
    pub thrower: Option<String>,
    pub receiver: Option<String>,
    pub passes_logged: usize,
    pub last_error: Option<String>,
}

/// Updates pushed from the app loop to the front-end.
#[derive(Debug, Clone)]
pub enum UiUpdate {
    Status(Box<StatusView>),
    ClockTick { display: String, expired: bool },
    Info(String),
    Error(String),
    GameSaved { game_id: String },
    Discarded,
    Stats(Box<Dashboard>),
}
