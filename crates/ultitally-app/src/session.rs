// Game session orchestrator: team assembly, settings, live recording (tally
// events and passes), and the durable session snapshot.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use ultitally_core::backend::SessionStore;
use ultitally_core::config::GameDefaults;
use ultitally_core::model::{EventKind, Player, Side, TallyEvent, TurnoverType};
use ultitally_core::passes::{PassError, PassTracker, PassTransition};
use ultitally_core::recorder::{Recorder, RecorderError, RecorderSnapshot, Transition};
use ultitally_core::records::{LineRecord, RosterPlayer};
use ultitally_core::tally::Tallies;

use crate::clock::MatchClock;

/// Session-store key for the whole in-progress game.
pub const SESSION_STATE_KEY: &str = "live-game-session";

// ---------------------------------------------------------------------------
// Wizard types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardStep {
    ChoosingTeamMethod,
    AssigningTeams,
    ConfiguringSettings,
    Live,
    Saved { game_id: String },
    Discarded,
}

impl WizardStep {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WizardStep::Saved { .. } | WizardStep::Discarded)
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardStep::ChoosingTeamMethod => f.write_str("choosing team method"),
            WizardStep::AssigningTeams => f.write_str("assigning teams"),
            WizardStep::ConfiguringSettings => f.write_str("configuring settings"),
            WizardStep::Live => f.write_str("live"),
            WizardStep::Saved { game_id } => write!(f, "saved ({game_id})"),
            WizardStep::Discarded => f.write_str("discarded"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeamMethod {
    /// One saved line against the rest of the roster.
    Line,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assignment {
    Side(Side),
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    /// 0 = count-up clock.
    pub duration_minutes: u32,
    /// 0 = uncapped.
    pub score_cap: u32,
}

impl From<GameDefaults> for GameSettings {
    fn from(d: GameDefaults) -> Self {
        GameSettings {
            duration_minutes: d.duration_minutes,
            score_cap: d.score_cap,
        }
    }
}

/// What a previous save attempt already wrote, so a retry can pick up where
/// it stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveProgress {
    pub game_id: Option<String>,
    pub lineups_saved: bool,
    pub events_saved: bool,
}

/// Input the live recorder understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderCommand {
    Open(EventKind),
    Input(String),
    HighlightDown,
    HighlightUp,
    PickHighlighted,
    /// Pick the n-th recent player (0 = most recent).
    PickRecent(usize),
    /// Score without an assister.
    NoAssister,
    TurnoverType(TurnoverType),
    Cancel,
    Undo,
}

/// Input the pass tracker understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassCommand {
    /// Tap a player by id: thrower, then receiver, then receiver again to
    /// confirm the catch.
    Tap(String),
    Catch,
    Goal,
    Turnover,
    /// Drop the last selection.
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("cannot {action} while {step}")]
    WrongStep { action: &'static str, step: String },

    #[error("unknown player: {0}")]
    UnknownPlayer(String),

    #[error("each side needs at least one player (A: {a}, B: {b})")]
    EmptySide { a: usize, b: usize },

    #[error("{0} is not playing in this game")]
    NotPlaying(String),

    #[error("the game is already partly saved; retry the save or discard it")]
    SaveStarted,

    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error(transparent)]
    Pass(#[from] PassError),
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Durable form of a session, written after every change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub step: WizardStep,
    pub team_id: Option<String>,
    pub method: Option<TeamMethod>,
    pub roster: Vec<RosterPlayer>,
    pub assignments: HashMap<String, Assignment>,
    pub settings: GameSettings,
    pub clock: MatchClock,
    pub recorder: RecorderSnapshot,
    #[serde(default)]
    pub passes: PassTracker,
    #[serde(default)]
    pub save: SaveProgress,
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GameSession {
    step: WizardStep,
    team_id: Option<String>,
    method: Option<TeamMethod>,
    roster: Vec<RosterPlayer>,
    assignments: HashMap<String, Assignment>,
    settings: GameSettings,
    clock: MatchClock,
    recorder: Recorder,
    passes: PassTracker,
    save: SaveProgress,
    saving: bool,
    last_error: Option<String>,
    recent_limit: usize,
}

impl GameSession {
    /// A fresh session. Every roster player starts absent.
    pub fn new(
        team_id: Option<String>,
        roster: Vec<RosterPlayer>,
        defaults: GameDefaults,
        recent_limit: usize,
    ) -> Self {
        let settings = GameSettings::from(defaults);
        GameSession {
            step: WizardStep::ChoosingTeamMethod,
            team_id,
            method: None,
            roster,
            assignments: HashMap::new(),
            settings,
            clock: MatchClock::new(settings.duration_minutes),
            recorder: Recorder::new(recent_limit),
            passes: PassTracker::default(),
            save: SaveProgress::default(),
            saving: false,
            last_error: None,
            recent_limit,
        }
    }

    pub fn from_snapshot(snapshot: SessionSnapshot, recent_limit: usize) -> Self {
        GameSession {
            step: snapshot.step,
            team_id: snapshot.team_id,
            method: snapshot.method,
            roster: snapshot.roster,
            assignments: snapshot.assignments,
            settings: snapshot.settings,
            clock: snapshot.clock,
            recorder: Recorder::restore(snapshot.recorder, recent_limit),
            passes: snapshot.passes,
            save: snapshot.save,
            saving: false,
            last_error: None,
            recent_limit,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            step: self.step.clone(),
            team_id: self.team_id.clone(),
            method: self.method,
            roster: self.roster.clone(),
            assignments: self.assignments.clone(),
            settings: self.settings,
            clock: self.clock,
            recorder: self.recorder.snapshot(),
            passes: self.passes.clone(),
            save: self.save.clone(),
        }
    }

    /// Load an in-progress session. Returns `None` when nothing usable is
    /// stored; unreadable snapshots are logged and ignored.
    pub fn restore(store: &dyn SessionStore, recent_limit: usize) -> Option<Self> {
        let value = match store.load_session(SESSION_STATE_KEY) {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                warn!("failed to read session snapshot: {e:#}");
                return None;
            }
        };
        match serde_json::from_value::<SessionSnapshot>(value) {
            Ok(snapshot) if snapshot.step.is_terminal() => {
                warn!("ignoring finished session snapshot ({})", snapshot.step);
                None
            }
            Ok(snapshot) => {
                info!(
                    "restored session at step {} with {} event(s)",
                    snapshot.step,
                    snapshot.recorder.event_log.len()
                );
                Some(GameSession::from_snapshot(snapshot, recent_limit))
            }
            Err(e) => {
                warn!("discarding unreadable session snapshot: {e}");
                None
            }
        }
    }

    /// Mirror the session to the store. Failures are logged; the in-memory
    /// session stays authoritative.
    pub fn autosave(&self, store: &dyn SessionStore) {
        let result = serde_json::to_value(self.snapshot())
            .map_err(anyhow::Error::from)
            .and_then(|value| store.save_session(SESSION_STATE_KEY, &value));
        if let Err(e) = result {
            warn!("failed to autosave session: {e:#}");
        }
    }

    // -- Accessors -----------------------------------------------------------

    pub fn step(&self) -> &WizardStep {
        &self.step
    }

    pub fn team_id(&self) -> Option<&str> {
        self.team_id.as_deref()
    }

    pub fn method(&self) -> Option<TeamMethod> {
        self.method
    }

    pub fn roster(&self) -> &[RosterPlayer] {
        &self.roster
    }

    pub fn assignment(&self, player_id: &str) -> Assignment {
        self.assignments
            .get(player_id)
            .copied()
            .unwrap_or(Assignment::Absent)
    }

    pub fn settings(&self) -> GameSettings {
        self.settings
    }

    pub fn clock(&self) -> &MatchClock {
        &self.clock
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn tallies(&self) -> &Tallies {
        self.recorder.tallies()
    }

    pub fn event_log(&self) -> &[TallyEvent] {
        self.recorder.event_log()
    }

    pub fn pass_tracker(&self) -> &PassTracker {
        &self.passes
    }

    pub fn save_progress(&self) -> &SaveProgress {
        &self.save
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Players on `side`, in roster order.
    pub fn side_players(&self, side: Side) -> Vec<Player> {
        self.roster
            .iter()
            .filter(|p| self.assignment(&p.id) == Assignment::Side(side))
            .map(|p| p.on_side(side))
            .collect()
    }

    /// Everyone taking part, in roster order.
    pub fn present_players(&self) -> Vec<Player> {
        self.roster
            .iter()
            .filter_map(|p| match self.assignment(&p.id) {
                Assignment::Side(side) => Some(p.on_side(side)),
                Assignment::Absent => None,
            })
            .collect()
    }

    /// Advisory: either side has reached a non-zero cap.
    pub fn score_cap_reached(&self) -> bool {
        let cap = self.settings.score_cap;
        cap > 0 && Side::BOTH.iter().any(|&s| self.tallies().score(s) >= cap)
    }

    // -- Wizard --------------------------------------------------------------

    fn expect_step(&self, expected: &WizardStep, action: &'static str) -> Result<(), WizardError> {
        if &self.step == expected {
            Ok(())
        } else {
            debug!("refused {action} while {}", self.step);
            Err(WizardError::WrongStep {
                action,
                step: self.step.to_string(),
            })
        }
    }

    pub fn choose_method(&mut self, method: TeamMethod) -> Result<(), WizardError> {
        self.expect_step(&WizardStep::ChoosingTeamMethod, "choose a team method")?;
        self.method = Some(method);
        self.step = WizardStep::AssigningTeams;
        Ok(())
    }

    /// Put the line on side A and every other roster player on side B.
    pub fn apply_line(&mut self, line: &LineRecord) -> Result<(), WizardError> {
        self.expect_step(&WizardStep::AssigningTeams, "apply a line")?;
        self.assignments = self
            .roster
            .iter()
            .map(|p| {
                let side = if line.player_ids.contains(&p.id) {
                    Side::A
                } else {
                    Side::B
                };
                (p.id.clone(), Assignment::Side(side))
            })
            .collect();
        info!("applied line {} against the rest of the roster", line.name);
        Ok(())
    }

    pub fn assign(&mut self, player_id: &str, assignment: Assignment) -> Result<(), WizardError> {
        self.expect_step(&WizardStep::AssigningTeams, "assign players")?;
        if !self.roster.iter().any(|p| p.id == player_id) {
            return Err(WizardError::UnknownPlayer(player_id.to_string()));
        }
        self.assignments.insert(player_id.to_string(), assignment);
        Ok(())
    }

    pub fn confirm_teams(&mut self) -> Result<(), WizardError> {
        self.expect_step(&WizardStep::AssigningTeams, "confirm teams")?;
        let a = self.side_players(Side::A).len();
        let b = self.side_players(Side::B).len();
        if a == 0 || b == 0 {
            return Err(WizardError::EmptySide { a, b });
        }
        self.step = WizardStep::ConfiguringSettings;
        Ok(())
    }

    /// Step back one wizard page. Not available once the game is live.
    pub fn back(&mut self) -> Result<(), WizardError> {
        self.step = match self.step {
            WizardStep::AssigningTeams => WizardStep::ChoosingTeamMethod,
            WizardStep::ConfiguringSettings => WizardStep::AssigningTeams,
            _ => {
                return Err(WizardError::WrongStep {
                    action: "go back",
                    step: self.step.to_string(),
                })
            }
        };
        Ok(())
    }

    pub fn configure(&mut self, settings: GameSettings) -> Result<(), WizardError> {
        self.expect_step(&WizardStep::ConfiguringSettings, "change settings")?;
        self.settings = settings;
        self.clock = MatchClock::new(settings.duration_minutes);
        Ok(())
    }

    pub fn start_game(&mut self) -> Result<(), WizardError> {
        self.expect_step(&WizardStep::ConfiguringSettings, "start the game")?;
        self.clock = MatchClock::new(self.settings.duration_minutes);
        self.clock.start();
        self.step = WizardStep::Live;
        info!(
            "game started: {} vs {} players, {} min, cap {}",
            self.side_players(Side::A).len(),
            self.side_players(Side::B).len(),
            self.settings.duration_minutes,
            self.settings.score_cap
        );
        Ok(())
    }

    // -- Live ----------------------------------------------------------------

    /// Once a save has written the game row, the log is frozen so a retry
    /// stores exactly what that row says.
    fn expect_unsaved(&self) -> Result<(), WizardError> {
        match &self.save.game_id {
            Some(game_id) => {
                debug!("refused change to partly saved game {game_id}");
                Err(WizardError::SaveStarted)
            }
            None => Ok(()),
        }
    }

    /// Route a recorder command. Picker-only commands return `None`.
    pub fn record(&mut self, cmd: RecorderCommand) -> Result<Option<Transition>, WizardError> {
        self.expect_step(&WizardStep::Live, "record events")?;
        self.expect_unsaved()?;
        let present = self.present_players();
        let rec = &mut self.recorder;
        let transition = match cmd {
            RecorderCommand::Open(kind) => Some(rec.open_modal(kind)?),
            RecorderCommand::Input(text) => {
                rec.input(&text)?;
                None
            }
            RecorderCommand::HighlightDown => {
                rec.highlight_down(&present);
                None
            }
            RecorderCommand::HighlightUp => {
                rec.highlight_up();
                None
            }
            RecorderCommand::PickHighlighted => Some(rec.pick_highlighted(&present)?),
            RecorderCommand::PickRecent(index) => Some(rec.pick_recent(index, &present)?),
            RecorderCommand::NoAssister => Some(rec.select_assister(None)?),
            RecorderCommand::TurnoverType(t) => Some(rec.select_turnover_type(t)?),
            RecorderCommand::Cancel => Some(rec.cancel()),
            RecorderCommand::Undo => Some(rec.undo()?),
        };
        if transition.as_ref().is_some_and(Transition::settled) && self.score_cap_reached() {
            info!("score cap of {} reached", self.settings.score_cap);
        }
        Ok(transition)
    }

    /// Route a pass command. Tapped players must be on a side.
    pub fn pass(&mut self, cmd: PassCommand) -> Result<PassTransition, WizardError> {
        self.expect_step(&WizardStep::Live, "record passes")?;
        self.expect_unsaved()?;
        let transition = match cmd {
            PassCommand::Tap(player_id) => {
                let player = self
                    .present_players()
                    .into_iter()
                    .find(|p| p.id == player_id)
                    .ok_or(WizardError::NotPlaying(player_id))?;
                self.passes.tap(player)?
            }
            PassCommand::Catch => self.passes.catch()?,
            PassCommand::Goal => self.passes.goal()?,
            PassCommand::Turnover => self.passes.turnover()?,
            PassCommand::Clear => self.passes.clear(),
        };
        Ok(transition)
    }

    /// One clock second. Returns true when the clock moved.
    pub fn tick(&mut self) -> bool {
        self.step == WizardStep::Live && self.clock.tick()
    }

    pub fn pause_clock(&mut self) -> Result<(), WizardError> {
        self.expect_step(&WizardStep::Live, "pause the clock")?;
        self.clock.pause();
        Ok(())
    }

    pub fn resume_clock(&mut self) -> Result<(), WizardError> {
        self.expect_step(&WizardStep::Live, "resume the clock")?;
        self.clock.resume();
        Ok(())
    }

    // -- Save bookkeeping (driven by crate::save) ----------------------------

    pub(crate) fn set_saving(&mut self, saving: bool) {
        self.saving = saving;
    }

    pub(crate) fn record_game_id(&mut self, game_id: String) {
        self.save.game_id = Some(game_id);
    }

    pub(crate) fn mark_lineups_saved(&mut self) {
        self.save.lineups_saved = true;
    }

    pub(crate) fn mark_events_saved(&mut self) {
        self.save.events_saved = true;
    }

    pub(crate) fn set_last_error(&mut self, message: Option<String>) {
        self.last_error = message;
    }

    pub(crate) fn mark_saved(&mut self, game_id: String) {
        self.step = WizardStep::Saved { game_id };
        self.clock.pause();
    }

    /// Drop the game without saving and clear the stored snapshot. The
    /// roster is kept so a new game can start from it.
    pub fn discard(&mut self, store: &dyn SessionStore) {
        self.step = WizardStep::Discarded;
        self.method = None;
        self.assignments.clear();
        self.clock.pause();
        self.recorder = Recorder::new(self.recent_limit);
        self.passes = PassTracker::default();
        self.save = SaveProgress::default();
        self.saving = false;
        self.last_error = None;
        if let Err(e) = store.clear_session(SESSION_STATE_KEY) {
            warn!("failed to clear session snapshot: {e:#}");
        }
        info!("game discarded");
    }
}
