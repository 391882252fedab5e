// Event recorder: the modal state machine behind the Score / Defend /
// Turnover buttons, with undo and a durable snapshot.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::SessionStore;
use crate::model::{now_millis, EventKind, Player, TallyEvent, TurnoverType};
use crate::picker::{PickerOption, PlayerPicker, DEFAULT_RECENT_LIMIT};
use crate::tally::Tallies;

/// Session-store key for the recorder snapshot.
pub const RECORDER_STATE_KEY: &str = "tally-game-event-recorder";

// ---------------------------------------------------------------------------
// Modal steps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreStep {
    Assister,
    Scorer { assister: Option<Player> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnoverStep {
    Player,
    Type { player: Player },
}

/// An in-progress event entry. Absence of a modal means the recorder is idle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    Score(ScoreStep),
    Defend,
    Turnover(TurnoverStep),
}

impl Modal {
    fn opening(kind: EventKind) -> Modal {
        match kind {
            EventKind::Score => Modal::Score(ScoreStep::Assister),
            EventKind::Defend => Modal::Defend,
            EventKind::Turnover => Modal::Turnover(TurnoverStep::Player),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Modal::Score(_) => EventKind::Score,
            Modal::Defend => EventKind::Defend,
            Modal::Turnover(_) => EventKind::Turnover,
        }
    }

    /// Whether the picker offers a "None" row at this step.
    pub fn allows_nobody(&self) -> bool {
        matches!(self, Modal::Score(ScoreStep::Assister))
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            Modal::Score(ScoreStep::Assister) => "Select Assister",
            Modal::Score(ScoreStep::Scorer { .. }) => "Select Scorer",
            Modal::Defend => "Select Defender",
            Modal::Turnover(TurnoverStep::Player) => "Select Player",
            Modal::Turnover(TurnoverStep::Type { .. }) => "Select Turnover Type",
        }
    }
}

// ---------------------------------------------------------------------------
// Errors and transitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecorderError {
    #[error("no event entry is in progress")]
    Idle,

    #[error("an event entry is already in progress ({0})")]
    Busy(&'static str),

    #[error("cannot {operation} while at step: {step}")]
    WrongStep {
        operation: &'static str,
        step: &'static str,
    },

    #[error("no option is highlighted")]
    NothingHighlighted,

    #[error("no recent player at position {0}")]
    NoRecent(usize),
}

/// Outcome of a recorder operation, reported to the owner so it can persist
/// and refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Opened(EventKind),
    Advanced,
    Appended(TallyEvent),
    Cancelled,
    Undone(Option<TallyEvent>),
}

impl Transition {
    /// True when the recorder came to rest and its counters may have changed.
    pub fn settled(&self) -> bool {
        !matches!(self, Transition::Opened(_) | Transition::Advanced)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Durable form of the recorder: counters flattened next to the log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderSnapshot {
    #[serde(flatten)]
    pub tallies: Tallies,
    #[serde(default)]
    pub event_log: Vec<TallyEvent>,
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Recorder {
    tallies: Tallies,
    log: Vec<TallyEvent>,
    modal: Option<Modal>,
    picker: PlayerPicker,
}

impl Default for Recorder {
    fn default() -> Self {
        Recorder::new(DEFAULT_RECENT_LIMIT)
    }
}

impl Recorder {
    pub fn new(recent_limit: usize) -> Self {
        Recorder {
            tallies: Tallies::default(),
            log: Vec::new(),
            modal: None,
            picker: PlayerPicker::with_recent_limit(recent_limit),
        }
    }

    /// Rebuild from a snapshot. Events whose stored side disagrees with their
    /// actor are dropped and the counters are re-derived from what remains.
    pub fn restore(snapshot: RecorderSnapshot, recent_limit: usize) -> Self {
        let total = snapshot.event_log.len();
        let log: Vec<TallyEvent> = snapshot
            .event_log
            .into_iter()
            .filter(TallyEvent::is_consistent)
            .collect();
        if log.len() != total {
            warn!(
                "dropped {} inconsistent event(s) from recorder snapshot",
                total - log.len()
            );
        }
        let tallies = Tallies::replay(&log);
        if tallies != snapshot.tallies {
            warn!("recorder snapshot counters disagree with its log; using replayed counters");
        }
        Recorder {
            tallies,
            log,
            modal: None,
            picker: PlayerPicker::with_recent_limit(recent_limit),
        }
    }

    /// Load from the session store. Missing or unreadable state yields an
    /// empty recorder.
    pub fn load_from(store: &dyn SessionStore, recent_limit: usize) -> Self {
        match store.load_session(RECORDER_STATE_KEY) {
            Ok(Some(value)) => match serde_json::from_value::<RecorderSnapshot>(value) {
                Ok(snapshot) => {
                    info!(
                        "restored recorder with {} event(s)",
                        snapshot.event_log.len()
                    );
                    Recorder::restore(snapshot, recent_limit)
                }
                Err(e) => {
                    warn!("discarding unreadable recorder snapshot: {e}");
                    Recorder::new(recent_limit)
                }
            },
            Ok(None) => Recorder::new(recent_limit),
            Err(e) => {
                warn!("failed to read recorder snapshot: {e:#}");
                Recorder::new(recent_limit)
            }
        }
    }

    pub fn snapshot(&self) -> RecorderSnapshot {
        RecorderSnapshot {
            tallies: self.tallies,
            event_log: self.log.clone(),
        }
    }

    pub fn save_to(&self, store: &dyn SessionStore) -> anyhow::Result<()> {
        let value = serde_json::to_value(self.snapshot())?;
        store.save_session(RECORDER_STATE_KEY, &value)
    }

    pub fn tallies(&self) -> &Tallies {
        &self.tallies
    }

    pub fn event_log(&self) -> &[TallyEvent] {
        &self.log
    }

    pub fn modal(&self) -> Option<&Modal> {
        self.modal.as_ref()
    }

    pub fn picker(&self) -> &PlayerPicker {
        &self.picker
    }

    pub fn is_idle(&self) -> bool {
        self.modal.is_none()
    }

    // -- Modal flow ----------------------------------------------------------

    /// Start entering an event. An entry already in progress is abandoned.
    pub fn open_modal(&mut self, kind: EventKind) -> Result<Transition, RecorderError> {
        if let Some(previous) = self.modal.take() {
            debug!("replacing {} entry", previous.kind());
        }
        self.picker.reset();
        self.modal = Some(Modal::opening(kind));
        debug!("opened {kind} entry");
        Ok(Transition::Opened(kind))
    }

    /// Choose the assister, or `None` for no assister.
    pub fn select_assister(&mut self, player: Option<Player>) -> Result<Transition, RecorderError> {
        match &self.modal {
            Some(Modal::Score(ScoreStep::Assister)) => {
                if let Some(p) = &player {
                    self.picker.select(p);
                }
                self.picker.reset();
                self.modal = Some(Modal::Score(ScoreStep::Scorer { assister: player }));
                Ok(Transition::Advanced)
            }
            other => Err(self.step_error("select an assister", other.as_ref())),
        }
    }

    pub fn select_scorer(&mut self, scorer: Player) -> Result<Transition, RecorderError> {
        match self.modal.take() {
            Some(Modal::Score(ScoreStep::Scorer { assister })) => {
                self.picker.select(&scorer);
                Ok(self.append(TallyEvent::score(assister, scorer, now_millis())))
            }
            other => {
                let err = self.step_error("select a scorer", other.as_ref());
                self.modal = other;
                Err(err)
            }
        }
    }

    pub fn select_defender(&mut self, defender: Player) -> Result<Transition, RecorderError> {
        match &self.modal {
            Some(Modal::Defend) => {
                self.picker.select(&defender);
                Ok(self.append(TallyEvent::defend(defender, now_millis())))
            }
            other => Err(self.step_error("select a defender", other.as_ref())),
        }
    }

    pub fn select_turnover_player(&mut self, player: Player) -> Result<Transition, RecorderError> {
        match &self.modal {
            Some(Modal::Turnover(TurnoverStep::Player)) => {
                self.picker.select(&player);
                self.picker.reset();
                self.modal = Some(Modal::Turnover(TurnoverStep::Type { player }));
                Ok(Transition::Advanced)
            }
            other => Err(self.step_error("select a turnover player", other.as_ref())),
        }
    }

    pub fn select_turnover_type(
        &mut self,
        turnover_type: TurnoverType,
    ) -> Result<Transition, RecorderError> {
        match self.modal.take() {
            Some(Modal::Turnover(TurnoverStep::Type { player })) => {
                Ok(self.append(TallyEvent::turnover(player, turnover_type, now_millis())))
            }
            other => {
                let err = self.step_error("select a turnover type", other.as_ref());
                self.modal = other;
                Err(err)
            }
        }
    }

    /// Abandon the in-progress entry. Counters and log are untouched.
    pub fn cancel(&mut self) -> Transition {
        if let Some(modal) = self.modal.take() {
            debug!("cancelled {} entry", modal.kind());
        }
        self.picker.reset();
        Transition::Cancelled
    }

    /// Remove the most recent event and uncount it. A no-op on an empty log.
    pub fn undo(&mut self) -> Result<Transition, RecorderError> {
        if let Some(modal) = &self.modal {
            return Err(RecorderError::Busy(modal.prompt()));
        }
        let removed = self.log.pop();
        if let Some(event) = &removed {
            self.tallies.revert(event);
            info!("undid {event}");
        }
        Ok(Transition::Undone(removed))
    }

    // -- Picker plumbing -----------------------------------------------------

    pub fn input(&mut self, text: &str) -> Result<(), RecorderError> {
        if self.modal.is_none() {
            return Err(RecorderError::Idle);
        }
        self.picker.input(text);
        Ok(())
    }

    /// Options for the current step, drawn from `roster`.
    pub fn options(&self, roster: &[Player]) -> Vec<PickerOption> {
        match &self.modal {
            Some(Modal::Turnover(TurnoverStep::Type { .. })) | None => Vec::new(),
            Some(modal) => self.picker.options(roster, modal.allows_nobody()),
        }
    }

    pub fn highlight_down(&mut self, roster: &[Player]) {
        let count = self.options(roster).len();
        self.picker.highlight_down(count);
    }

    pub fn highlight_up(&mut self) {
        self.picker.highlight_up();
    }

    /// Act on the highlighted option as if it had been clicked.
    pub fn pick_highlighted(&mut self, roster: &[Player]) -> Result<Transition, RecorderError> {
        let modal = self.modal.clone().ok_or(RecorderError::Idle)?;
        let options = self.options(roster);
        let choice = self
            .picker
            .highlighted(&options)
            .ok_or(RecorderError::NothingHighlighted)?;
        self.choose(modal, choice)
    }

    /// Act on the `index`-th recent player (0 = most recent) as if it had
    /// been clicked. The player must still be in `roster`, and is taken from
    /// there so the current side assignment applies.
    pub fn pick_recent(
        &mut self,
        index: usize,
        roster: &[Player],
    ) -> Result<Transition, RecorderError> {
        let modal = self.modal.clone().ok_or(RecorderError::Idle)?;
        let recent_id = self
            .picker
            .recent()
            .iter()
            .nth(index)
            .map(|p| p.id.clone())
            .ok_or(RecorderError::NoRecent(index))?;
        let player = roster
            .iter()
            .find(|p| p.id == recent_id)
            .cloned()
            .ok_or(RecorderError::NoRecent(index))?;
        self.choose(modal, PickerOption::Player(player))
    }

    fn choose(&mut self, modal: Modal, choice: PickerOption) -> Result<Transition, RecorderError> {
        match (modal, choice) {
            (Modal::Score(ScoreStep::Assister), PickerOption::Nobody) => self.select_assister(None),
            (Modal::Score(ScoreStep::Assister), PickerOption::Player(p)) => {
                self.select_assister(Some(p))
            }
            (Modal::Score(ScoreStep::Scorer { .. }), PickerOption::Player(p)) => {
                self.select_scorer(p)
            }
            (Modal::Defend, PickerOption::Player(p)) => self.select_defender(p),
            (Modal::Turnover(TurnoverStep::Player), PickerOption::Player(p)) => {
                self.select_turnover_player(p)
            }
            (modal, _) => Err(RecorderError::WrongStep {
                operation: "pick a player",
                step: modal.prompt(),
            }),
        }
    }

    fn append(&mut self, event: TallyEvent) -> Transition {
        self.tallies.apply(&event);
        self.log.push(event.clone());
        self.modal = None;
        self.picker.reset();
        info!("recorded {event}");
        Transition::Appended(event)
    }

    fn step_error(&self, operation: &'static str, modal: Option<&Modal>) -> RecorderError {
        match modal {
            None => RecorderError::Idle,
            Some(m) => RecorderError::WrongStep {
                operation,
                step: m.prompt(),
            },
        }
    }
}
