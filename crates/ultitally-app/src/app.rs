// Application state and the central event loop.
//
// One task owns the roster cache and the game session. It reacts to user
// commands from the front-end and to a one-second clock tick, mirrors the
// session to the local store after every change, and pushes UI updates
// back to the front-end.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use ultitally_core::backend::{Backend, SessionStore};
use ultitally_core::config::Config;
use ultitally_core::model::{Side, TurnoverType};
use ultitally_core::recorder::{Modal, TurnoverStep};
use ultitally_core::records::{LineRecord, RosterPlayer};

use crate::dashboard::load_dashboard;
use crate::protocol::{SideView, StatusView, UiUpdate, UserCommand};
use crate::save::{save_session, SaveError};
use crate::session::{Assignment, GameSession, PassCommand, WizardError, WizardStep};

/// Match clock resolution.
pub const CLOCK_TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error("no line with id {0}")]
    UnknownLine(String),

    #[error("no player matches '{0}'")]
    UnknownPlayer(String),

    #[error("{0:#}")]
    Backend(anyhow::Error),
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub config: Config,
    pub backend: Arc<dyn Backend>,
    pub store: Arc<dyn SessionStore>,
    /// Roster of the configured team, ordered by name.
    pub players: Vec<RosterPlayer>,
    pub lines: Vec<LineRecord>,
    pub session: GameSession,
}

impl AppState {
    pub fn new(config: Config, backend: Arc<dyn Backend>, store: Arc<dyn SessionStore>) -> Self {
        let session = GameSession::new(
            Some(config.team.id.clone()),
            Vec::new(),
            config.game,
            config.recorder.recent_limit,
        );
        AppState {
            config,
            backend,
            store,
            players: Vec::new(),
            lines: Vec::new(),
            session,
        }
    }

    /// A new session over the cached roster, at the first wizard step.
    pub fn fresh_session(&self) -> GameSession {
        GameSession::new(
            Some(self.config.team.id.clone()),
            self.players.clone(),
            self.config.game,
            self.config.recorder.recent_limit,
        )
    }

    /// Resolve a player by id, or by name ignoring case.
    fn find_player(&self, key: &str) -> Option<&RosterPlayer> {
        let roster = self.session.roster();
        roster.iter().find(|p| p.id == key).or_else(|| {
            roster
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(key.trim()))
        })
    }

    pub fn status_view(&self) -> StatusView {
        let session = &self.session;
        let recorder = session.recorder();
        let present = session.present_players();
        let passes = session.pass_tracker();

        let sides: Vec<SideView> = Side::BOTH
            .iter()
            .map(|&side| SideView {
                side,
                players: session
                    .side_players(side)
                    .into_iter()
                    .map(|p| p.name)
                    .collect(),
                score: session.tallies().score(side),
            })
            .collect();
        let absent: Vec<String> = session
            .roster()
            .iter()
            .filter(|p| session.assignment(&p.id) == Assignment::Absent)
            .map(|p| p.name.clone())
            .collect();

        let options: Vec<String> = match recorder.modal() {
            Some(Modal::Turnover(TurnoverStep::Type { .. })) => TurnoverType::ALL
                .iter()
                .map(|t| t.to_string())
                .collect(),
            _ => recorder
                .options(&present)
                .iter()
                .map(|o| o.label().to_string())
                .collect(),
        };

        StatusView {
            step: session.step().to_string(),
            sides,
            absent,
            lines: self
                .lines
                .iter()
                .map(|l| (l.id.clone(), l.name.clone()))
                .collect(),
            tallies: *session.tallies(),
            clock: session.clock().display(),
            clock_running: session.clock().is_running(),
            score_cap_reached: session.score_cap_reached(),
            prompt: recorder.modal().map(|m| m.prompt().to_string()),
            options,
            highlight: recorder.picker().highlight(),
            recent: recorder
                .picker()
                .recent()
                .iter()
                .map(|p| p.name.clone())
                .collect(),
            last_event: session.event_log().last().cloned(),
            point_number: passes.point_number(),
            thrower: passes.thrower().map(|p| p.name.clone()),
            receiver: passes.receiver().map(|p| p.name.clone()),
            passes_logged: passes.passes().len(),
            last_error: session.last_error().map(str::to_string),
        }
    }
}

// ---------------------------------------------------------------------------
// Startup helpers
// ---------------------------------------------------------------------------

/// Reload the configured team's players and lines from the backend.
pub async fn refresh_roster(state: &mut AppState) -> anyhow::Result<()> {
    let team_id = state.config.team.id.clone();
    state.players = state.backend.list_players(&team_id).await?;
    state.lines = state.backend.list_lines(&team_id).await?;
    info!(
        "loaded {} player(s) and {} line(s) for team {}",
        state.players.len(),
        state.lines.len(),
        team_id
    );
    Ok(())
}

/// Restore an in-progress game from the session store, or start fresh.
/// Returns true when a game was restored.
pub fn recover_session(state: &mut AppState) -> bool {
    match GameSession::restore(state.store.as_ref(), state.config.recorder.recent_limit) {
        Some(session) => {
            info!("recovered game session at step {}", session.step());
            state.session = session;
            true
        }
        None => {
            state.session = state.fresh_session();
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the application event loop until `Quit` or the command channel
/// closes.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    let mut clock_interval = tokio::time::interval(CLOCK_TICK_INTERVAL);
    // The first tick completes immediately; consume it so the clock moves
    // after one full second.
    clock_interval.tick().await;

    send_status(&state, &ui_tx).await;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        if let Err(e) = handle_user_command(&mut state, cmd, &ui_tx).await {
                            debug!("command rejected: {e}");
                            notify(&ui_tx, UiUpdate::Error(e.to_string())).await;
                        }
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            _ = clock_interval.tick() => {
                if state.session.tick() {
                    let clock = state.session.clock();
                    let expired = clock.is_expired();
                    if expired {
                        info!("match clock expired");
                    }
                    notify(&ui_tx, UiUpdate::ClockTick { display: clock.display(), expired }).await;
                    state.session.autosave(state.store.as_ref());
                }
            }
        }
    }

    state.session.autosave(state.store.as_ref());
    info!("Application event loop exiting");
    Ok(())
}

async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) -> Result<(), CommandError> {
    match cmd {
        UserCommand::ChooseMethod(method) => state.session.choose_method(method)?,
        UserCommand::ApplyLine(line_id) => {
            let line = state
                .lines
                .iter()
                .find(|l| l.id == line_id)
                .cloned()
                .ok_or(CommandError::UnknownLine(line_id))?;
            state.session.apply_line(&line)?;
        }
        UserCommand::Assign { player, assignment } => {
            let id = state
                .find_player(&player)
                .map(|p| p.id.clone())
                .ok_or(CommandError::UnknownPlayer(player))?;
            state.session.assign(&id, assignment)?;
        }
        UserCommand::ConfirmTeams => state.session.confirm_teams()?,
        UserCommand::Back => state.session.back()?,
        UserCommand::Configure(settings) => state.session.configure(settings)?,
        UserCommand::StartGame => state.session.start_game()?,
        UserCommand::Recorder(rc) => {
            if state.session.record(rc)?.is_none() {
                // Picker movement only; nothing durable changed.
                send_status(state, ui_tx).await;
                return Ok(());
            }
        }
        UserCommand::Pass(PassCommand::Tap(player)) => {
            let id = state
                .find_player(&player)
                .map(|p| p.id.clone())
                .ok_or(CommandError::UnknownPlayer(player))?;
            state.session.pass(PassCommand::Tap(id))?;
        }
        UserCommand::Pass(pc) => {
            state.session.pass(pc)?;
        }
        UserCommand::PauseClock => state.session.pause_clock()?,
        UserCommand::ResumeClock => state.session.resume_clock()?,
        UserCommand::Save => {
            let backend = Arc::clone(&state.backend);
            let store = Arc::clone(&state.store);
            let game_id =
                save_session(&mut state.session, backend.as_ref(), store.as_ref()).await?;
            notify(ui_tx, UiUpdate::GameSaved { game_id }).await;
            state.session = state.fresh_session();
            send_status(state, ui_tx).await;
            return Ok(());
        }
        UserCommand::Discard => {
            state.session.discard(state.store.as_ref());
            notify(ui_tx, UiUpdate::Discarded).await;
            state.session = state.fresh_session();
            send_status(state, ui_tx).await;
            return Ok(());
        }
        UserCommand::RefreshStats => {
            let dashboard = load_dashboard(
                state.backend.as_ref(),
                &state.config.team.id,
                &state.config.analytics,
            )
            .await
            .map_err(CommandError::Backend)?;
            notify(ui_tx, UiUpdate::Stats(Box::new(dashboard))).await;
            return Ok(());
        }
        UserCommand::Status => {
            send_status(state, ui_tx).await;
            return Ok(());
        }
        UserCommand::Quit => return Ok(()),
    }

    state.session.autosave(state.store.as_ref());
    if state.session.step() == &WizardStep::Live && state.session.score_cap_reached() {
        let cap = state.session.settings().score_cap;
        notify(ui_tx, UiUpdate::Info(format!("score cap of {cap} reached"))).await;
    }
    send_status(state, ui_tx).await;
    Ok(())
}

/// Push an update the front-end can live without.
async fn notify(ui_tx: &mpsc::Sender<UiUpdate>, update: UiUpdate) {
    if let Err(e) = ui_tx.send(update).await {
        debug!("UI channel closed; dropped {:?}", e.0);
    }
}

async fn send_status(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    if ui_tx
        .send(UiUpdate::Status(Box::new(state.status_view())))
        .await
        .is_err()
    {
        warn!("UI channel closed; status update dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ultitally_core::config::{AnalyticsConfig, GameDefaults, RecorderConfig, TeamConfig};
    use ultitally_core::db::Database;
    use ultitally_core::model::EventKind;
    use ultitally_core::records::{NewLine, NewPlayer};

    use ultitally_core::records::ThrowResult;

    use crate::session::{GameSettings, RecorderCommand, TeamMethod, SESSION_STATE_KEY};

    fn test_config() -> Config {
        Config {
            team: TeamConfig {
                id: "home".into(),
                name: "Home".into(),
            },
            db_path: ":memory:".into(),
            game: GameDefaults::default(),
            recorder: RecorderConfig::default(),
            analytics: AnalyticsConfig::default(),
        }
    }

    async fn seeded_state() -> (AppState, Arc<Database>) {
        let db = Arc::new(Database::open(":memory:").unwrap());
        db.ensure_team("home", "Home").await.unwrap();
        let players = db
            .insert_players(
                "home",
                &["Alice", "Bob", "Cara"].map(|name| NewPlayer {
                    name: name.into(),
                    jersey_number: None,
                }),
            )
            .await
            .unwrap();
        db.insert_line(&NewLine {
            team_id: "home".into(),
            name: "O-line".into(),
            description: String::new(),
            player_ids: vec![players[0].id.clone(), players[1].id.clone()],
        })
        .await
        .unwrap();
        let mut state = AppState::new(test_config(), db.clone(), db.clone());
        refresh_roster(&mut state).await.unwrap();
        recover_session(&mut state);
        (state, db)
    }

    /// Skip clock ticks and info until the next status or error.
    async fn next_reply(rx: &mut mpsc::Receiver<UiUpdate>) -> UiUpdate {
        loop {
            match rx.recv().await.expect("ui channel closed") {
                UiUpdate::ClockTick { .. } | UiUpdate::Info(_) => continue,
                other => return other,
            }
        }
    }

    async fn expect_status(rx: &mut mpsc::Receiver<UiUpdate>) -> StatusView {
        match next_reply(rx).await {
            UiUpdate::Status(view) => *view,
            other => panic!("expected status, got {other:?}"),
        }
    }

    async fn send(tx: &mpsc::Sender<UserCommand>, cmd: UserCommand) {
        tx.send(cmd).await.unwrap();
    }

    /// Drive the wizard to a live game with the O-line against Cara.
    async fn go_live(
        cmd_tx: &mpsc::Sender<UserCommand>,
        ui_rx: &mut mpsc::Receiver<UiUpdate>,
        line_id: &str,
    ) {
        send(cmd_tx, UserCommand::ChooseMethod(TeamMethod::Line)).await;
        expect_status(ui_rx).await;
        send(cmd_tx, UserCommand::ApplyLine(line_id.into())).await;
        expect_status(ui_rx).await;
        send(cmd_tx, UserCommand::ConfirmTeams).await;
        expect_status(ui_rx).await;
        send(
            cmd_tx,
            UserCommand::Configure(GameSettings {
                duration_minutes: 0,
                score_cap: 0,
            }),
        )
        .await;
        expect_status(ui_rx).await;
        send(cmd_tx, UserCommand::StartGame).await;
        let view = expect_status(ui_rx).await;
        assert_eq!(view.step, "live");
    }

    async fn record_score(
        cmd_tx: &mpsc::Sender<UserCommand>,
        ui_rx: &mut mpsc::Receiver<UiUpdate>,
        assister: Option<&str>,
        scorer: &str,
    ) -> StatusView {
        send(cmd_tx, UserCommand::Recorder(RecorderCommand::Open(EventKind::Score))).await;
        expect_status(ui_rx).await;
        match assister {
            Some(name) => {
                send(cmd_tx, UserCommand::Recorder(RecorderCommand::Input(name.into()))).await;
                let view = expect_status(ui_rx).await;
                assert_eq!(view.options[0], "None");
                send(cmd_tx, UserCommand::Recorder(RecorderCommand::HighlightDown)).await;
                expect_status(ui_rx).await;
                send(cmd_tx, UserCommand::Recorder(RecorderCommand::PickHighlighted)).await;
            }
            None => send(cmd_tx, UserCommand::Recorder(RecorderCommand::NoAssister)).await,
        }
        expect_status(ui_rx).await;
        send(cmd_tx, UserCommand::Recorder(RecorderCommand::Input(scorer.into()))).await;
        expect_status(ui_rx).await;
        send(cmd_tx, UserCommand::Recorder(RecorderCommand::PickHighlighted)).await;
        expect_status(ui_rx).await
    }

    // ---- Startup ----

    #[tokio::test]
    async fn fresh_start_has_roster_and_lines() {
        let (state, _db) = seeded_state().await;
        assert_eq!(state.players.len(), 3);
        assert_eq!(state.lines.len(), 1);
        assert_eq!(state.session.step(), &WizardStep::ChoosingTeamMethod);
        let view = state.status_view();
        assert_eq!(view.absent, vec!["Alice", "Bob", "Cara"]);
    }

    // ---- Event loop ----

    #[tokio::test]
    async fn full_game_through_the_loop() {
        let (state, db) = seeded_state().await;
        let line_id = state.lines[0].id.clone();
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));
        expect_status(&mut ui_rx).await;

        go_live(&cmd_tx, &mut ui_rx, &line_id).await;
        let view = record_score(&cmd_tx, &mut ui_rx, Some("alice"), "bob").await;
        assert_eq!(view.tallies.score_a, 1);
        assert_eq!(view.recent, vec!["Bob", "Alice"]);
        let last = view.last_event.unwrap();
        assert_eq!(last.to_string(), "Score: Alice → Bob [A]");

        send(&cmd_tx, UserCommand::Save).await;
        let game_id = match next_reply(&mut ui_rx).await {
            UiUpdate::GameSaved { game_id } => game_id,
            other => panic!("expected GameSaved, got {other:?}"),
        };
        let view = expect_status(&mut ui_rx).await;
        assert_eq!(view.step, "choosing team method");

        send(&cmd_tx, UserCommand::Quit).await;
        handle.await.unwrap().unwrap();

        let games = db.list_games("home").await.unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].id, game_id);
        assert_eq!(db.list_tally_points(&game_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn passes_through_the_loop() {
        let (state, db) = seeded_state().await;
        let line_id = state.lines[0].id.clone();
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));
        expect_status(&mut ui_rx).await;
        go_live(&cmd_tx, &mut ui_rx, &line_id).await;

        send(&cmd_tx, UserCommand::Pass(PassCommand::Tap("alice".into()))).await;
        let view = expect_status(&mut ui_rx).await;
        assert_eq!(view.thrower.as_deref(), Some("Alice"));
        send(&cmd_tx, UserCommand::Pass(PassCommand::Tap("Bob".into()))).await;
        let view = expect_status(&mut ui_rx).await;
        assert_eq!(view.receiver.as_deref(), Some("Bob"));

        // Cara is on the other side.
        send(&cmd_tx, UserCommand::Pass(PassCommand::Tap("cara".into()))).await;
        assert!(matches!(next_reply(&mut ui_rx).await, UiUpdate::Error(_)));

        send(&cmd_tx, UserCommand::Pass(PassCommand::Goal)).await;
        let view = expect_status(&mut ui_rx).await;
        assert_eq!(view.point_number, 2);
        assert_eq!(view.passes_logged, 1);
        assert!(view.thrower.is_none());

        send(&cmd_tx, UserCommand::Save).await;
        let game_id = match next_reply(&mut ui_rx).await {
            UiUpdate::GameSaved { game_id } => game_id,
            other => panic!("expected GameSaved, got {other:?}"),
        };
        expect_status(&mut ui_rx).await;
        send(&cmd_tx, UserCommand::Quit).await;
        handle.await.unwrap().unwrap();

        let events = db.list_events(&[game_id]).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].result, ThrowResult::Goal);
    }

    #[tokio::test]
    async fn closed_ui_channel_does_not_stop_the_loop() {
        let (state, db) = seeded_state().await;
        let line_id = state.lines[0].id.clone();
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, ui_rx) = mpsc::channel(64);
        drop(ui_rx);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));

        send(&cmd_tx, UserCommand::ChooseMethod(TeamMethod::Line)).await;
        send(&cmd_tx, UserCommand::ApplyLine(line_id)).await;
        send(&cmd_tx, UserCommand::StartGame).await;
        send(&cmd_tx, UserCommand::Quit).await;
        handle.await.unwrap().unwrap();

        let snapshot = db.load_state(SESSION_STATE_KEY).unwrap().unwrap();
        assert_eq!(snapshot["step"], "AssigningTeams");
    }

    #[tokio::test]
    async fn undo_through_the_loop() {
        let (state, _db) = seeded_state().await;
        let line_id = state.lines[0].id.clone();
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));
        expect_status(&mut ui_rx).await;

        go_live(&cmd_tx, &mut ui_rx, &line_id).await;
        record_score(&cmd_tx, &mut ui_rx, None, "cara").await;
        send(&cmd_tx, UserCommand::Recorder(RecorderCommand::Undo)).await;
        let view = expect_status(&mut ui_rx).await;
        assert_eq!(view.tallies.score_b, 0);
        assert!(view.last_event.is_none());

        send(&cmd_tx, UserCommand::Quit).await;
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn rejected_command_reports_error() {
        let (state, _db) = seeded_state().await;
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));
        expect_status(&mut ui_rx).await;

        send(&cmd_tx, UserCommand::StartGame).await;
        assert!(matches!(next_reply(&mut ui_rx).await, UiUpdate::Error(_)));

        send(&cmd_tx, UserCommand::ChooseMethod(TeamMethod::Manual)).await;
        expect_status(&mut ui_rx).await;
        send(
            &cmd_tx,
            UserCommand::Assign {
                player: "nobody".into(),
                assignment: Assignment::Side(Side::A),
            },
        )
        .await;
        match next_reply(&mut ui_rx).await {
            UiUpdate::Error(msg) => assert!(msg.contains("nobody")),
            other => panic!("expected error, got {other:?}"),
        }

        send(&cmd_tx, UserCommand::Quit).await;
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn clock_ticks_while_live() {
        let (state, db) = seeded_state().await;
        let line_id = state.lines[0].id.clone();
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));
        expect_status(&mut ui_rx).await;
        go_live(&cmd_tx, &mut ui_rx, &line_id).await;

        let mut displays = Vec::new();
        while displays.len() < 2 {
            if let Some(UiUpdate::ClockTick { display, expired }) = ui_rx.recv().await {
                assert!(!expired);
                displays.push(display);
            }
        }
        assert_eq!(displays, vec!["00:01", "00:02"]);

        send(&cmd_tx, UserCommand::Quit).await;
        handle.await.unwrap().unwrap();

        let snapshot = db.load_state(SESSION_STATE_KEY).unwrap().unwrap();
        assert_eq!(snapshot["step"], "Live");
    }

    #[tokio::test]
    async fn session_survives_restart() {
        let (state, db) = seeded_state().await;
        let line_id = state.lines[0].id.clone();
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));
        expect_status(&mut ui_rx).await;
        go_live(&cmd_tx, &mut ui_rx, &line_id).await;
        record_score(&cmd_tx, &mut ui_rx, None, "alice").await;
        send(&cmd_tx, UserCommand::Quit).await;
        handle.await.unwrap().unwrap();

        let mut restarted = AppState::new(test_config(), db.clone(), db.clone());
        refresh_roster(&mut restarted).await.unwrap();
        assert!(recover_session(&mut restarted));
        assert_eq!(restarted.session.step(), &WizardStep::Live);
        assert_eq!(restarted.session.tallies().score_a, 1);
    }

    #[tokio::test]
    async fn discard_starts_over() {
        let (state, db) = seeded_state().await;
        let line_id = state.lines[0].id.clone();
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));
        expect_status(&mut ui_rx).await;
        go_live(&cmd_tx, &mut ui_rx, &line_id).await;

        send(&cmd_tx, UserCommand::Discard).await;
        assert!(matches!(next_reply(&mut ui_rx).await, UiUpdate::Discarded));
        let view = expect_status(&mut ui_rx).await;
        assert_eq!(view.step, "choosing team method");
        assert!(db.load_state(SESSION_STATE_KEY).unwrap().is_none());

        send(&cmd_tx, UserCommand::Quit).await;
        handle.await.unwrap().unwrap();
        assert!(db.list_games("home").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stats_after_saved_game() {
        let (state, _db) = seeded_state().await;
        let line_id = state.lines[0].id.clone();
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run(cmd_rx, ui_tx, state));
        expect_status(&mut ui_rx).await;
        go_live(&cmd_tx, &mut ui_rx, &line_id).await;
        record_score(&cmd_tx, &mut ui_rx, None, "bob").await;
        send(&cmd_tx, UserCommand::Save).await;
        assert!(matches!(next_reply(&mut ui_rx).await, UiUpdate::GameSaved { .. }));
        expect_status(&mut ui_rx).await;

        send(&cmd_tx, UserCommand::RefreshStats).await;
        match next_reply(&mut ui_rx).await {
            UiUpdate::Stats(dash) => {
                assert_eq!(dash.report.win_loss.wins, 1);
                let names: Vec<&str> = dash
                    .report
                    .standings
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect();
                assert_eq!(names, vec!["Alice", "Bob"]);
            }
            other => panic!("expected stats, got {other:?}"),
        }

        send(&cmd_tx, UserCommand::Quit).await;
        handle.await.unwrap().unwrap();
    }
}
