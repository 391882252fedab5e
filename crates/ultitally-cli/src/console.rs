// Line-oriented console front-end.
//
// Reads one command per line from stdin, turns it into a UserCommand for the
// app loop, and prints the UI updates that come back.

use std::fmt::Write as _;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use ultitally_app::dashboard::Dashboard;
use ultitally_app::protocol::{StatusView, UiUpdate, UserCommand};
use ultitally_app::session::{Assignment, GameSettings, PassCommand, RecorderCommand, TeamMethod};
use ultitally_core::model::{EventKind, Side, TurnoverType};

pub const HELP: &str = "\
setup:   method line|manual   line <id>   assign <player> a|b|absent   teams done
         back   settings <minutes> <cap>   start
live:    score   defend   turnover   type <text>   down   up   enter   none
         recent <n>   throwing|catching|skip   cancel   undo   pause   resume
passes:  pass <player>   catch   goal   drop   unpass
end:     save   discard
other:   stats   status   help   quit";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

/// What a console line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Command(UserCommand),
    Help,
    Blank,
}

/// Parse one console line.
pub fn parse_line(line: &str) -> Result<ConsoleInput, ParseError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let cmd = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(ConsoleInput::Blank),
        "help" | "?" => return Ok(ConsoleInput::Help),
        "method" => match rest.to_ascii_lowercase().as_str() {
            "line" => UserCommand::ChooseMethod(TeamMethod::Line),
            "manual" => UserCommand::ChooseMethod(TeamMethod::Manual),
            _ => return Err(ParseError::Usage("method line|manual")),
        },
        "line" if !rest.is_empty() => UserCommand::ApplyLine(rest.to_string()),
        "line" => return Err(ParseError::Usage("line <id>")),
        "assign" => parse_assign(rest)?,
        "teams" if rest.eq_ignore_ascii_case("done") => UserCommand::ConfirmTeams,
        "teams" => return Err(ParseError::Usage("teams done")),
        "back" => UserCommand::Back,
        "settings" => parse_settings(rest)?,
        "start" => UserCommand::StartGame,
        "score" => UserCommand::Recorder(RecorderCommand::Open(EventKind::Score)),
        "defend" => UserCommand::Recorder(RecorderCommand::Open(EventKind::Defend)),
        "turnover" => UserCommand::Recorder(RecorderCommand::Open(EventKind::Turnover)),
        "type" => UserCommand::Recorder(RecorderCommand::Input(rest.to_string())),
        "down" => UserCommand::Recorder(RecorderCommand::HighlightDown),
        "up" => UserCommand::Recorder(RecorderCommand::HighlightUp),
        "enter" => UserCommand::Recorder(RecorderCommand::PickHighlighted),
        "none" => UserCommand::Recorder(RecorderCommand::NoAssister),
        "recent" => parse_recent(rest)?,
        "pass" if !rest.is_empty() => UserCommand::Pass(PassCommand::Tap(rest.to_string())),
        "pass" => return Err(ParseError::Usage("pass <player>")),
        "catch" => UserCommand::Pass(PassCommand::Catch),
        "goal" => UserCommand::Pass(PassCommand::Goal),
        "drop" => UserCommand::Pass(PassCommand::Turnover),
        "unpass" => UserCommand::Pass(PassCommand::Clear),
        "cancel" => UserCommand::Recorder(RecorderCommand::Cancel),
        "undo" => UserCommand::Recorder(RecorderCommand::Undo),
        "pause" => UserCommand::PauseClock,
        "resume" => UserCommand::ResumeClock,
        "save" => UserCommand::Save,
        "discard" => UserCommand::Discard,
        "stats" => UserCommand::RefreshStats,
        "status" => UserCommand::Status,
        "quit" | "exit" => UserCommand::Quit,
        other => match TurnoverType::from_str_type(other) {
            Some(t) => UserCommand::Recorder(RecorderCommand::TurnoverType(t)),
            None => return Err(ParseError::Unknown(other.to_string())),
        },
    };
    Ok(ConsoleInput::Command(cmd))
}

/// `assign <player...> a|b|absent`; the player may contain spaces.
fn parse_assign(rest: &str) -> Result<UserCommand, ParseError> {
    const USAGE: &str = "assign <player> a|b|absent";
    let (player, target) = rest.rsplit_once(char::is_whitespace).ok_or(ParseError::Usage(USAGE))?;
    let assignment = if target.eq_ignore_ascii_case("absent") {
        Assignment::Absent
    } else {
        Assignment::Side(Side::from_str_side(target).ok_or(ParseError::Usage(USAGE))?)
    };
    let player = player.trim();
    if player.is_empty() {
        return Err(ParseError::Usage(USAGE));
    }
    Ok(UserCommand::Assign {
        player: player.to_string(),
        assignment,
    })
}

/// `recent <n>`, counting from 1 as the list is shown.
fn parse_recent(rest: &str) -> Result<UserCommand, ParseError> {
    match rest.parse::<usize>() {
        Ok(n) if n > 0 => Ok(UserCommand::Recorder(RecorderCommand::PickRecent(n - 1))),
        _ => Err(ParseError::Usage("recent <n> (1 = most recent)")),
    }
}

fn parse_settings(rest: &str) -> Result<UserCommand, ParseError> {
    const USAGE: &str = "settings <minutes> <cap> (0 = no limit)";
    let mut parts = rest.split_whitespace().map(str::parse::<u32>);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(duration_minutes)), Some(Ok(score_cap)), None) => {
            Ok(UserCommand::Configure(GameSettings {
                duration_minutes,
                score_cap,
            }))
        }
        _ => Err(ParseError::Usage(USAGE)),
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn render_update(update: &UiUpdate) -> String {
    match update {
        UiUpdate::Status(view) => render_status(view),
        UiUpdate::ClockTick { display, expired } => {
            if *expired {
                format!("[{display}] time is up")
            } else {
                format!("[{display}]")
            }
        }
        UiUpdate::Info(msg) => format!("* {msg}"),
        UiUpdate::Error(msg) => format!("! {msg}"),
        UiUpdate::GameSaved { game_id } => format!("Game saved ({game_id})"),
        UiUpdate::Discarded => "Game discarded".to_string(),
        UiUpdate::Stats(dashboard) => render_dashboard(dashboard),
    }
}

pub fn render_status(view: &StatusView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", view.step);
    for side in &view.sides {
        let _ = writeln!(
            out,
            "Team {} ({}): {}",
            side.side,
            side.score,
            if side.players.is_empty() {
                "-".to_string()
            } else {
                side.players.join(", ")
            }
        );
    }
    if !view.absent.is_empty() {
        let _ = writeln!(out, "Absent: {}", view.absent.join(", "));
    }
    if view.step == "assigning teams" && !view.lines.is_empty() {
        let _ = writeln!(out, "Lines:");
        for (id, name) in &view.lines {
            let _ = writeln!(out, "  {id}  {name}");
        }
    }
    if view.step == "live" {
        let t = &view.tallies;
        let _ = writeln!(
            out,
            "Clock {}{}  Defends {}-{}  Turnovers {}-{}",
            view.clock,
            if view.clock_running { "" } else { " (paused)" },
            t.defends_a,
            t.defends_b,
            t.turnovers_a,
            t.turnovers_b
        );
        if view.score_cap_reached {
            let _ = writeln!(out, "Score cap reached");
        }
        if let Some(event) = &view.last_event {
            let _ = writeln!(out, "Last: {event}");
        }
        let disc = match (&view.thrower, &view.receiver) {
            (Some(thrower), Some(receiver)) => format!("{thrower} → {receiver}"),
            (Some(thrower), None) => thrower.clone(),
            _ => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "Point {}  Disc: {}  Throws logged: {}",
            view.point_number, disc, view.passes_logged
        );
    }
    if let Some(prompt) = &view.prompt {
        let _ = writeln!(out, "{prompt}:");
        for (i, option) in view.options.iter().enumerate() {
            let marker = if i == view.highlight { '>' } else { ' ' };
            let _ = writeln!(out, " {marker} {option}");
        }
        if !view.recent.is_empty() {
            let numbered: Vec<String> = view
                .recent
                .iter()
                .enumerate()
                .map(|(i, name)| format!("{} {name}", i + 1))
                .collect();
            let _ = writeln!(out, "Recent: {}", numbered.join(", "));
        }
    }
    if let Some(err) = &view.last_error {
        let _ = writeln!(out, "Last save failed: {err}");
    }
    out.trim_end().to_string()
}

pub fn render_dashboard(dashboard: &Dashboard) -> String {
    let r = &dashboard.report;
    let mut out = String::new();
    let _ = writeln!(out, "Record (recent): {}-{}", r.win_loss.wins, r.win_loss.losses);
    let _ = writeln!(
        out,
        "Completion {}% ({:+})  Turnover rate {}% ({:+})",
        r.recent.completion_pct, r.completion_trend, r.recent.turnover_rate, r.turnover_trend
    );
    let _ = writeln!(
        out,
        "Trending {}",
        if r.trending_up() { "up" } else { "down" }
    );
    if let Some(mvp) = &r.mvp {
        let _ = writeln!(out, "MVP: {} ({} involvements)", mvp.name, mvp.involvement());
    }
    if let Some(t) = &r.improvement {
        let _ = writeln!(out, "Most improved: {} ({:+}%)", t.name, t.completion_change);
    }
    if let Some(t) = &r.concern {
        let _ = writeln!(out, "Needs attention: {} ({:+}%)", t.name, t.completion_change);
    }
    if !r.standings.is_empty() {
        let _ = writeln!(out, "Tally standings:");
        for (rank, s) in r.standings.iter().enumerate() {
            let _ = writeln!(out, "  {}. {} {}", rank + 1, s.name, s.points);
        }
    }
    for insight in &r.insights {
        let _ = writeln!(out, "- {insight}");
    }
    if let Some(game) = &dashboard.latest_game {
        let _ = writeln!(out, "Latest game:");
        for (label, board) in [
            ("goals", &game.goals),
            ("assists", &game.assists),
            ("turnovers", &game.turnovers),
        ] {
            if board.is_empty() {
                continue;
            }
            let names: Vec<String> = board.iter().map(|e| format!("{} {}", e.name, e.value)).collect();
            let _ = writeln!(out, "  {label}: {}", names.join(", "));
        }
        for c in &game.connections {
            let _ = writeln!(out, "  {} → {} x{}", c.thrower, c.receiver, c.count);
        }
    }
    if !dashboard.latest_tally_points.is_empty() {
        let _ = writeln!(
            out,
            "Tally points last game: {}",
            dashboard.latest_tally_points.join(", ")
        );
    }
    out.trim_end().to_string()
}

// ---------------------------------------------------------------------------
// Console loop
// ---------------------------------------------------------------------------

/// Run the console until the user quits, stdin closes, or the app loop goes
/// away.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    // Clock ticks would flood the console; `status` shows the time.
                    Some(UiUpdate::ClockTick { expired: false, .. }) => {}
                    Some(update) => println!("{}", render_update(&update)),
                    None => break,
                }
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("stdin closed");
                    let _ = cmd_tx.send(UserCommand::Quit).await;
                    break;
                };
                match parse_line(&line) {
                    Ok(ConsoleInput::Blank) => {}
                    Ok(ConsoleInput::Help) => println!("{HELP}"),
                    Ok(ConsoleInput::Command(cmd)) => {
                        debug!("console command: {cmd:?}");
                        let quit = cmd == UserCommand::Quit;
                        if cmd_tx.send(cmd).await.is_err() || quit {
                            break;
                        }
                    }
                    Err(e) => println!("! {e}"),
                }
            }
        }
    }
    Ok(())
}
