// Ultitally entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open database, make sure the configured team exists
// 4. Import roster and line CSVs if given
// 5. Load roster and lines, recover any in-progress game
// 6. Create mpsc channels
// 7. Spawn app logic task
// 8. Run the console until the user quits
// 9. Cleanup on exit

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use ultitally_app::app;
use ultitally_cli::console;
use ultitally_core::backend::Backend;
use ultitally_core::config;
use ultitally_core::db::Database;
use ultitally_core::roster;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Ultitally starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: team={} ({}), database={}",
        config.team.name, config.team.id, config.db_path
    );

    // 3. Open database
    let db = Arc::new(Database::open(&config.db_path).context("failed to open database")?);
    info!("Database opened at {}", config.db_path);
    db.ensure_team(&config.team.id, &config.team.name)
        .await
        .context("failed to create team")?;

    // 4. Roster and line imports
    if let Some(path) = &args.roster {
        let players = roster::load_roster_csv(path)?;
        let stored = db
            .insert_players(&config.team.id, &players)
            .await
            .context("failed to store imported players")?;
        println!("Imported {} player(s) from {}", stored.len(), path.display());
    }
    if let Some(path) = &args.lines {
        import_lines(db.as_ref(), &config.team.id, path).await?;
    }

    // 5. Roster, lines, and crash recovery
    let mut app_state = app::AppState::new(config, db.clone(), db.clone());
    app::refresh_roster(&mut app_state)
        .await
        .context("failed to load roster")?;
    if app::recover_session(&mut app_state) {
        info!("Game session restored from previous run");
        println!("Resumed the game in progress.");
    } else {
        info!("Starting fresh game session");
    }

    // 6. Create mpsc channels
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    // 7. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 8. Console (blocks until the user quits)
    if let Err(e) = console::run(ui_rx, cmd_tx).await {
        error!("Console error: {}", e);
    }

    // 9. Cleanup: wait for app task to finish (with timeout)
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("Ultitally shut down cleanly");
    Ok(())
}

/// Binary, library, and app crates log at info; dependencies at warn.
const DEFAULT_LOG_FILTER: &str = "ultitally=info,ultitally_cli=info,ultitally_core=info,ultitally_app=info,warn";

const USAGE: &str = "usage: ultitally [--import-roster <csv>] [--import-lines <csv>]";

#[derive(Debug, Default)]
struct Args {
    roster: Option<PathBuf>,
    lines: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        let slot = match arg.as_str() {
            "--import-roster" => &mut parsed.roster,
            "--import-lines" => &mut parsed.lines,
            other => anyhow::bail!("unknown argument: {other} ({USAGE})"),
        };
        let path = args
            .next()
            .with_context(|| format!("{arg} needs a CSV file path"))?;
        *slot = Some(PathBuf::from(path));
    }
    Ok(parsed)
}

/// Store each line from the CSV, matching player names against the team's
/// roster. Unknown names are reported and left out.
async fn import_lines(db: &Database, team_id: &str, path: &Path) -> anyhow::Result<()> {
    let imports = roster::load_lines_csv(path)?;
    let players = db
        .list_players(team_id)
        .await
        .context("failed to load roster for line import")?;
    let mut stored = 0;
    for import in &imports {
        let (line, unknown) = import.resolve(team_id, &players);
        if !unknown.is_empty() {
            warn!("line '{}': no player named {}", import.name, unknown.join(", "));
            println!("Line '{}': skipped unknown player(s) {}", import.name, unknown.join(", "));
        }
        if line.player_ids.is_empty() {
            continue;
        }
        db.insert_line(&line)
            .await
            .with_context(|| format!("failed to store line '{}'", import.name))?;
        stored += 1;
    }
    info!("imported {stored} line(s) from {}", path.display());
    println!("Imported {stored} line(s) from {}", path.display());
    Ok(())
}

/// Initialize tracing to log to a file (not the terminal, which is used by the console).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("ultitally.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
