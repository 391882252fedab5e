// Integration tests for the core crate.
//
// These exercise the public API across modules: roster and line import into
// the database, a recorded tally game stored as a game row, throw events feeding
// the analytics report, and recorder state surviving a restart through the
// session store.

use ultitally_core::analytics::{AnalyticsReport, ChemistryMatrix};
use ultitally_core::backend::{load_analytics_snapshot, Backend, SessionStore};
use ultitally_core::config::AnalyticsConfig;
use ultitally_core::db::Database;
use ultitally_core::model::{EventKind, Side, TurnoverType};
use ultitally_core::recorder::{Recorder, Transition, RECORDER_STATE_KEY};
use ultitally_core::records::{
    LineupTeam, NewGame, NewLineup, NewThrowEvent, RosterPlayer, ThrowResult,
};
use ultitally_core::roster::{load_lines_from_reader, load_roster_from_reader};
use ultitally_core::tally::Tallies;

// ===========================================================================
// Test helpers
// ===========================================================================

const ROSTER_CSV: &str = "name,jersey_number\nAlice,7\nBob,12\nCara,\nDev,33\n";

async fn seeded_db() -> (Database, Vec<RosterPlayer>) {
    let db = Database::open(":memory:").unwrap();
    db.ensure_team("home", "Home").await.unwrap();
    let new_players = load_roster_from_reader(ROSTER_CSV.as_bytes()).unwrap();
    let players = db.insert_players("home", &new_players).await.unwrap();
    (db, players)
}

fn by_name<'a>(players: &'a [RosterPlayer], name: &str) -> &'a RosterPlayer {
    players.iter().find(|p| p.name == name).unwrap()
}

fn throw(game_id: &str, from: &str, to: Option<&str>, result: ThrowResult) -> NewThrowEvent {
    NewThrowEvent {
        game_id: game_id.into(),
        thrower_id: from.into(),
        receiver_id: to.map(str::to_string),
        result,
        point_number: None,
    }
}

fn tally_game(date: &str, us: u32, them: u32) -> NewGame {
    NewGame {
        team_id: Some("home".into()),
        opponent: "Tally Game".into(),
        game_date: Some(date.into()),
        game_type: Some("Tally".into()),
        final_score_us: Some(us),
        final_score_them: Some(them),
        event_log: Vec::new(),
    }
}

// ===========================================================================
// Recorder and storage
// ===========================================================================

#[tokio::test]
async fn recorded_game_round_trips_through_the_database() {
    let (db, players) = seeded_db().await;
    let alice = by_name(&players, "Alice").on_side(Side::A);
    let bob = by_name(&players, "Bob").on_side(Side::A);
    let cara = by_name(&players, "Cara").on_side(Side::B);

    let mut rec = Recorder::new(5);
    rec.open_modal(EventKind::Score).unwrap();
    rec.select_assister(Some(alice.clone())).unwrap();
    rec.select_scorer(bob).unwrap();
    rec.open_modal(EventKind::Turnover).unwrap();
    rec.select_turnover_player(cara).unwrap();
    rec.select_turnover_type(TurnoverType::Skip).unwrap();
    rec.open_modal(EventKind::Defend).unwrap();
    rec.select_defender(alice).unwrap();

    let tallies = *rec.tallies();
    let mut game = tally_game("2026-07-04", tallies.score_a, tallies.score_b);
    game.event_log = rec.event_log().to_vec();
    let stored = db.insert_game(&game).await.unwrap();

    let games = db.list_games("home").await.unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].id, stored.id);
    assert_eq!(games[0].event_log, rec.event_log());
    assert_eq!(Tallies::replay(&games[0].event_log), tallies);
    assert_eq!(tallies.defends_a, 1);
    assert_eq!(tallies.turnovers_b, 1);
}

#[tokio::test]
async fn recorder_survives_restart_via_session_store() {
    let (db, players) = seeded_db().await;
    let dev = by_name(&players, "Dev").on_side(Side::B);

    let mut rec = Recorder::new(5);
    rec.open_modal(EventKind::Score).unwrap();
    rec.select_assister(None).unwrap();
    let t = rec.select_scorer(dev).unwrap();
    assert!(matches!(t, Transition::Appended(_)));
    rec.save_to(&db).unwrap();

    let restored = Recorder::load_from(&db, 5);
    assert_eq!(restored.tallies().score_b, 1);
    assert_eq!(restored.event_log(), rec.event_log());

    db.clear_session(RECORDER_STATE_KEY).unwrap();
    assert!(Recorder::load_from(&db, 5).event_log().is_empty());
}

// ===========================================================================
// Analytics over stored records
// ===========================================================================

#[tokio::test]
async fn analytics_report_from_stored_records() {
    let (db, players) = seeded_db().await;
    let alice = by_name(&players, "Alice").id.as_str();
    let bob = by_name(&players, "Bob").id.as_str();
    let cara = by_name(&players, "Cara").id.as_str();
    let dev = by_name(&players, "Dev").id.as_str();

    let won = db.insert_game(&tally_game("2026-06-02", 5, 3)).await.unwrap();
    let lost = db.insert_game(&tally_game("2026-06-01", 2, 4)).await.unwrap();
    db.insert_lineups(&[
        NewLineup {
            game_id: won.id.clone(),
            team: LineupTeam::Dark,
            player_ids: vec![alice.into(), bob.into()],
        },
        NewLineup {
            game_id: won.id.clone(),
            team: LineupTeam::Light,
            player_ids: vec![cara.into(), dev.into()],
        },
        NewLineup {
            game_id: lost.id.clone(),
            team: LineupTeam::Dark,
            player_ids: vec![alice.into(), cara.into()],
        },
        NewLineup {
            game_id: lost.id.clone(),
            team: LineupTeam::Light,
            player_ids: vec![bob.into(), dev.into()],
        },
    ])
    .await
    .unwrap();
    db.insert_events(&[
        throw(&won.id, alice, Some(bob), ThrowResult::Completion),
        throw(&won.id, alice, Some(bob), ThrowResult::Completion),
        throw(&won.id, bob, Some(alice), ThrowResult::Completion),
        throw(&won.id, bob, Some(alice), ThrowResult::Goal),
        throw(&lost.id, cara, None, ThrowResult::Turnover),
    ])
    .await
    .unwrap();

    let snapshot = load_analytics_snapshot(&db, "home").await.unwrap();
    assert_eq!(snapshot.games[0].id, won.id);

    let report = AnalyticsReport::build(&snapshot, &AnalyticsConfig::default());
    assert_eq!(report.win_loss.wins, 1);
    assert_eq!(report.win_loss.losses, 1);
    assert_eq!(report.recent.completions, 3);
    assert_eq!(report.recent.turnovers, 1);
    assert_eq!(report.recent.completion_pct, 75);
    assert_eq!(report.recent.turnover_rate, 25);
    assert_eq!(report.mvp.as_ref().unwrap().name, "Alice");

    let chemistry = ChemistryMatrix::build(&snapshot.players, &snapshot.events);
    assert_eq!(chemistry.get(alice, bob), Some(2));
    assert_eq!(chemistry.get(bob, alice), Some(1));
    assert_eq!(chemistry.get(alice, alice), None);

    // Won game: Dark lineup (Alice, Bob). Lost game: Light lineup (Bob, Dev).
    let standings: Vec<(&str, u32)> = report
        .standings
        .iter()
        .map(|s| (s.name.as_str(), s.points))
        .collect();
    assert_eq!(standings, vec![("Bob", 2), ("Alice", 1), ("Dev", 1)]);
}

#[tokio::test]
async fn tally_points_are_unique_per_game_and_player() {
    let (db, players) = seeded_db().await;
    let alice = by_name(&players, "Alice").id.clone();
    let game = db.insert_game(&tally_game("2026-06-02", 1, 0)).await.unwrap();

    assert!(!db.tally_point_exists(&game.id, &alice).await.unwrap());
    assert!(db.insert_tally_point(&game.id, &alice).await.unwrap().is_some());
    assert!(db.insert_tally_point(&game.id, &alice).await.unwrap().is_none());
    assert!(db.tally_point_exists(&game.id, &alice).await.unwrap());
    assert_eq!(db.list_tally_points(&game.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn imported_lines_resolve_against_the_stored_roster() {
    let (db, players) = seeded_db().await;
    let csv = "name,description,players\nO-line,starters,alice; BOB ;Zed\nGhosts,,Nobody\n";
    let imports = load_lines_from_reader(csv.as_bytes()).unwrap();
    assert_eq!(imports.len(), 2);

    let mut stored = 0;
    for import in &imports {
        let (line, unknown) = import.resolve("home", &players);
        if line.player_ids.is_empty() {
            assert_eq!(unknown, vec!["Nobody"]);
            continue;
        }
        assert_eq!(unknown, vec!["Zed"]);
        db.insert_line(&line).await.unwrap();
        stored += 1;
    }
    assert_eq!(stored, 1);

    let lines = db.list_lines("home").await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].name, "O-line");
    assert_eq!(lines[0].description, "starters");
    assert_eq!(
        lines[0].player_ids,
        vec![
            by_name(&players, "Alice").id.clone(),
            by_name(&players, "Bob").id.clone()
        ]
    );
}
