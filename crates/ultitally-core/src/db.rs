// SQLite persistence layer for teams, games, tally points, and session state.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::backend::{Backend, SessionStore};
use crate::model::TallyEvent;
use crate::records::{
    GameRecord, LineRecord, LineupRecord, LineupTeam, NewGame, NewLine, NewLineup, NewPlayer,
    NewThrowEvent, RosterPlayer, TallyPointRecord, TeamRecord, ThrowEvent, ThrowResult,
};

/// SQLite-backed record store and key-value session state.
pub struct Database {
    conn: Mutex<Connection>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// `?, ?, ?` for an `IN (...)` clause.
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn json_column_error(idx: usize, e: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn parse_column<T: std::str::FromStr<Err = String>>(
    idx: usize,
    raw: &str,
) -> rusqlite::Result<T> {
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn game_from_row(row: &Row<'_>) -> rusqlite::Result<GameRecord> {
    let log_json: Option<String> = row.get(7)?;
    let event_log = match log_json {
        Some(json) => {
            serde_json::from_str::<Vec<TallyEvent>>(&json).map_err(|e| json_column_error(7, e))?
        }
        None => Vec::new(),
    };
    Ok(GameRecord {
        id: row.get(0)?,
        team_id: row.get(1)?,
        opponent: row.get(2)?,
        game_date: row.get(3)?,
        game_type: row.get(4)?,
        final_score_us: row.get(5)?,
        final_score_them: row.get(6)?,
        event_log,
        created_at: row.get(8)?,
    })
}

fn lineup_from_row(row: &Row<'_>) -> rusqlite::Result<LineupRecord> {
    let team: String = row.get(2)?;
    let ids_json: String = row.get(3)?;
    Ok(LineupRecord {
        id: row.get(0)?,
        game_id: row.get(1)?,
        team: parse_column(2, &team)?,
        player_ids: serde_json::from_str(&ids_json).map_err(|e| json_column_error(3, e))?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<ThrowEvent> {
    let result: String = row.get(4)?;
    Ok(ThrowEvent {
        id: row.get(0)?,
        game_id: row.get(1)?,
        thrower_id: row.get(2)?,
        receiver_id: row.get(3)?,
        result: parse_column(4, &result)?,
        point_number: row.get(5)?,
        timestamp: row.get(6)?,
    })
}

fn player_from_row(row: &Row<'_>) -> rusqlite::Result<RosterPlayer> {
    Ok(RosterPlayer {
        id: row.get(0)?,
        team_id: row.get(1)?,
        name: row.get(2)?,
        jersey_number: row.get(3)?,
    })
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS teams (
                id         TEXT PRIMARY KEY,
                name       TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS players (
                id            TEXT PRIMARY KEY,
                team_id       TEXT NOT NULL REFERENCES teams(id),
                name          TEXT NOT NULL,
                jersey_number INTEGER
            );

            CREATE TABLE IF NOT EXISTS lines (
                id          TEXT PRIMARY KEY,
                team_id     TEXT NOT NULL REFERENCES teams(id),
                name        TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                player_ids  TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS games (
                id               TEXT PRIMARY KEY,
                team_id          TEXT REFERENCES teams(id),
                opponent         TEXT NOT NULL,
                game_date        TEXT,
                game_type        TEXT,
                final_score_us   INTEGER,
                final_score_them INTEGER,
                event_log        TEXT,
                created_at       TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS lineups (
                id         TEXT PRIMARY KEY,
                game_id    TEXT NOT NULL REFERENCES games(id),
                team       TEXT NOT NULL,
                player_ids TEXT NOT NULL,
                UNIQUE(game_id, team)
            );

            CREATE TABLE IF NOT EXISTS events (
                id           TEXT PRIMARY KEY,
                game_id      TEXT NOT NULL REFERENCES games(id),
                thrower_id   TEXT NOT NULL,
                receiver_id  TEXT,
                result       TEXT NOT NULL,
                point_number INTEGER,
                timestamp    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS tally_points (
                id        TEXT PRIMARY KEY,
                game_id   TEXT NOT NULL REFERENCES games(id),
                player_id TEXT NOT NULL,
                UNIQUE(game_id, player_id)
            );

            CREATE TABLE IF NOT EXISTS session_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_games_team_id ON games(team_id);
            CREATE INDEX IF NOT EXISTS idx_events_game_id ON events(game_id);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Teams and roster
    // ------------------------------------------------------------------

    /// Insert the team unless a row with `id` already exists, then return the
    /// stored row.
    pub fn upsert_team(&self, id: &str, name: &str) -> Result<TeamRecord> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR IGNORE INTO teams (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![id, name, now_rfc3339()],
        )
        .context("failed to insert team")?;
        conn.query_row(
            "SELECT id, name, created_at FROM teams WHERE id = ?1",
            params![id],
            |row| {
                Ok(TeamRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )
        .context("failed to load team")
    }

    /// Insert players for a team in a single transaction.
    pub fn add_players(&self, team_id: &str, players: &[NewPlayer]) -> Result<Vec<RosterPlayer>> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin player import")?;
        let mut stored = Vec::with_capacity(players.len());
        for p in players {
            let row = RosterPlayer {
                id: new_id(),
                team_id: team_id.to_string(),
                name: p.name.clone(),
                jersey_number: p.jersey_number,
            };
            tx.execute(
                "INSERT INTO players (id, team_id, name, jersey_number) VALUES (?1, ?2, ?3, ?4)",
                params![row.id, row.team_id, row.name, row.jersey_number],
            )
            .context("failed to insert player")?;
            stored.push(row);
        }
        tx.commit().context("failed to commit player import")?;
        Ok(stored)
    }

    pub fn players_for_team(&self, team_id: &str) -> Result<Vec<RosterPlayer>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, team_id, name, jersey_number
                 FROM players WHERE team_id = ?1 ORDER BY name, id",
            )
            .context("failed to prepare players query")?;
        let players = stmt
            .query_map(params![team_id], player_from_row)
            .context("failed to query players")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map player rows")?;
        Ok(players)
    }

    pub fn create_line(&self, line: &NewLine) -> Result<LineRecord> {
        let conn = self.conn();
        let record = LineRecord {
            id: new_id(),
            team_id: line.team_id.clone(),
            name: line.name.clone(),
            description: line.description.clone(),
            player_ids: line.player_ids.clone(),
        };
        let ids_json =
            serde_json::to_string(&record.player_ids).context("failed to serialize line players")?;
        conn.execute(
            "INSERT INTO lines (id, team_id, name, description, player_ids, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.team_id,
                record.name,
                record.description,
                ids_json,
                now_rfc3339(),
            ],
        )
        .context("failed to insert line")?;
        Ok(record)
    }

    pub fn lines_for_team(&self, team_id: &str) -> Result<Vec<LineRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, team_id, name, description, player_ids
                 FROM lines WHERE team_id = ?1 ORDER BY name",
            )
            .context("failed to prepare lines query")?;
        let lines = stmt
            .query_map(params![team_id], |row| {
                let ids_json: String = row.get(4)?;
                Ok(LineRecord {
                    id: row.get(0)?,
                    team_id: row.get(1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                    player_ids: serde_json::from_str(&ids_json)
                        .map_err(|e| json_column_error(4, e))?,
                })
            })
            .context("failed to query lines")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map line rows")?;
        Ok(lines)
    }

    // ------------------------------------------------------------------
    // Games and lineups
    // ------------------------------------------------------------------

    pub fn create_game(&self, game: &NewGame) -> Result<GameRecord> {
        let conn = self.conn();
        let record = GameRecord {
            id: new_id(),
            team_id: game.team_id.clone(),
            opponent: game.opponent.clone(),
            game_date: game.game_date.clone(),
            game_type: game.game_type.clone(),
            final_score_us: game.final_score_us,
            final_score_them: game.final_score_them,
            event_log: game.event_log.clone(),
            created_at: now_rfc3339(),
        };
        let log_json =
            serde_json::to_string(&record.event_log).context("failed to serialize event log")?;
        conn.execute(
            "INSERT INTO games
                (id, team_id, opponent, game_date, game_type, final_score_us, final_score_them, event_log, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.id,
                record.team_id,
                record.opponent,
                record.game_date,
                record.game_type,
                record.final_score_us,
                record.final_score_them,
                log_json,
                record.created_at,
            ],
        )
        .context("failed to insert game")?;
        Ok(record)
    }

    /// Games for a team, newest `game_date` first; undated games sort last.
    pub fn games_for_team(&self, team_id: &str) -> Result<Vec<GameRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, team_id, opponent, game_date, game_type,
                        final_score_us, final_score_them, event_log, created_at
                 FROM games WHERE team_id = ?1
                 ORDER BY game_date IS NULL, game_date DESC, created_at DESC",
            )
            .context("failed to prepare games query")?;
        let games = stmt
            .query_map(params![team_id], game_from_row)
            .context("failed to query games")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map game rows")?;
        Ok(games)
    }

    /// Insert lineups in one transaction. A second lineup for the same
    /// `(game_id, team)` violates the unique constraint and rolls back all of
    /// them.
    pub fn create_lineups(&self, lineups: &[NewLineup]) -> Result<Vec<LineupRecord>> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin lineup insert")?;
        let mut stored = Vec::with_capacity(lineups.len());
        for l in lineups {
            let record = LineupRecord {
                id: new_id(),
                game_id: l.game_id.clone(),
                team: l.team,
                player_ids: l.player_ids.clone(),
            };
            let ids_json = serde_json::to_string(&record.player_ids)
                .context("failed to serialize lineup players")?;
            tx.execute(
                "INSERT INTO lineups (id, game_id, team, player_ids) VALUES (?1, ?2, ?3, ?4)",
                params![record.id, record.game_id, record.team.as_str(), ids_json],
            )
            .context("failed to insert lineup")?;
            stored.push(record);
        }
        tx.commit().context("failed to commit lineups")?;
        Ok(stored)
    }

    pub fn has_lineup(&self, game_id: &str, team: LineupTeam) -> Result<bool> {
        let conn = self.conn();
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM lineups WHERE game_id = ?1 AND team = ?2)",
                params![game_id, team.as_str()],
                |row| row.get(0),
            )
            .context("failed to check lineup existence")?;
        Ok(exists)
    }

    pub fn lineups_for_games(&self, game_ids: &[String]) -> Result<Vec<LineupRecord>> {
        if game_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn();
        let sql = format!(
            "SELECT id, game_id, team, player_ids FROM lineups
             WHERE game_id IN ({}) ORDER BY game_id, team",
            placeholders(game_ids.len())
        );
        let mut stmt = conn.prepare(&sql).context("failed to prepare lineups query")?;
        let lineups = stmt
            .query_map(params_from_iter(game_ids.iter()), lineup_from_row)
            .context("failed to query lineups")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map lineup rows")?;
        Ok(lineups)
    }

    // ------------------------------------------------------------------
    // Throw events
    // ------------------------------------------------------------------

    pub fn add_events(&self, events: &[NewThrowEvent]) -> Result<Vec<ThrowEvent>> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin event insert")?;
        let mut stored = Vec::with_capacity(events.len());
        for e in events {
            let record = ThrowEvent {
                id: new_id(),
                game_id: e.game_id.clone(),
                thrower_id: e.thrower_id.clone(),
                receiver_id: e.receiver_id.clone(),
                result: e.result,
                point_number: e.point_number,
                timestamp: now_rfc3339(),
            };
            tx.execute(
                "INSERT INTO events (id, game_id, thrower_id, receiver_id, result, point_number, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id,
                    record.game_id,
                    record.thrower_id,
                    record.receiver_id,
                    record.result.as_str(),
                    record.point_number,
                    record.timestamp,
                ],
            )
            .context("failed to insert event")?;
            stored.push(record);
        }
        tx.commit().context("failed to commit events")?;
        Ok(stored)
    }

    pub fn events_for_games(&self, game_ids: &[String]) -> Result<Vec<ThrowEvent>> {
        if game_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn();
        let sql = format!(
            "SELECT id, game_id, thrower_id, receiver_id, result, point_number, timestamp
             FROM events WHERE game_id IN ({}) ORDER BY timestamp, rowid",
            placeholders(game_ids.len())
        );
        let mut stmt = conn.prepare(&sql).context("failed to prepare events query")?;
        let events = stmt
            .query_map(params_from_iter(game_ids.iter()), event_from_row)
            .context("failed to query events")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map event rows")?;
        Ok(events)
    }

    // ------------------------------------------------------------------
    // Tally points
    // ------------------------------------------------------------------

    pub fn has_tally_point(&self, game_id: &str, player_id: &str) -> Result<bool> {
        let conn = self.conn();
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM tally_points WHERE game_id = ?1 AND player_id = ?2)",
                params![game_id, player_id],
                |row| row.get(0),
            )
            .context("failed to check tally point existence")?;
        Ok(exists)
    }

    /// Uses INSERT OR IGNORE so re-crediting the same pair is a no-op; returns
    /// `None` in that case.
    pub fn credit_tally_point(
        &self,
        game_id: &str,
        player_id: &str,
    ) -> Result<Option<TallyPointRecord>> {
        let conn = self.conn();
        let record = TallyPointRecord {
            id: new_id(),
            game_id: game_id.to_string(),
            player_id: player_id.to_string(),
        };
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO tally_points (id, game_id, player_id) VALUES (?1, ?2, ?3)",
                params![record.id, record.game_id, record.player_id],
            )
            .context("failed to insert tally point")?;
        Ok((inserted > 0).then_some(record))
    }

    pub fn tally_points_for_game(&self, game_id: &str) -> Result<Vec<TallyPointRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, game_id, player_id FROM tally_points
                 WHERE game_id = ?1 ORDER BY player_id",
            )
            .context("failed to prepare tally points query")?;
        let points = stmt
            .query_map(params![game_id], |row| {
                Ok(TallyPointRecord {
                    id: row.get(0)?,
                    game_id: row.get(1)?,
                    player_id: row.get(2)?,
                })
            })
            .context("failed to query tally points")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map tally point rows")?;
        Ok(points)
    }

    // ------------------------------------------------------------------
    // Session state
    // ------------------------------------------------------------------

    /// Persist an arbitrary JSON value under `key`. Uses INSERT OR REPLACE so
    /// repeated saves overwrite the previous value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn();
        let json_str = serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO session_state (key, value) VALUES (?1, ?2)",
            params![key, json_str],
        )
        .context("failed to save state")?;
        Ok(())
    }

    /// Load a previously saved JSON value by `key`.
    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let json_str: Option<String> = conn
            .query_row(
                "SELECT value FROM session_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query session state")?;
        match json_str {
            Some(s) => {
                let value = serde_json::from_str(&s).context("failed to deserialize state value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub fn clear_state(&self, key: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM session_state WHERE key = ?1", params![key])
            .context("failed to clear state")?;
        Ok(())
    }
}

impl SessionStore for Database {
    fn load_session(&self, key: &str) -> Result<Option<serde_json::Value>> {
        self.load_state(key)
    }

    fn save_session(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        self.save_state(key, value)
    }

    fn clear_session(&self, key: &str) -> Result<()> {
        self.clear_state(key)
    }
}

#[async_trait]
impl Backend for Database {
    async fn ensure_team(&self, id: &str, name: &str) -> Result<TeamRecord> {
        self.upsert_team(id, name)
    }

    async fn insert_players(
        &self,
        team_id: &str,
        players: &[NewPlayer],
    ) -> Result<Vec<RosterPlayer>> {
        self.add_players(team_id, players)
    }

    async fn list_players(&self, team_id: &str) -> Result<Vec<RosterPlayer>> {
        self.players_for_team(team_id)
    }

    async fn insert_line(&self, line: &NewLine) -> Result<LineRecord> {
        self.create_line(line)
    }

    async fn list_lines(&self, team_id: &str) -> Result<Vec<LineRecord>> {
        self.lines_for_team(team_id)
    }

    async fn insert_game(&self, game: &NewGame) -> Result<GameRecord> {
        self.create_game(game)
    }

    async fn list_games(&self, team_id: &str) -> Result<Vec<GameRecord>> {
        self.games_for_team(team_id)
    }

    async fn insert_lineups(&self, lineups: &[NewLineup]) -> Result<Vec<LineupRecord>> {
        self.create_lineups(lineups)
    }

    async fn lineup_exists(&self, game_id: &str, team: LineupTeam) -> Result<bool> {
        self.has_lineup(game_id, team)
    }

    async fn list_lineups(&self, game_ids: &[String]) -> Result<Vec<LineupRecord>> {
        self.lineups_for_games(game_ids)
    }

    async fn insert_events(&self, events: &[NewThrowEvent]) -> Result<Vec<ThrowEvent>> {
        self.add_events(events)
    }

    async fn list_events(&self, game_ids: &[String]) -> Result<Vec<ThrowEvent>> {
        self.events_for_games(game_ids)
    }

    async fn tally_point_exists(&self, game_id: &str, player_id: &str) -> Result<bool> {
        self.has_tally_point(game_id, player_id)
    }

    async fn insert_tally_point(
        &self,
        game_id: &str,
        player_id: &str,
    ) -> Result<Option<TallyPointRecord>> {
        self.credit_tally_point(game_id, player_id)
    }

    async fn list_tally_points(&self, game_id: &str) -> Result<Vec<TallyPointRecord>> {
        self.tally_points_for_game(game_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Player, Side};

    fn test_db() -> Database {
        Database::open(":memory:").expect("failed to open in-memory db")
    }

    fn sample_game(team_id: &str, date: Option<&str>, us: u32, them: u32) -> NewGame {
        NewGame {
            team_id: Some(team_id.to_string()),
            opponent: "Tally Game".to_string(),
            game_date: date.map(str::to_string),
            game_type: Some("Tally".to_string()),
            final_score_us: Some(us),
            final_score_them: Some(them),
            event_log: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Schema
    // ------------------------------------------------------------------

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for table in [
            "events",
            "games",
            "lines",
            "lineups",
            "players",
            "session_state",
            "tally_points",
            "teams",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn foreign_keys_enforced() {
        let db = test_db();
        let result = db.credit_tally_point("no-such-game", "p1");
        assert!(result.is_err());
    }

    // ------------------------------------------------------------------
    // Teams and roster
    // ------------------------------------------------------------------

    #[test]
    fn upsert_team_is_idempotent() {
        let db = test_db();
        let first = db.upsert_team("home", "Home").unwrap();
        let second = db.upsert_team("home", "Renamed").unwrap();
        assert_eq!(first, second);
        assert_eq!(second.name, "Home");
    }

    #[test]
    fn players_round_trip_sorted_by_name() {
        let db = test_db();
        let team = db.upsert_team("hucks", "Hucks").unwrap();
        db.add_players(
            &team.id,
            &[
                NewPlayer {
                    name: "Zed".into(),
                    jersey_number: Some(9),
                },
                NewPlayer {
                    name: "Amy".into(),
                    jersey_number: None,
                },
            ],
        )
        .unwrap();
        let players = db.players_for_team(&team.id).unwrap();
        let names: Vec<&str> = players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Amy", "Zed"]);
        assert_eq!(players[1].jersey_number, Some(9));
    }

    #[test]
    fn lines_store_player_ids() {
        let db = test_db();
        let team = db.upsert_team("hucks", "Hucks").unwrap();
        db.create_line(&NewLine {
            team_id: team.id.clone(),
            name: "O-line".into(),
            description: String::new(),
            player_ids: vec!["p1".into(), "p2".into()],
        })
        .unwrap();
        let lines = db.lines_for_team(&team.id).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].player_ids, vec!["p1", "p2"]);
    }

    // ------------------------------------------------------------------
    // Games
    // ------------------------------------------------------------------

    #[test]
    fn game_round_trip_preserves_event_log() {
        let db = test_db();
        let team = db.upsert_team("hucks", "Hucks").unwrap();
        let mut new_game = sample_game(&team.id, Some("2026-05-01"), 7, 3);
        new_game.event_log = vec![TallyEvent::defend(Player::new("p1", "Ana", Side::A), 5)];
        let saved = db.create_game(&new_game).unwrap();

        let games = db.games_for_team(&team.id).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0], saved);
        assert_eq!(games[0].event_log.len(), 1);
    }

    #[test]
    fn games_listed_newest_date_first() {
        let db = test_db();
        let team = db.upsert_team("hucks", "Hucks").unwrap();
        db.create_game(&sample_game(&team.id, Some("2026-01-01"), 1, 0))
            .unwrap();
        db.create_game(&sample_game(&team.id, None, 2, 0)).unwrap();
        db.create_game(&sample_game(&team.id, Some("2026-03-01"), 3, 0))
            .unwrap();
        let scores: Vec<Option<u32>> = db
            .games_for_team(&team.id)
            .unwrap()
            .iter()
            .map(|g| g.final_score_us)
            .collect();
        assert_eq!(scores, vec![Some(3), Some(1), Some(2)]);
    }

    #[test]
    fn duplicate_lineup_is_rejected() {
        let db = test_db();
        let game = db.create_game(&sample_game("x", None, 0, 0));
        // team_id references teams(id), so an unknown team fails.
        assert!(game.is_err());

        let team = db.upsert_team("hucks", "Hucks").unwrap();
        let game = db.create_game(&sample_game(&team.id, None, 0, 0)).unwrap();
        let lineup = NewLineup {
            game_id: game.id.clone(),
            team: LineupTeam::Dark,
            player_ids: vec!["p1".into()],
        };
        db.create_lineups(std::slice::from_ref(&lineup)).unwrap();
        assert!(db.has_lineup(&game.id, LineupTeam::Dark).unwrap());
        assert!(!db.has_lineup(&game.id, LineupTeam::Light).unwrap());
        assert!(db.create_lineups(&[lineup]).is_err());
        assert_eq!(db.lineups_for_games(&[game.id]).unwrap().len(), 1);
    }

    #[test]
    fn empty_id_list_returns_nothing() {
        let db = test_db();
        assert!(db.lineups_for_games(&[]).unwrap().is_empty());
        assert!(db.events_for_games(&[]).unwrap().is_empty());
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    #[test]
    fn events_filtered_by_game() {
        let db = test_db();
        let team = db.upsert_team("hucks", "Hucks").unwrap();
        let g1 = db.create_game(&sample_game(&team.id, None, 0, 0)).unwrap();
        let g2 = db.create_game(&sample_game(&team.id, None, 0, 0)).unwrap();
        db.add_events(&[
            NewThrowEvent {
                game_id: g1.id.clone(),
                thrower_id: "p1".into(),
                receiver_id: Some("p2".into()),
                result: ThrowResult::Goal,
                point_number: Some(1),
            },
            NewThrowEvent {
                game_id: g2.id.clone(),
                thrower_id: "p2".into(),
                receiver_id: None,
                result: ThrowResult::Turnover,
                point_number: None,
            },
        ])
        .unwrap();
        let events = db.events_for_games(&[g1.id.clone()]).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].result, ThrowResult::Goal);
        assert_eq!(events[0].receiver_id.as_deref(), Some("p2"));
    }

    #[test]
    fn mixed_case_results_are_read() {
        let db = test_db();
        let team = db.upsert_team("hucks", "Hucks").unwrap();
        let g = db.create_game(&sample_game(&team.id, None, 0, 0)).unwrap();
        db.conn()
            .execute(
                "INSERT INTO events (id, game_id, thrower_id, result) VALUES ('e1', ?1, 'p1', 'Goal')",
                params![g.id],
            )
            .unwrap();
        let events = db.events_for_games(&[g.id]).unwrap();
        assert_eq!(events[0].result, ThrowResult::Goal);
    }

    // ------------------------------------------------------------------
    // Tally points
    // ------------------------------------------------------------------

    #[test]
    fn tally_point_credited_once() {
        let db = test_db();
        let team = db.upsert_team("hucks", "Hucks").unwrap();
        let g = db.create_game(&sample_game(&team.id, None, 7, 3)).unwrap();
        assert!(!db.has_tally_point(&g.id, "p1").unwrap());
        assert!(db.credit_tally_point(&g.id, "p1").unwrap().is_some());
        assert!(db.credit_tally_point(&g.id, "p1").unwrap().is_none());
        assert!(db.has_tally_point(&g.id, "p1").unwrap());
        assert_eq!(db.tally_points_for_game(&g.id).unwrap().len(), 1);
    }

    // ------------------------------------------------------------------
    // Session state
    // ------------------------------------------------------------------

    #[test]
    fn save_and_load_state_round_trip() {
        let db = test_db();
        let value = serde_json::json!({"scoreA": 3, "eventLog": []});
        db.save_state("k", &value).unwrap();
        assert_eq!(db.load_state("k").unwrap(), Some(value));
    }

    #[test]
    fn load_state_returns_none_for_missing_key() {
        let db = test_db();
        assert_eq!(db.load_state("missing").unwrap(), None);
    }

    #[test]
    fn save_state_overwrites_and_clear_removes() {
        let db = test_db();
        db.save_state("k", &serde_json::json!(1)).unwrap();
        db.save_state("k", &serde_json::json!(2)).unwrap();
        assert_eq!(db.load_state("k").unwrap(), Some(serde_json::json!(2)));
        db.clear_state("k").unwrap();
        assert_eq!(db.load_state("k").unwrap(), None);
    }
}
