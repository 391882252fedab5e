// Persistence seams: the record backend (teams, games, lineups, points,
// events) and the local session store for in-progress state.

use anyhow::Result;
use async_trait::async_trait;

use crate::analytics::AnalyticsSnapshot;
use crate::records::{
    GameRecord, LineRecord, LineupRecord, LineupTeam, NewGame, NewLine, NewLineup, NewPlayer,
    NewThrowEvent, RosterPlayer, TallyPointRecord, TeamRecord, ThrowEvent,
};

/// Record storage. Every call may fail; callers surface the error and keep
/// their own state intact.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Create a team with a caller-chosen id if it does not exist yet.
    async fn ensure_team(&self, id: &str, name: &str) -> Result<TeamRecord>;

    async fn insert_players(&self, team_id: &str, players: &[NewPlayer])
        -> Result<Vec<RosterPlayer>>;

    /// Players for a team, ordered by name.
    async fn list_players(&self, team_id: &str) -> Result<Vec<RosterPlayer>>;

    async fn insert_line(&self, line: &NewLine) -> Result<LineRecord>;

    async fn list_lines(&self, team_id: &str) -> Result<Vec<LineRecord>>;

    async fn insert_game(&self, game: &NewGame) -> Result<GameRecord>;

    /// Games for a team, most recent `game_date` first.
    async fn list_games(&self, team_id: &str) -> Result<Vec<GameRecord>>;

    async fn insert_lineups(&self, lineups: &[NewLineup]) -> Result<Vec<LineupRecord>>;

    async fn lineup_exists(&self, game_id: &str, team: LineupTeam) -> Result<bool>;

    async fn list_lineups(&self, game_ids: &[String]) -> Result<Vec<LineupRecord>>;

    async fn insert_events(&self, events: &[NewThrowEvent]) -> Result<Vec<ThrowEvent>>;

    async fn list_events(&self, game_ids: &[String]) -> Result<Vec<ThrowEvent>>;

    async fn tally_point_exists(&self, game_id: &str, player_id: &str) -> Result<bool>;

    /// Credit one point. Returns `None` when the pair was already credited.
    async fn insert_tally_point(
        &self,
        game_id: &str,
        player_id: &str,
    ) -> Result<Option<TallyPointRecord>>;

    async fn list_tally_points(&self, game_id: &str) -> Result<Vec<TallyPointRecord>>;
}

/// Keyed JSON storage for in-progress state that must survive a restart.
pub trait SessionStore: Send + Sync {
    fn load_session(&self, key: &str) -> Result<Option<serde_json::Value>>;
    fn save_session(&self, key: &str, value: &serde_json::Value) -> Result<()>;
    fn clear_session(&self, key: &str) -> Result<()>;
}

/// Everything analytics needs for one team.
pub async fn load_analytics_snapshot(
    backend: &dyn Backend,
    team_id: &str,
) -> Result<AnalyticsSnapshot> {
    let games = backend.list_games(team_id).await?;
    let players = backend.list_players(team_id).await?;
    let game_ids: Vec<String> = games.iter().map(|g| g.id.clone()).collect();
    let events = backend.list_events(&game_ids).await?;
    let lineups = backend.list_lineups(&game_ids).await?;
    Ok(AnalyticsSnapshot::new(games, players, events, lineups))
}
