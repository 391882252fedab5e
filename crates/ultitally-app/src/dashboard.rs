// Dashboard loading: fetch one team's records and build the analytics
// report plus the breakdown of the most recent game, including who took a
// tally point from it.

use anyhow::Context;
use tracing::info;

use ultitally_core::analytics::{game_report, AnalyticsReport, GameReport};
use ultitally_core::backend::{load_analytics_snapshot, Backend};
use ultitally_core::config::AnalyticsConfig;

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub report: AnalyticsReport,
    pub latest_game: Option<GameReport>,
    /// Names credited with a tally point in the most recent game.
    pub latest_tally_points: Vec<String>,
}

pub async fn load_dashboard(
    backend: &dyn Backend,
    team_id: &str,
    config: &AnalyticsConfig,
) -> anyhow::Result<Dashboard> {
    let snapshot = load_analytics_snapshot(backend, team_id)
        .await
        .with_context(|| format!("failed to load records for team {team_id}"))?;
    let report = AnalyticsReport::build(&snapshot, config);
    let latest_game = snapshot
        .games
        .first()
        .map(|g| game_report(&g.id, &snapshot.players, &snapshot.events));
    let mut latest_tally_points = Vec::new();
    if let Some(latest) = snapshot.games.first() {
        let points = backend
            .list_tally_points(&latest.id)
            .await
            .with_context(|| format!("failed to load tally points for game {}", latest.id))?;
        for point in points {
            let name = snapshot
                .players
                .iter()
                .find(|p| p.id == point.player_id)
                .map_or_else(|| point.player_id.clone(), |p| p.name.clone());
            latest_tally_points.push(name);
        }
        latest_tally_points.sort();
    }
    info!(
        "dashboard built from {} game(s), {} event(s)",
        snapshot.games.len(),
        snapshot.events.len()
    );
    Ok(Dashboard {
        report,
        latest_game,
        latest_tally_points,
    })
}
