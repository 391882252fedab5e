// End-game save: one game row, a lineup per side, the logged passes as
// throw events, and a tally point for every player on the winning side.
// Each stage records its progress on the session so a retry after a failure
// resumes instead of duplicating rows.

use chrono::Local;
use thiserror::Error;
use tracing::{info, warn};

use ultitally_core::backend::{Backend, SessionStore};
use ultitally_core::model::Side;
use ultitally_core::records::{LineupTeam, NewGame, NewLineup, NewThrowEvent};

use crate::session::{GameSession, WizardStep, SESSION_STATE_KEY};

pub const TALLY_OPPONENT: &str = "Tally Game";
pub const TALLY_GAME_TYPE: &str = "Tally";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error("a save is already in progress")]
    InFlight,

    #[error("only a live game can be saved")]
    NotLive,

    #[error("failed to save game: {0}")]
    Backend(String),
}

/// Persist the live game. On success the session moves to `Saved` and the
/// stored snapshot is cleared; on failure it stays `Live` with
/// `last_error` set.
pub async fn save_session(
    session: &mut GameSession,
    backend: &dyn Backend,
    store: &dyn SessionStore,
) -> Result<String, SaveError> {
    if session.is_saving() {
        return Err(SaveError::InFlight);
    }
    if session.step() != &WizardStep::Live {
        return Err(SaveError::NotLive);
    }

    session.set_saving(true);
    let result = persist(session, backend, store).await;
    session.set_saving(false);

    match result {
        Ok(game_id) => {
            session.set_last_error(None);
            session.mark_saved(game_id.clone());
            if let Err(e) = store.clear_session(SESSION_STATE_KEY) {
                warn!("failed to clear session snapshot: {e:#}");
            }
            info!("saved tally game {game_id}");
            Ok(game_id)
        }
        Err(e) => {
            let err = SaveError::Backend(format!("{e:#}"));
            warn!("{err}");
            session.set_last_error(Some(err.to_string()));
            session.autosave(store);
            Err(err)
        }
    }
}

async fn persist(
    session: &mut GameSession,
    backend: &dyn Backend,
    store: &dyn SessionStore,
) -> anyhow::Result<String> {
    let tallies = *session.tallies();

    let game_id = match session.save_progress().game_id.clone() {
        Some(id) => id,
        None => {
            let game = backend
                .insert_game(&NewGame {
                    team_id: session.team_id().map(str::to_string),
                    opponent: TALLY_OPPONENT.to_string(),
                    game_date: Some(Local::now().format("%Y-%m-%d").to_string()),
                    game_type: Some(TALLY_GAME_TYPE.to_string()),
                    final_score_us: Some(tallies.score_a),
                    final_score_them: Some(tallies.score_b),
                    event_log: session.event_log().to_vec(),
                })
                .await?;
            session.record_game_id(game.id.clone());
            session.autosave(store);
            game.id
        }
    };

    if !session.save_progress().lineups_saved {
        let mut missing = Vec::new();
        for side in Side::BOTH {
            let team = LineupTeam::from(side);
            if !backend.lineup_exists(&game_id, team).await? {
                missing.push(NewLineup {
                    game_id: game_id.clone(),
                    team,
                    player_ids: session.side_players(side).into_iter().map(|p| p.id).collect(),
                });
            }
        }
        if !missing.is_empty() {
            backend.insert_lineups(&missing).await?;
        }
        session.mark_lineups_saved();
        session.autosave(store);
    }

    if !session.save_progress().events_saved {
        let events: Vec<NewThrowEvent> = session
            .pass_tracker()
            .passes()
            .iter()
            .map(|pass| pass.to_new_event(&game_id))
            .collect();
        if !events.is_empty() {
            backend.insert_events(&events).await?;
            info!("stored {} throw event(s)", events.len());
        }
        session.mark_events_saved();
        session.autosave(store);
    }

    if let Some(winner) = tallies.leader() {
        let mut credited = 0;
        for player in session.side_players(winner) {
            if backend.tally_point_exists(&game_id, &player.id).await? {
                continue;
            }
            if backend.insert_tally_point(&game_id, &player.id).await?.is_some() {
                credited += 1;
            }
        }
        info!("credited {credited} tally point(s) to side {winner}");
    }

    Ok(game_id)
}
