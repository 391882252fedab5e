// Analytics aggregator: read-only summaries over a team's games, roster,
// throw events, and lineups.
//
// Everything here is a pure function of an `AnalyticsSnapshot`.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::config::AnalyticsConfig;
use crate::records::{GameRecord, LineupRecord, RosterPlayer, ThrowEvent, ThrowResult};

/// Placeholder for ids that are not on the roster.
const UNKNOWN_PLAYER: &str = "Unknown";

const LEADERBOARD_SIZE: usize = 5;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct AnalyticsSnapshot {
    /// Most recent first.
    pub games: Vec<GameRecord>,
    pub players: Vec<RosterPlayer>,
    pub events: Vec<ThrowEvent>,
    pub lineups: Vec<LineupRecord>,
}

impl AnalyticsSnapshot {
    /// Builds a snapshot, putting games in most-recent-first order.
    pub fn new(
        mut games: Vec<GameRecord>,
        players: Vec<RosterPlayer>,
        events: Vec<ThrowEvent>,
        lineups: Vec<LineupRecord>,
    ) -> Self {
        sort_recent_first(&mut games);
        AnalyticsSnapshot {
            games,
            players,
            events,
            lineups,
        }
    }

    /// Display name for a roster id, "Unknown" when absent.
    pub fn player_name(&self, id: &str) -> &str {
        player_name(&self.players, id)
    }
}

fn player_name<'a>(players: &'a [RosterPlayer], id: &str) -> &'a str {
    players
        .iter()
        .find(|p| p.id == id)
        .map(|p| p.name.as_str())
        .unwrap_or(UNKNOWN_PLAYER)
}

/// Newest `game_date` first, then newest `created_at`. Undated games last.
pub fn sort_recent_first(games: &mut [GameRecord]) {
    games.sort_by(|a, b| {
        match (&a.game_date, &b.game_date) {
            (Some(x), Some(y)) => y.cmp(x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
        .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

/// Events belonging to any of `games`.
pub fn events_for_games<'a>(events: &'a [ThrowEvent], games: &[GameRecord]) -> Vec<&'a ThrowEvent> {
    let ids: HashSet<&str> = games.iter().map(|g| g.id.as_str()).collect();
    events
        .iter()
        .filter(|e| ids.contains(e.game_id.as_str()))
        .collect()
}

/// `part` as a whole-number percentage of `total`, 0 when `total` is 0.
fn percent(part: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(part) * 100.0 / f64::from(total)).round() as u32
}

/// Rounds halves toward positive infinity, so -2.5 becomes -2.
fn round_half_up(x: f64) -> i32 {
    (x + 0.5).floor() as i32
}

// ---------------------------------------------------------------------------
// Team summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WinLoss {
    pub wins: u32,
    pub losses: u32,
}

/// Wins are games where we outscored them. Every other game with both scores
/// recorded, ties included, is a loss.
pub fn win_loss(games: &[GameRecord]) -> WinLoss {
    let mut record = WinLoss::default();
    for game in games {
        if game.final_score_us.is_none() || game.final_score_them.is_none() {
            continue;
        }
        if game.is_win() {
            record.wins += 1;
        } else {
            record.losses += 1;
        }
    }
    record
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompletionStats {
    pub completions: u32,
    pub turnovers: u32,
    pub total_throws: u32,
    pub completion_pct: u32,
    pub turnover_rate: u32,
}

/// Goals are not throws for this summary; only completions and turnovers
/// count.
pub fn completion_stats<'a>(events: impl IntoIterator<Item = &'a ThrowEvent>) -> CompletionStats {
    let mut completions = 0;
    let mut turnovers = 0;
    for e in events {
        match e.result {
            ThrowResult::Completion => completions += 1,
            ThrowResult::Turnover => turnovers += 1,
            ThrowResult::Goal => {}
        }
    }
    let total_throws = completions + turnovers;
    CompletionStats {
        completions,
        turnovers,
        total_throws,
        completion_pct: percent(completions, total_throws),
        turnover_rate: percent(turnovers, total_throws),
    }
}

// ---------------------------------------------------------------------------
// Player stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerStatLine {
    pub player_id: String,
    pub name: String,
    pub completions: u32,
    pub turnovers: u32,
    pub goals: u32,
    pub assists: u32,
}

impl PlayerStatLine {
    fn new(player: &RosterPlayer) -> Self {
        PlayerStatLine {
            player_id: player.id.clone(),
            name: player.name.clone(),
            completions: 0,
            turnovers: 0,
            goals: 0,
            assists: 0,
        }
    }

    /// Goals + assists + completions.
    pub fn involvement(&self) -> u32 {
        self.goals + self.assists + self.completions
    }
}

/// Per-player counters in roster order. Events naming ids that are not on
/// the roster are ignored.
pub fn player_stats<'a>(
    players: &[RosterPlayer],
    events: impl IntoIterator<Item = &'a ThrowEvent>,
) -> Vec<PlayerStatLine> {
    let mut lines: Vec<PlayerStatLine> = players.iter().map(PlayerStatLine::new).collect();
    let index: HashMap<&str, usize> = players
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), i))
        .collect();

    for e in events {
        let thrower = index.get(e.thrower_id.as_str()).copied();
        let receiver = e
            .receiver_id
            .as_deref()
            .and_then(|id| index.get(id).copied());
        match e.result {
            ThrowResult::Completion => {
                if let Some(i) = thrower {
                    lines[i].completions += 1;
                }
            }
            ThrowResult::Turnover => {
                if let Some(i) = thrower {
                    lines[i].turnovers += 1;
                }
            }
            ThrowResult::Goal => {
                if let Some(i) = receiver {
                    lines[i].goals += 1;
                }
                if let Some(i) = thrower {
                    lines[i].assists += 1;
                }
            }
        }
    }
    lines
}

/// Highest involvement; the earliest line wins a tie.
pub fn mvp(stats: &[PlayerStatLine]) -> Option<&PlayerStatLine> {
    stats.iter().fold(None, |best, line| match best {
        Some(b) if b.involvement() >= line.involvement() => Some(b),
        _ => Some(line),
    })
}

// ---------------------------------------------------------------------------
// Trends
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerTrend {
    pub player_id: String,
    pub name: String,
    /// Percent change in completions, last window vs the one before.
    pub completion_change: i32,
    pub turnover_change: i32,
}

/// Percent change from `previous` to `recent`; 0 when `previous` is 0.
fn change_pct(recent: u32, previous: u32) -> i32 {
    if previous == 0 {
        return 0;
    }
    round_half_up((f64::from(recent) - f64::from(previous)) / f64::from(previous) * 100.0)
}

/// Compare each player's last `window` games with the `window` before them.
/// `games` must be most recent first.
pub fn player_trends(
    players: &[RosterPlayer],
    games: &[GameRecord],
    events: &[ThrowEvent],
    window: usize,
) -> Vec<PlayerTrend> {
    let recent_games = &games[..window.min(games.len())];
    let previous_games = &games[window.min(games.len())..(2 * window).min(games.len())];
    let recent = player_stats(players, events_for_games(events, recent_games));
    let previous = player_stats(players, events_for_games(events, previous_games));

    recent
        .into_iter()
        .zip(previous)
        .map(|(r, p)| PlayerTrend {
            completion_change: change_pct(r.completions, p.completions),
            turnover_change: change_pct(r.turnovers, p.turnovers),
            player_id: r.player_id,
            name: r.name,
        })
        .collect()
}

/// Largest positive completion change, first on ties.
pub fn most_improved(trends: &[PlayerTrend]) -> Option<&PlayerTrend> {
    trends
        .iter()
        .filter(|t| t.completion_change > 0)
        .fold(None, |best: Option<&PlayerTrend>, t| match best {
            Some(b) if b.completion_change >= t.completion_change => Some(b),
            _ => Some(t),
        })
}

/// Most negative completion change, first on ties.
pub fn biggest_concern(trends: &[PlayerTrend]) -> Option<&PlayerTrend> {
    trends
        .iter()
        .filter(|t| t.completion_change < 0)
        .fold(None, |worst: Option<&PlayerTrend>, t| match worst {
            Some(w) if w.completion_change <= t.completion_change => Some(w),
            _ => Some(t),
        })
}

// ---------------------------------------------------------------------------
// Chemistry
// ---------------------------------------------------------------------------

/// Completed passes from thrower (row) to receiver (column). Not symmetric;
/// the diagonal is undefined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChemistryMatrix {
    player_ids: Vec<String>,
    index: HashMap<String, usize>,
    cells: Vec<u32>,
}

impl ChemistryMatrix {
    pub fn build<'a>(
        players: &[RosterPlayer],
        events: impl IntoIterator<Item = &'a ThrowEvent>,
    ) -> Self {
        let player_ids: Vec<String> = players.iter().map(|p| p.id.clone()).collect();
        let index: HashMap<String, usize> = player_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        let n = player_ids.len();
        let mut cells = vec![0; n * n];

        for e in events {
            if e.result != ThrowResult::Completion {
                continue;
            }
            let Some(receiver_id) = e.receiver_id.as_deref() else {
                continue;
            };
            if let (Some(&t), Some(&r)) = (index.get(&e.thrower_id), index.get(receiver_id)) {
                if t != r {
                    cells[t * n + r] += 1;
                }
            }
        }

        ChemistryMatrix {
            player_ids,
            index,
            cells,
        }
    }

    pub fn len(&self) -> usize {
        self.player_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.player_ids.is_empty()
    }

    /// Completions from `thrower` to `receiver`. `None` on the diagonal or
    /// for ids outside the roster.
    pub fn get(&self, thrower: &str, receiver: &str) -> Option<u32> {
        let t = *self.index.get(thrower)?;
        let r = *self.index.get(receiver)?;
        (t != r).then(|| self.cells[t * self.len() + r])
    }

    /// The strongest connection, scanning rows then columns in roster order;
    /// `None` when no completions were recorded.
    pub fn best_pair(&self) -> Option<(&str, &str, u32)> {
        let n = self.len();
        let mut best: Option<(usize, usize, u32)> = None;
        for t in 0..n {
            for r in 0..n {
                let count = self.cells[t * n + r];
                if t != r && count > best.map_or(0, |b| b.2) {
                    best = Some((t, r, count));
                }
            }
        }
        best.map(|(t, r, count)| (self.player_ids[t].as_str(), self.player_ids[r].as_str(), count))
    }
}

// ---------------------------------------------------------------------------
// Tally standings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TallyStanding {
    pub player_id: String,
    pub name: String,
    pub points: u32,
}

/// One point per player on the winning lineup of every decided game. Only
/// players with at least one point are listed, highest first, then by name.
pub fn tally_standings(
    games: &[GameRecord],
    lineups: &[LineupRecord],
    players: &[RosterPlayer],
) -> Vec<TallyStanding> {
    let mut points: BTreeMap<&str, u32> = BTreeMap::new();
    for game in games {
        let Some(winner) = game.winning_lineup() else {
            continue;
        };
        let Some(lineup) = lineups
            .iter()
            .find(|l| l.game_id == game.id && l.team == winner)
        else {
            continue;
        };
        for id in &lineup.player_ids {
            *points.entry(id.as_str()).or_insert(0) += 1;
        }
    }

    let mut standings: Vec<TallyStanding> = points
        .into_iter()
        .map(|(id, points)| TallyStanding {
            player_id: id.to_string(),
            name: player_name(players, id).to_string(),
            points,
        })
        .collect();
    standings.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.name.cmp(&b.name)));
    standings
}

// ---------------------------------------------------------------------------
// Insights
// ---------------------------------------------------------------------------

/// Short advisory lines for the dashboard.
pub fn quick_insights(
    players: &[RosterPlayer],
    chemistry: &ChemistryMatrix,
    stats: &[PlayerStatLine],
) -> Vec<String> {
    let mut insights = Vec::new();
    if let Some((thrower, receiver, _)) = chemistry.best_pair() {
        insights.push(format!(
            "Consider pairing {} with {} more often.",
            player_name(players, thrower),
            player_name(players, receiver)
        ));
    }
    let top_thrower = stats.iter().fold(None, |best: Option<&PlayerStatLine>, s| match best {
        Some(b) if b.completions >= s.completions => Some(b),
        _ => Some(s),
    });
    if let Some(s) = top_thrower.filter(|s| s.completions > 0) {
        insights.push(format!("{} is excelling at completions.", s.name));
    }
    insights
}

// ---------------------------------------------------------------------------
// Single-game report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub player_id: String,
    pub name: String,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoalConnection {
    pub thrower: String,
    pub receiver: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameReport {
    pub game_id: String,
    pub goals: Vec<LeaderboardEntry>,
    pub assists: Vec<LeaderboardEntry>,
    pub turnovers: Vec<LeaderboardEntry>,
    pub connections: Vec<GoalConnection>,
}

fn leaderboard(stats: &[PlayerStatLine], value: impl Fn(&PlayerStatLine) -> u32) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = stats
        .iter()
        .filter(|s| value(s) > 0)
        .map(|s| LeaderboardEntry {
            player_id: s.player_id.clone(),
            name: s.name.clone(),
            value: value(s),
        })
        .collect();
    entries.sort_by(|a, b| b.value.cmp(&a.value));
    entries.truncate(LEADERBOARD_SIZE);
    entries
}

/// Leaders and goal connections for one game.
pub fn game_report(game_id: &str, players: &[RosterPlayer], events: &[ThrowEvent]) -> GameReport {
    let game_events: Vec<&ThrowEvent> = events.iter().filter(|e| e.game_id == game_id).collect();
    let stats = player_stats(players, game_events.iter().copied());

    let mut pairs: Vec<((&str, &str), u32)> = Vec::new();
    for e in &game_events {
        if e.result != ThrowResult::Goal {
            continue;
        }
        let Some(receiver) = e.receiver_id.as_deref() else {
            continue;
        };
        let key = (e.thrower_id.as_str(), receiver);
        match pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, count)) => *count += 1,
            None => pairs.push((key, 1)),
        }
    }
    pairs.sort_by(|a, b| b.1.cmp(&a.1));
    pairs.truncate(LEADERBOARD_SIZE);

    GameReport {
        game_id: game_id.to_string(),
        goals: leaderboard(&stats, |s| s.goals),
        assists: leaderboard(&stats, |s| s.assists),
        turnovers: leaderboard(&stats, |s| s.turnovers),
        connections: pairs
            .into_iter()
            .map(|((t, r), count)| GoalConnection {
                thrower: player_name(players, t).to_string(),
                receiver: player_name(players, r).to_string(),
                count,
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Dashboard report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AnalyticsReport {
    pub win_loss: WinLoss,
    pub recent: CompletionStats,
    pub previous: CompletionStats,
    /// Recent minus previous completion percentage.
    pub completion_trend: i32,
    pub turnover_trend: i32,
    pub player_stats: Vec<PlayerStatLine>,
    pub mvp: Option<PlayerStatLine>,
    pub improvement: Option<PlayerTrend>,
    pub concern: Option<PlayerTrend>,
    pub chemistry: ChemistryMatrix,
    pub standings: Vec<TallyStanding>,
    pub insights: Vec<String>,
}

impl AnalyticsReport {
    pub fn build(snapshot: &AnalyticsSnapshot, config: &AnalyticsConfig) -> Self {
        let games = &snapshot.games;
        let n = config.recent_games;
        let recent_games = &games[..n.min(games.len())];
        let previous_games = &games[n.min(games.len())..(2 * n).min(games.len())];

        let recent = completion_stats(events_for_games(&snapshot.events, recent_games));
        let previous = completion_stats(events_for_games(&snapshot.events, previous_games));

        let stats = player_stats(&snapshot.players, &snapshot.events);
        let trends = player_trends(
            &snapshot.players,
            games,
            &snapshot.events,
            config.trend_games,
        );
        let chemistry = ChemistryMatrix::build(&snapshot.players, &snapshot.events);
        let insights = quick_insights(&snapshot.players, &chemistry, &stats);

        AnalyticsReport {
            win_loss: win_loss(recent_games),
            completion_trend: recent.completion_pct as i32 - previous.completion_pct as i32,
            turnover_trend: recent.turnover_rate as i32 - previous.turnover_rate as i32,
            recent,
            previous,
            mvp: mvp(&stats).cloned(),
            improvement: most_improved(&trends).cloned(),
            concern: biggest_concern(&trends).cloned(),
            standings: tally_standings(games, &snapshot.lineups, &snapshot.players),
            player_stats: stats,
            chemistry,
            insights,
        }
    }

    /// Recent completion percentage beats the previous window's.
    pub fn trending_up(&self) -> bool {
        self.completion_trend > 0
    }
}
