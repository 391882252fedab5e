// Keyboard-driven player picker: substring filtering, highlight navigation,
// and a short most-recently-used list.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::model::Player;

pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// Lowercase, trimmed form used for matching.
fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Players whose name contains `query`, ignoring case and surrounding
/// whitespace. An empty query matches everyone. Input order is kept.
pub fn filter_players<'a>(players: &'a [Player], query: &str) -> Vec<&'a Player> {
    let needle = normalize(query);
    players
        .iter()
        .filter(|p| normalize(&p.name).contains(&needle))
        .collect()
}

// ---------------------------------------------------------------------------
// Recent players
// ---------------------------------------------------------------------------

/// Most-recent-first list of picked players, de-duplicated by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentPlayers {
    limit: usize,
    players: VecDeque<Player>,
}

impl Default for RecentPlayers {
    fn default() -> Self {
        RecentPlayers::new(DEFAULT_RECENT_LIMIT)
    }
}

impl RecentPlayers {
    pub fn new(limit: usize) -> Self {
        RecentPlayers {
            limit,
            players: VecDeque::with_capacity(limit),
        }
    }

    pub fn push(&mut self, player: &Player) {
        self.players.retain(|p| p.id != player.id);
        self.players.push_front(player.clone());
        self.players.truncate(self.limit);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Picker
// ---------------------------------------------------------------------------

/// One row in the picker list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerOption {
    /// "No assister", offered only on the assister step.
    Nobody,
    Player(Player),
}

impl PickerOption {
    pub fn label(&self) -> &str {
        match self {
            PickerOption::Nobody => "None",
            PickerOption::Player(p) => &p.name,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlayerPicker {
    query: String,
    selected: Option<Player>,
    highlight: usize,
    recent: RecentPlayers,
}

impl PlayerPicker {
    pub fn with_recent_limit(limit: usize) -> Self {
        PlayerPicker {
            recent: RecentPlayers::new(limit),
            ..PlayerPicker::default()
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected(&self) -> Option<&Player> {
        self.selected.as_ref()
    }

    pub fn highlight(&self) -> usize {
        self.highlight
    }

    pub fn recent(&self) -> &RecentPlayers {
        &self.recent
    }

    /// Clear query, selection, and highlight. Recent players survive.
    pub fn reset(&mut self) {
        self.query.clear();
        self.selected = None;
        self.highlight = 0;
    }

    /// Replace the query text. Drops any held selection.
    pub fn input(&mut self, text: &str) {
        self.query = text.to_string();
        self.selected = None;
        self.highlight = 0;
    }

    /// Current option list. While a selection is held the full roster is
    /// shown regardless of the query text.
    pub fn options(&self, roster: &[Player], allow_nobody: bool) -> Vec<PickerOption> {
        let mut options = Vec::with_capacity(roster.len() + 1);
        if allow_nobody {
            options.push(PickerOption::Nobody);
        }
        if self.selected.is_some() {
            options.extend(roster.iter().cloned().map(PickerOption::Player));
        } else {
            options.extend(
                filter_players(roster, &self.query)
                    .into_iter()
                    .cloned()
                    .map(PickerOption::Player),
            );
        }
        options
    }

    pub fn highlight_down(&mut self, option_count: usize) {
        self.highlight = match option_count {
            0 => 0,
            n => (self.highlight + 1).min(n - 1),
        };
    }

    pub fn highlight_up(&mut self) {
        self.highlight = self.highlight.saturating_sub(1);
    }

    pub fn highlighted(&self, options: &[PickerOption]) -> Option<PickerOption> {
        options.get(self.highlight).cloned()
    }

    /// Accept a player: the query shows their name and they move to the front
    /// of the recent list.
    pub fn select(&mut self, player: &Player) {
        self.query = player.name.clone();
        self.selected = Some(player.clone());
        self.highlight = 0;
        self.recent.push(player);
    }
}
