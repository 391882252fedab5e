// CSV imports: roster rows (`name,jersey_number`) into new player records,
// and saved lines (`name,description,players`) matched against the roster.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::records::{NewLine, NewPlayer, RosterPlayer};

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

/// One roster row. The jersey column is optional and may be blank.
#[derive(Debug, Deserialize)]
struct RawRosterRow {
    #[serde(alias = "Name")]
    name: String,
    #[serde(default, alias = "jersey", alias = "Jersey", alias = "number")]
    jersey_number: Option<String>,
}

/// Parse roster rows from any reader. Rows with a blank name or a
/// non-numeric jersey are skipped.
pub fn load_roster_from_reader<R: Read>(rdr: R) -> Result<Vec<NewPlayer>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(rdr);
    let mut players = Vec::new();
    for result in reader.deserialize::<RawRosterRow>() {
        match result {
            Ok(raw) => {
                if raw.name.is_empty() {
                    warn!("skipping roster row with blank name");
                    continue;
                }
                let jersey_number = match raw.jersey_number.as_deref() {
                    None | Some("") => None,
                    Some(text) => match text.parse::<u32>() {
                        Ok(n) => Some(n),
                        Err(_) => {
                            warn!("skipping player '{}': bad jersey number '{}'", raw.name, text);
                            continue;
                        }
                    },
                };
                players.push(NewPlayer {
                    name: raw.name,
                    jersey_number,
                });
            }
            Err(e) => {
                warn!("skipping malformed roster row: {}", e);
            }
        }
    }
    Ok(players)
}

pub fn load_roster_csv(path: &Path) -> Result<Vec<NewPlayer>, RosterError> {
    let path_str = path.display().to_string();
    let file = File::open(path).map_err(|e| RosterError::Io {
        path: path_str.clone(),
        source: e,
    })?;
    let players = load_roster_from_reader(file).map_err(|e| RosterError::Csv {
        path: path_str.clone(),
        source: e,
    })?;
    info!("read {} player(s) from {}", players.len(), path_str);
    Ok(players)
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

/// One line row. `players` holds player names separated by `;`.
#[derive(Debug, Deserialize)]
struct RawLineRow {
    #[serde(alias = "Name")]
    name: String,
    #[serde(default, alias = "Description")]
    description: String,
    #[serde(default, alias = "Players")]
    players: String,
}

/// A line read from CSV, with its players still given by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineImport {
    pub name: String,
    pub description: String,
    pub player_names: Vec<String>,
}

impl LineImport {
    /// Match player names against `roster` ignoring case. Returns the line
    /// to store and the names that matched nobody.
    pub fn resolve(&self, team_id: &str, roster: &[RosterPlayer]) -> (NewLine, Vec<String>) {
        let mut player_ids = Vec::with_capacity(self.player_names.len());
        let mut unknown = Vec::new();
        for name in &self.player_names {
            match roster.iter().find(|p| p.name.eq_ignore_ascii_case(name)) {
                Some(p) if !player_ids.contains(&p.id) => player_ids.push(p.id.clone()),
                Some(_) => {}
                None => unknown.push(name.clone()),
            }
        }
        let line = NewLine {
            team_id: team_id.to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            player_ids,
        };
        (line, unknown)
    }
}

/// Parse line rows from any reader. Rows with a blank name or no players are
/// skipped.
pub fn load_lines_from_reader<R: Read>(rdr: R) -> Result<Vec<LineImport>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(rdr);
    let mut lines = Vec::new();
    for result in reader.deserialize::<RawLineRow>() {
        match result {
            Ok(raw) => {
                let player_names: Vec<String> = raw
                    .players
                    .split(';')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .collect();
                if raw.name.is_empty() || player_names.is_empty() {
                    warn!("skipping line row '{}' with no name or players", raw.name);
                    continue;
                }
                lines.push(LineImport {
                    name: raw.name,
                    description: raw.description,
                    player_names,
                });
            }
            Err(e) => {
                warn!("skipping malformed line row: {}", e);
            }
        }
    }
    Ok(lines)
}

pub fn load_lines_csv(path: &Path) -> Result<Vec<LineImport>, RosterError> {
    let path_str = path.display().to_string();
    let file = File::open(path).map_err(|e| RosterError::Io {
        path: path_str.clone(),
        source: e,
    })?;
    let lines = load_lines_from_reader(file).map_err(|e| RosterError::Csv {
        path: path_str.clone(),
        source: e,
    })?;
    info!("read {} line(s) from {}", lines.len(), path_str);
    Ok(lines)
}
