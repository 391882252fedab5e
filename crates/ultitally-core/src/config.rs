// Configuration loading and parsing (config/ultitally.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::picker::DEFAULT_RECENT_LIMIT;

pub const CONFIG_FILE: &str = "ultitally.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub team: TeamConfig,
    pub db_path: String,
    pub game: GameDefaults,
    pub recorder: RecorderConfig,
    pub analytics: AnalyticsConfig,
}

/// On-disk layout of ultitally.toml.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    team: TeamConfig,
    database: DatabaseSection,
    #[serde(default)]
    game: GameDefaults,
    #[serde(default)]
    recorder: RecorderConfig,
    #[serde(default)]
    analytics: AnalyticsConfig,
}

/// The team whose roster, lines, and games this install manages.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamConfig {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

/// Values the settings step starts from. 0 means no limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameDefaults {
    pub duration_minutes: u32,
    pub score_cap: u32,
}

impl Default for GameDefaults {
    fn default() -> Self {
        GameDefaults {
            duration_minutes: 0,
            score_cap: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub recent_limit: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        RecorderConfig {
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

/// Window sizes for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Games in the "recent" window; the previous window is the same size.
    pub recent_games: usize,
    /// Games per side of a player trend comparison.
    pub trend_games: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        AnalyticsConfig {
            recent_games: 5,
            trend_games: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load and validate `<base_dir>/config/ultitally.toml`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let config = Config {
        team: file.team,
        db_path: file.database.path,
        game: file.game,
        recorder: file.recorder,
        analytics: file.analytics,
    };
    validate(&config)?;
    Ok(config)
}

/// Built-in copy of `defaults/ultitally.toml`, used when an install has no
/// `defaults/` directory next to it.
const BUNDLED_CONFIG: &str = include_str!("../../../defaults/ultitally.toml");

/// Make sure `<base_dir>/config/ultitally.toml` exists. A missing file is
/// seeded from `<base_dir>/defaults/ultitally.toml`, or from the bundled
/// defaults when that is absent too. An existing file is left alone.
///
/// Returns the path written, if any.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.is_file() {
        return Ok(None);
    }

    let source = base_dir.join("defaults").join(CONFIG_FILE);
    let body = if source.is_file() {
        std::fs::read_to_string(&source).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read {}: {e}", source.display()),
        })?
    } else {
        BUNDLED_CONFIG.to_string()
    };

    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", dir.display()),
        })?;
    }
    std::fs::write(&target, body).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to write {}: {e}", target.display()),
    })?;
    Ok(Some(target))
}

/// Loads config relative to the current working directory, writing the
/// default file first on a fresh install.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    if let Some(path) = ensure_config_file(&cwd)? {
        info!("wrote default config to {}", path.display());
    }
    load_config_from(&cwd)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let text_fields: &[(&str, &str)] = &[
        ("team.id", config.team.id.as_str()),
        ("team.name", config.team.name.as_str()),
        ("database.path", config.db_path.as_str()),
    ];
    for (name, val) in text_fields {
        if val.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
    }

    let count_fields: &[(&str, usize)] = &[
        ("recorder.recent_limit", config.recorder.recent_limit),
        ("analytics.recent_games", config.analytics.recent_games),
        ("analytics.trend_games", config.analytics.trend_games),
    ];
    for (name, val) in count_fields {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Workspace root, where `defaults/` lives.
    fn project_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../..")
            .canonicalize()
            .unwrap()
    }

    /// Fresh temp dir with `config/ultitally.toml` holding `body`.
    fn temp_config(name: &str, body: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config").join(CONFIG_FILE), body).unwrap();
        tmp
    }

    const MINIMAL: &str = "[team]\nid = \"home\"\nname = \"Home\"\n\n[database]\npath = \"t.db\"\n";

    #[test]
    fn defaults_file_parses_and_validates() {
        let tmp = std::env::temp_dir().join("ultitally_config_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::copy(
            project_root().join("defaults").join(CONFIG_FILE),
            tmp.join("config").join(CONFIG_FILE),
        )
        .unwrap();

        let config = load_config_from(&tmp).expect("defaults should load");
        assert_eq!(config.db_path, "ultitally.db");
        assert_eq!(config.recorder.recent_limit, 5);
        assert_eq!(config.analytics.recent_games, 5);
        assert_eq!(config.analytics.trend_games, 3);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn optional_sections_fall_back_to_defaults() {
        let tmp = temp_config("ultitally_config_minimal", MINIMAL);
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.team.id, "home");
        assert_eq!(config.game, GameDefaults::default());
        assert_eq!(config.recorder, RecorderConfig::default());
        assert_eq!(config.analytics, AnalyticsConfig::default());
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_recent_limit() {
        let body = format!("{MINIMAL}\n[recorder]\nrecent_limit = 0\n");
        let tmp = temp_config("ultitally_config_zero_recent", &body);
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "recorder.recent_limit")
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_empty_team_id() {
        let body = MINIMAL.replace("id = \"home\"", "id = \"  \"");
        let tmp = temp_config("ultitally_config_empty_team", &body);
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "team.id"),
            other => panic!("expected ValidationError, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = temp_config("ultitally_config_bad_toml", "[team\nid=");
        assert!(matches!(
            load_config_from(&tmp).unwrap_err(),
            ConfigError::ParseError { .. }
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_when_missing() {
        let tmp = std::env::temp_dir().join("ultitally_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::FileNotFound { path } => assert!(path.ends_with(CONFIG_FILE)),
            other => panic!("expected FileNotFound, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    // ---- ensure_config_file ----

    #[test]
    fn seeds_config_from_defaults_dir_once() {
        let tmp = std::env::temp_dir().join("ultitally_config_seed");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults").join(CONFIG_FILE), MINIMAL).unwrap();

        let written = ensure_config_file(&tmp).unwrap();
        assert_eq!(written, Some(tmp.join("config").join(CONFIG_FILE)));
        assert_eq!(load_config_from(&tmp).unwrap().db_path, "t.db");

        // An edited config is never replaced.
        fs::write(tmp.join("config").join(CONFIG_FILE), "edited").unwrap();
        assert_eq!(ensure_config_file(&tmp).unwrap(), None);
        assert_eq!(
            fs::read_to_string(tmp.join("config").join(CONFIG_FILE)).unwrap(),
            "edited"
        );
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn bundled_defaults_cover_a_bare_install() {
        let tmp = std::env::temp_dir().join("ultitally_config_bare");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        assert!(ensure_config_file(&tmp).unwrap().is_some());
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.team.id, "home");
        assert_eq!(config.db_path, "ultitally.db");
        let _ = fs::remove_dir_all(&tmp);
    }
}
