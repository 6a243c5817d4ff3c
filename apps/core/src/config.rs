use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::settings;

pub const DEFAULT_CATALOG_URL: &str = "https://api.steampowered.com/ISteamApps/GetAppList/v2/";
pub const DEFAULT_COUNT_URL: &str =
    "https://api.steampowered.com/ISteamUserStats/GetNumberOfCurrentPlayers/v1/";

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(error) => write!(f, "io error: {error}"),
            Self::Parse(error) => write!(f, "parse error: {error}"),
            Self::Invalid(error) => write!(f, "invalid config: {error}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog_url: String,
    pub count_url: String,
    pub catalog_timeout_secs: u64,
    pub interactive_timeout_secs: u64,
    pub background_timeout_secs: u64,
    pub suggestion_page_size: usize,
    pub history_limit: usize,
    pub history_display_limit: usize,
    pub worker_threads: usize,
    pub refresh_interval_secs: u64,
    pub catalog_cache_path: PathBuf,
    pub session_path: PathBuf,
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let base = stable_app_data_dir();
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            count_url: DEFAULT_COUNT_URL.to_string(),
            catalog_timeout_secs: 15,
            interactive_timeout_secs: 10,
            background_timeout_secs: 5,
            suggestion_page_size: 12,
            history_limit: 20,
            history_display_limit: 10,
            worker_threads: 4,
            refresh_interval_secs: 0,
            catalog_cache_path: base.join("catalog.sqlite3"),
            session_path: base.join("session.json"),
            config_path: base.join("config.toml"),
        }
    }
}

impl Config {
    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_secs(self.catalog_timeout_secs)
    }

    pub fn interactive_timeout(&self) -> Duration {
        Duration::from_secs(self.interactive_timeout_secs)
    }

    pub fn background_timeout(&self) -> Duration {
        Duration::from_secs(self.background_timeout_secs)
    }
}

pub fn stable_app_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("STEAMCOUNT_HOME") {
        return PathBuf::from(dir);
    }

    let base = std::env::var_os("XDG_DATA_HOME")
        .or_else(|| std::env::var_os("APPDATA"))
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("share")))
        .unwrap_or_else(std::env::temp_dir);
    base.join("steamcount")
}

pub fn validate(cfg: &Config) -> Result<(), String> {
    if cfg.catalog_url.trim().is_empty() {
        return Err("catalog_url is required".into());
    }

    if cfg.count_url.trim().is_empty() {
        return Err("count_url is required".into());
    }

    for (name, value) in [
        ("catalog_timeout_secs", cfg.catalog_timeout_secs),
        ("interactive_timeout_secs", cfg.interactive_timeout_secs),
        ("background_timeout_secs", cfg.background_timeout_secs),
    ] {
        if value == 0 || value > 120 {
            return Err(format!("{name} must be between 1 and 120"));
        }
    }

    settings::validate_page_size(cfg.suggestion_page_size)?;
    settings::validate_worker_threads(cfg.worker_threads)?;
    settings::validate_refresh_interval(cfg.refresh_interval_secs)?;

    if cfg.history_limit == 0 {
        return Err("history_limit must be at least 1".into());
    }

    if cfg.history_display_limit == 0 || cfg.history_display_limit > cfg.history_limit {
        return Err("history_display_limit must be between 1 and history_limit".into());
    }

    if cfg.catalog_cache_path.as_os_str().is_empty() {
        return Err("catalog_cache_path is required".into());
    }

    if cfg.session_path.as_os_str().is_empty() {
        return Err("session_path is required".into());
    }

    Ok(())
}

/// Reads the TOML config at `path` (or the default location). A missing file
/// yields defaults; missing keys fall back to their default values.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| Config::default().config_path);

    let mut cfg = match std::fs::read_to_string(&config_path) {
        Ok(raw) => toml::from_str::<Config>(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Config::default(),
        Err(error) => return Err(ConfigError::Io(error)),
    };
    cfg.config_path = config_path;

    validate(&cfg).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    validate(cfg).map_err(ConfigError::Invalid)?;
    if let Some(parent) = cfg.config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let encoded = toml::to_string_pretty(cfg).map_err(|e| ConfigError::Parse(e.to_string()))?;
    std::fs::write(&cfg.config_path, encoded)?;
    Ok(())
}
