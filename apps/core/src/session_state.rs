use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::model::CountResult;
use crate::settings::validate_refresh_interval;

pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const DEFAULT_HISTORY_DISPLAY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshConfig {
    pub interval_secs: u64,
}

impl RefreshConfig {
    pub fn is_enabled(&self) -> bool {
        self.interval_secs > 0
    }
}

/// Persisted shape of a session. Field names match the settings file the
/// desktop app has always written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSnapshot {
    pub favorites: Vec<String>,
    #[serde(rename = "search_history")]
    pub history: Vec<String>,
    #[serde(rename = "auto_refresh")]
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastResult {
    pub name: String,
    pub result: CountResult,
}

#[derive(Debug, Default)]
struct SessionData {
    favorites: BTreeSet<String>,
    history: Vec<String>,
    refresh: RefreshConfig,
    last_result: Option<LastResult>,
    favorite_counts: BTreeMap<String, CountResult>,
}

/// Favorites, history and refresh config behind a single lock. All writes go
/// through these methods; readers get copies.
pub struct SessionState {
    data: RwLock<SessionData>,
    history_limit: usize,
    history_display_limit: usize,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT, DEFAULT_HISTORY_DISPLAY_LIMIT)
    }
}

impl SessionState {
    pub fn new(history_limit: usize, history_display_limit: usize) -> Self {
        let history_limit = history_limit.max(1);
        Self {
            data: RwLock::new(SessionData::default()),
            history_limit,
            history_display_limit: history_display_limit.clamp(1, history_limit),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionData> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionData> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Appends `name` unless it is already present. Repeats keep their
    /// original position. Returns whether the list changed.
    pub fn record_search(&self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }

        let mut data = self.write();
        if data.history.iter().any(|existing| existing == name) {
            return false;
        }
        data.history.push(name.to_string());
        let overflow = data.history.len().saturating_sub(self.history_limit);
        if overflow > 0 {
            data.history.drain(..overflow);
        }
        true
    }

    pub fn toggle_favorite(&self, name: &str) -> bool {
        let mut data = self.write();
        if data.favorites.remove(name) {
            data.favorite_counts.remove(name);
            false
        } else {
            data.favorites.insert(name.to_string());
            true
        }
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        self.read().favorites.contains(name)
    }

    pub fn favorites_sorted(&self) -> Vec<String> {
        self.read().favorites.iter().cloned().collect()
    }

    pub fn has_favorites(&self) -> bool {
        !self.read().favorites.is_empty()
    }

    /// Oldest first, as stored.
    pub fn history(&self) -> Vec<String> {
        self.read().history.clone()
    }

    /// Newest first, limited to the display bound.
    pub fn recent_history(&self) -> Vec<String> {
        self.read()
            .history
            .iter()
            .rev()
            .take(self.history_display_limit)
            .cloned()
            .collect()
    }

    pub fn refresh_config(&self) -> RefreshConfig {
        self.read().refresh
    }

    pub fn set_refresh_interval(&self, interval_secs: u64) -> Result<RefreshConfig, String> {
        validate_refresh_interval(interval_secs)?;
        let mut data = self.write();
        data.refresh = RefreshConfig { interval_secs };
        Ok(data.refresh)
    }

    pub fn record_result(&self, name: &str, result: CountResult) {
        let mut data = self.write();
        if data.favorites.contains(name) {
            data.favorite_counts.insert(name.to_string(), result);
        }
        data.last_result = Some(LastResult {
            name: name.to_string(),
            result,
        });
    }

    /// Stores a background refresh observation. Ignored when the favorite was
    /// removed while the fetch was in flight.
    pub fn record_favorite_count(&self, name: &str, result: CountResult) -> bool {
        let mut data = self.write();
        if !data.favorites.contains(name) {
            return false;
        }
        data.favorite_counts.insert(name.to_string(), result);
        true
    }

    pub fn last_result(&self) -> Option<LastResult> {
        self.read().last_result.clone()
    }

    pub fn favorite_counts(&self) -> BTreeMap<String, CountResult> {
        self.read().favorite_counts.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let data = self.read();
        let skip = data.history.len().saturating_sub(self.history_limit);
        SessionSnapshot {
            favorites: data.favorites.iter().cloned().collect(),
            history: data.history[skip..].to_vec(),
            refresh_interval_secs: data.refresh.interval_secs,
        }
    }

    /// Replaces favorites, history and refresh config in one step. An invalid
    /// snapshot is rejected before anything changes.
    pub fn restore(&self, snapshot: SessionSnapshot) -> Result<(), String> {
        validate_refresh_interval(snapshot.refresh_interval_secs)?;

        let favorites: BTreeSet<String> = snapshot
            .favorites
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        let mut history: Vec<String> = Vec::with_capacity(snapshot.history.len());
        for name in snapshot.history {
            let name = name.trim();
            if !name.is_empty() && !history.iter().any(|existing| existing == name) {
                history.push(name.to_string());
            }
        }
        let overflow = history.len().saturating_sub(self.history_limit);
        history.drain(..overflow);

        let mut data = self.write();
        *data = SessionData {
            favorites,
            history,
            refresh: RefreshConfig {
                interval_secs: snapshot.refresh_interval_secs,
            },
            last_result: None,
            favorite_counts: BTreeMap::new(),
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SessionState;

    #[test]
    fn blank_names_are_not_recorded() {
        let state = SessionState::default();
        assert!(!state.record_search("   "));
        assert!(state.history().is_empty());
    }

    #[test]
    fn recent_history_is_newest_first_and_bounded() {
        let state = SessionState::new(20, 3);
        for name in ["A", "B", "C", "D"] {
            state.record_search(name);
        }
        assert_eq!(state.recent_history(), vec!["D", "C", "B"]);
    }
}
