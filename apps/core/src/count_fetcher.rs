use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::model::CountResult;
use crate::steam_api::{CountSource, FetchError};

/// Interactive lookups wait longer than background refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutClass {
    Interactive,
    Background,
}

pub struct CountFetcher {
    source: Arc<dyn CountSource>,
    interactive_timeout: Duration,
    background_timeout: Duration,
    cache: Mutex<HashMap<u64, CountResult>>,
}

impl CountFetcher {
    pub fn new(
        source: Arc<dyn CountSource>,
        interactive_timeout: Duration,
        background_timeout: Duration,
    ) -> Self {
        Self {
            source,
            interactive_timeout,
            background_timeout,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(source: Arc<dyn CountSource>, cfg: &Config) -> Self {
        Self::new(source, cfg.interactive_timeout(), cfg.background_timeout())
    }

    pub fn timeout_for(&self, class: TimeoutClass) -> Duration {
        match class {
            TimeoutClass::Interactive => self.interactive_timeout,
            TimeoutClass::Background => self.background_timeout,
        }
    }

    /// One request, no retry. Successful observations replace the cached one.
    pub fn fetch_count(&self, entry_id: u64, timeout: Duration) -> Result<CountResult, FetchError> {
        let result = self.source.fetch_count(entry_id, timeout)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(entry_id, result);
        }
        Ok(result)
    }

    pub fn fetch_count_for(
        &self,
        entry_id: u64,
        class: TimeoutClass,
    ) -> Result<CountResult, FetchError> {
        self.fetch_count(entry_id, self.timeout_for(class))
    }

    pub fn cached(&self, entry_id: u64) -> Option<CountResult> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(&entry_id).copied())
    }

    /// Drops cached results whose id fails `keep`, used after a catalog swap.
    pub fn retain_cached<F>(&self, mut keep: F)
    where
        F: FnMut(u64) -> bool,
    {
        if let Ok(mut cache) = self.cache.lock() {
            cache.retain(|id, _| keep(*id));
        }
    }
}
