use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: u64,
    pub name: String,
    normalized_name: String,
}

impl CatalogEntry {
    pub fn new(id: u64, name: &str) -> Self {
        Self::from_owned(id, name.to_string())
    }

    pub fn from_owned(id: u64, name: String) -> Self {
        let normalized_name = normalize_for_match(&name);
        Self {
            id,
            name,
            normalized_name,
        }
    }

    pub fn normalized_name(&self) -> &str {
        &self.normalized_name
    }
}

/// Immutable, ordered set of entries. Replaced wholesale on reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    /// First position of each id in `entries`.
    by_id: HashMap<u64, usize>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let mut by_id = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            by_id.entry(entry.id).or_insert(position);
        }
        Self { entries, by_id }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_id(&self, id: u64) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn entry_by_id(&self, id: u64) -> Option<&CatalogEntry> {
        self.by_id
            .get(&id)
            .and_then(|position| self.entries.get(*position))
    }
}

/// Last known observation for one id. `count == None` means the service had
/// no value for the app, which is not the same as a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountResult {
    pub entry_id: u64,
    pub count: Option<u64>,
    pub fetched_at_epoch_secs: i64,
}

pub fn normalize_for_match(input: &str) -> String {
    input.to_lowercase()
}
