use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::model::{normalize_for_match, Catalog, CatalogEntry};
use crate::steam_api::{CatalogSource, FetchError};

/// Typeahead queries shorter than this never reach the catalog scan.
pub const MIN_FILTER_CHARS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    InProgress,
    Fetch(FetchError),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "catalog load already in progress"),
            Self::Fetch(error) => write!(f, "catalog load failed: {error}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<FetchError> for LoadError {
    fn from(value: FetchError) -> Self {
        Self::Fetch(value)
    }
}

/// Holds the published catalog. Readers clone the `Arc` and never observe a
/// catalog that is still being built; a reload swaps in a new object.
#[derive(Default)]
pub struct CatalogStore {
    current: RwLock<Arc<Catalog>>,
    loading: AtomicBool,
}

struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        let store = Self::new();
        store.install(catalog);
        store
    }

    pub fn snapshot(&self) -> Arc<Catalog> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Publishes `catalog` as the current one and returns its entry count.
    pub fn install(&self, catalog: Catalog) -> usize {
        let published = Arc::new(catalog);
        let count = published.len();
        match self.current.write() {
            Ok(mut guard) => *guard = published,
            Err(poisoned) => *poisoned.into_inner() = published,
        }
        count
    }

    /// Fetches the full catalog and installs it. On failure the previously
    /// installed catalog stays in place.
    pub fn load(
        &self,
        source: &dyn CatalogSource,
        timeout: Duration,
    ) -> Result<Arc<Catalog>, LoadError> {
        if self
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(LoadError::InProgress);
        }
        let _guard = LoadingGuard(&self.loading);

        let catalog = source.fetch_catalog(timeout)?;
        self.install(catalog);
        Ok(self.snapshot())
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub fn is_loaded(&self) -> bool {
        !self.snapshot().is_empty()
    }

    pub fn entry_by_id(&self, id: u64) -> Option<CatalogEntry> {
        self.snapshot().entry_by_id(id).cloned()
    }

    pub fn resolve(&self, query: &str) -> Option<CatalogEntry> {
        resolve_in(&self.snapshot(), query).cloned()
    }

    pub fn filter(&self, query: &str, limit: usize) -> Vec<CatalogEntry> {
        filter_in(&self.snapshot(), query, 0, limit).0
    }

    /// Returns page `page` (zero based) of the filtered matches and whether a
    /// further page exists.
    pub fn filter_page(
        &self,
        query: &str,
        page: usize,
        page_size: usize,
    ) -> (Vec<CatalogEntry>, bool) {
        filter_in(&self.snapshot(), query, page.saturating_mul(page_size), page_size)
    }
}

/// Exact case-insensitive name match first, then the first name containing
/// the query. Both tiers break ties by catalog order.
pub fn resolve_in<'a>(catalog: &'a Catalog, query: &str) -> Option<&'a CatalogEntry> {
    let needle = normalize_for_match(query.trim());
    if needle.is_empty() || catalog.is_empty() {
        return None;
    }

    let entries = catalog.entries();
    entries
        .iter()
        .find(|entry| entry.normalized_name() == needle)
        .or_else(|| {
            entries
                .iter()
                .find(|entry| entry.normalized_name().contains(&needle))
        })
}

fn filter_in(
    catalog: &Catalog,
    query: &str,
    skip: usize,
    limit: usize,
) -> (Vec<CatalogEntry>, bool) {
    if limit == 0 || query.trim().is_empty() || query.chars().count() < MIN_FILTER_CHARS {
        return (Vec::new(), false);
    }

    let needle = normalize_for_match(query);
    let mut matches = catalog
        .entries()
        .iter()
        .filter(|entry| entry.normalized_name().contains(&needle))
        .skip(skip);

    let page: Vec<CatalogEntry> = matches.by_ref().take(limit).cloned().collect();
    let has_more = matches.next().is_some();
    (page, has_more)
}
