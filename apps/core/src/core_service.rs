use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::catalog_store::{CatalogStore, LoadError};
use crate::config::{validate, Config};
use crate::contract::{
    CatalogEntryDto, CatalogLoadResponse, CoreRequest, CoreResponse, FavoriteResponse,
    FilterResponse, RefreshResponse, ResolveResponse, SearchRecordedResponse, SuggestResponse,
};
use crate::count_fetcher::{CountFetcher, TimeoutClass};
use crate::index_store::{self, StoreError};
use crate::logging;
use crate::settings::refresh_interval_label;
use crate::model::{CatalogEntry, CountResult};
use crate::query_engine::{LookupError, QueryEngine, SuggestionBoard, SuggestionPage};
use crate::refresh_scheduler::{RefreshScheduler, SchedulerState, TickOutcome};
use crate::session_state::{SessionSnapshot, SessionState};
use crate::session_store::{self, SessionStoreError};
use crate::steam_api::{CatalogSource, CountSource, FetchError, SteamApi};
use crate::worker_pool::WorkerPool;

#[derive(Debug)]
pub enum ServiceError {
    Config(String),
    Store(StoreError),
    Session(SessionStoreError),
    Fetch(FetchError),
    Lookup(LookupError),
    LoadInProgress,
    CatalogUnavailable,
    UnknownEntry(u64),
    InvalidRequest(String),
}

impl ServiceError {
    /// Short text for the status line of whatever renders the result.
    pub fn status_message(&self) -> String {
        match self {
            Self::Config(error) => format!("Settings error: {error}"),
            Self::Store(_) => "Game cache is unavailable".to_string(),
            Self::Session(_) => "Could not read or write saved session".to_string(),
            Self::Fetch(error) => error.status_message(),
            Self::Lookup(error) => error.status_message(),
            Self::LoadInProgress => "Game list is already loading...".to_string(),
            Self::CatalogUnavailable => {
                "Game database not loaded yet. Please wait.".to_string()
            }
            Self::UnknownEntry(id) => format!("App {id} is not in the game database"),
            Self::InvalidRequest(message) => message.clone(),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(error) => write!(f, "config error: {error}"),
            Self::Store(error) => write!(f, "store error: {error}"),
            Self::Session(error) => write!(f, "session error: {error}"),
            Self::Fetch(error) => write!(f, "fetch error: {error}"),
            Self::Lookup(error) => write!(f, "lookup error: {error}"),
            Self::LoadInProgress => write!(f, "catalog load already in progress"),
            Self::CatalogUnavailable => write!(f, "catalog not loaded"),
            Self::UnknownEntry(id) => write!(f, "appid not in catalog: {id}"),
            Self::InvalidRequest(message) => write!(f, "invalid request: {message}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<SessionStoreError> for ServiceError {
    fn from(value: SessionStoreError) -> Self {
        Self::Session(value)
    }
}

impl From<FetchError> for ServiceError {
    fn from(value: FetchError) -> Self {
        Self::Fetch(value)
    }
}

impl From<LookupError> for ServiceError {
    fn from(value: LookupError) -> Self {
        Self::Lookup(value)
    }
}

impl From<LoadError> for ServiceError {
    fn from(value: LoadError) -> Self {
        match value {
            LoadError::InProgress => Self::LoadInProgress,
            LoadError::Fetch(error) => Self::Fetch(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogOrigin {
    Network,
    Cache,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogLoad {
    pub origin: CatalogOrigin,
    pub entries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub entry: CatalogEntry,
    pub result: CountResult,
    pub is_favorite: bool,
}

/// The renderer-facing engine: catalog, lookup, counts, session and the
/// refresh schedule wired together.
pub struct CoreService {
    config: Config,
    catalog: Arc<CatalogStore>,
    catalog_source: Arc<dyn CatalogSource>,
    fetcher: Arc<CountFetcher>,
    query: QueryEngine,
    suggestions: SuggestionBoard,
    session: Arc<SessionState>,
    scheduler: RefreshScheduler,
    pool: WorkerPool,
    cache_db: Option<Mutex<Connection>>,
}

impl CoreService {
    pub fn new(config: Config) -> Result<Self, ServiceError> {
        validate(&config).map_err(ServiceError::Config)?;
        let api = Arc::new(SteamApi::from_config(&config));
        let cache_db = index_store::open_from_config(&config)?;
        Self::with_sources(config, api.clone(), api, Some(cache_db))
    }

    pub fn with_sources(
        config: Config,
        catalog_source: Arc<dyn CatalogSource>,
        count_source: Arc<dyn CountSource>,
        cache_db: Option<Connection>,
    ) -> Result<Self, ServiceError> {
        validate(&config).map_err(ServiceError::Config)?;

        let catalog = Arc::new(CatalogStore::new());
        let fetcher = Arc::new(CountFetcher::from_config(count_source, &config));
        let session = Arc::new(SessionState::new(
            config.history_limit,
            config.history_display_limit,
        ));
        let scheduler = RefreshScheduler::new(
            Arc::clone(&catalog),
            Arc::clone(&fetcher),
            Arc::clone(&session),
        );
        let query = QueryEngine::new(Arc::clone(&catalog), config.suggestion_page_size);
        let pool = WorkerPool::new(config.worker_threads);

        // Configured interval applies until a saved session says otherwise.
        session
            .set_refresh_interval(config.refresh_interval_secs)
            .map_err(ServiceError::Config)?;
        if config.refresh_interval_secs > 0 {
            scheduler.configure(config.refresh_interval_secs);
        }

        Ok(Self {
            config,
            catalog,
            catalog_source,
            fetcher,
            query,
            suggestions: SuggestionBoard::new(),
            session,
            scheduler,
            pool,
            cache_db: cache_db.map(Mutex::new),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn catalog_len(&self) -> usize {
        self.catalog.snapshot().len()
    }

    /// Loads the catalog from the network and installs it. The previous
    /// catalog, if any, stays available when this fails.
    pub fn load_catalog(&self) -> Result<usize, ServiceError> {
        let catalog = self
            .catalog
            .load(self.catalog_source.as_ref(), self.config.catalog_timeout())?;
        let entries = catalog.len();
        logging::info(&format!(
            "catalog loaded source={} entries={entries}",
            self.catalog_source.source_name()
        ));

        self.fetcher.retain_cached(|id| catalog.contains_id(id));
        if let Err(error) = self.write_cache(&catalog) {
            logging::warn(&format!("catalog cache write failed: {error}"));
        }
        Ok(entries)
    }

    /// Network first; on a fetch failure falls back to the last cached
    /// catalog. Without a cache the fetch error is returned.
    pub fn load_catalog_with_fallback(&self) -> Result<CatalogLoad, ServiceError> {
        let fetch_error = match self.load_catalog() {
            Ok(entries) => {
                return Ok(CatalogLoad {
                    origin: CatalogOrigin::Network,
                    entries,
                })
            }
            Err(ServiceError::Fetch(error)) => error,
            Err(other) => return Err(other),
        };

        logging::warn(&format!("catalog fetch failed, trying cache: {fetch_error}"));
        let cached = match self.read_cache() {
            Ok(cached) => cached,
            Err(error) => {
                logging::warn(&format!("catalog cache read failed: {error}"));
                None
            }
        };

        match cached {
            Some(catalog) => {
                let entries = self.catalog.install(catalog);
                logging::info(&format!("catalog restored from cache entries={entries}"));
                Ok(CatalogLoad {
                    origin: CatalogOrigin::Cache,
                    entries,
                })
            }
            None => Err(ServiceError::Fetch(fetch_error)),
        }
    }

    fn write_cache(&self, catalog: &crate::model::Catalog) -> Result<(), StoreError> {
        let Some(db) = self.cache_db.as_ref() else {
            return Ok(());
        };
        let mut conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        index_store::replace_catalog(&mut conn, catalog)?;
        Ok(())
    }

    fn read_cache(&self) -> Result<Option<crate::model::Catalog>, StoreError> {
        let Some(db) = self.cache_db.as_ref() else {
            return Ok(None);
        };
        let conn = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        index_store::load_catalog(&conn)
    }

    pub fn suggestions(&self, text: &str) -> Vec<CatalogEntry> {
        self.query.on_text_changed(text)
    }

    pub fn suggestion_page(&self, text: &str, page: usize) -> SuggestionPage {
        self.query.suggestion_page(text, page)
    }

    /// Suggestions for keystroke `request_id`. `None` when a newer keystroke
    /// was seen before this one finished, so its result must not be shown.
    pub fn suggest_tracked(
        &self,
        text: &str,
        page: usize,
        request_id: u64,
    ) -> Option<SuggestionPage> {
        self.suggestions.observe(request_id);
        let result = self.query.suggestion_page(text, page);
        self.suggestions
            .publish(request_id, result.clone())
            .then_some(result)
    }

    pub fn visible_suggestions(&self) -> Option<SuggestionPage> {
        self.suggestions.visible()
    }

    /// At most `limit` entries in catalog order.
    pub fn filter(&self, text: &str, limit: usize) -> Vec<CatalogEntry> {
        self.catalog.filter(text, limit)
    }

    pub fn resolve(&self, text: &str) -> Result<CatalogEntry, ServiceError> {
        Ok(self.query.on_submit(text)?)
    }

    pub fn fetch_count(&self, entry_id: u64, class: TimeoutClass) -> Result<CountResult, ServiceError> {
        fetch_known(&self.catalog, &self.fetcher, entry_id, class)
    }

    /// Runs the fetch on the worker pool and hands the outcome to `on_done`
    /// on that worker thread.
    pub fn fetch_count_async<F>(
        &self,
        entry_id: u64,
        class: TimeoutClass,
        on_done: F,
    ) -> Result<(), ServiceError>
    where
        F: FnOnce(Result<CountResult, ServiceError>) + Send + 'static,
    {
        let catalog = Arc::clone(&self.catalog);
        let fetcher = Arc::clone(&self.fetcher);
        self.pool
            .submit(move || on_done(fetch_known(&catalog, &fetcher, entry_id, class)))
            .map_err(|error| ServiceError::InvalidRequest(error.to_string()))
    }

    pub fn cached_count(&self, entry_id: u64) -> Option<CountResult> {
        self.fetcher.cached(entry_id)
    }

    /// Interactive lookup: record the search, resolve the name, fetch its
    /// count and remember it as the last result.
    pub fn submit(&self, text: &str) -> Result<SubmitOutcome, ServiceError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(LookupError::EmptyQuery.into());
        }
        if !self.catalog.is_loaded() {
            return Err(ServiceError::CatalogUnavailable);
        }

        self.session.record_search(trimmed);
        let entry = self.query.on_submit(trimmed)?;
        let result = self.fetch_count(entry.id, TimeoutClass::Interactive)?;
        self.session.record_result(&entry.name, result);

        Ok(SubmitOutcome {
            is_favorite: self.session.is_favorite(&entry.name),
            entry,
            result,
        })
    }

    pub fn record_search(&self, name: &str) -> bool {
        self.session.record_search(name)
    }

    pub fn toggle_favorite(&self, name: &str) -> Result<bool, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "favorite name is required".to_string(),
            ));
        }
        Ok(self.session.toggle_favorite(name))
    }

    pub fn configure_refresh(&self, interval_secs: u64) -> Result<SchedulerState, ServiceError> {
        self.session
            .set_refresh_interval(interval_secs)
            .map_err(ServiceError::Config)?;
        Ok(self.scheduler.configure(interval_secs))
    }

    pub fn refresh_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn refresh_favorites_now(&self) -> TickOutcome {
        self.scheduler.tick_now()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Replaces the session wholesale and re-arms the refresh timer with the
    /// restored interval.
    pub fn restore(&self, snapshot: SessionSnapshot) -> Result<SchedulerState, ServiceError> {
        let interval = snapshot.refresh_interval_secs;
        self.session.restore(snapshot).map_err(ServiceError::Config)?;
        Ok(self.scheduler.configure(interval))
    }

    /// Restores the saved session. Without one, the configured refresh
    /// interval stays in effect.
    pub fn load_session(&self) -> Result<SchedulerState, ServiceError> {
        match session_store::load_if_present(&self.config.session_path)? {
            Some(snapshot) => self.restore(snapshot),
            None => {
                logging::info(&format!(
                    "no saved session at {}; auto refresh {}",
                    self.config.session_path.display(),
                    refresh_interval_label(self.config.refresh_interval_secs)
                ));
                Ok(self.scheduler.state())
            }
        }
    }

    pub fn save_session(&self) -> Result<(), ServiceError> {
        session_store::save(&self.config.session_path, &self.snapshot())?;
        Ok(())
    }

    pub fn handle_command(&self, request: CoreRequest) -> Result<CoreResponse, ServiceError> {
        match request {
            CoreRequest::LoadCatalog(payload) => {
                let load = if payload.allow_cache {
                    self.load_catalog_with_fallback()?
                } else {
                    CatalogLoad {
                        origin: CatalogOrigin::Network,
                        entries: self.load_catalog()?,
                    }
                };
                Ok(CoreResponse::LoadCatalog(CatalogLoadResponse {
                    entries: load.entries,
                    from_cache: load.origin == CatalogOrigin::Cache,
                }))
            }
            CoreRequest::Filter(payload) => {
                let limit = payload.limit.unwrap_or(self.config.suggestion_page_size);
                let results = self.filter(&payload.text, limit);
                Ok(CoreResponse::Filter(FilterResponse {
                    results: results.into_iter().map(CatalogEntryDto::from).collect(),
                }))
            }
            CoreRequest::Suggest(payload) => {
                let page_index = payload.page.unwrap_or(0);
                let Some(request_id) = payload.request_id else {
                    let page = self.suggestion_page(&payload.text, page_index);
                    return Ok(CoreResponse::Suggest(SuggestResponse::from(page)));
                };
                let response = match self.suggest_tracked(&payload.text, page_index, request_id) {
                    Some(page) => SuggestResponse {
                        request_id: Some(request_id),
                        ..SuggestResponse::from(page)
                    },
                    None => SuggestResponse::stale(request_id, page_index),
                };
                Ok(CoreResponse::Suggest(response))
            }
            CoreRequest::Resolve(payload) => {
                let entry = self.resolve(&payload.text)?;
                Ok(CoreResponse::Resolve(ResolveResponse {
                    entry: entry.into(),
                }))
            }
            CoreRequest::FetchCount(payload) => {
                let result = self.fetch_count(payload.id, payload.timeout_class)?;
                Ok(CoreResponse::FetchCount(result))
            }
            CoreRequest::ToggleFavorite(payload) => {
                let is_favorite = self.toggle_favorite(&payload.name)?;
                Ok(CoreResponse::ToggleFavorite(FavoriteResponse { is_favorite }))
            }
            CoreRequest::RecordSearch(payload) => {
                let recorded = self.record_search(&payload.name);
                Ok(CoreResponse::RecordSearch(SearchRecordedResponse {
                    recorded,
                    history: self.session.history(),
                }))
            }
            CoreRequest::ConfigureRefresh(payload) => {
                let state = self.configure_refresh(payload.seconds)?;
                Ok(CoreResponse::ConfigureRefresh(RefreshResponse::from(state)))
            }
            CoreRequest::Snapshot => Ok(CoreResponse::Snapshot(self.snapshot())),
            CoreRequest::Restore(snapshot) => {
                let state = self.restore(snapshot)?;
                Ok(CoreResponse::Restore(RefreshResponse::from(state)))
            }
        }
    }
}

/// Only ids present in the current catalog are fetched, so every cached
/// result belongs to a known entry.
fn fetch_known(
    catalog: &CatalogStore,
    fetcher: &CountFetcher,
    entry_id: u64,
    class: TimeoutClass,
) -> Result<CountResult, ServiceError> {
    let Some(entry) = catalog.entry_by_id(entry_id) else {
        return Err(ServiceError::UnknownEntry(entry_id));
    };
    fetcher.fetch_count_for(entry_id, class).map_err(|error| {
        logging::warn(&format!(
            "count fetch for '{}' (appid {entry_id}) failed: {error}",
            entry.name
        ));
        ServiceError::from(error)
    })
}
