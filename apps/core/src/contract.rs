use serde::{Deserialize, Serialize};

use crate::count_fetcher::TimeoutClass;
use crate::model::{CatalogEntry, CountResult};
use crate::query_engine::SuggestionPage;
use crate::refresh_scheduler::SchedulerState;
use crate::session_state::SessionSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadCatalogRequest {
    #[serde(default)]
    pub allow_cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterRequest {
    pub text: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuggestRequest {
    pub text: String,
    pub page: Option<usize>,
    /// Keystroke sequence number. When set, a response for an id older than
    /// the newest one seen comes back marked `stale` with no results.
    #[serde(default)]
    pub request_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolveRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchCountRequest {
    pub id: u64,
    pub timeout_class: TimeoutClass,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigureRefreshRequest {
    pub seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntryDto {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogLoadResponse {
    pub entries: usize,
    pub from_cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterResponse {
    pub results: Vec<CatalogEntryDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuggestResponse {
    pub results: Vec<CatalogEntryDto>,
    pub page: usize,
    pub has_next_page: bool,
    pub below_threshold: bool,
    #[serde(default)]
    pub request_id: Option<u64>,
    #[serde(default)]
    pub stale: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolveResponse {
    pub entry: CatalogEntryDto,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FavoriteResponse {
    pub is_favorite: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchRecordedResponse {
    pub recorded: bool,
    pub history: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshResponse {
    pub running: bool,
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "payload")]
pub enum CoreRequest {
    LoadCatalog(LoadCatalogRequest),
    Filter(FilterRequest),
    Suggest(SuggestRequest),
    Resolve(ResolveRequest),
    FetchCount(FetchCountRequest),
    ToggleFavorite(NameRequest),
    RecordSearch(NameRequest),
    ConfigureRefresh(ConfigureRefreshRequest),
    Snapshot,
    Restore(SessionSnapshot),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "payload")]
pub enum CoreResponse {
    LoadCatalog(CatalogLoadResponse),
    Filter(FilterResponse),
    Suggest(SuggestResponse),
    Resolve(ResolveResponse),
    FetchCount(CountResult),
    ToggleFavorite(FavoriteResponse),
    RecordSearch(SearchRecordedResponse),
    ConfigureRefresh(RefreshResponse),
    Snapshot(SessionSnapshot),
    Restore(RefreshResponse),
}

impl From<CatalogEntry> for CatalogEntryDto {
    fn from(value: CatalogEntry) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

impl From<SuggestionPage> for SuggestResponse {
    fn from(value: SuggestionPage) -> Self {
        Self {
            results: value.entries.into_iter().map(CatalogEntryDto::from).collect(),
            page: value.page,
            has_next_page: value.has_next_page,
            below_threshold: !value.searched,
            request_id: None,
            stale: false,
        }
    }
}

impl SuggestResponse {
    pub fn stale(request_id: u64, page: usize) -> Self {
        Self {
            results: Vec::new(),
            page,
            has_next_page: false,
            below_threshold: false,
            request_id: Some(request_id),
            stale: true,
        }
    }
}

impl From<SchedulerState> for RefreshResponse {
    fn from(value: SchedulerState) -> Self {
        match value {
            SchedulerState::Stopped => Self {
                running: false,
                interval_secs: 0,
            },
            SchedulerState::Running(interval_secs) => Self {
                running: true,
                interval_secs,
            },
        }
    }
}
