use std::fmt::{Display, Formatter};
use std::io::Read;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::config::Config;
use crate::model::{Catalog, CatalogEntry, CountResult};

const USER_AGENT: &str = "steamcount-core";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    NetworkFailure(String),
    Timeout,
    InvalidResponse(String),
}

impl FetchError {
    pub fn status_message(&self) -> String {
        match self {
            Self::NetworkFailure(detail) => format!("Network error: {}", shorten(detail, 40)),
            Self::Timeout => "Steam did not answer in time. Try again.".to_string(),
            Self::InvalidResponse(_) => "Invalid response from Steam API".to_string(),
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NetworkFailure(detail) => write!(f, "network failure: {detail}"),
            Self::Timeout => write!(f, "request timed out"),
            Self::InvalidResponse(detail) => write!(f, "invalid response: {detail}"),
        }
    }
}

impl std::error::Error for FetchError {}

pub trait CatalogSource: Send + Sync {
    fn source_name(&self) -> &'static str;
    fn fetch_catalog(&self, timeout: Duration) -> Result<Catalog, FetchError>;
}

/// Single-attempt count lookup. Retries belong to the caller.
pub trait CountSource: Send + Sync {
    fn fetch_count(&self, entry_id: u64, timeout: Duration) -> Result<CountResult, FetchError>;
}

pub struct SteamApi {
    agent: ureq::Agent,
    catalog_url: String,
    count_url: String,
}

impl SteamApi {
    pub fn new(catalog_url: &str, count_url: &str) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().user_agent(USER_AGENT).build(),
            catalog_url: catalog_url.to_string(),
            count_url: count_url.to_string(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(&cfg.catalog_url, &cfg.count_url)
    }

    fn get_body(&self, request: ureq::Request) -> Result<String, FetchError> {
        let response = request.call().map_err(map_ureq_error)?;
        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(map_io_error)?;
        Ok(body)
    }
}

impl CatalogSource for SteamApi {
    fn source_name(&self) -> &'static str {
        "steam-web-api"
    }

    fn fetch_catalog(&self, timeout: Duration) -> Result<Catalog, FetchError> {
        let request = self.agent.get(&self.catalog_url).timeout(timeout);
        let body = self.get_body(request)?;
        parse_catalog_body(&body)
    }
}

impl CountSource for SteamApi {
    fn fetch_count(&self, entry_id: u64, timeout: Duration) -> Result<CountResult, FetchError> {
        let request = self
            .agent
            .get(&self.count_url)
            .query("appid", &entry_id.to_string())
            .timeout(timeout);
        let body = self.get_body(request)?;
        parse_count_body(entry_id, &body, now_epoch_secs())
    }
}

/// Parses `{"applist":{"apps":[{"appid":..,"name":..}, ..]}}`. Entries
/// missing either field are skipped; a missing list is an invalid response.
pub fn parse_catalog_body(body: &str) -> Result<Catalog, FetchError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::InvalidResponse(format!("malformed catalog json: {e}")))?;
    let apps = value
        .get("applist")
        .and_then(|applist| applist.get("apps"))
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::InvalidResponse("missing applist.apps".to_string()))?;

    let entries = apps
        .iter()
        .filter_map(|app| {
            let id = app.get("appid").and_then(Value::as_u64)?;
            let name = app.get("name").and_then(Value::as_str)?;
            Some(CatalogEntry::new(id, name))
        })
        .collect();

    Ok(Catalog::new(entries))
}

/// Parses `{"response":{"player_count":N,"result":1}}`.
///
/// A `null` count, or a non-success `result` code without a count, is the
/// service saying it has no value. Anything else without a count is invalid.
pub fn parse_count_body(entry_id: u64, body: &str, now: i64) -> Result<CountResult, FetchError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::InvalidResponse(format!("malformed count json: {e}")))?;
    let response = value
        .get("response")
        .and_then(Value::as_object)
        .ok_or_else(|| FetchError::InvalidResponse("missing response object".to_string()))?;

    let count = match response.get("player_count") {
        Some(Value::Null) => None,
        Some(raw) => Some(raw.as_u64().ok_or_else(|| {
            FetchError::InvalidResponse(format!("player_count is not a count: {raw}"))
        })?),
        None => {
            let reports_no_data = response
                .get("result")
                .and_then(Value::as_i64)
                .is_some_and(|code| code != 1);
            if !reports_no_data {
                return Err(FetchError::InvalidResponse(
                    "missing player_count".to_string(),
                ));
            }
            None
        }
    };

    Ok(CountResult {
        entry_id,
        count,
        fetched_at_epoch_secs: now,
    })
}

fn map_ureq_error(error: ureq::Error) -> FetchError {
    match error {
        ureq::Error::Status(code, _) => FetchError::NetworkFailure(format!("http status {code}")),
        ureq::Error::Transport(transport) => {
            if is_timeout(&transport) || transport.to_string().contains("timed out") {
                FetchError::Timeout
            } else {
                FetchError::NetworkFailure(transport.to_string())
            }
        }
    }
}

fn map_io_error(error: std::io::Error) -> FetchError {
    if is_timeout(&error) {
        FetchError::Timeout
    } else {
        FetchError::NetworkFailure(format!("failed to read body: {error}"))
    }
}

fn is_timeout(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ) {
                return true;
            }
        }
        current = err.source();
    }
    false
}

fn shorten(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

pub(crate) fn now_epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
