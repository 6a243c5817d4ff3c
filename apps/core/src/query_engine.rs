use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::catalog_store::{CatalogStore, MIN_FILTER_CHARS};
use crate::model::CatalogEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    EmptyQuery,
    NotFound(String),
}

impl LookupError {
    pub fn status_message(&self) -> String {
        match self {
            Self::EmptyQuery => "Please enter a game name".to_string(),
            Self::NotFound(name) => format!("Game '{name}' not found in database"),
        }
    }
}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyQuery => write!(f, "empty query"),
            Self::NotFound(name) => write!(f, "no catalog entry matches '{name}'"),
        }
    }
}

impl std::error::Error for LookupError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionPage {
    pub query: String,
    pub entries: Vec<CatalogEntry>,
    pub page: usize,
    pub has_next_page: bool,
    /// False when the query is under the typeahead threshold, which is not
    /// the same as a query that matched nothing.
    pub searched: bool,
}

impl SuggestionPage {
    fn below_threshold(query: &str, page: usize) -> Self {
        Self {
            query: query.to_string(),
            entries: Vec::new(),
            page,
            has_next_page: false,
            searched: false,
        }
    }
}

pub struct QueryEngine {
    catalog: Arc<CatalogStore>,
    page_size: usize,
}

impl QueryEngine {
    pub fn new(catalog: Arc<CatalogStore>, page_size: usize) -> Self {
        Self {
            catalog,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn on_text_changed(&self, text: &str) -> Vec<CatalogEntry> {
        self.suggestion_page(text, 0).entries
    }

    pub fn suggestion_page(&self, text: &str, page: usize) -> SuggestionPage {
        if !meets_threshold(text) {
            return SuggestionPage::below_threshold(text, page);
        }

        let (entries, has_next_page) = self.catalog.filter_page(text, page, self.page_size);
        SuggestionPage {
            query: text.to_string(),
            entries,
            page,
            has_next_page,
            searched: true,
        }
    }

    /// Pure resolution; recording the search in history is the caller's step.
    pub fn on_submit(&self, text: &str) -> Result<CatalogEntry, LookupError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(LookupError::EmptyQuery);
        }

        self.catalog
            .resolve(trimmed)
            .ok_or_else(|| LookupError::NotFound(trimmed.to_string()))
    }
}

fn meets_threshold(text: &str) -> bool {
    !text.trim().is_empty() && text.chars().count() >= MIN_FILTER_CHARS
}

/// Holds the suggestion list the renderer shows. Every keystroke takes a new
/// request id; only the newest id may publish, so a slow earlier result can
/// never replace a later one.
#[derive(Default)]
pub struct SuggestionBoard {
    latest_issued: AtomicU64,
    visible: Mutex<Option<(u64, SuggestionPage)>>,
}

impl SuggestionBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> u64 {
        self.latest_issued.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Records an id issued by the caller, for renderers that number their
    /// own keystrokes. Ids lower than one already seen are stale.
    pub fn observe(&self, request_id: u64) {
        self.latest_issued.fetch_max(request_id, Ordering::AcqRel);
    }

    pub fn latest_request_id(&self) -> u64 {
        self.latest_issued.load(Ordering::Acquire)
    }

    pub fn publish(&self, request_id: u64, page: SuggestionPage) -> bool {
        let Ok(mut visible) = self.visible.lock() else {
            return false;
        };
        if request_id != self.latest_request_id() {
            return false;
        }
        if visible
            .as_ref()
            .is_some_and(|(shown_id, _)| *shown_id > request_id)
        {
            return false;
        }
        *visible = Some((request_id, page));
        true
    }

    pub fn visible(&self) -> Option<SuggestionPage> {
        self.visible
            .lock()
            .ok()
            .and_then(|visible| visible.as_ref().map(|(_, page)| page.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::{meets_threshold, SuggestionBoard, SuggestionPage};

    fn page(query: &str) -> SuggestionPage {
        SuggestionPage {
            query: query.to_string(),
            entries: Vec::new(),
            page: 0,
            has_next_page: false,
            searched: true,
        }
    }

    #[test]
    fn threshold_counts_characters_not_bytes() {
        assert!(!meets_threshold("wi"));
        assert!(!meets_threshold("   "));
        assert!(meets_threshold("wit"));
        assert!(meets_threshold("äöü"));
    }

    #[test]
    fn stale_request_cannot_publish() {
        let board = SuggestionBoard::new();
        let first = board.begin();
        let second = board.begin();

        assert!(board.publish(second, page("witch")));
        assert!(!board.publish(first, page("wi")));
        assert_eq!(board.visible().map(|p| p.query), Some("witch".to_string()));
    }

    #[test]
    fn observed_ids_only_move_forward() {
        let board = SuggestionBoard::new();
        board.observe(7);
        board.observe(3);

        assert_eq!(board.latest_request_id(), 7);
        assert!(!board.publish(3, page("wi")));
        assert!(board.publish(7, page("witch")));
    }
}
