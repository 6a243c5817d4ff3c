use std::fmt::{Display, Formatter};
use std::path::Path;

use crate::session_state::SessionSnapshot;

#[derive(Debug)]
pub enum SessionStoreError {
    Io(std::io::Error),
    Decode(String),
    Encode(String),
}

impl Display for SessionStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(error) => write!(f, "io error: {error}"),
            Self::Decode(error) => write!(f, "failed to decode session: {error}"),
            Self::Encode(error) => write!(f, "failed to encode session: {error}"),
        }
    }
}

impl std::error::Error for SessionStoreError {}

impl From<std::io::Error> for SessionStoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Reads a saved session. A missing file is an empty session.
pub fn load(path: &Path) -> Result<SessionSnapshot, SessionStoreError> {
    Ok(load_if_present(path)?.unwrap_or_default())
}

/// Like [`load`], but `None` when nothing has been saved at `path` yet. The
/// reader accepts JSON5 so hand-edited files with comments still load.
pub fn load_if_present(path: &Path) -> Result<Option<SessionSnapshot>, SessionStoreError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(SessionStoreError::Io(error)),
    };

    if raw.trim().is_empty() {
        return Ok(Some(SessionSnapshot::default()));
    }
    json5::from_str::<SessionSnapshot>(&raw)
        .map(Some)
        .map_err(|e| SessionStoreError::Decode(e.to_string()))
}

/// Writes through a sibling temp file and a rename, so readers never see a
/// half-written session.
pub fn save(path: &Path, snapshot: &SessionSnapshot) -> Result<(), SessionStoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let encoded = serde_json::to_string_pretty(snapshot)
        .map_err(|e| SessionStoreError::Encode(e.to_string()))?;

    let staging = path.with_extension("json.tmp");
    std::fs::write(&staging, encoded)?;
    std::fs::rename(&staging, path)?;
    Ok(())
}
