use std::fmt::{Display, Formatter};
use std::path::Path;

use rusqlite::{params, Connection};

use crate::config::Config;
use crate::model::{Catalog, CatalogEntry};

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(error) => write!(f, "sqlite error: {error}"),
            Self::Io(error) => write!(f, "io error: {error}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS catalog_entry (
    position INTEGER PRIMARY KEY,
    appid INTEGER NOT NULL,
    name TEXT NOT NULL
)";

pub fn open_memory() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    conn.execute(SCHEMA, [])?;
    Ok(conn)
}

pub fn open_file(path: &Path) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.execute(SCHEMA, [])?;
    Ok(conn)
}

pub fn open_from_config(cfg: &Config) -> Result<Connection, StoreError> {
    open_file(&cfg.catalog_cache_path)
}

/// Replaces the cached catalog in one transaction, so a crash mid-write
/// leaves the previous cache intact.
pub fn replace_catalog(db: &mut Connection, catalog: &Catalog) -> Result<usize, StoreError> {
    let tx = db.transaction()?;
    tx.execute("DELETE FROM catalog_entry", [])?;
    {
        let mut stmt =
            tx.prepare("INSERT INTO catalog_entry (position, appid, name) VALUES (?1, ?2, ?3)")?;
        for (position, entry) in catalog.entries().iter().enumerate() {
            stmt.execute(params![position as i64, entry.id as i64, entry.name])?;
        }
    }
    tx.commit()?;
    Ok(catalog.len())
}

/// Returns the cached catalog in its original order, or `None` if nothing
/// has been cached yet.
pub fn load_catalog(db: &Connection) -> Result<Option<Catalog>, StoreError> {
    let mut stmt = db.prepare("SELECT appid, name FROM catalog_entry ORDER BY position")?;
    let entries = stmt
        .query_map([], |row| {
            let id: i64 = row.get(0)?;
            let name: String = row.get(1)?;
            Ok(CatalogEntry::from_owned(id as u64, name))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    if entries.is_empty() {
        return Ok(None);
    }
    Ok(Some(Catalog::new(entries)))
}

pub fn cached_entry_count(db: &Connection) -> Result<usize, StoreError> {
    let count: i64 = db.query_row("SELECT COUNT(*) FROM catalog_entry", [], |row| row.get(0))?;
    Ok(count as usize)
}
