use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

const LOG_FILE_NAME: &str = "steamcount.log";
const ARCHIVE_PREFIX: &str = "steamcount-";
const MAX_LOG_BYTES: u64 = 1_000_000;
const MAX_ARCHIVES: usize = 5;

static LOGGER: OnceLock<Logger> = OnceLock::new();
static PANIC_HOOK: Once = Once::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

struct ActiveFile {
    file: Option<File>,
    bytes: u64,
}

/// Appends to `<dir>/steamcount.log` and rolls it into a timestamped archive
/// once it passes `MAX_LOG_BYTES`, including in the middle of a long run.
struct Logger {
    dir: PathBuf,
    active: Mutex<ActiveFile>,
}

impl Logger {
    fn open(dir: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        let active = open_active(dir)?;
        let logger = Self {
            dir: dir.to_path_buf(),
            active: Mutex::new(active),
        };
        if logger.lock_active().bytes >= MAX_LOG_BYTES {
            logger.roll(&mut logger.lock_active())?;
        }
        Ok(logger)
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, ActiveFile> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self, level: Level, message: &str) {
        let line = format!("[{}] [{}] {message}\n", epoch_secs(), level.tag());
        let mut active = self.lock_active();
        if active.bytes + line.len() as u64 > MAX_LOG_BYTES && self.roll(&mut active).is_err() {
            return;
        }
        let Some(file) = active.file.as_mut() else {
            return;
        };
        if file.write_all(line.as_bytes()).is_ok() {
            let _ = file.flush();
            active.bytes += line.len() as u64;
        }
    }

    /// The handle is closed before the rename so the roll also works where
    /// open files cannot be renamed.
    fn roll(&self, active: &mut ActiveFile) -> std::io::Result<()> {
        drop(active.file.take());
        fs::rename(self.dir.join(LOG_FILE_NAME), archive_path(&self.dir))?;
        *active = open_active(&self.dir)?;
        prune_old_archives(&self.dir)
    }
}

fn open_active(dir: &Path) -> std::io::Result<ActiveFile> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE_NAME))?;
    let bytes = file.metadata()?.len();
    Ok(ActiveFile {
        file: Some(file),
        bytes,
    })
}

/// `steamcount-<secs>.log`, with a counter when a roll happens twice in one
/// second.
fn archive_path(dir: &Path) -> PathBuf {
    let stamp = epoch_secs();
    let mut candidate = dir.join(format!("{ARCHIVE_PREFIX}{stamp}.log"));
    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{ARCHIVE_PREFIX}{stamp}-{counter}.log"));
        counter += 1;
    }
    candidate
}

fn is_archive(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(ARCHIVE_PREFIX) && name.ends_with(".log"))
}

fn prune_old_archives(dir: &Path) -> std::io::Result<()> {
    let mut archives: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| is_archive(path))
        .collect();
    if archives.len() <= MAX_ARCHIVES {
        return Ok(());
    }

    archives.sort();
    let excess = archives.len() - MAX_ARCHIVES;
    for stale in &archives[..excess] {
        let _ = fs::remove_file(stale);
    }
    Ok(())
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

pub fn logs_dir() -> PathBuf {
    crate::config::stable_app_data_dir().join("logs")
}

pub fn init() -> std::io::Result<()> {
    init_in(&logs_dir())
}

/// Starts logging into `log_dir`. Only the first successful call takes
/// effect; before it, every log call is a no-op.
pub fn init_in(log_dir: &Path) -> std::io::Result<()> {
    if LOGGER.get().is_none() {
        let logger = Logger::open(log_dir)?;
        let _ = LOGGER.set(logger);
    }
    PANIC_HOOK.call_once(install_panic_hook);
    Ok(())
}

pub fn info(message: &str) {
    log(Level::Info, message);
}

pub fn warn(message: &str) {
    log(Level::Warn, message);
}

pub fn error(message: &str) {
    log(Level::Error, message);
}

fn log(level: Level, message: &str) {
    if let Some(logger) = LOGGER.get() {
        logger.write(level, message);
    }
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let payload = info.payload();
        let reason = payload
            .downcast_ref::<&str>()
            .map(|text| (*text).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        let location = info
            .location()
            .map_or_else(|| "unknown".to_string(), |at| format!("{}:{}", at.file(), at.line()));
        error(&format!("panic at {location}: {reason}"));
        previous(info);
    }));
}
