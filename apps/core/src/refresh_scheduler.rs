use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::catalog_store::CatalogStore;
use crate::count_fetcher::{CountFetcher, TimeoutClass};
use crate::logging;
use crate::session_state::SessionState;
use crate::steam_api::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running(u64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub refreshed: Vec<String>,
    pub unresolved: Vec<String>,
    pub failed: Vec<(String, FetchError)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Ran(CycleReport),
    NoFavorites,
    CycleInFlight,
    CatalogLoading,
}

struct RefreshContext {
    catalog: Arc<CatalogStore>,
    fetcher: Arc<CountFetcher>,
    session: Arc<SessionState>,
    in_flight: AtomicBool,
    cycles_completed: AtomicU64,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RefreshContext {
    fn tick(&self) -> TickOutcome {
        if !self.session.has_favorites() {
            return TickOutcome::NoFavorites;
        }
        if self.catalog.is_loading() {
            return TickOutcome::CatalogLoading;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return TickOutcome::CycleInFlight;
        }
        let _guard = InFlightGuard(&self.in_flight);

        let report = self.run_cycle();
        self.cycles_completed.fetch_add(1, Ordering::AcqRel);
        TickOutcome::Ran(report)
    }

    /// Refreshes every favorite. A failure is logged and recorded, and the
    /// remaining favorites are still fetched.
    fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();
        for name in self.session.favorites_sorted() {
            let Some(entry) = self.catalog.resolve(&name) else {
                report.unresolved.push(name);
                continue;
            };

            match self.fetcher.fetch_count_for(entry.id, TimeoutClass::Background) {
                Ok(result) => {
                    self.session.record_favorite_count(&name, result);
                    report.refreshed.push(name);
                }
                Err(error) => {
                    logging::warn(&format!(
                        "refresh of favorite '{name}' (appid {}) failed: {error}",
                        entry.id
                    ));
                    report.failed.push((name, error));
                }
            }
        }
        report
    }
}

struct Timer {
    interval_secs: u64,
    stop: Sender<()>,
}

/// Periodically refreshes favorites' counts. At most one timer exists; a
/// cycle that is already running when the timer is replaced or stopped runs
/// to completion but is not followed by another tick from the old timer.
pub struct RefreshScheduler {
    context: Arc<RefreshContext>,
    timer: Mutex<Option<Timer>>,
}

impl RefreshScheduler {
    pub fn new(
        catalog: Arc<CatalogStore>,
        fetcher: Arc<CountFetcher>,
        session: Arc<SessionState>,
    ) -> Self {
        Self {
            context: Arc::new(RefreshContext {
                catalog,
                fetcher,
                session,
                in_flight: AtomicBool::new(false),
                cycles_completed: AtomicU64::new(0),
            }),
            timer: Mutex::new(None),
        }
    }

    pub fn configure(&self, interval_secs: u64) -> SchedulerState {
        self.start_timer(interval_secs, Duration::from_secs(interval_secs))
    }

    fn start_timer(&self, interval_secs: u64, period: Duration) -> SchedulerState {
        let mut timer = self
            .timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(previous) = timer.take() {
            let _ = previous.stop.send(());
        }

        if interval_secs == 0 || period.is_zero() {
            logging::info("favorites auto refresh stopped");
            return SchedulerState::Stopped;
        }

        let (stop, stop_rx) = mpsc::channel::<()>();
        let context = Arc::clone(&self.context);
        let spawned = thread::Builder::new()
            .name("steamcount-refresh".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => {
                        if let TickOutcome::Ran(report) = context.tick() {
                            logging::info(&format!(
                                "favorites refreshed ok={} unresolved={} failed={}",
                                report.refreshed.len(),
                                report.unresolved.len(),
                                report.failed.len()
                            ));
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                }
            });

        match spawned {
            Ok(_) => {
                logging::info(&format!("favorites auto refresh every {interval_secs}s"));
                *timer = Some(Timer {
                    interval_secs,
                    stop,
                });
                SchedulerState::Running(interval_secs)
            }
            Err(error) => {
                logging::error(&format!("failed to start refresh timer: {error}"));
                SchedulerState::Stopped
            }
        }
    }

    pub fn state(&self) -> SchedulerState {
        match self.timer.lock() {
            Ok(timer) => timer
                .as_ref()
                .map(|t| SchedulerState::Running(t.interval_secs))
                .unwrap_or(SchedulerState::Stopped),
            Err(_) => SchedulerState::Stopped,
        }
    }

    /// Runs one tick on the calling thread, with the same skip rules as a
    /// timer tick.
    pub fn tick_now(&self) -> TickOutcome {
        self.context.tick()
    }

    pub fn is_cycle_in_flight(&self) -> bool {
        self.context.in_flight.load(Ordering::Acquire)
    }

    pub fn cycles_completed(&self) -> u64 {
        self.context.cycles_completed.load(Ordering::Acquire)
    }

    pub fn stop(&self) -> SchedulerState {
        self.configure(0)
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Ok(mut timer) = self.timer.lock() {
            if let Some(current) = timer.take() {
                let _ = current.stop.send(());
            }
        }
    }
}
