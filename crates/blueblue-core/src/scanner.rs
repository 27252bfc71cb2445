//! Background scan loop with start/stop guards.
//!
//! [`ScanController`] owns at most one scan session at a time. A session is a spawned
//! task that drives the [`AdvertisementSource`] in back-to-back windows of fixed length,
//! normalizing every advertisement into the [`Registry`]. Stopping is cooperative: the
//! session token is checked at each window boundary, so the window in flight always runs
//! to its deadline (or until the source returns).

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use crate::advertisement::Advertisement;
use crate::bluetooth::AdvertisementSource;
use crate::error::{BlueblueError, Result};
use crate::registry::Registry;
use crate::types::{DeviceRecord, ScanState, ScanStatus};

/// How long a source may take to return after its window is cancelled.
const CANCEL_GRACE: Duration = Duration::from_secs(1);

/// Single-flight controller for the background scan loop.
///
/// Cloning is cheap; all clones control the same loop.
#[derive(Clone)]
pub struct ScanController {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn AdvertisementSource>,
    registry: Arc<Registry>,
    window: Duration,
    state: AtomicU8,
    windows_completed: AtomicU64,
    session: Mutex<Option<Session>>,
}

struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    stop: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ScanController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanController")
            .field("source", &self.inner.source.name())
            .field("window", &self.inner.window)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ScanController {
    /// Create an idle controller feeding `registry` from `source` in windows of `window`.
    #[must_use]
    pub fn new(
        source: Arc<dyn AdvertisementSource>,
        registry: Arc<Registry>,
        window: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                registry,
                window,
                state: AtomicU8::new(ScanState::Idle.as_u8()),
                windows_completed: AtomicU64::new(0),
                session: Mutex::new(None),
            }),
        }
    }

    /// Current controller state.
    #[must_use]
    pub fn state(&self) -> ScanState {
        ScanState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Returns `true` while a scan loop is running.
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.state().is_scanning()
    }

    /// Configured scan window length.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.inner.window
    }

    /// Start a scan session in the background and return its id.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`BlueblueError::AlreadyScanning`] if a session is running; that session
    /// is left untouched.
    pub fn start(&self) -> Result<Uuid> {
        if self
            .inner
            .state
            .compare_exchange(
                ScanState::Idle.as_u8(),
                ScanState::Scanning.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Err(BlueblueError::AlreadyScanning);
        }

        let id = Uuid::new_v4();
        let stop = CancellationToken::new();
        self.inner.windows_completed.store(0, Ordering::Release);

        // Hold the session lock across the spawn so `stop` cannot observe a half-built session.
        let mut session = self.inner.lock_session();
        let span = tracing::info_span!("scan", session = %id, source = self.inner.source.name());
        let task = tokio::spawn(Arc::clone(&self.inner).run(stop.clone()).instrument(span));
        *session = Some(Session {
            id,
            started_at: Utc::now(),
            stop,
            task: Some(task),
        });

        Ok(id)
    }

    /// Ask the running session to stop after its current window.
    ///
    /// # Errors
    ///
    /// Returns [`BlueblueError::NotScanning`] if no session is running, or
    /// [`BlueblueError::StopAlreadyRequested`] if the session is already winding down.
    pub fn stop(&self) -> Result<()> {
        if !self.is_scanning() {
            return Err(BlueblueError::NotScanning);
        }

        let session = self.inner.lock_session();
        match session.as_ref() {
            Some(session) if !session.stop.is_cancelled() => {
                info!(session = %session.id, "Stop requested");
                session.stop.cancel();
                Ok(())
            }
            // The loop exited between the state check and here, or stop was already asked.
            _ => Err(BlueblueError::StopAlreadyRequested),
        }
    }

    /// Stop the running session (if any) and wait for its loop to exit.
    pub async fn shutdown(&self) {
        let task = {
            let mut session = self.inner.lock_session();
            session.as_mut().and_then(|session| {
                session.stop.cancel();
                session.task.take()
            })
        };

        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Scan task ended abnormally");
            }
        }
    }

    /// Point-in-time status of the controller and its current or last session.
    #[must_use]
    pub fn status(&self) -> ScanStatus {
        let state = self.state();
        let session = self.inner.lock_session();
        ScanStatus {
            state,
            window_secs: self.inner.window.as_secs_f64(),
            source: self.inner.source.name().to_string(),
            session_id: session.as_ref().map(|s| s.id),
            session_started_at: session.as_ref().map(|s| s.started_at),
            windows_completed: self.inner.windows_completed.load(Ordering::Acquire),
            stop_requested: state.is_scanning()
                && session.as_ref().is_some_and(|s| s.stop.is_cancelled()),
        }
    }
}

impl Inner {
    fn lock_session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock()
    }

    async fn run(self: Arc<Self>, stop: CancellationToken) {
        // Reverts to Idle however the loop ends, including a panicking source.
        let _idle = IdleOnDrop(&self.state);
        info!(window = ?self.window, "Started scanning");

        let mut window_no: u64 = 0;
        while !stop.is_cancelled() {
            window_no += 1;
            self.scan_window(window_no, &stop).await;
            self.windows_completed.fetch_add(1, Ordering::AcqRel);
        }

        info!(windows = window_no, "Stopped scanning");
    }

    async fn scan_window(&self, window_no: u64, stop: &CancellationToken) {
        let deadline = Instant::now() + self.window;
        let window = CancellationToken::new();
        let _cancel_on_exit = window.clone().drop_guard();

        let registry = Arc::clone(&self.registry);
        let sink = move |advertisement: Advertisement| {
            registry.upsert(DeviceRecord::from_advertisement(advertisement, Utc::now()));
        };

        let mut scan = self.source.scan(window.clone(), &sink);
        let result = tokio::select! {
            result = &mut scan => Some(result),
            () = tokio::time::sleep_until(deadline) => {
                // The source gets to see the cancel and wind down; the grace timeout is a
                // backstop for one that ignores it.
                window.cancel();
                tokio::time::timeout(CANCEL_GRACE, &mut scan).await.ok()
            }
        };

        match result {
            None => warn!(window = window_no, "Source ignored window cancellation, abandoning it"),
            Some(Ok(())) if window.is_cancelled() => {
                debug!(window = window_no, "Scan window elapsed");
            }
            Some(Ok(())) => debug!(window = window_no, "Scan window ended early"),
            Some(Err(e)) => {
                if e.is_recoverable() {
                    warn!(window = window_no, error = %e, "Scan window failed");
                } else {
                    error!(window = window_no, error = %e, "Scan window failed");
                }
                // A failed window still lasts until its deadline so a dead radio cannot spin
                // the loop; a stop request cuts the wait short.
                tokio::select! {
                    () = tokio::time::sleep_until(deadline) => {}
                    () = stop.cancelled() => {}
                }
            }
        }
    }
}

struct IdleOnDrop<'a>(&'a AtomicU8);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(ScanState::Idle.as_u8(), Ordering::Release);
    }
}
