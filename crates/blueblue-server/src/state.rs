//! Application state shared across handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use blueblue_core::{AdvertisementSource, Config, QueryService, Registry, ScanController};

use crate::render::Templates;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

/// Alias used by the routers.
pub type SharedState = AppState;

struct AppStateInner {
    scanner: ScanController,
    query: QueryService,
    templates: Templates,
    public_dir: PathBuf,
    started_at: Instant,
}

impl AppState {
    /// Wire the registry, scan controller and query service together.
    ///
    /// The registry is created here and lives as long as the state.
    #[must_use]
    pub fn new(
        config: &Config,
        source: Arc<dyn AdvertisementSource>,
        public_dir: PathBuf,
        templates: Templates,
    ) -> Self {
        let registry = Arc::new(Registry::new());
        let scanner = ScanController::new(source, Arc::clone(&registry), config.scan.window());
        let query = QueryService::new(registry, config.scan.evict_stale);

        Self {
            inner: Arc::new(AppStateInner {
                scanner,
                query,
                templates,
                public_dir,
                started_at: Instant::now(),
            }),
        }
    }

    /// The scan controller.
    #[must_use]
    pub fn scanner(&self) -> &ScanController {
        &self.inner.scanner
    }

    /// The device query service.
    #[must_use]
    pub fn query(&self) -> &QueryService {
        &self.inner.query
    }

    /// The parsed page templates.
    #[must_use]
    pub fn templates(&self) -> &Templates {
        &self.inner.templates
    }

    /// Directory served under `/public`.
    #[must_use]
    pub fn public_dir(&self) -> &PathBuf {
        &self.inner.public_dir
    }

    /// Seconds since the state was created.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }
}
