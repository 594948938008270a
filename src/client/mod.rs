//! Client facade for cached feature toggles
//!
//! Provides the public entry point composing the cache, the refresh
//! scheduler and the notification conduits:
//! - [`ToggleClient`] - Reads toggles and exposes change/error streams
//! - [`ToggleClientBuilder`] - Configurable client construction
//!
//! # Basic Usage
//! ```no_run
//! use toggle_cache::ToggleClient;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let client = ToggleClient::new(vec!["http://127.0.0.1:4001".into()], "checkout", 5)
//!         .expect("valid configuration");
//!
//!     // Populates the cache, then refreshes it every 5 seconds
//!     client.initialise().await.expect("first fetch");
//!
//!     let mut updates = client.on_update();
//!     tokio::spawn(async move {
//!         while let Ok(event) = updates.recv().await {
//!             println!("toggles changed at version {}: {:?}", event.version, event.changes);
//!         }
//!     });
//!
//!     if client.get_or_default("new_checkout_flow", false) {
//!         println!("new flow enabled");
//!     }
//! }
//! ```

mod builder;

pub use builder::*;


use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::debug;
use tracing::warn;

use crate::metrics;
use crate::ClientConfig;
use crate::Error;
use crate::EtcdFetcher;
use crate::Fetcher;
use crate::Notifier;
use crate::RefreshCycle;
use crate::Result;
use crate::Scheduler;
use crate::SchedulerState;
use crate::Snapshot;
use crate::ToggleCache;
use crate::UpdateEvent;

/// Cached view of one application's toggles, kept fresh in the background.
///
/// Reads never wait on the refresh task. Each client owns its cache, so
/// clients for different applications coexist without interference.
/// Dropping the client stops its refresh loop.
pub struct ToggleClient<F: Fetcher = EtcdFetcher> {
    config: ClientConfig,
    fetcher: Arc<F>,
    cache: Arc<ToggleCache>,
    notifier: Arc<Notifier>,
    scheduler: Scheduler,
}

impl ToggleClient<EtcdFetcher> {
    /// Builds a client for `app_name` backed by the etcd fetcher.
    ///
    /// Pure construction: validates the arguments, performs no I/O.
    ///
    /// # Errors
    /// [`Error::Config`] for an empty app name, an interval below one second
    /// or a missing/malformed endpoint.
    pub fn new(
        endpoints: Vec<String>,
        app_name: impl Into<String>,
        refresh_interval_in_secs: u64,
    ) -> Result<Self> {
        Self::from_config(ClientConfig::for_app(endpoints, app_name, refresh_interval_in_secs))
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let config = config.validate()?;
        let fetcher = EtcdFetcher::new(&config)?;
        Ok(Self::assemble(config, fetcher))
    }

    /// Create a configured client builder
    pub fn builder(
        endpoints: Vec<String>,
        app_name: impl Into<String>,
    ) -> ToggleClientBuilder {
        ToggleClientBuilder::new(endpoints, app_name)
    }
}

impl<F: Fetcher> ToggleClient<F> {
    /// Builds a client that reads snapshots through a custom [`Fetcher`].
    pub fn with_fetcher(
        config: ClientConfig,
        fetcher: F,
    ) -> Result<Self> {
        let config = config.validate()?;
        Ok(Self::assemble(config, fetcher))
    }

    fn assemble(
        config: ClientConfig,
        fetcher: F,
    ) -> Self {
        let notifier = Notifier::new(config.error_buffer_size, config.update_buffer_size);
        Self {
            config,
            fetcher: Arc::new(fetcher),
            cache: Arc::new(ToggleCache::new()),
            notifier: Arc::new(notifier),
            scheduler: Scheduler::new(),
        }
    }

    /// Fetches the first snapshot, then starts the background refresh.
    ///
    /// The first fetch runs on the caller's task and is not diffed: nothing
    /// is published for it. On failure the error is returned, the refresh
    /// loop is not started and `initialise` may simply be called again.
    /// Calling it while the refresh loop runs does nothing. After `stop()`,
    /// it first waits for the cycle the old loop may still be running.
    pub async fn initialise(&self) -> Result<()> {
        if self.scheduler.is_running() {
            debug!(app_name = %self.config.app_name, "Client already initialised");
            return Ok(());
        }
        // A stopped loop may still be installing its last snapshot
        self.scheduler.join_stopped().await;

        let app_name = &self.config.app_name;
        let snapshot = match self.fetcher.fetch_snapshot(app_name).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(app_name = %app_name, "Initial fetch failed: {}", e);
                metrics::record_refresh_failure(app_name);
                return Err(e);
            }
        };

        let version = snapshot.version();
        let toggles = snapshot.len();
        self.cache.replace(snapshot);
        metrics::record_refresh_success(app_name, version);
        debug!(app_name = %app_name, version, toggles, "Toggle cache initialised");

        let cycle = Arc::new(RefreshCycle::new(
            app_name.clone(),
            self.fetcher.clone(),
            self.cache.clone(),
            self.notifier.clone(),
        ));
        self.scheduler.start(self.config.refresh_interval(), move || {
            let cycle = cycle.clone();
            async move {
                cycle.run().await;
            }
        });

        Ok(())
    }

    /// Returns the cached value of `name`, or `None` when the toggle does
    /// not exist (or the client was never initialised).
    pub fn get(
        &self,
        name: &str,
    ) -> Option<bool> {
        self.cache.read(name)
    }

    /// Returns the cached value of `name`, or `default` when unknown.
    pub fn get_or_default(
        &self,
        name: &str,
        default: bool,
    ) -> bool {
        self.cache.read_or_default(name, default)
    }

    /// Subscribes to refresh errors.
    ///
    /// Only errors raised after subscribing are delivered. The conduit keeps
    /// the most recent `error_buffer_size` events for a slow subscriber.
    pub fn on_error(&self) -> broadcast::Receiver<Arc<Error>> {
        self.notifier.subscribe_errors()
    }

    /// Subscribes to non-empty change batches.
    ///
    /// Only batches published after subscribing are delivered. The conduit
    /// keeps the most recent `update_buffer_size` events for a slow
    /// subscriber.
    pub fn on_update(&self) -> broadcast::Receiver<UpdateEvent> {
        self.notifier.subscribe_updates()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.cache.load()
    }

    pub fn app_name(&self) -> &str {
        &self.config.app_name
    }

    pub fn refresh_interval(&self) -> Duration {
        self.config.refresh_interval()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Events dropped because nobody was subscribed when they were published
    pub fn unobserved_events(&self) -> u64 {
        self.notifier.unobserved_count()
    }

    /// Stops background refresh; cached values stay readable.
    pub fn stop(&self) {
        self.scheduler.stop();
    }

    /// Stops background refresh and waits for an in-flight cycle to finish.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}

impl<F: Fetcher> Drop for ToggleClient<F> {
    fn drop(&mut self) {
        self.scheduler.stop();
    }
}
