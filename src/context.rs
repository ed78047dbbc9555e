//! Shared application context.
//!
//! One [`AppContext`] is built at startup and cloned into the session, the
//! event dispatcher, and every deferred task. All fields are cheap to clone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::control::{ControlPlane, HttpControlPlane};
use crate::queue::DispatchQueue;
use crate::rules::parse_rule_table;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub control: Arc<dyn ControlPlane>,
    pub queue: Arc<DispatchQueue>,
    /// Cancelled on signal or when a drained queue asks to exit.
    pub shutdown: CancellationToken,
    startup_scan_claimed: Arc<AtomicBool>,
}

impl AppContext {
    /// Build a context around an arbitrary control plane.
    pub fn new(config: Config, control: Arc<dyn ControlPlane>) -> Self {
        let rules = parse_rule_table(&config.rules);
        tracing::info!(
            rules = rules.rules().len(),
            fallback = rules.fallback().is_some(),
            "Conversion rule table loaded"
        );

        let config = Arc::new(config);
        let shutdown = CancellationToken::new();
        let queue = Arc::new(DispatchQueue::new(
            Arc::clone(&config),
            rules,
            Arc::clone(&control),
            shutdown.clone(),
        ));

        Self {
            config,
            control,
            queue,
            shutdown,
            startup_scan_claimed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build a context talking HTTP to the configured host.
    pub fn from_config(config: Config) -> Self {
        let control: Arc<dyn ControlPlane> = Arc::new(HttpControlPlane::new(
            &config.host,
            &config.token,
            config.request_timeout(),
        ));
        Self::new(config, control)
    }

    /// Returns `true` exactly once per process, for the caller that should run
    /// the startup scan.
    pub fn claim_startup_scan(&self) -> bool {
        !self.startup_scan_claimed.swap(true, Ordering::SeqCst)
    }

    /// Periodically adopt the server's running count and refill free slots.
    ///
    /// Keeps running after shutdown so a draining queue still makes progress.
    pub fn spawn_resync_loop(&self) -> Option<JoinHandle<()>> {
        let interval = self.config.resync_interval()?;
        let queue = Arc::clone(&self.queue);

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; nothing is running yet.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                queue.resync().await;
                if !queue.is_empty() {
                    queue.fill();
                }
            }
        }))
    }
}
