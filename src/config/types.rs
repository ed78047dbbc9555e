use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration. Every field except `host` and `token` has a default,
/// so an empty file plus two environment variables is a valid setup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Base address of the media server, e.g. `https://abs.example.com`.
    pub host: String,

    /// API token used for both the realtime auth event and HTTP calls.
    pub token: String,

    /// Maximum number of encode jobs kept in flight.
    pub concurrency: usize,

    /// Wait after an `item_added` event before attempting dispatch.
    pub settle_delay_ms: u64,

    /// Embed metadata once an encode finishes.
    pub embed_metadata: bool,

    /// Conversion rule table text.
    pub rules: String,

    /// Queue every existing library item once after the first handshake.
    pub scan_on_start: bool,

    /// Exit once a dispatch attempt finds the queue empty.
    pub exit_when_drained: bool,

    /// Source codecs that are never re-encoded.
    pub excluded_codecs: Vec<String>,

    pub handshake_grace_ms: u64,

    pub reconnect_backoff_ms: u64,

    pub embed_delay_ms: u64,

    /// Interval of the authoritative running-count resync. `0` disables it.
    pub resync_interval_secs: u64,

    pub request_timeout_secs: u64,

    /// How often a shutting-down process retries dispatch while items remain queued.
    pub drain_poll_ms: u64,
}

fn default_concurrency() -> usize {
    1
}
fn default_settle_delay_ms() -> u64 {
    15_000
}
fn default_rules() -> String {
    "copy".to_string()
}
fn default_excluded_codecs() -> Vec<String> {
    vec!["opus".to_string()]
}
fn default_handshake_grace_ms() -> u64 {
    1_000
}
fn default_reconnect_backoff_ms() -> u64 {
    5_000
}
fn default_embed_delay_ms() -> u64 {
    60_000
}
fn default_resync_interval_secs() -> u64 {
    300
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_drain_poll_ms() -> u64 {
    5_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::new(),
            token: String::new(),
            concurrency: default_concurrency(),
            settle_delay_ms: default_settle_delay_ms(),
            embed_metadata: false,
            rules: default_rules(),
            scan_on_start: false,
            exit_when_drained: false,
            excluded_codecs: default_excluded_codecs(),
            handshake_grace_ms: default_handshake_grace_ms(),
            reconnect_backoff_ms: default_reconnect_backoff_ms(),
            embed_delay_ms: default_embed_delay_ms(),
            resync_interval_secs: default_resync_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            drain_poll_ms: default_drain_poll_ms(),
        }
    }
}

impl Config {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn handshake_grace(&self) -> Duration {
        Duration::from_millis(self.handshake_grace_ms)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    pub fn embed_delay(&self) -> Duration {
        Duration::from_millis(self.embed_delay_ms)
    }

    /// `None` when periodic resync is disabled.
    pub fn resync_interval(&self) -> Option<Duration> {
        (self.resync_interval_secs > 0).then(|| Duration::from_secs(self.resync_interval_secs))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Never zero, so the drain loop cannot spin.
    pub fn drain_poll(&self) -> Duration {
        Duration::from_millis(self.drain_poll_ms.max(1))
    }

    /// Whether items with this source codec are skipped.
    pub fn is_excluded(&self, codec: &str) -> bool {
        self.excluded_codecs
            .iter()
            .any(|c| c.eq_ignore_ascii_case(codec))
    }
}
