//! Shared test harness for integration tests.
//!
//! Provides [`FakeControlPlane`], an in-memory stand-in for the media server's
//! HTTP API that records every call, and [`TestHarness`] which wires it into a
//! full [`AppContext`].

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use shelfwatch::config::Config;
use shelfwatch::context::AppContext;
use shelfwatch::control::{ControlPlane, Library};
use shelfwatch::rules::{EncodeParams, MediaDescriptor};
use shelfwatch::{Error, Result};

/// How the fake answers `count_active_jobs`.
#[derive(Debug, Clone, Copy)]
pub enum JobCount {
    /// Number of encodes started so far.
    Started,
    Fixed(usize),
    Fail,
}

pub struct FakeControlPlane {
    items: Mutex<HashMap<String, Option<MediaDescriptor>>>,
    libraries: Mutex<Vec<Library>>,
    library_items: Mutex<HashMap<String, Vec<String>>>,
    failing_libraries: Mutex<HashSet<String>>,
    failing_encodes: Mutex<HashSet<String>>,
    job_count: Mutex<JobCount>,
    pub encodes: Mutex<Vec<(String, EncodeParams)>>,
    pub embeds: Mutex<Vec<String>>,
    pub detail_calls: AtomicUsize,
    pub library_calls: AtomicUsize,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            libraries: Mutex::new(Vec::new()),
            library_items: Mutex::new(HashMap::new()),
            failing_libraries: Mutex::new(HashSet::new()),
            failing_encodes: Mutex::new(HashSet::new()),
            job_count: Mutex::new(JobCount::Fail),
            encodes: Mutex::new(Vec::new()),
            embeds: Mutex::new(Vec::new()),
            detail_calls: AtomicUsize::new(0),
            library_calls: AtomicUsize::new(0),
        }
    }

    /// Register an item with audio. Unregistered items fail `get_item_details`.
    pub fn with_item(self, id: &str, codec: &str, bit_rate: u64, channels: u32) -> Self {
        self.items
            .lock()
            .insert(id.to_string(), Some(MediaDescriptor::new(codec, bit_rate, channels)));
        self
    }

    /// Register an item that has no audio files.
    pub fn with_silent_item(self, id: &str) -> Self {
        self.items.lock().insert(id.to_string(), None);
        self
    }

    pub fn with_library(self, id: &str, media_type: &str, items: &[&str]) -> Self {
        self.libraries.lock().push(Library {
            id: id.to_string(),
            name: format!("Library {id}"),
            media_type: media_type.to_string(),
        });
        self.library_items
            .lock()
            .insert(id.to_string(), items.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_failing_library(self, id: &str) -> Self {
        self.libraries.lock().push(Library {
            id: id.to_string(),
            name: format!("Library {id}"),
            media_type: "book".to_string(),
        });
        self.failing_libraries.lock().insert(id.to_string());
        self
    }

    pub fn with_failing_encode(self, id: &str) -> Self {
        self.failing_encodes.lock().insert(id.to_string());
        self
    }

    pub fn with_job_count(self, count: JobCount) -> Self {
        *self.job_count.lock() = count;
        self
    }

    pub fn encoded_ids(&self) -> Vec<String> {
        self.encodes.lock().iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn embedded_ids(&self) -> Vec<String> {
        self.embeds.lock().clone()
    }
}

#[async_trait::async_trait]
impl ControlPlane for FakeControlPlane {
    async fn get_item_details(&self, item_id: &str) -> Result<Option<MediaDescriptor>> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.items
            .lock()
            .get(item_id)
            .cloned()
            .ok_or_else(|| Error::control_plane("get_item_details", "404 Not Found"))
    }

    async fn start_encoding(&self, item_id: &str, params: &EncodeParams) -> Result<()> {
        if self.failing_encodes.lock().contains(item_id) {
            return Err(Error::control_plane("start_encoding", "500 Internal Server Error"));
        }
        self.encodes
            .lock()
            .push((item_id.to_string(), params.clone()));
        Ok(())
    }

    async fn embed_metadata(&self, item_id: &str) -> Result<()> {
        self.embeds.lock().push(item_id.to_string());
        Ok(())
    }

    async fn list_libraries(&self) -> Result<Vec<Library>> {
        self.library_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.libraries.lock().clone())
    }

    async fn list_library_items(&self, library_id: &str) -> Result<Vec<String>> {
        if self.failing_libraries.lock().contains(library_id) {
            return Err(Error::control_plane("list_library_items", "502 Bad Gateway"));
        }
        Ok(self
            .library_items
            .lock()
            .get(library_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn count_active_jobs(&self) -> Result<usize> {
        match *self.job_count.lock() {
            JobCount::Started => Ok(self.encodes.lock().len()),
            JobCount::Fixed(n) => Ok(n),
            JobCount::Fail => Err(Error::control_plane("count_active_jobs", "timeout")),
        }
    }
}

/// Config with the required settings filled in.
pub fn test_config() -> Config {
    Config {
        host: "http://localhost:13378".into(),
        token: "secret".into(),
        ..Config::default()
    }
}

pub struct TestHarness {
    pub ctx: AppContext,
    pub control: Arc<FakeControlPlane>,
}

impl TestHarness {
    pub fn new(config: Config, control: FakeControlPlane) -> Self {
        let control = Arc::new(control);
        let ctx = AppContext::new(config, Arc::clone(&control) as Arc<dyn ControlPlane>);
        Self { ctx, control }
    }

    pub fn enqueue(&self, ids: &[&str]) {
        for id in ids {
            self.ctx.queue.enqueue(*id);
        }
    }
}

/// Let spawned tasks run to completion under a paused clock.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
