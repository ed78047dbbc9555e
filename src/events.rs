//! Application event routing.
//!
//! Decoded `(name, payload)` pairs from the realtime session are parsed into
//! [`ServerEvent`] and handed to [`EventDispatcher`]. Malformed payloads stop
//! here: they are logged and dropped.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::context::AppContext;
use crate::error::{Error, Result};

/// Outbound event carrying the access token.
pub const AUTH_EVENT: &str = "auth";

/// Application events the companion reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    AuthSuccess,
    AuthError(Value),
    ItemAdded {
        item_id: String,
    },
    TaskFinished {
        action: String,
        item_id: Option<String>,
    },
    TaskProgress {
        item_id: String,
        progress: f64,
    },
    /// Any other event name; ignored.
    Other(String),
}

impl ServerEvent {
    pub fn parse(name: &str, payload: Value) -> Result<Self> {
        match name {
            "auth_success" => Ok(ServerEvent::AuthSuccess),
            "auth_error" => Ok(ServerEvent::AuthError(payload)),
            "item_added" => {
                let item_id = str_field(&payload, "id")
                    .ok_or_else(|| Error::Decode("item_added without id".into()))?;
                Ok(ServerEvent::ItemAdded { item_id })
            }
            "task_finished" => {
                let action = str_field(&payload, "action")
                    .ok_or_else(|| Error::Decode("task_finished without action".into()))?;
                Ok(ServerEvent::TaskFinished {
                    action,
                    item_id: task_item_id(&payload),
                })
            }
            "task_progress" => {
                let item_id = task_item_id(&payload)
                    .ok_or_else(|| Error::Decode("task_progress without item id".into()))?;
                let progress = payload
                    .get("progress")
                    .and_then(Value::as_f64)
                    .ok_or_else(|| Error::Decode("task_progress without progress".into()))?;
                Ok(ServerEvent::TaskProgress { item_id, progress })
            }
            other => Ok(ServerEvent::Other(other.to_string())),
        }
    }
}

fn str_field(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Task payloads carry the item id either at the top level or under `data`.
fn task_item_id(payload: &Value) -> Option<String> {
    str_field(payload, "libraryItemId")
        .or_else(|| payload.get("data").and_then(|d| str_field(d, "libraryItemId")))
}

/// Routes events to the dispatch queue and the control plane.
pub struct EventDispatcher {
    ctx: AppContext,
    /// Last logged progress decile per item.
    progress: HashMap<String, u8>,
}

impl EventDispatcher {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            progress: HashMap::new(),
        }
    }

    /// Parse and route one event. Parse failures are logged and dropped.
    pub fn handle(&mut self, name: &str, payload: Value) -> Option<ServerEvent> {
        match ServerEvent::parse(name, payload) {
            Ok(event) => {
                self.dispatch(&event);
                Some(event)
            }
            Err(e) => {
                tracing::warn!(event = name, error = %e, "Dropping malformed event");
                None
            }
        }
    }

    pub fn dispatch(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::AuthSuccess => tracing::info!("Authenticated with media server"),
            ServerEvent::AuthError(detail) => {
                tracing::error!(detail = %detail, "Authentication rejected by media server");
            }
            ServerEvent::ItemAdded { item_id } => self.on_item_added(item_id),
            ServerEvent::TaskFinished { action, item_id } => {
                self.on_task_finished(action, item_id.as_deref());
            }
            ServerEvent::TaskProgress { item_id, progress } => {
                self.on_task_progress(item_id, *progress);
            }
            ServerEvent::Other(name) => tracing::trace!(event = %name, "Ignoring event"),
        }
    }

    fn on_item_added(&self, item_id: &str) {
        tracing::info!(item_id = %item_id, "New item added");
        self.ctx.queue.enqueue(item_id);
        self.ctx.queue.schedule_dispatch(self.ctx.config.settle_delay());
    }

    fn on_task_finished(&mut self, action: &str, item_id: Option<&str>) {
        if !action.contains("encode") {
            tracing::trace!(action = %action, "Ignoring non-encode task");
            return;
        }

        let queue = &self.ctx.queue;
        queue.release();
        tracing::info!(
            item_id = item_id.unwrap_or("<unknown>"),
            running = queue.running(),
            queued = queue.len(),
            "Encode finished"
        );

        if let Some(item_id) = item_id {
            self.progress.remove(item_id);
            if self.ctx.config.embed_metadata {
                self.schedule_embed(item_id.to_string());
            }
        }

        queue.fill();
    }

    fn on_task_progress(&mut self, item_id: &str, progress: f64) {
        let decile = (progress.clamp(0.0, 100.0) / 10.0).floor() as u8;
        let last = if decile >= 10 {
            self.progress.remove(item_id)
        } else {
            self.progress.insert(item_id.to_string(), decile)
        };
        if last.map_or(true, |last| decile > last) {
            tracing::info!(item_id = %item_id, progress = decile * 10, "Encode progress");
        }
    }

    fn schedule_embed(&self, item_id: String) {
        let control = Arc::clone(&self.ctx.control);
        let delay = self.ctx.config.embed_delay();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match control.embed_metadata(&item_id).await {
                Ok(()) => tracing::info!(item_id = %item_id, "Metadata embed requested"),
                Err(e) => {
                    tracing::warn!(item_id = %item_id, error = %e, "Metadata embed failed");
                }
            }
        });
    }
}
