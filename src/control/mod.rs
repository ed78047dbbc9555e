//! Control-plane capability consumed by the dispatch queue and the scanner.

mod client;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use client::HttpControlPlane;

use serde::Deserialize;

use crate::error::Result;
use crate::rules::{EncodeParams, MediaDescriptor};

/// A library as reported by the media server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Library {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// `book`, `podcast`, ... Empty when the server does not report it.
    #[serde(default)]
    pub media_type: String,
}

impl Library {
    /// Whether items in this library are candidates for re-encoding.
    pub fn holds_books(&self) -> bool {
        self.media_type.is_empty() || self.media_type == "book"
    }
}

/// Calls the companion makes against the media server's HTTP API.
#[async_trait::async_trait]
pub trait ControlPlane: Send + Sync {
    /// Sample the source parameters of an item. `None` when it has no audio.
    async fn get_item_details(&self, item_id: &str) -> Result<Option<MediaDescriptor>>;

    /// Request a background encode with the given parameters.
    async fn start_encoding(&self, item_id: &str, params: &EncodeParams) -> Result<()>;

    /// Request that metadata be embedded into the item's files.
    async fn embed_metadata(&self, item_id: &str) -> Result<()>;

    async fn list_libraries(&self) -> Result<Vec<Library>>;

    async fn list_library_items(&self, library_id: &str) -> Result<Vec<String>>;

    /// Number of encode jobs the server currently has in flight.
    async fn count_active_jobs(&self) -> Result<usize>;
}
