use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{ControlPlane, Library};
use crate::error::{Error, Result};
use crate::rules::{EncodeParams, MediaDescriptor};

/// HTTP implementation of [`ControlPlane`] using bearer-token auth.
pub struct HttpControlPlane {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemResponse {
    #[serde(default)]
    media: Option<ItemMedia>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemMedia {
    #[serde(default)]
    audio_files: Vec<AudioFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AudioFile {
    #[serde(default)]
    codec: String,
    #[serde(default)]
    bit_rate: u64,
    #[serde(default)]
    channels: u32,
}

#[derive(Debug, Deserialize)]
struct LibrariesResponse {
    #[serde(default)]
    libraries: Vec<Library>,
}

#[derive(Debug, Deserialize)]
struct LibraryItemsResponse {
    #[serde(default)]
    results: Vec<LibraryItem>,
}

#[derive(Debug, Deserialize)]
struct LibraryItem {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TasksResponse {
    #[serde(default)]
    tasks: Vec<Task>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Task {
    #[serde(default)]
    action: String,
    #[serde(default)]
    is_finished: bool,
}

impl HttpControlPlane {
    pub fn new(host: &str, token: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {e}");
                Client::new()
            });

        let host = host.trim().trim_end_matches('/');
        let base_url = if host.contains("://") {
            host.to_string()
        } else {
            format!("http://{host}")
        };

        Self {
            client,
            base_url,
            token: token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &str, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::control_plane(operation, e))?;

        check_status(operation, response)
            .await?
            .json()
            .await
            .map_err(|e| Error::control_plane(operation, e))
    }

    async fn post(&self, operation: &str, path: &str, query: &[(&str, &str)]) -> Result<()> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::control_plane(operation, e))?;

        check_status(operation, response).await?;
        Ok(())
    }
}

async fn check_status(operation: &str, response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(Error::control_plane(operation, format!("{status}: {body}")))
}

#[async_trait::async_trait]
impl ControlPlane for HttpControlPlane {
    async fn get_item_details(&self, item_id: &str) -> Result<Option<MediaDescriptor>> {
        let item: ItemResponse = self
            .get_json("get_item_details", &format!("/items/{item_id}?expanded=1"))
            .await?;

        Ok(item
            .media
            .and_then(|media| media.audio_files.into_iter().next())
            .map(|file| MediaDescriptor::new(&file.codec, file.bit_rate, file.channels)))
    }

    async fn start_encoding(&self, item_id: &str, params: &EncodeParams) -> Result<()> {
        self.post(
            "start_encoding",
            &format!("/tools/item/{item_id}/encode-m4b"),
            &[
                ("codec", params.codec.as_str()),
                ("bitrate", params.bit_rate.as_str()),
                ("channels", params.channels.as_str()),
            ],
        )
        .await
    }

    async fn embed_metadata(&self, item_id: &str) -> Result<()> {
        self.post(
            "embed_metadata",
            &format!("/tools/item/{item_id}/embed-metadata"),
            &[],
        )
        .await
    }

    async fn list_libraries(&self) -> Result<Vec<Library>> {
        let response: LibrariesResponse = self.get_json("list_libraries", "/libraries").await?;
        Ok(response.libraries)
    }

    async fn list_library_items(&self, library_id: &str) -> Result<Vec<String>> {
        let response: LibraryItemsResponse = self
            .get_json(
                "list_library_items",
                &format!("/libraries/{library_id}/items"),
            )
            .await?;
        Ok(response.results.into_iter().map(|item| item.id).collect())
    }

    async fn count_active_jobs(&self) -> Result<usize> {
        let response: TasksResponse = self.get_json("count_active_jobs", "/tasks").await?;
        Ok(response
            .tasks
            .iter()
            .filter(|task| task.action.contains("encode") && !task.is_finished)
            .count())
    }
}
