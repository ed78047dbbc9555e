use super::{ControlPlane, Library};
use crate::error::Result;
use crate::rules::{EncodeParams, MediaDescriptor};

/// Control plane that succeeds at everything and knows no items.
pub struct NoopControl;

#[async_trait::async_trait]
impl ControlPlane for NoopControl {
    async fn get_item_details(&self, _: &str) -> Result<Option<MediaDescriptor>> {
        Ok(None)
    }
    async fn start_encoding(&self, _: &str, _: &EncodeParams) -> Result<()> {
        Ok(())
    }
    async fn embed_metadata(&self, _: &str) -> Result<()> {
        Ok(())
    }
    async fn list_libraries(&self) -> Result<Vec<Library>> {
        Ok(vec![])
    }
    async fn list_library_items(&self, _: &str) -> Result<Vec<String>> {
        Ok(vec![])
    }
    async fn count_active_jobs(&self) -> Result<usize> {
        Ok(0)
    }
}
