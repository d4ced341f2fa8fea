use async_trait::async_trait;
use panic_admin_core::crud::CollectionTransport;
use panic_admin_core::settings::SettingsTransport;
use panic_admin_core::RecordId;
use serde_json::Value;

use crate::{AdminApiClient, ApiClientError};

#[async_trait]
impl CollectionTransport for AdminApiClient {
    type Error = ApiClientError;

    async fn fetch_collection(&self, endpoint: &str) -> Result<Value, ApiClientError> {
        self.get_json(endpoint).await
    }

    async fn create_record(&self, endpoint: &str, body: &Value) -> Result<Value, ApiClientError> {
        self.post_json(endpoint, body).await
    }

    async fn update_record(
        &self,
        endpoint: &str,
        id: &RecordId,
        body: &Value,
    ) -> Result<Value, ApiClientError> {
        self.put_json(Self::record_path(endpoint, id).as_str(), body)
            .await
    }

    async fn delete_record(&self, endpoint: &str, id: &RecordId) -> Result<(), ApiClientError> {
        self.delete(Self::record_path(endpoint, id).as_str()).await
    }
}

#[async_trait]
impl SettingsTransport for AdminApiClient {
    type Error = ApiClientError;

    async fn fetch_settings(&self) -> Result<Value, ApiClientError> {
        self.get_json(Self::settings_path()).await
    }

    async fn store_settings(&self, body: &Value) -> Result<Value, ApiClientError> {
        self.put_json(Self::settings_path(), body).await
    }
}
