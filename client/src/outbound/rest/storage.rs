//! `BlobStore` over the hosted object storage endpoints.

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;

use super::backend::{HttpFailure, RestBackend};
use crate::domain::ports::{BlobStore, BlobStoreError, BlobUpload};

fn map_storage_failure(failure: HttpFailure) -> BlobStoreError {
    match failure {
        HttpFailure::Transport(message) | HttpFailure::Timeout(message) => {
            BlobStoreError::connection(message)
        }
        HttpFailure::Status { status, message, .. } if status.is_server_error() => {
            BlobStoreError::connection(message)
        }
        other => BlobStoreError::rejected(other.describe()),
    }
}

#[async_trait]
impl BlobStore for RestBackend {
    async fn upload(&self, upload: &BlobUpload) -> Result<(), BlobStoreError> {
        let url = self
            .endpoint(&format!("storage/v1/object/{}/{}", upload.bucket, upload.path))
            .map_err(map_storage_failure)?;
        let builder = self
            .request(Method::POST, url)
            .await
            .header(CONTENT_TYPE, upload.content_type.as_str())
            .header("x-upsert", if upload.upsert { "true" } else { "false" })
            .body(upload.bytes.clone());
        self.execute_empty(builder)
            .await
            .map_err(map_storage_failure)
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.public_object_url(bucket, path)
    }
}
