//! Port abstraction for the backend's object storage.
use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by blob store adapters.
    pub enum BlobStoreError {
        /// Storage could not be reached.
        Connection { message: String } => "blob store connection failed: {message}",
        /// Storage refused the object.
        Rejected { message: String } => "blob upload rejected: {message}",
    }
}

/// Object to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobUpload {
    /// Bucket name.
    pub bucket: String,
    /// Object path inside the bucket.
    pub path: String,
    /// Object body.
    pub bytes: Vec<u8>,
    /// MIME type sent with the object.
    pub content_type: String,
    /// Overwrite an existing object at `path`.
    pub upsert: bool,
}

/// Upload objects and resolve their public URLs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store an object.
    async fn upload(&self, upload: &BlobUpload) -> Result<(), BlobStoreError>;

    /// Public URL of an object. Pure string construction; does not check the
    /// object exists.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}
