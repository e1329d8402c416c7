//! Profile image upload.

use std::sync::Arc;

use tracing::info;

use crate::domain::ports::{AccountSession, BlobStore, BlobStoreError, BlobUpload, require_user_id};
use crate::domain::{Error, ProfileUpdate};

/// Bucket holding profile images unless configured otherwise.
pub const DEFAULT_PROFILE_IMAGE_BUCKET: &str = "profile-images";

/// Accepted image file extensions, lowercase.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "heic"];

fn content_type(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

fn map_blob_error(error: BlobStoreError) -> Error {
    match error {
        BlobStoreError::Connection { message } => {
            Error::network(format!("image storage unavailable: {message}"))
        }
        BlobStoreError::Rejected { message } => {
            Error::profile_update(format!("Failed to upload image: {message}"))
        }
    }
}

/// Uploads the user's avatar and records its URL on the profile.
#[derive(Clone)]
pub struct AvatarService<B, S> {
    store: Arc<B>,
    session: Arc<S>,
    bucket: String,
}

impl<B, S> AvatarService<B, S> {
    /// Create an avatar service writing to [`DEFAULT_PROFILE_IMAGE_BUCKET`].
    pub fn new(store: Arc<B>, session: Arc<S>) -> Self {
        Self::with_bucket(store, session, DEFAULT_PROFILE_IMAGE_BUCKET)
    }

    /// Create an avatar service writing to `bucket`.
    pub fn with_bucket(store: Arc<B>, session: Arc<S>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            session,
            bucket: bucket.into(),
        }
    }
}

impl<B, S> AvatarService<B, S>
where
    B: BlobStore,
    S: AccountSession,
{
    /// Store `bytes` as `<user id>.<extension>`, replacing any previous image,
    /// and point the profile's `image` at its public URL.
    ///
    /// Returns the public URL.
    pub async fn upload(&self, bytes: Vec<u8>, file_extension: &str) -> Result<String, Error> {
        let user_id = require_user_id(self.session.as_ref())?;
        let extension = file_extension
            .trim()
            .trim_start_matches('.')
            .to_ascii_lowercase();
        if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            return Err(Error::validation(format!(
                "unsupported image type: {extension:?}"
            )));
        }
        if bytes.is_empty() {
            return Err(Error::validation("image is empty"));
        }

        let upload = BlobUpload {
            bucket: self.bucket.clone(),
            path: format!("{user_id}.{extension}"),
            content_type: content_type(&extension).to_owned(),
            bytes,
            upsert: true,
        };
        self.store.upload(&upload).await.map_err(map_blob_error)?;

        let url = self.store.public_url(&upload.bucket, &upload.path);
        self.session
            .update_profile(ProfileUpdate::default().image(url.clone()))
            .await?;
        info!(user_id = %user_id, path = %upload.path, "profile image uploaded");
        Ok(url)
    }
}
