//! Client configuration loaded via OrthoConfig.
//!
//! Values come from `BOOKINGS_*` environment variables or a configuration
//! file; command-line subcommands are parsed separately by the binary.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::{DEFAULT_PROFILE_IMAGE_BUCKET, Error};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "BOOKINGS")]
pub struct ClientSettings {
    /// Project base URL, e.g. `https://example.supabase.co`.
    pub url: Option<String>,
    /// Public (anonymous) API key.
    pub anon_key: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Storage bucket for profile images.
    pub profile_image_bucket: Option<String>,
}

impl ClientSettings {
    /// Validated project URL.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the URL is missing or malformed.
    pub fn url(&self) -> Result<Url, Error> {
        let raw = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| Error::validation("BOOKINGS_URL is not set"))?;
        let parsed =
            Url::parse(raw).map_err(|err| Error::validation(format!("invalid BOOKINGS_URL: {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::validation(format!(
                "BOOKINGS_URL must use http or https, got {}",
                parsed.scheme()
            )));
        }
        Ok(parsed)
    }

    /// Public API key.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the key is missing or blank.
    pub fn anon_key(&self) -> Result<&str, Error> {
        self.anon_key
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| Error::validation("BOOKINGS_ANON_KEY is not set"))
    }

    /// Per-request timeout, falling back to 30 seconds.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Profile image bucket, falling back to the default.
    pub fn profile_image_bucket(&self) -> &str {
        self.profile_image_bucket
            .as_deref()
            .unwrap_or(DEFAULT_PROFILE_IMAGE_BUCKET)
    }
}
