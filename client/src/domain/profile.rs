//! User profile read model and partial updates.
//!
//! The profile row lives in the backend's `users` table keyed by the identity
//! id. Field names follow the table's snake_case columns.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::formats::{format_date, optional_date};
use crate::domain::user::{DisplayName, Email, UserId};

/// Application-level record describing a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Identity id; primary key of the row.
    pub id: UserId,
    /// Email captured at sign-up.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Dialling prefix of the primary phone number.
    #[serde(default)]
    pub country_code: Option<String>,
    /// Primary phone number.
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Postal address.
    #[serde(default)]
    pub address: Option<String>,
    /// Free-form gender.
    #[serde(default)]
    pub gender: Option<String>,
    /// Date of birth.
    #[serde(default, with = "optional_date")]
    pub birthday: Option<NaiveDate>,
    /// Public URL of the avatar image.
    #[serde(default)]
    pub image: Option<String>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}

/// Row upserted when an identity signs up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProfile {
    /// Identity id.
    pub id: UserId,
    /// Email used to sign up.
    pub email: Email,
    /// Name supplied at sign-up.
    pub name: DisplayName,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl NewProfile {
    /// Materialise the row the backend is expected to hold after the upsert.
    pub fn into_profile(self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.into(),
            name: self.name.into(),
            country_code: None,
            phone_number: None,
            address: None,
            gender: None,
            birthday: None,
            image: None,
            created_at: self.created_at,
        }
    }
}

/// Partial profile update.
///
/// Every field is tri-state: untouched (`None`), set (`Some(Some(_))`) or
/// cleared to null (`Some(None)`). Only touched fields are serialised.
///
/// # Examples
/// ```
/// use booking_client::domain::ProfileUpdate;
///
/// let update = ProfileUpdate::default().address("12 Harbour Road").clear_phone();
/// let json = serde_json::to_value(&update).unwrap();
/// assert_eq!(json["address"], "12 Harbour Road");
/// assert!(json["phone_number"].is_null());
/// assert!(json.get("name").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<DisplayName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    country_code: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone_number: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gender: Option<Option<String>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_birthday"
    )]
    birthday: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<Option<String>>,
}

impl ProfileUpdate {
    /// Set the display name.
    #[must_use]
    pub fn name(mut self, name: DisplayName) -> Self {
        self.name = Some(name);
        self
    }

    /// Set the primary phone number and its dialling prefix.
    #[must_use]
    pub fn phone(mut self, country_code: Option<String>, phone_number: impl Into<String>) -> Self {
        self.country_code = Some(country_code);
        self.phone_number = Some(Some(phone_number.into()));
        self
    }

    /// Clear the primary phone number and its dialling prefix.
    #[must_use]
    pub fn clear_phone(mut self) -> Self {
        self.country_code = Some(None);
        self.phone_number = Some(None);
        self
    }

    /// Set the postal address.
    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(Some(address.into()));
        self
    }

    /// Set the gender.
    #[must_use]
    pub fn gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(Some(gender.into()));
        self
    }

    /// Set the date of birth.
    #[must_use]
    pub fn birthday(mut self, birthday: NaiveDate) -> Self {
        self.birthday = Some(Some(birthday));
        self
    }

    /// Set the avatar URL.
    #[must_use]
    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.image = Some(Some(url.into()));
        self
    }

    /// True when no field is touched.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.country_code.is_none()
            && self.phone_number.is_none()
            && self.address.is_none()
            && self.gender.is_none()
            && self.birthday.is_none()
            && self.image.is_none()
    }

    /// Apply the touched fields to a profile, leaving the rest unchanged.
    pub fn apply_to(&self, profile: &mut UserProfile) {
        if let Some(name) = &self.name {
            profile.name = name.to_string();
        }
        if let Some(value) = &self.country_code {
            profile.country_code.clone_from(value);
        }
        if let Some(value) = &self.phone_number {
            profile.phone_number.clone_from(value);
        }
        if let Some(value) = &self.address {
            profile.address.clone_from(value);
        }
        if let Some(value) = &self.gender {
            profile.gender.clone_from(value);
        }
        if let Some(value) = self.birthday {
            profile.birthday = value;
        }
        if let Some(value) = &self.image {
            profile.image.clone_from(value);
        }
    }
}

fn serialize_birthday<S>(value: &Option<Option<NaiveDate>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(Some(date)) => serializer.serialize_str(&format_date(*date)),
        _ => serializer.serialize_none(),
    }
}
