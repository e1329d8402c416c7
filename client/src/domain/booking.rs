//! Booking records: journey, party contacts, payment and status tracking.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::formats::{date, time};
use crate::domain::user::UserId;

/// Payment progress of a booking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Nothing settled beyond any advance.
    #[default]
    Pending,
    /// Part of the fare settled.
    Partial,
    /// Fully settled.
    Paid,
}

/// Whether fuel is included in the fare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OilStatus {
    /// Fuel is part of the fare.
    Included,
    /// Fuel is billed separately.
    #[default]
    NotIncluded,
}

/// Lifecycle of a booking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Reserved, not yet departed.
    #[default]
    Booked,
    /// Journey under way.
    InProgress,
    /// Journey finished.
    Completed,
    /// Called off.
    Cancelled,
}

/// Journey shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnType {
    /// Single leg.
    #[default]
    #[serde(rename = "One-way")]
    OneWay,
    /// Outbound and return legs.
    #[serde(rename = "Both-ways")]
    BothWays,
}

/// Validation failures for booking drafts.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingValidationError {
    /// From or to location was blank.
    MissingLocation,
    /// Customer name or contact was blank.
    MissingCustomer,
    /// A money field was negative or not finite.
    InvalidAmount {
        /// Offending field.
        field: &'static str,
        /// Offending value.
        value: f64,
    },
}

impl fmt::Display for BookingValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingLocation => write!(f, "Location fields are required"),
            Self::MissingCustomer => write!(f, "Customer details are required"),
            Self::InvalidAmount { field, value } => {
                write!(f, "{field} must be a non-negative amount, got {value}")
            }
        }
    }
}

impl std::error::Error for BookingValidationError {}

/// Editable booking fields.
///
/// Used both to create a booking and to overwrite an existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDraft {
    /// Pick-up location.
    pub from_location: String,
    /// Drop location.
    pub to_location: String,
    /// Departure date.
    #[serde(with = "date")]
    pub departure_date: NaiveDate,
    /// Departure time.
    #[serde(with = "time")]
    pub departure_time: NaiveTime,
    /// Arrival date.
    #[serde(with = "date")]
    pub arrival_date: NaiveDate,
    /// Arrival time.
    #[serde(with = "time")]
    pub arrival_time: NaiveTime,
    /// Customer name.
    pub customer_name: String,
    /// Customer phone or other contact.
    pub customer_contact: String,
    /// Driver name.
    #[serde(default)]
    pub driver_name: String,
    /// Driver contact.
    #[serde(default)]
    pub driver_contact: String,
    /// Vehicle owner name.
    #[serde(default)]
    pub owner_name: String,
    /// Vehicle owner contact.
    #[serde(default)]
    pub owner_contact: String,
    /// Agreed fare.
    #[serde(default)]
    pub money: f64,
    /// Advance received.
    #[serde(default)]
    pub advance: f64,
    /// Further payments received.
    #[serde(default)]
    pub payment_amount: f64,
    /// Payment progress.
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// Fuel arrangement.
    #[serde(default)]
    pub oil_status: OilStatus,
    /// Lifecycle status.
    #[serde(default)]
    pub booking_status: BookingStatus,
    /// Journey shape.
    #[serde(default)]
    pub return_type: ReturnType,
    /// Free-form notes.
    #[serde(default)]
    pub extras: Option<String>,
}

impl BookingDraft {
    /// Minimal draft with the required journey and customer fields; the
    /// remaining fields take their defaults.
    pub fn new(
        from_location: impl Into<String>,
        to_location: impl Into<String>,
        departure: (NaiveDate, NaiveTime),
        arrival: (NaiveDate, NaiveTime),
        customer_name: impl Into<String>,
        customer_contact: impl Into<String>,
    ) -> Self {
        Self {
            from_location: from_location.into(),
            to_location: to_location.into(),
            departure_date: departure.0,
            departure_time: departure.1,
            arrival_date: arrival.0,
            arrival_time: arrival.1,
            customer_name: customer_name.into(),
            customer_contact: customer_contact.into(),
            driver_name: String::new(),
            driver_contact: String::new(),
            owner_name: String::new(),
            owner_contact: String::new(),
            money: 0.0,
            advance: 0.0,
            payment_amount: 0.0,
            payment_status: PaymentStatus::default(),
            oil_status: OilStatus::default(),
            booking_status: BookingStatus::default(),
            return_type: ReturnType::default(),
            extras: None,
        }
    }

    /// Required-field and amount checks.
    pub fn validate(&self) -> Result<(), BookingValidationError> {
        if self.from_location.trim().is_empty() || self.to_location.trim().is_empty() {
            return Err(BookingValidationError::MissingLocation);
        }
        if self.customer_name.trim().is_empty() || self.customer_contact.trim().is_empty() {
            return Err(BookingValidationError::MissingCustomer);
        }
        for (field, value) in [
            ("money", self.money),
            ("advance", self.advance),
            ("payment_amount", self.payment_amount),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(BookingValidationError::InvalidAmount { field, value });
            }
        }
        Ok(())
    }

    /// Materialise a stored booking for `user_id`.
    pub fn into_booking(self, id: Uuid, user_id: UserId, now: DateTime<Utc>) -> Booking {
        Booking {
            id,
            user_id,
            draft: self,
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<&Booking> for BookingDraft {
    fn from(value: &Booking) -> Self {
        value.draft.clone()
    }
}

/// Stored booking row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Row id.
    pub id: Uuid,
    /// Owning user.
    pub user_id: UserId,
    /// Editable fields.
    #[serde(flatten)]
    pub draft: BookingDraft,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Outstanding amount: fare minus advance and payments, never negative.
    #[expect(clippy::float_arithmetic, reason = "fares are stored as floating-point amounts")]
    pub fn balance_due(&self) -> f64 {
        let due = self.draft.money - self.draft.advance - self.draft.payment_amount;
        due.max(0.0)
    }

    /// Overwrite the editable fields.
    pub fn apply(&mut self, draft: BookingDraft, now: DateTime<Utc>) {
        self.draft = draft;
        self.updated_at = now;
    }
}
