//! Phone numbers attached to a profile (`user_phones` rows).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user::UserId;

/// Role of a phone number. At most one number per type per user.
///
/// Ordering follows display order: Primary, Secondary, Other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhoneType {
    /// Number mirrored onto the profile row.
    Primary,
    /// Second contact number.
    Secondary,
    /// Any other number.
    Other,
}

impl PhoneType {
    /// All phone types in display order.
    pub const ALL: [Self; 3] = [Self::Primary, Self::Secondary, Self::Other];

    /// Stored label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "Primary",
            Self::Secondary => "Secondary",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for PhoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhoneType {
    type Err = PhoneValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PhoneValidationError::UnknownType(s.to_owned()))
    }
}

/// Validation errors for new phone numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneValidationError {
    /// The number was blank.
    EmptyNumber,
    /// The number contained characters other than digits and separators.
    InvalidNumber,
    /// The phone type label was not recognised.
    UnknownType(String),
}

impl fmt::Display for PhoneValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyNumber => write!(f, "Please enter a phone number"),
            Self::InvalidNumber => write!(
                f,
                "phone numbers may only contain digits, spaces, and + - ( )"
            ),
            Self::UnknownType(label) => write!(f, "unknown phone type: {label}"),
        }
    }
}

impl std::error::Error for PhoneValidationError {}

/// Stored phone number row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    /// Row id.
    pub id: Uuid,
    /// Owning user.
    pub user_id: UserId,
    /// Dialling prefix, e.g. `+351`.
    #[serde(default)]
    pub country_code: Option<String>,
    /// Number as entered.
    pub phone_number: String,
    /// Role of the number.
    pub phone_type: PhoneType,
}

/// Validated phone number awaiting insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPhoneNumber {
    country_code: Option<String>,
    phone_number: String,
    phone_type: PhoneType,
}

impl NewPhoneNumber {
    /// Validate a phone number submission.
    ///
    /// # Examples
    /// ```
    /// use booking_client::domain::{NewPhoneNumber, PhoneType};
    ///
    /// let phone = NewPhoneNumber::new(Some("+351"), " 912 345 678 ", PhoneType::Primary).unwrap();
    /// assert_eq!(phone.phone_number(), "912 345 678");
    /// ```
    pub fn new(
        country_code: Option<&str>,
        phone_number: &str,
        phone_type: PhoneType,
    ) -> Result<Self, PhoneValidationError> {
        let number = phone_number.trim();
        if number.is_empty() {
            return Err(PhoneValidationError::EmptyNumber);
        }
        let allowed = |c: char| c.is_ascii_digit() || matches!(c, ' ' | '-' | '+' | '(' | ')');
        if !number.chars().all(allowed) || !number.chars().any(|c| c.is_ascii_digit()) {
            return Err(PhoneValidationError::InvalidNumber);
        }
        let prefix = country_code
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_owned);

        Ok(Self {
            country_code: prefix,
            phone_number: number.to_owned(),
            phone_type,
        })
    }

    /// Dialling prefix.
    pub fn country_code(&self) -> Option<&str> {
        self.country_code.as_deref()
    }

    /// Number as entered, trimmed.
    pub fn phone_number(&self) -> &str {
        self.phone_number.as_str()
    }

    /// Role of the number.
    pub fn phone_type(&self) -> PhoneType {
        self.phone_type
    }

    /// Materialise the stored row for `user_id` under a fresh id.
    pub fn into_row(self, user_id: UserId) -> PhoneNumber {
        PhoneNumber {
            id: Uuid::new_v4(),
            user_id,
            country_code: self.country_code,
            phone_number: self.phone_number,
            phone_type: self.phone_type,
        }
    }
}

/// Sort phone numbers into display order, keeping insertion order per type.
pub fn sort_for_display(phones: &mut [PhoneNumber]) {
    phones.sort_by_key(|phone| phone.phone_type);
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    fn row(kind: PhoneType, number: &str) -> PhoneNumber {
        NewPhoneNumber::new(None, number, kind)
            .expect("valid phone")
            .into_row(UserId::random())
    }

    #[rstest]
    #[case("", PhoneValidationError::EmptyNumber)]
    #[case("   ", PhoneValidationError::EmptyNumber)]
    #[case("call me", PhoneValidationError::InvalidNumber)]
    #[case("+-()", PhoneValidationError::InvalidNumber)]
    fn rejects_invalid_numbers(#[case] raw: &str, #[case] expected: PhoneValidationError) {
        let err = NewPhoneNumber::new(None, raw, PhoneType::Other).expect_err("invalid");
        assert_eq!(err, expected);
    }

    #[rstest]
    fn blank_country_code_is_dropped() {
        let phone = NewPhoneNumber::new(Some("  "), "123", PhoneType::Other).expect("valid");
        assert!(phone.country_code().is_none());
    }

    #[rstest]
    fn display_order_is_primary_secondary_other() {
        let mut phones = vec![
            row(PhoneType::Other, "3"),
            row(PhoneType::Primary, "1"),
            row(PhoneType::Secondary, "2"),
        ];
        sort_for_display(&mut phones);
        let kinds: Vec<_> = phones.iter().map(|p| p.phone_type).collect();
        assert_eq!(kinds, PhoneType::ALL.to_vec());
    }

    #[rstest]
    #[case("Primary", PhoneType::Primary)]
    #[case("secondary", PhoneType::Secondary)]
    #[case(" OTHER ", PhoneType::Other)]
    fn parses_type_labels(#[case] raw: &str, #[case] expected: PhoneType) {
        assert_eq!(raw.parse::<PhoneType>().expect("label"), expected);
    }

    #[rstest]
    fn serialises_type_with_stored_label() {
        let json = serde_json::to_value(PhoneType::Secondary).expect("json");
        assert_eq!(json, "Secondary");
    }
}
