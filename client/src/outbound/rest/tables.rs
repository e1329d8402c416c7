//! Row repositories over the hosted backend's PostgREST endpoints.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use uuid::Uuid;

use super::backend::{HttpFailure, RestBackend, eq_filter};
use super::dto::{BookingRowDto, NewPhoneRowDto};
use crate::domain::ports::{
    BookingRepository, BookingRepositoryError, PhoneRepository, PhoneRepositoryError,
    ProfileRepository, ProfileRepositoryError,
};
use crate::domain::{
    Booking, BookingDraft, NewPhoneNumber, NewProfile, PhoneNumber, ProfileUpdate, UserId,
    UserProfile,
};

const USERS_TABLE: &str = "rest/v1/users";
const PHONES_TABLE: &str = "rest/v1/user_phones";
const BOOKINGS_TABLE: &str = "rest/v1/bookings";

const PREFER: &str = "Prefer";
const RETURN_ROWS: &str = "return=representation";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates";

/// Postgres unique-violation code surfaced by PostgREST.
const UNIQUE_VIOLATION: &str = "23505";

fn is_connection(failure: &HttpFailure) -> bool {
    match failure {
        HttpFailure::Transport(_) | HttpFailure::Timeout(_) => true,
        HttpFailure::Status { status, .. } => status.is_server_error(),
        HttpFailure::Decode(_) => false,
    }
}

fn map_profile_failure(failure: HttpFailure) -> ProfileRepositoryError {
    if is_connection(&failure) {
        ProfileRepositoryError::connection(failure.describe())
    } else {
        ProfileRepositoryError::query(failure.describe())
    }
}

fn map_phone_failure(failure: HttpFailure) -> PhoneRepositoryError {
    match &failure {
        HttpFailure::Status { status, code, .. }
            if *status == StatusCode::CONFLICT || code.as_deref() == Some(UNIQUE_VIOLATION) =>
        {
            PhoneRepositoryError::duplicate(failure.describe())
        }
        _ if is_connection(&failure) => PhoneRepositoryError::connection(failure.describe()),
        _ => PhoneRepositoryError::query(failure.describe()),
    }
}

fn map_booking_failure(failure: HttpFailure) -> BookingRepositoryError {
    if is_connection(&failure) {
        BookingRepositoryError::connection(failure.describe())
    } else {
        BookingRepositoryError::query(failure.describe())
    }
}

#[async_trait]
impl ProfileRepository for RestBackend {
    async fn upsert(&self, profile: &NewProfile) -> Result<(), ProfileRepositoryError> {
        let url = self.endpoint(USERS_TABLE).map_err(map_profile_failure)?;
        let builder = self
            .request(Method::POST, url)
            .await
            .header(PREFER, MERGE_DUPLICATES)
            .json(profile);
        self.execute_empty(builder)
            .await
            .map_err(map_profile_failure)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserProfile>, ProfileRepositoryError> {
        let url = self.endpoint(USERS_TABLE).map_err(map_profile_failure)?;
        let builder = self
            .request(Method::GET, eq_filter(url, "id", id.as_ref()))
            .await;
        let rows: Vec<UserProfile> = self.execute(builder).await.map_err(map_profile_failure)?;
        Ok(rows.into_iter().next())
    }

    async fn update(&self, id: &UserId, update: &ProfileUpdate) -> Result<(), ProfileRepositoryError> {
        let url = self.endpoint(USERS_TABLE).map_err(map_profile_failure)?;
        let builder = self
            .request(Method::PATCH, eq_filter(url, "id", id.as_ref()))
            .await
            .header(PREFER, RETURN_ROWS)
            .json(update);
        let rows: Vec<UserProfile> = self.execute(builder).await.map_err(map_profile_failure)?;
        if rows.is_empty() {
            return Err(ProfileRepositoryError::not_found(id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PhoneRepository for RestBackend {
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<PhoneNumber>, PhoneRepositoryError> {
        let url = self.endpoint(PHONES_TABLE).map_err(map_phone_failure)?;
        let builder = self
            .request(Method::GET, eq_filter(url, "user_id", user_id.as_ref()))
            .await;
        self.execute(builder).await.map_err(map_phone_failure)
    }

    async fn insert(
        &self,
        user_id: &UserId,
        phone: &NewPhoneNumber,
    ) -> Result<PhoneNumber, PhoneRepositoryError> {
        let url = self.endpoint(PHONES_TABLE).map_err(map_phone_failure)?;
        let builder = self
            .request(Method::POST, url)
            .await
            .header(PREFER, RETURN_ROWS)
            .json(&NewPhoneRowDto::new(user_id, phone));
        let rows: Vec<PhoneNumber> = self.execute(builder).await.map_err(map_phone_failure)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| PhoneRepositoryError::query("insert returned no row"))
    }

    async fn delete(&self, id: &Uuid) -> Result<(), PhoneRepositoryError> {
        let url = self.endpoint(PHONES_TABLE).map_err(map_phone_failure)?;
        let builder = self
            .request(Method::DELETE, eq_filter(url, "id", &id.to_string()))
            .await;
        self.execute_empty(builder).await.map_err(map_phone_failure)
    }
}

#[async_trait]
impl BookingRepository for RestBackend {
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Booking>, BookingRepositoryError> {
        let url = self.endpoint(BOOKINGS_TABLE).map_err(map_booking_failure)?;
        let mut filtered = eq_filter(url, "user_id", user_id.as_ref());
        filtered
            .query_pairs_mut()
            .append_pair("order", "departure_date.desc,departure_time.desc");
        let builder = self.request(Method::GET, filtered).await;
        self.execute(builder).await.map_err(map_booking_failure)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Booking>, BookingRepositoryError> {
        let url = self.endpoint(BOOKINGS_TABLE).map_err(map_booking_failure)?;
        let builder = self
            .request(Method::GET, eq_filter(url, "id", &id.to_string()))
            .await;
        let rows: Vec<Booking> = self.execute(builder).await.map_err(map_booking_failure)?;
        Ok(rows.into_iter().next())
    }

    async fn insert(
        &self,
        user_id: &UserId,
        draft: &BookingDraft,
    ) -> Result<Booking, BookingRepositoryError> {
        let url = self.endpoint(BOOKINGS_TABLE).map_err(map_booking_failure)?;
        let row = BookingRowDto {
            user_id: Some(user_id),
            draft,
            updated_at: self.clock.utc(),
        };
        let builder = self
            .request(Method::POST, url)
            .await
            .header(PREFER, RETURN_ROWS)
            .json(&row);
        let rows: Vec<Booking> = self.execute(builder).await.map_err(map_booking_failure)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BookingRepositoryError::query("insert returned no row"))
    }

    async fn update(&self, id: &Uuid, draft: &BookingDraft) -> Result<(), BookingRepositoryError> {
        let url = self.endpoint(BOOKINGS_TABLE).map_err(map_booking_failure)?;
        let row = BookingRowDto {
            user_id: None,
            draft,
            updated_at: self.clock.utc(),
        };
        let builder = self
            .request(Method::PATCH, eq_filter(url, "id", &id.to_string()))
            .await
            .header(PREFER, RETURN_ROWS)
            .json(&row);
        let rows: Vec<Booking> = self.execute(builder).await.map_err(map_booking_failure)?;
        if rows.is_empty() {
            return Err(BookingRepositoryError::not_found(id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), BookingRepositoryError> {
        let url = self.endpoint(BOOKINGS_TABLE).map_err(map_booking_failure)?;
        let builder = self
            .request(Method::DELETE, eq_filter(url, "id", &id.to_string()))
            .await;
        self.execute_empty(builder).await.map_err(map_booking_failure)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for row failure mapping.
    use super::*;
    use rstest::rstest;

    fn status(status: StatusCode, code: Option<&str>) -> HttpFailure {
        HttpFailure::Status {
            status,
            message: "failed".to_owned(),
            code: code.map(str::to_owned),
        }
    }

    #[rstest]
    #[case::conflict(status(StatusCode::CONFLICT, None))]
    #[case::unique_code(status(StatusCode::BAD_REQUEST, Some("23505")))]
    fn unique_violations_are_duplicates(#[case] failure: HttpFailure) {
        assert!(matches!(
            map_phone_failure(failure),
            PhoneRepositoryError::Duplicate { .. }
        ));
    }

    #[rstest]
    #[case::timeout(HttpFailure::Timeout("slow".to_owned()), true)]
    #[case::server(status(StatusCode::SERVICE_UNAVAILABLE, None), true)]
    #[case::forbidden(status(StatusCode::FORBIDDEN, Some("42501")), false)]
    #[case::decode(HttpFailure::Decode("bad json".to_owned()), false)]
    fn connection_failures_are_distinguished(#[case] failure: HttpFailure, #[case] connection: bool) {
        let mapped = map_profile_failure(failure);
        assert_eq!(
            matches!(mapped, ProfileRepositoryError::Connection { .. }),
            connection
        );
    }

    #[rstest]
    fn booking_server_errors_map_to_connection() {
        assert!(matches!(
            map_booking_failure(status(StatusCode::BAD_GATEWAY, None)),
            BookingRepositoryError::Connection { .. }
        ));
    }
}
