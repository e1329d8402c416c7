//! In-memory backend implementing every driven port.
//!
//! Behaves like the hosted backend closely enough for integration tests:
//! sessions are cached and broadcast, `(user, phone type)` is unique, and
//! failures can be injected per concern.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::domain::ports::{
    AuthBackend, AuthBackendError, AuthChangeHub, AuthSubscription, BlobStore, BlobStoreError,
    BlobUpload, BookingRepository, BookingRepositoryError, PhoneRepository, PhoneRepositoryError,
    ProfileRepository, ProfileRepositoryError,
};
use crate::domain::{
    AuthChange, AuthEvent, AuthResponse, Booking, BookingDraft, Credentials, DisplayName,
    NewPhoneNumber, NewProfile, PhoneNumber, ProfileUpdate, Session, UserId, UserProfile,
};

struct Account {
    id: UserId,
    password: Zeroizing<String>,
}

struct StoredBlob {
    bytes: Vec<u8>,
    content_type: String,
}

#[derive(Default)]
struct Store {
    accounts: HashMap<String, Account>,
    session: Option<Session>,
    profiles: HashMap<UserId, UserProfile>,
    phones: Vec<PhoneNumber>,
    bookings: HashMap<Uuid, Booking>,
    blobs: HashMap<(String, String), StoredBlob>,
}

#[derive(Default)]
struct Faults {
    sign_out: AtomicBool,
    profile_upsert: AtomicBool,
    profile_reads: AtomicBool,
    profile_read_delay_ms: AtomicU64,
    profile_write_delay_ms: AtomicU64,
}

/// Backend double holding all state in process memory.
pub struct InMemoryBackend {
    store: Mutex<Store>,
    hub: AuthChangeHub,
    clock: Arc<dyn Clock>,
    faults: Faults,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Empty backend using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }

    /// Empty backend stamping rows with `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Mutex::new(Store::default()),
            hub: AuthChangeHub::default(),
            clock,
            faults: Faults::default(),
        }
    }

    /// Make backend sign-out fail while `enabled`; the session stays live.
    pub fn fail_sign_out(&self, enabled: bool) {
        self.faults.sign_out.store(enabled, Ordering::SeqCst);
    }

    /// Make profile upserts fail while `enabled`.
    pub fn fail_profile_upserts(&self, enabled: bool) {
        self.faults.profile_upsert.store(enabled, Ordering::SeqCst);
    }

    /// Make profile reads fail while `enabled`.
    pub fn fail_profile_reads(&self, enabled: bool) {
        self.faults.profile_reads.store(enabled, Ordering::SeqCst);
    }

    /// Delay every profile read by `delay`.
    pub fn delay_profile_reads(&self, delay: Duration) {
        self.faults
            .profile_read_delay_ms
            .store(as_millis(delay), Ordering::SeqCst);
    }

    /// Delay every profile update by `delay`, before the row is written.
    pub fn delay_profile_writes(&self, delay: Duration) {
        self.faults
            .profile_write_delay_ms
            .store(as_millis(delay), Ordering::SeqCst);
    }

    /// Session currently held by the backend.
    pub async fn current_session(&self) -> Option<Session> {
        self.store.lock().await.session.clone()
    }

    /// Stored profile row for `id`.
    pub async fn stored_profile(&self, id: &UserId) -> Option<UserProfile> {
        self.store.lock().await.profiles.get(id).cloned()
    }

    /// Stored phone rows for `id`.
    pub async fn stored_phones(&self, id: &UserId) -> Vec<PhoneNumber> {
        self.store
            .lock()
            .await
            .phones
            .iter()
            .filter(|row| &row.user_id == id)
            .cloned()
            .collect()
    }

    /// Bytes stored at `bucket`/`path`.
    pub async fn stored_blob(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.store
            .lock()
            .await
            .blobs
            .get(&(bucket.to_owned(), path.to_owned()))
            .map(|blob| blob.bytes.clone())
    }

    /// Content type recorded for `bucket`/`path`.
    pub async fn stored_content_type(&self, bucket: &str, path: &str) -> Option<String> {
        self.store
            .lock()
            .await
            .blobs
            .get(&(bucket.to_owned(), path.to_owned()))
            .map(|blob| blob.content_type.clone())
    }

    /// Publish an arbitrary auth change, as the hosted client does on token
    /// refresh.
    pub fn emit(&self, change: AuthChange) {
        self.hub.emit(change);
    }

    fn issue_session(&self, id: &UserId, credentials: &Credentials) -> Session {
        let expires = self.clock.utc() + chrono::Duration::hours(1);
        Session::new(
            id.clone(),
            Some(credentials.email().clone()),
            format!("access-{}", Uuid::new_v4()),
            format!("refresh-{}", Uuid::new_v4()),
            Some(expires),
        )
    }
}

fn as_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

async fn pause_for(delay_ms: &AtomicU64) {
    let millis = delay_ms.load(Ordering::SeqCst);
    if millis > 0 {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}

#[async_trait]
impl AuthBackend for InMemoryBackend {
    async fn get_session(&self) -> Result<Option<Session>, AuthBackendError> {
        Ok(self.current_session().await)
    }

    fn subscribe(&self) -> AuthSubscription {
        self.hub.subscribe()
    }

    async fn sign_up(
        &self,
        credentials: &Credentials,
        _name: &DisplayName,
    ) -> Result<AuthResponse, AuthBackendError> {
        let email = credentials.email().to_string();
        let session = {
            let mut store = self.store.lock().await;
            if store.accounts.contains_key(&email) {
                return Err(AuthBackendError::email_taken("User already registered"));
            }
            let id = UserId::random();
            store.accounts.insert(
                email,
                Account {
                    id: id.clone(),
                    password: Zeroizing::new(credentials.password().to_owned()),
                },
            );
            let session = self.issue_session(&id, credentials);
            store.session = Some(session.clone());
            session
        };
        debug!(user_id = %session.user_id(), "memory backend: identity created");
        self.hub
            .emit(AuthChange::new(AuthEvent::SignedIn, Some(session.clone())));
        Ok(AuthResponse {
            user_id: session.user_id().clone(),
            session: Some(session),
        })
    }

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthResponse, AuthBackendError> {
        let session = {
            let mut store = self.store.lock().await;
            let id = store
                .accounts
                .get(credentials.email().as_ref())
                .filter(|account| account.password.as_str() == credentials.password())
                .map(|account| account.id.clone())
                .ok_or_else(|| AuthBackendError::invalid_credentials("Invalid login credentials"))?;
            let session = self.issue_session(&id, credentials);
            store.session = Some(session.clone());
            session
        };
        self.hub
            .emit(AuthChange::new(AuthEvent::SignedIn, Some(session.clone())));
        Ok(AuthResponse {
            user_id: session.user_id().clone(),
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> Result<(), AuthBackendError> {
        if self.faults.sign_out.load(Ordering::SeqCst) {
            return Err(AuthBackendError::transport("network request failed"));
        }
        self.store.lock().await.session = None;
        self.hub.emit(AuthChange::signed_out());
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryBackend {
    async fn upsert(&self, profile: &NewProfile) -> Result<(), ProfileRepositoryError> {
        if self.faults.profile_upsert.load(Ordering::SeqCst) {
            return Err(ProfileRepositoryError::query(
                "new row violates row-level security policy",
            ));
        }
        let mut store = self.store.lock().await;
        match store.profiles.get_mut(&profile.id) {
            Some(existing) => {
                existing.email = profile.email.to_string();
                existing.name = profile.name.to_string();
            }
            None => {
                store
                    .profiles
                    .insert(profile.id.clone(), profile.clone().into_profile());
            }
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserProfile>, ProfileRepositoryError> {
        pause_for(&self.faults.profile_read_delay_ms).await;
        if self.faults.profile_reads.load(Ordering::SeqCst) {
            return Err(ProfileRepositoryError::connection("connection refused"));
        }
        Ok(self.stored_profile(id).await)
    }

    async fn update(&self, id: &UserId, update: &ProfileUpdate) -> Result<(), ProfileRepositoryError> {
        pause_for(&self.faults.profile_write_delay_ms).await;
        let mut store = self.store.lock().await;
        let profile = store
            .profiles
            .get_mut(id)
            .ok_or_else(|| ProfileRepositoryError::not_found(id.to_string()))?;
        update.apply_to(profile);
        Ok(())
    }
}

#[async_trait]
impl PhoneRepository for InMemoryBackend {
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<PhoneNumber>, PhoneRepositoryError> {
        Ok(self.stored_phones(user_id).await)
    }

    async fn insert(
        &self,
        user_id: &UserId,
        phone: &NewPhoneNumber,
    ) -> Result<PhoneNumber, PhoneRepositoryError> {
        let mut store = self.store.lock().await;
        let taken = store
            .phones
            .iter()
            .any(|row| &row.user_id == user_id && row.phone_type == phone.phone_type());
        if taken {
            return Err(PhoneRepositoryError::duplicate(format!(
                "{} number exists for {user_id}",
                phone.phone_type()
            )));
        }
        let row = phone.clone().into_row(user_id.clone());
        store.phones.push(row.clone());
        Ok(row)
    }

    async fn delete(&self, id: &Uuid) -> Result<(), PhoneRepositoryError> {
        self.store.lock().await.phones.retain(|row| &row.id != id);
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for InMemoryBackend {
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Booking>, BookingRepositoryError> {
        Ok(self
            .store
            .lock()
            .await
            .bookings
            .values()
            .filter(|booking| &booking.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Booking>, BookingRepositoryError> {
        Ok(self.store.lock().await.bookings.get(id).cloned())
    }

    async fn insert(
        &self,
        user_id: &UserId,
        draft: &BookingDraft,
    ) -> Result<Booking, BookingRepositoryError> {
        let booking = draft
            .clone()
            .into_booking(Uuid::new_v4(), user_id.clone(), self.clock.utc());
        self.store
            .lock()
            .await
            .bookings
            .insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn update(&self, id: &Uuid, draft: &BookingDraft) -> Result<(), BookingRepositoryError> {
        let now = self.clock.utc();
        let mut store = self.store.lock().await;
        let booking = store
            .bookings
            .get_mut(id)
            .ok_or_else(|| BookingRepositoryError::not_found(id.to_string()))?;
        booking.apply(draft.clone(), now);
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), BookingRepositoryError> {
        self.store.lock().await.bookings.remove(id);
        Ok(())
    }
}

#[async_trait]
impl BlobStore for InMemoryBackend {
    async fn upload(&self, upload: &BlobUpload) -> Result<(), BlobStoreError> {
        let key = (upload.bucket.clone(), upload.path.clone());
        let mut store = self.store.lock().await;
        if !upload.upsert && store.blobs.contains_key(&key) {
            return Err(BlobStoreError::rejected("The resource already exists"));
        }
        store.blobs.insert(
            key,
            StoredBlob {
                bytes: upload.bytes.clone(),
                content_type: upload.content_type.clone(),
            },
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://storage/{bucket}/{path}")
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::PhoneType;
    use rstest::rstest;

    fn credentials(email: &str) -> Credentials {
        Credentials::try_from_parts(email, "secret1").expect("credentials")
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let backend = InMemoryBackend::new();
        let name = DisplayName::new("Ana").expect("name");
        backend
            .sign_up(&credentials("ana@example.com"), &name)
            .await
            .expect("first sign-up");

        let error = backend
            .sign_up(&credentials("ANA@example.com"), &name)
            .await
            .expect_err("duplicate");

        assert!(matches!(error, AuthBackendError::EmailTaken { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let backend = InMemoryBackend::new();
        let name = DisplayName::new("Ana").expect("name");
        backend
            .sign_up(&credentials("ana@example.com"), &name)
            .await
            .expect("sign-up");
        let wrong = Credentials::try_from_parts("ana@example.com", "secret2").expect("credentials");

        let error = backend
            .sign_in_with_password(&wrong)
            .await
            .expect_err("wrong password");

        assert!(matches!(error, AuthBackendError::InvalidCredentials { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn sign_out_broadcasts_and_clears_session() {
        let backend = InMemoryBackend::new();
        let mut changes = backend.subscribe();
        backend
            .sign_up(&credentials("ana@example.com"), &DisplayName::new("Ana").expect("name"))
            .await
            .expect("sign-up");
        backend.sign_out().await.expect("sign-out");

        assert_eq!(changes.recv().await.map(|c| c.event), Some(AuthEvent::SignedIn));
        assert_eq!(changes.recv().await.map(|c| c.event), Some(AuthEvent::SignedOut));
        assert!(backend.current_session().await.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn phone_type_is_unique_per_user() {
        let backend = InMemoryBackend::new();
        let user = UserId::random();
        let phone = NewPhoneNumber::new(None, "912", PhoneType::Primary).expect("phone");
        PhoneRepository::insert(&backend, &user, &phone)
            .await
            .expect("first");

        let error = PhoneRepository::insert(&backend, &user, &phone)
            .await
            .expect_err("duplicate");

        assert!(matches!(error, PhoneRepositoryError::Duplicate { .. }));
        assert_eq!(backend.stored_phones(&user).await.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn upload_without_upsert_refuses_overwrite() {
        let backend = InMemoryBackend::new();
        let mut upload = BlobUpload {
            bucket: "profile-images".to_owned(),
            path: "a.png".to_owned(),
            bytes: vec![1],
            content_type: "image/png".to_owned(),
            upsert: false,
        };
        backend.upload(&upload).await.expect("first upload");
        assert!(backend.upload(&upload).await.is_err());

        upload.upsert = true;
        upload.bytes = vec![2];
        backend.upload(&upload).await.expect("upsert");
        assert_eq!(backend.stored_blob("profile-images", "a.png").await, Some(vec![2]));
    }
}
