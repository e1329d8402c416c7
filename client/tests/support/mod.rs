//! Shared harness for integration tests against the in-memory backend.

use std::sync::Arc;

use booking_client::domain::SessionSynchronizer;
use booking_client::outbound::memory::InMemoryBackend;
use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

/// Synchroniser wired to the in-memory backend for both ports.
pub type MemorySync = SessionSynchronizer<InMemoryBackend, InMemoryBackend>;

/// Clock pinned to a fixed instant.
pub struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

/// Instant every fixture row is stamped with.
pub fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 12, 9, 30, 0)
        .single()
        .expect("valid fixture timestamp")
}

/// Backend and a started synchroniser sharing one fixed clock.
pub struct Harness {
    pub backend: Arc<InMemoryBackend>,
    pub sync: Arc<MemorySync>,
}

impl Harness {
    pub async fn start() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(FixtureClock {
            utc_now: fixture_timestamp(),
        });
        let backend = Arc::new(InMemoryBackend::with_clock(Arc::clone(&clock)));
        let sync = Arc::new(
            SessionSynchronizer::start_with_clock(Arc::clone(&backend), Arc::clone(&backend), clock)
                .await,
        );
        Self { backend, sync }
    }

    /// Harness with an account already signed up and signed in.
    pub async fn signed_up(email: &str, name: &str) -> Self {
        let harness = Self::start().await;
        harness
            .sync
            .sign_up(email, "secret123", name)
            .await
            .expect("sign-up succeeds");
        harness
    }
}
