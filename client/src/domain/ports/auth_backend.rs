//! Driven port for the backend's identity service.
//!
//! Adapters own the session store and push auth-state changes to subscribers
//! through [`AuthChangeHub`]. The synchroniser only ever sees [`Session`]
//! values and [`AuthChange`] notifications.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::{AuthChange, AuthResponse, Credentials, DisplayName, Session};

use super::define_port_error;

define_port_error! {
    /// Errors raised by auth backend adapters.
    pub enum AuthBackendError {
        /// Email/password pair was not accepted.
        InvalidCredentials { message: String } => "invalid login credentials: {message}",
        /// An identity already exists for the email.
        EmailTaken { message: String } => "email already registered: {message}",
        /// The backend refused the request for another reason.
        Rejected { message: String } => "auth request rejected: {message}",
        /// The backend could not be reached.
        Transport { message: String } => "auth backend unavailable: {message}",
    }
}

/// Live subscription to auth-state changes.
///
/// Dropping the subscription (or calling [`AuthSubscription::unsubscribe`])
/// detaches it from the backend client.
#[derive(Debug)]
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthChange>,
}

impl AuthSubscription {
    /// Wrap a broadcast receiver.
    pub fn new(receiver: broadcast::Receiver<AuthChange>) -> Self {
        Self { receiver }
    }

    /// Wait for the next change. Returns `None` once the backend client is
    /// gone.
    ///
    /// A subscriber that falls behind skips the changes it missed; each change
    /// carries the full session, so only the newest one matters.
    pub async fn recv(&mut self) -> Option<AuthChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "auth subscription lagged; skipping stale changes");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Detach from the backend client.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

/// Fan-out point adapters use to publish auth-state changes.
#[derive(Debug, Clone)]
pub struct AuthChangeHub {
    sender: broadcast::Sender<AuthChange>,
}

impl AuthChangeHub {
    /// Create a hub buffering at most `capacity` undelivered changes per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a change to every live subscriber.
    pub fn emit(&self, change: AuthChange) {
        if let Err(unsent) = self.sender.send(change) {
            debug!(event = ?unsent.0.event, "no auth subscribers; change dropped");
        }
    }

    /// Open a new subscription.
    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription::new(self.sender.subscribe())
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for AuthChangeHub {
    fn default() -> Self {
        Self::new(32)
    }
}

/// Port for sign-up, sign-in, sign-out and session retrieval.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Current session held by the backend client, if any.
    async fn get_session(&self) -> Result<Option<Session>, AuthBackendError>;

    /// Subscribe to auth-state changes.
    fn subscribe(&self) -> AuthSubscription;

    /// Create an identity. `name` is stored as identity metadata.
    async fn sign_up(
        &self,
        credentials: &Credentials,
        name: &DisplayName,
    ) -> Result<AuthResponse, AuthBackendError>;

    /// Authenticate with email and password.
    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthResponse, AuthBackendError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), AuthBackendError>;
}
