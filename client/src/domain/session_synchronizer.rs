//! Session/profile synchroniser.
//!
//! Keeps a reactive mirror of who is signed in and what their profile looks
//! like, in step with the backend's authoritative session store.
//!
//! Every state change goes through [`SyncCore::commit`]. A transition takes an
//! epoch ticket when it starts and its commit is dropped if another transition
//! started in the meantime, so the last-started transition wins and a profile
//! fetch that outlives a sign-out cannot resurrect the profile. After a local
//! sign-out, commits carrying a session are refused until the next explicit
//! sign-in or sign-up.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    AccountSession, AuthBackend, AuthBackendError, AuthSubscription, ProfileRepository,
};
use crate::domain::{
    AuthChange, AuthEvent, AuthState, Credentials, DisplayName, Error, NewProfile, ProfileUpdate,
    Session, UserId, UserProfile,
};

/// Outcome of the backend half of a sign-out.
///
/// Local state is cleared before the backend is called, so this only records
/// whether the backend session is known to be gone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RemoteSignOut {
    /// No sign-out has been attempted.
    #[default]
    NotRequested,
    /// The backend acknowledged the sign-out.
    Confirmed,
    /// The backend call failed; the remote session may still be live.
    Pending {
        /// Failure reported by the backend.
        reason: String,
    },
}

impl RemoteSignOut {
    /// True while a failed remote sign-out awaits a retry.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommitRule {
    /// Install the new state.
    Replace,
    /// Replace only the profile, keeping the session in force, if the same
    /// user is still signed in.
    Refresh,
}

struct SyncCore<A, P> {
    auth: Arc<A>,
    profiles: Arc<P>,
    clock: Arc<dyn Clock>,
    state: watch::Sender<AuthState>,
    remote_sign_out: watch::Sender<RemoteSignOut>,
    epoch: AtomicU64,
    signed_out_locally: AtomicBool,
}

impl<A, P> SyncCore<A, P>
where
    A: AuthBackend,
    P: ProfileRepository,
{
    fn begin(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn snapshot(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Claim the next epoch only if nothing started since `snapshot`.
    fn advance_from(&self, snapshot: u64) -> Option<u64> {
        self.epoch
            .compare_exchange(snapshot, snapshot + 1, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|previous| previous + 1)
    }

    fn commit(&self, ticket: u64, next: AuthState, rule: CommitRule) -> bool {
        let mut applied = false;
        self.state.send_if_modified(|current| {
            if self.epoch.load(Ordering::SeqCst) != ticket {
                return false;
            }
            if next.session().is_some() && self.signed_out_locally.load(Ordering::SeqCst) {
                return false;
            }
            let candidate = match rule {
                CommitRule::Replace => next,
                CommitRule::Refresh => match refreshed(current, next) {
                    Some(state) => state,
                    None => return false,
                },
            };
            applied = true;
            let merged = keep_known_profile(current, candidate);
            if *current == merged {
                return false;
            }
            debug!(from = state_label(current), to = state_label(&merged), "auth state transition");
            *current = merged;
            true
        });
        applied
    }

    async fn fetch_profile(&self, user_id: &UserId) -> Option<UserProfile> {
        match self.profiles.find_by_id(user_id).await {
            Ok(Some(profile)) => Some(profile),
            Ok(None) => {
                warn!(user_id = %user_id, "no profile row for signed-in user");
                None
            }
            Err(error) => {
                warn!(user_id = %user_id, error = %error, "error fetching user profile");
                None
            }
        }
    }

    async fn resolve(&self, session: Option<Session>) -> AuthState {
        match session {
            None => AuthState::Anonymous,
            Some(session) => {
                let profile = self.fetch_profile(session.user_id()).await;
                AuthState::for_session(session, profile)
            }
        }
    }

    async fn apply_change(&self, change: AuthChange) {
        let AuthChange { event, session } = change;
        if event == AuthEvent::SignedOut {
            self.signed_out_locally.store(false, Ordering::SeqCst);
        }
        if session.is_some() && self.signed_out_locally.load(Ordering::SeqCst) {
            debug!(?event, "ignoring auth change after local sign-out");
            return;
        }
        let ticket = self.begin();
        let next = self.resolve(session).await;
        if !self.commit(ticket, next, CommitRule::Replace) {
            debug!(?event, "discarding superseded auth change");
        }
    }

    async fn sign_out(&self) -> RemoteSignOut {
        self.signed_out_locally.store(true, Ordering::SeqCst);
        let ticket = self.begin();
        self.commit(ticket, AuthState::Anonymous, CommitRule::Replace);
        info!("signed out locally");
        self.sign_out_remote().await
    }

    async fn sign_out_remote(&self) -> RemoteSignOut {
        let outcome = match self.auth.sign_out().await {
            Ok(()) => RemoteSignOut::Confirmed,
            Err(error) => {
                warn!(error = %error, "remote sign-out failed; local state already cleared");
                RemoteSignOut::Pending {
                    reason: error.to_string(),
                }
            }
        };
        self.remote_sign_out.send_replace(outcome.clone());
        outcome
    }
}

/// Profile refresh on top of the session currently in force.
///
/// Returns `None` when a different user (or nobody) is signed in now.
fn refreshed(current: &AuthState, next: AuthState) -> Option<AuthState> {
    let session = current.session()?;
    if next.user_id() != Some(session.user_id()) {
        return None;
    }
    let profile = match next {
        AuthState::Authenticated { profile, .. } => Some(profile),
        AuthState::Initializing | AuthState::Anonymous | AuthState::Degraded { .. } => None,
    };
    Some(AuthState::for_session(session.clone(), profile))
}

/// A failed refresh for the user already on screen keeps their last profile.
fn keep_known_profile(current: &AuthState, next: AuthState) -> AuthState {
    match (current, next) {
        (AuthState::Authenticated { profile, .. }, AuthState::Degraded { session })
            if &profile.id == session.user_id() =>
        {
            AuthState::Authenticated {
                session,
                profile: profile.clone(),
            }
        }
        (_, next) => next,
    }
}

fn state_label(state: &AuthState) -> &'static str {
    match state {
        AuthState::Initializing => "initializing",
        AuthState::Anonymous => "anonymous",
        AuthState::Authenticated { .. } => "authenticated",
        AuthState::Degraded { .. } => "degraded",
    }
}

fn map_sign_up_error(error: AuthBackendError) -> Error {
    match error {
        AuthBackendError::InvalidCredentials { message } | AuthBackendError::Rejected { message } => {
            Error::validation(message)
        }
        AuthBackendError::EmailTaken { message } => Error::auth(message),
        AuthBackendError::Transport { message } => Error::network(message),
    }
}

fn map_sign_in_error(error: AuthBackendError) -> Error {
    match error {
        AuthBackendError::InvalidCredentials { message }
        | AuthBackendError::EmailTaken { message }
        | AuthBackendError::Rejected { message } => Error::auth(message),
        AuthBackendError::Transport { message } => Error::network(message),
    }
}

/// Session/profile synchroniser: the explicit auth context handed to the rest
/// of the app.
///
/// Construct once with [`SessionSynchronizer::start`]; call
/// [`SessionSynchronizer::shutdown`] (or drop it) to unsubscribe from the
/// backend's change notifications.
pub struct SessionSynchronizer<A, P> {
    core: Arc<SyncCore<A, P>>,
    listener: JoinHandle<()>,
}

impl<A, P> SessionSynchronizer<A, P>
where
    A: AuthBackend + 'static,
    P: ProfileRepository + 'static,
{
    /// Subscribe to auth changes, resolve the initial session and start
    /// listening.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn start(auth: Arc<A>, profiles: Arc<P>) -> Self {
        Self::start_with_clock(auth, profiles, Arc::new(DefaultClock)).await
    }

    /// [`SessionSynchronizer::start`] with an explicit clock for profile
    /// timestamps.
    pub async fn start_with_clock(auth: Arc<A>, profiles: Arc<P>, clock: Arc<dyn Clock>) -> Self {
        let (state, _) = watch::channel(AuthState::Initializing);
        let (remote_sign_out, _) = watch::channel(RemoteSignOut::NotRequested);
        let core = Arc::new(SyncCore {
            auth,
            profiles,
            clock,
            state,
            remote_sign_out,
            epoch: AtomicU64::new(0),
            signed_out_locally: AtomicBool::new(false),
        });

        // Subscribe before reading the session so no change slips between.
        let subscription = core.auth.subscribe();
        let initial = match core.auth.get_session().await {
            Ok(session) => session,
            Err(error) => {
                warn!(error = %error, "initial session check failed; starting anonymous");
                None
            }
        };
        core.apply_change(AuthChange::new(AuthEvent::InitialSession, initial))
            .await;

        let listener = tokio::spawn(listen(Arc::clone(&core), subscription));
        Self { core, listener }
    }

    /// Stop listening for auth changes. State stays readable.
    pub fn shutdown(&self) {
        self.listener.abort();
    }

    /// True while the change listener is running.
    pub fn is_listening(&self) -> bool {
        !self.listener.is_finished()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.core.state.borrow().clone()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.core.state.subscribe()
    }

    /// Current session, if any.
    pub fn session(&self) -> Option<Session> {
        self.core.state.borrow().session().cloned()
    }

    /// Current profile, if loaded.
    pub fn profile(&self) -> Option<UserProfile> {
        self.core.state.borrow().profile().cloned()
    }

    /// Outcome of the most recent remote sign-out.
    pub fn remote_sign_out(&self) -> RemoteSignOut {
        self.core.remote_sign_out.borrow().clone()
    }

    /// Wait until the initial session check has resolved.
    pub async fn wait_until_ready(&self) -> AuthState {
        let mut receiver = self.core.state.subscribe();
        match receiver.wait_for(AuthState::is_ready).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Create an identity and its profile row.
    ///
    /// If the profile cannot be written or read back, the new identity is
    /// signed out again before the error is returned so no authenticated
    /// identity is left without a profile.
    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<UserProfile, Error> {
        let credentials = Credentials::try_from_parts(email, password)
            .map_err(|err| Error::validation(err.to_string()))?;
        let display_name =
            DisplayName::new(name).map_err(|err| Error::validation(err.to_string()))?;

        self.core.signed_out_locally.store(false, Ordering::SeqCst);
        let response = self
            .core
            .auth
            .sign_up(&credentials, &display_name)
            .await
            .map_err(|err| {
                warn!(error = %err, "sign-up rejected");
                map_sign_up_error(err)
            })?;
        let user_id = response.user_id.clone();

        let new_profile = NewProfile {
            id: user_id.clone(),
            email: credentials.email().clone(),
            name: display_name,
            created_at: self.core.clock.utc(),
        };
        if let Err(error) = self.core.profiles.upsert(&new_profile).await {
            warn!(user_id = %user_id, error = %error, "profile creation failed; signing identity out");
            self.core.sign_out().await;
            return Err(Error::profile_creation("Failed to create user profile"));
        }

        let profile = match self.core.profiles.find_by_id(&user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                warn!(user_id = %user_id, "profile missing after upsert; signing identity out");
                self.core.sign_out().await;
                return Err(Error::profile_creation("Failed to verify user profile"));
            }
            Err(error) => {
                warn!(user_id = %user_id, error = %error, "profile verification failed; signing identity out");
                self.core.sign_out().await;
                return Err(Error::profile_creation("Failed to verify user profile"));
            }
        };

        if let Some(session) = response.session {
            let ticket = self.core.begin();
            self.core.commit(
                ticket,
                AuthState::for_session(session, Some(profile.clone())),
                CommitRule::Replace,
            );
        } else {
            debug!(user_id = %user_id, "sign-up issued no session; awaiting confirmation");
        }
        info!(user_id = %user_id, "signed up");
        Ok(profile)
    }

    /// Authenticate and load the profile.
    ///
    /// A failed profile fetch leaves the synchroniser [`AuthState::Degraded`]
    /// rather than failing the sign-in. Navigation is left to the caller.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), Error> {
        let credentials = Credentials::for_sign_in(email, password)
            .map_err(|err| Error::validation(err.to_string()))?;

        self.core.signed_out_locally.store(false, Ordering::SeqCst);
        let response = self
            .core
            .auth
            .sign_in_with_password(&credentials)
            .await
            .map_err(|err| {
                warn!(error = %err, "sign-in rejected");
                map_sign_in_error(err)
            })?;
        let Some(session) = response.session else {
            return Err(Error::auth("sign-in did not return a session"));
        };

        let ticket = self.core.begin();
        let next = self.core.resolve(Some(session)).await;
        self.core.commit(ticket, next, CommitRule::Replace);
        info!(user_id = %response.user_id, "signed in");
        Ok(())
    }

    /// Clear local state, then sign out of the backend on a best-effort
    /// basis. Never fails; a backend failure is recorded as
    /// [`RemoteSignOut::Pending`].
    pub async fn sign_out(&self) -> RemoteSignOut {
        self.core.sign_out().await
    }

    /// Retry a failed remote sign-out. Does nothing unless one is pending.
    pub async fn retry_remote_sign_out(&self) -> RemoteSignOut {
        let current = self.remote_sign_out();
        if !current.is_pending() {
            return current;
        }
        debug!("retrying remote sign-out");
        self.core.sign_out_remote().await
    }

    /// Write a partial profile update, then re-fetch the full row.
    ///
    /// The local profile is never patched from `update`; the re-fetch picks up
    /// any server-side defaults. A failed re-fetch is logged and keeps the
    /// previous profile.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<(), Error> {
        let session = self.session().ok_or_else(Error::not_authenticated)?;
        let user_id = session.user_id().clone();

        self.core
            .profiles
            .update(&user_id, &update)
            .await
            .map_err(|err| {
                warn!(user_id = %user_id, error = %err, "profile update failed");
                Error::profile_update(format!("Error updating profile: {err}"))
            })?;

        let ticket = self.core.begin();
        let profile = self.core.fetch_profile(&user_id).await;
        self.core.commit(
            ticket,
            AuthState::for_session(session, profile),
            CommitRule::Refresh,
        );
        debug!(user_id = %user_id, "profile updated");
        Ok(())
    }

    /// Re-validate that a backend session exists and its profile row can be
    /// read. Returns `false` instead of failing.
    pub async fn check_user(&self) -> bool {
        if self.core.signed_out_locally.load(Ordering::SeqCst) {
            return false;
        }
        let snapshot = self.core.snapshot();
        let session = match self.core.auth.get_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return false,
            Err(error) => {
                warn!(error = %error, "error checking user session");
                return false;
            }
        };
        let profile = match self.core.profiles.find_by_id(session.user_id()).await {
            Ok(Some(profile)) => profile,
            Ok(None) => return false,
            Err(error) => {
                warn!(user_id = %session.user_id(), error = %error, "error checking user profile");
                return false;
            }
        };

        match self.core.advance_from(snapshot) {
            Some(ticket) => {
                self.core.commit(
                    ticket,
                    AuthState::Authenticated { session, profile },
                    CommitRule::Replace,
                );
            }
            None => debug!("state changed during user check; leaving it untouched"),
        }
        true
    }
}

async fn listen<A, P>(core: Arc<SyncCore<A, P>>, mut subscription: AuthSubscription)
where
    A: AuthBackend,
    P: ProfileRepository,
{
    while let Some(change) = subscription.recv().await {
        core.apply_change(change).await;
    }
    debug!("auth change stream closed");
}

impl<A, P> Drop for SessionSynchronizer<A, P> {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[async_trait]
impl<A, P> AccountSession for SessionSynchronizer<A, P>
where
    A: AuthBackend + 'static,
    P: ProfileRepository + 'static,
{
    fn current_user_id(&self) -> Option<UserId> {
        self.core.state.borrow().user_id().cloned()
    }

    async fn update_profile(&self, update: ProfileUpdate) -> Result<(), Error> {
        SessionSynchronizer::update_profile(self, update).await
    }
}

#[cfg(test)]
#[path = "session_synchronizer_tests.rs"]
mod tests;
