//! Tagged session/profile state published by the synchroniser.

use crate::domain::auth::Session;
use crate::domain::profile::UserProfile;
use crate::domain::user::UserId;

/// Who is signed in and what their profile looks like.
///
/// A single variant replaces independent `loading`/`session`/`profile` flags,
/// so a session can never sit beside a profile belonging to another user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    /// The first session check has not resolved yet.
    #[default]
    Initializing,
    /// Nobody is signed in.
    Anonymous,
    /// Signed in with a loaded profile.
    Authenticated {
        /// Active session.
        session: Session,
        /// Profile row of `session`'s user.
        profile: UserProfile,
    },
    /// Signed in, but the profile could not be loaded.
    Degraded {
        /// Active session.
        session: Session,
    },
}

impl AuthState {
    /// Session in force, if any.
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated { session, .. } | Self::Degraded { session } => Some(session),
            Self::Initializing | Self::Anonymous => None,
        }
    }

    /// Loaded profile, if any.
    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            Self::Authenticated { profile, .. } => Some(profile),
            _ => None,
        }
    }

    /// Signed-in user id, if any.
    pub fn user_id(&self) -> Option<&UserId> {
        self.session().map(Session::user_id)
    }

    /// True once the initial session check has resolved.
    pub fn is_ready(&self) -> bool {
        !matches!(self, Self::Initializing)
    }

    /// Build the state for a session and the outcome of its profile fetch.
    pub(crate) fn for_session(session: Session, profile: Option<UserProfile>) -> Self {
        match profile {
            Some(profile) if &profile.id == session.user_id() => {
                Self::Authenticated { session, profile }
            }
            _ => Self::Degraded { session },
        }
    }
}
