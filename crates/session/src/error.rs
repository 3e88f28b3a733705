//! Session error taxonomy

use examdesk_core::StorageError;
use examdesk_http::ClientError;
use thiserror::Error;

/// Failures surfaced by [`crate::SessionStore`]
#[derive(Debug, Error)]
pub enum SessionError {
    /// Login rejected by the server; the message comes from its `detail`
    #[error("{0}")]
    Credentials(String),

    /// No usable refresh token, or the refresh exchange failed
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// The profile endpoint rejected the token or returned garbage
    #[error("Could not load profile: {0}")]
    ProfileFetch(String),

    /// Transport failure; never retried
    #[error("Network error: {0}")]
    Network(String),

    #[error("Session storage failed: {0}")]
    Storage(#[from] StorageError),
}

impl SessionError {
    pub(crate) fn from_login(err: &ClientError) -> Self {
        if err.is_network() {
            Self::Network(err.message())
        } else {
            Self::Credentials(err.message())
        }
    }

    pub(crate) fn from_profile(err: &ClientError) -> Self {
        if err.is_network() {
            Self::Network(err.message())
        } else {
            Self::ProfileFetch(err.message())
        }
    }

    /// Whether the caller was logged out as a consequence of this error
    pub const fn ends_session(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }
}
