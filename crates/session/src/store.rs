//! Session lifecycle: initialize, login, logout, profile refresh
//!
//! State machine:
//!
//! ```text
//! Loading --initialize--> Unauthenticated | Authenticated
//! Unauthenticated --login ok--> Authenticated
//! Authenticated --logout | refresh_profile failure | refresh failure--> Unauthenticated
//! ```
//!
//! Every write replaces the whole token pair or the whole identity, so a task
//! that finishes after its caller went away still leaves a consistent session.

use crate::error::SessionError;
use examdesk_core::{AuthState, Identity, KeyValueStore, SessionTokens, TokenStore};
use examdesk_http::AuthGateway;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, watch};
use tracing::{debug, info, warn};

struct Inner {
    gateway: Arc<dyn AuthGateway>,
    tokens: TokenStore,
    state: watch::Sender<AuthState>,
    initialized: OnceCell<()>,
    // Serializes refresh exchanges; refresh tokens are single use.
    refresh_guard: Mutex<()>,
}

/// Process-wide session handle; clones share the same session
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    pub fn new(gateway: Arc<dyn AuthGateway>, storage: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(AuthState::loading());
        Self {
            inner: Arc::new(Inner {
                gateway,
                tokens: TokenStore::new(storage),
                state,
                initialized: OnceCell::new(),
                refresh_guard: Mutex::new(()),
            }),
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.state.borrow().identity.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Persisted access token, if a complete pair is stored
    pub fn access_token(&self) -> Option<String> {
        self.inner.tokens.access_token().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read session storage");
            None
        })
    }

    /// Resolve the stored session once
    ///
    /// Later and concurrent calls wait for the first resolution. Failures are
    /// never returned: a stored session that cannot be confirmed is discarded.
    pub async fn initialize(&self) {
        self.inner
            .initialized
            .get_or_init(|| self.resolve_stored_session())
            .await;
    }

    async fn resolve_stored_session(&self) {
        let stored = self.inner.tokens.load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read session storage");
            None
        });

        let identity = match stored {
            None => None,
            Some(tokens) => match self.inner.gateway.fetch_profile(&tokens.access_token).await {
                Ok(identity) => Some(identity),
                Err(e) => {
                    debug!(error = %e, "Stored session rejected");
                    self.discard_tokens(&tokens);
                    None
                }
            },
        };

        // A login or logout that completed meanwhile wins.
        self.inner.state.send_if_modified(|state| {
            if !state.loading {
                return false;
            }
            *state = identity.map_or_else(AuthState::unauthenticated, AuthState::authenticated);
            true
        });
    }

    /// Log in with email and password
    ///
    /// Storage and state change only once both the token exchange and the
    /// profile fetch succeeded.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, SessionError> {
        let tokens: SessionTokens = self
            .inner
            .gateway
            .login(email, password)
            .await
            .map_err(|e| SessionError::from_login(&e))?
            .into();

        let identity = self
            .inner
            .gateway
            .fetch_profile(&tokens.access_token)
            .await
            .map_err(|e| SessionError::from_profile(&e))?;

        self.inner.tokens.save(&tokens)?;
        self.mark_initialized();
        self.publish(Some(identity.clone()));

        info!(user_id = identity.id, role = %identity.role, "Logged in");
        Ok(identity)
    }

    /// End the session; the server is told on a best-effort basis
    pub async fn logout(&self) {
        if let Some(token) = self.access_token() {
            if let Err(e) = self.inner.gateway.logout(&token).await {
                debug!(error = %e, "Ignoring server logout failure");
            }
        }

        self.mark_initialized();
        self.clear_session();
        info!("Logged out");
    }

    /// Re-fetch the profile for the stored access token
    ///
    /// On failure the whole session is dropped, tokens included, so storage
    /// never claims a login the state does not show.
    pub async fn refresh_profile(&self) -> Result<Identity, SessionError> {
        let Some(tokens) = self.inner.tokens.load()? else {
            self.publish(None);
            return Err(SessionError::SessionExpired("no stored session".into()));
        };

        match self.inner.gateway.fetch_profile(&tokens.access_token).await {
            Ok(identity) => {
                self.publish(Some(identity.clone()));
                Ok(identity)
            }
            Err(e) => {
                warn!(error = %e, "Profile refresh failed, ending session");
                self.clear_session();
                Err(SessionError::from_profile(&e))
            }
        }
    }

    /// Obtain a usable token pair after `rejected` drew a 401
    ///
    /// Only one exchange runs at a time. A caller that finds the stored pair
    /// already differs from the token it was rejected with reuses that pair;
    /// a caller that finds no pair fails. A failed exchange ends the session
    /// before the next caller gets to look.
    ///
    /// The exchange result is written only over the pair it was made for. If
    /// a logout or login replaced that pair meanwhile, the result is dropped
    /// and the caller gets whatever is stored now.
    pub async fn rotate_tokens(
        &self,
        rejected: Option<&str>,
    ) -> Result<SessionTokens, SessionError> {
        let _guard = self.inner.refresh_guard.lock().await;

        let Some(current) = self.inner.tokens.load()? else {
            self.clear_session();
            return Err(SessionError::SessionExpired("no refresh token stored".into()));
        };

        if rejected != Some(current.access_token.as_str()) {
            debug!("Token pair already rotated");
            return Ok(current);
        }

        match self.inner.gateway.refresh_tokens(&current.refresh_token).await {
            Ok(response) => {
                let tokens = SessionTokens::from(response);
                if self.inner.tokens.replace_if(&current, &tokens)? {
                    debug!("Token pair refreshed");
                    return Ok(tokens);
                }
                self.superseding_pair()
            }
            Err(e) => {
                if self.inner.tokens.clear_if(&current)? {
                    warn!(error = %e, "Token refresh failed, ending session");
                    self.publish(None);
                    return Err(SessionError::SessionExpired(e.message()));
                }
                self.superseding_pair()
            }
        }
    }

    /// The pair a login or logout stored while an exchange was in flight
    fn superseding_pair(&self) -> Result<SessionTokens, SessionError> {
        debug!("Session changed during refresh, discarding exchange result");
        self.inner
            .tokens
            .load()?
            .ok_or_else(|| SessionError::SessionExpired("session ended during refresh".into()))
    }

    fn publish(&self, identity: Option<Identity>) {
        let next = identity.map_or_else(AuthState::unauthenticated, AuthState::authenticated);
        self.inner.state.send_replace(next);
    }

    fn mark_initialized(&self) {
        // Fails only when already set or while initialize is running; both fine.
        let _ = self.inner.initialized.set(());
    }

    fn clear_session(&self) {
        if let Err(e) = self.inner.tokens.clear() {
            warn!(error = %e, "Failed to clear session storage");
        }
        self.publish(None);
    }

    fn discard_tokens(&self, expected: &SessionTokens) {
        if let Err(e) = self.inner.tokens.clear_if(expected) {
            warn!(error = %e, "Failed to clear session storage");
        }
    }
}
