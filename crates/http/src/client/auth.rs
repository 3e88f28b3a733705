//! Authentication API client methods

use super::{ClientError, ExamdeskClient};
use crate::types::{
    LoginForm, MessageResponse, RefreshRequest, ResetCodeRequest, ResetPasswordRequest,
};
use async_trait::async_trait;
use examdesk_core::{Identity, TokenResponse};
use reqwest::Method;
use tracing::debug;

/// Remote auth operations
///
/// Implementations keep no state and never retry; every failure is returned
/// to the caller as-is.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchange credentials for a token pair
    async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ClientError>;

    /// Fetch the profile the access token belongs to
    async fn fetch_profile(&self, access_token: &str) -> Result<Identity, ClientError>;

    /// Trade a refresh token for a new pair
    async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenResponse, ClientError>;

    /// Tell the server the session ended
    async fn logout(&self, access_token: &str) -> Result<(), ClientError>;
}

#[async_trait]
impl AuthGateway for ExamdeskClient {
    async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ClientError> {
        debug!(email, "POST /auth/login");
        let request = self.request(Method::POST, "/auth/login").form(&LoginForm {
            username: email,
            password,
        });
        self.execute(request).await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<Identity, ClientError> {
        let request = self.authorized(Method::GET, "/auth/me", access_token);
        self.execute(request).await
    }

    async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenResponse, ClientError> {
        debug!("POST /auth/refresh");
        let request = self
            .request(Method::POST, "/auth/refresh")
            .json(&RefreshRequest { refresh_token });
        self.execute(request).await
    }

    async fn logout(&self, access_token: &str) -> Result<(), ClientError> {
        let request = self.authorized(Method::POST, "/auth/logout", access_token);
        self.execute_empty(request).await
    }
}

impl ExamdeskClient {
    /// Ask the server to issue a password reset code for `email`
    pub async fn request_password_reset(&self, email: &str) -> Result<MessageResponse, ClientError> {
        let request = self
            .request(Method::POST, "/auth/request-reset")
            .json(&ResetCodeRequest { email });
        self.execute(request).await
    }

    /// Set a new password, proving ownership with the emailed code
    pub async fn reset_password(
        &self,
        email: &str,
        new_password: &str,
        verification_code: Option<&str>,
    ) -> Result<MessageResponse, ClientError> {
        let request = self
            .request(Method::POST, "/auth/reset-password")
            .json(&ResetPasswordRequest {
                email,
                new_password,
                verification_code,
            });
        self.execute(request).await
    }
}

#[cfg(feature = "tests")]
pub mod mock {
    use super::*;
    use mockall::mock;

    mock! {
        pub AuthGateway {}

        #[async_trait]
        impl AuthGateway for AuthGateway {
            async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ClientError>;
            async fn fetch_profile(&self, access_token: &str) -> Result<Identity, ClientError>;
            async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenResponse, ClientError>;
            async fn logout(&self, access_token: &str) -> Result<(), ClientError>;
        }
    }
}
