//! Account settings for the logged-in user

use crate::pipeline::{ApiRequest, RequestPipeline};
use examdesk_core::routing::LOGIN_PATH;
use examdesk_http::ClientError;
use examdesk_http::types::{ChangeEmailRequest, MessageResponse};
use tracing::info;

impl RequestPipeline {
    /// Change the password, proving knowledge of the current one
    ///
    /// The server takes both passwords as query parameters.
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<MessageResponse, ClientError> {
        let request = ApiRequest::put("/auth/change-password")
            .query("old_password", old_password)
            .query("new_password", new_password);
        self.execute(&request).await
    }

    /// Change the login email
    ///
    /// Tokens are bound to the old address, so on success the session is
    /// ended and the user is sent to the login page.
    pub async fn change_email(
        &self,
        new_email: &str,
        password: &str,
    ) -> Result<MessageResponse, ClientError> {
        let request = ApiRequest::put("/auth/change-email").json(&ChangeEmailRequest {
            new_email,
            password,
        })?;
        let response: MessageResponse = self.execute(&request).await?;

        info!("Email changed, ending session");
        self.session().logout().await;
        self.navigator().redirect(LOGIN_PATH);
        Ok(response)
    }
}
