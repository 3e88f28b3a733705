//! Wire types for the auth endpoints

use serde::{Deserialize, Serialize};

/// Form body of `POST /auth/login`; the email travels as `username`
#[derive(Serialize)]
pub struct LoginForm<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Body of `POST /auth/refresh`
#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Body of `POST /auth/request-reset`
#[derive(Debug, Serialize)]
pub struct ResetCodeRequest<'a> {
    pub email: &'a str,
}

/// Body of `POST /auth/reset-password`
#[derive(Debug, Serialize)]
pub struct ResetPasswordRequest<'a> {
    pub email: &'a str,
    pub new_password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<&'a str>,
}

/// Body of `PUT /auth/change-email`; the current password confirms the change
#[derive(Debug, Serialize)]
pub struct ChangeEmailRequest<'a> {
    pub new_email: &'a str,
    pub password: &'a str,
}

/// Plain acknowledgement returned by most account endpoints
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    /// Verification code, echoed by servers running without a mailer
    #[serde(default)]
    pub code: Option<String>,
}

/// Error body; `detail` is a string for handled errors and a list for
/// validation failures
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}
