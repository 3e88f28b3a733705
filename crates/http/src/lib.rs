//! Examdesk HTTP module providing the API client and the auth gateway
//!
//! The gateway is stateless: it turns each auth endpoint into one typed call
//! and never retries. Session bookkeeping lives in `examdesk-session`.

pub mod client;
pub mod types;

pub use client::auth::AuthGateway;
pub use client::error::ClientError;
pub use client::{ExamdeskClient, ExamdeskClientBuilder};

#[cfg(feature = "tests")]
pub use client::auth::mock::MockAuthGateway;
