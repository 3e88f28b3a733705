//! Examdesk session core
//!
//! [`SessionStore`] is the single owner of "who is logged in": the persisted
//! token pair plus the identity fetched for it. [`RequestPipeline`] sends
//! business API calls on behalf of that session and recovers from an expired
//! access token by refreshing the pair once per request.

pub mod account;
pub mod error;
pub mod navigator;
pub mod pipeline;
pub mod store;

pub use error::SessionError;
pub use navigator::{Navigator, TracingNavigator};
pub use pipeline::{ApiRequest, RequestPipeline};
pub use store::SessionStore;
