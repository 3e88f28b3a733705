//! Examdesk core types and utilities
//!
//! Everything here is free of network I/O: the session data model, the
//! key-value storage abstraction that holds the token pair, the route guard
//! decision table and settings loading.

pub mod config;
pub mod error;
pub mod identity;
pub mod routing;
pub mod state;
pub mod storage;
pub mod tokens;

pub use config::{ApiSettings, Settings, StorageSettings};
pub use error::{ConfigError, CoreResult, StorageError};
pub use identity::{Identity, Role};
pub use routing::{Decision, RenderTarget, RouteTable, default_route_for, guard};
pub use state::AuthState;
pub use storage::{FileStore, KeyValueStore, MemoryStore, TokenStore};
pub use tokens::{SessionTokens, TokenResponse};
