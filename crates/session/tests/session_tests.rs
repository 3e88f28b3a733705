//! Session lifecycle tests against a mocked auth gateway

use examdesk_core::storage::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use examdesk_core::{
    AuthState, Identity, KeyValueStore, MemoryStore, Role, SessionTokens, TokenResponse,
    TokenStore,
};
use examdesk_http::{ClientError, MockAuthGateway};
use examdesk_session::{SessionError, SessionStore};
use mockall::predicate::eq;
use std::sync::Arc;

fn identity(role: Role) -> Identity {
    Identity {
        id: 42,
        email: "admin@univ.edu".into(),
        display_name: "Nadia Rahmani".into(),
        role,
        first_name: Some("Nadia".into()),
        last_name: Some("Rahmani".into()),
    }
}

fn token_response(access: &str, refresh: &str) -> TokenResponse {
    TokenResponse {
        access_token: access.into(),
        refresh_token: refresh.into(),
        token_type: "bearer".into(),
    }
}

fn unauthorized() -> ClientError {
    ClientError::AuthenticationFailed("Could not validate credentials".into())
}

fn seeded_storage(access: &str, refresh: &str) -> Arc<MemoryStore> {
    let storage = Arc::new(MemoryStore::new());
    TokenStore::new(storage.clone())
        .save(&SessionTokens::new(access, refresh))
        .unwrap();
    storage
}

fn store(gateway: MockAuthGateway, storage: Arc<MemoryStore>) -> SessionStore {
    SessionStore::new(Arc::new(gateway), storage)
}

#[tokio::test]
async fn starts_loading() {
    let session = store(MockAuthGateway::new(), Arc::new(MemoryStore::new()));
    assert_eq!(session.state(), AuthState::loading());
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn initialize_without_tokens_skips_the_server() {
    let mut gateway = MockAuthGateway::new();
    gateway.expect_fetch_profile().never();

    let session = store(gateway, Arc::new(MemoryStore::new()));
    session.initialize().await;

    assert_eq!(session.state(), AuthState::unauthenticated());
}

#[tokio::test]
async fn initialize_restores_stored_session() {
    let mut gateway = MockAuthGateway::new();
    gateway
        .expect_fetch_profile()
        .with(eq("access-1"))
        .times(1)
        .returning(|_| Ok(identity(Role::Director)));

    let session = store(gateway, seeded_storage("access-1", "refresh-1"));
    session.initialize().await;
    session.initialize().await;

    assert_eq!(session.state(), AuthState::authenticated(identity(Role::Director)));
}

#[tokio::test]
async fn initialize_with_rejected_token_clears_storage() {
    let mut gateway = MockAuthGateway::new();
    gateway
        .expect_fetch_profile()
        .times(1)
        .returning(|_| Err(unauthorized()));

    let storage = seeded_storage("stale", "refresh-1");
    let session = store(gateway, storage.clone());
    session.initialize().await;

    assert_eq!(session.state(), AuthState::unauthenticated());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn initialize_with_unreachable_server_clears_storage() {
    let transport = reqwest::get("not a url").await.unwrap_err();

    let mut gateway = MockAuthGateway::new();
    gateway
        .expect_fetch_profile()
        .times(1)
        .return_once(move |_| Err(ClientError::Request(transport)));

    let storage = seeded_storage("access-1", "refresh-1");
    let session = store(gateway, storage.clone());
    session.initialize().await;

    assert_eq!(session.state(), AuthState::unauthenticated());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn initialize_with_malformed_profile_clears_storage() {
    let malformed = serde_json::from_str::<Identity>(r#"{"id":"not-a-number"}"#).unwrap_err();

    let mut gateway = MockAuthGateway::new();
    gateway
        .expect_fetch_profile()
        .times(1)
        .return_once(move |_| Err(ClientError::Serialization(malformed)));

    let storage = seeded_storage("access-1", "refresh-1");
    let session = store(gateway, storage.clone());
    session.initialize().await;

    assert_eq!(session.state(), AuthState::unauthenticated());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn concurrent_initialize_resolves_once() {
    let mut gateway = MockAuthGateway::new();
    gateway
        .expect_fetch_profile()
        .times(1)
        .returning(|_| Ok(identity(Role::Student)));

    let session = store(gateway, seeded_storage("access-1", "refresh-1"));
    let (a, b) = (session.clone(), session.clone());
    tokio::join!(a.initialize(), b.initialize());

    assert_eq!(session.identity().map(|i| i.role), Some(Role::Student));
}

#[tokio::test]
async fn login_persists_pair_and_sets_identity() {
    let mut gateway = MockAuthGateway::new();
    gateway
        .expect_login()
        .with(eq("admin@univ.edu"), eq("correct-pw"))
        .times(1)
        .returning(|_, _| Ok(token_response("access-1", "refresh-1")));
    gateway
        .expect_fetch_profile()
        .with(eq("access-1"))
        .times(1)
        .returning(|_| Ok(identity(Role::Administrator)));

    let storage = Arc::new(MemoryStore::new());
    let session = store(gateway, storage.clone());
    let mut changes = session.subscribe();

    let logged_in = session.login("admin@univ.edu", "correct-pw").await.unwrap();

    assert_eq!(logged_in.role, Role::Administrator);
    assert!(session.is_authenticated());
    assert!(changes.has_changed().unwrap());
    assert_eq!(changes.borrow_and_update().role(), Some(Role::Administrator));
    assert_eq!(
        storage.get_item(ACCESS_TOKEN_KEY).unwrap().as_deref(),
        Some("access-1")
    );
    assert_eq!(
        storage.get_item(REFRESH_TOKEN_KEY).unwrap().as_deref(),
        Some("refresh-1")
    );
}

#[tokio::test]
async fn rejected_login_leaves_everything_untouched() {
    let mut gateway = MockAuthGateway::new();
    gateway
        .expect_login()
        .returning(|_, _| Err(ClientError::AuthenticationFailed("Email ou mot de passe incorrect".into())));
    gateway.expect_fetch_profile().never();

    let storage = Arc::new(MemoryStore::new());
    let session = store(gateway, storage.clone());
    session.initialize().await;

    let err = session.login("admin@univ.edu", "wrong").await.unwrap_err();

    assert!(matches!(err, SessionError::Credentials(ref m) if m == "Email ou mot de passe incorrect"));
    assert_eq!(session.state(), AuthState::unauthenticated());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn login_with_unreadable_profile_writes_nothing() {
    let mut gateway = MockAuthGateway::new();
    gateway
        .expect_login()
        .returning(|_, _| Ok(token_response("access-1", "refresh-1")));
    gateway
        .expect_fetch_profile()
        .returning(|_| Err(ClientError::ServerError {
            status: 500,
            message: "Internal Server Error".into(),
        }));

    let storage = Arc::new(MemoryStore::new());
    let session = store(gateway, storage.clone());

    let err = session.login("admin@univ.edu", "correct-pw").await.unwrap_err();

    assert!(matches!(err, SessionError::ProfileFetch(_)));
    assert!(storage.is_empty());
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn failed_login_keeps_previous_session() {
    let mut gateway = MockAuthGateway::new();
    gateway
        .expect_fetch_profile()
        .with(eq("access-1"))
        .returning(|_| Ok(identity(Role::Director)));
    gateway
        .expect_login()
        .returning(|_, _| Err(ClientError::BadRequest("Compte désactivé".into())));

    let storage = seeded_storage("access-1", "refresh-1");
    let session = store(gateway, storage.clone());
    session.initialize().await;

    assert!(session.login("other@univ.edu", "pw").await.is_err());

    assert_eq!(session.identity().map(|i| i.role), Some(Role::Director));
    assert_eq!(session.access_token().as_deref(), Some("access-1"));
}

#[tokio::test]
async fn logout_clears_even_when_server_fails() {
    let mut gateway = MockAuthGateway::new();
    gateway
        .expect_fetch_profile()
        .returning(|_| Ok(identity(Role::Professor)));
    gateway
        .expect_logout()
        .with(eq("access-1"))
        .times(1)
        .returning(|_| Err(ClientError::ServerError {
            status: 502,
            message: "Bad Gateway".into(),
        }));

    let storage = seeded_storage("access-1", "refresh-1");
    let session = store(gateway, storage.clone());
    session.initialize().await;
    assert!(session.is_authenticated());

    session.logout().await;

    assert_eq!(session.state(), AuthState::unauthenticated());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn logout_without_tokens_skips_the_server() {
    let mut gateway = MockAuthGateway::new();
    gateway.expect_logout().never();

    let session = store(gateway, Arc::new(MemoryStore::new()));
    session.logout().await;

    assert_eq!(session.state(), AuthState::unauthenticated());
}

#[tokio::test]
async fn logout_before_initialize_settles_state() {
    let mut gateway = MockAuthGateway::new();
    gateway.expect_logout().returning(|_| Ok(()));
    gateway.expect_fetch_profile().never();

    let session = store(gateway, seeded_storage("access-1", "refresh-1"));
    session.logout().await;
    session.initialize().await;

    assert_eq!(session.state(), AuthState::unauthenticated());
}

#[tokio::test]
async fn refresh_profile_replaces_identity() {
    let mut gateway = MockAuthGateway::new();
    let mut seq = mockall::Sequence::new();
    gateway
        .expect_fetch_profile()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(identity(Role::Professor)));
    gateway
        .expect_fetch_profile()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(identity(Role::DepartmentHead)));

    let session = store(gateway, seeded_storage("access-1", "refresh-1"));
    session.initialize().await;

    let refreshed = session.refresh_profile().await.unwrap();
    assert_eq!(refreshed.role, Role::DepartmentHead);
    assert_eq!(session.identity().map(|i| i.role), Some(Role::DepartmentHead));
}

#[tokio::test]
async fn failed_profile_refresh_ends_session() {
    let mut gateway = MockAuthGateway::new();
    let mut seq = mockall::Sequence::new();
    gateway
        .expect_fetch_profile()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(identity(Role::Student)));
    gateway
        .expect_fetch_profile()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(unauthorized()));

    let storage = seeded_storage("access-1", "refresh-1");
    let session = store(gateway, storage.clone());
    session.initialize().await;

    let err = session.refresh_profile().await.unwrap_err();

    assert!(matches!(err, SessionError::ProfileFetch(_)));
    assert_eq!(session.state(), AuthState::unauthenticated());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn concurrent_rotations_share_one_exchange() {
    let mut gateway = MockAuthGateway::new();
    gateway
        .expect_refresh_tokens()
        .with(eq("refresh-1"))
        .times(1)
        .returning(|_| Ok(token_response("access-2", "refresh-2")));

    let session = store(gateway, seeded_storage("access-1", "refresh-1"));

    let rotations = (0..8).map(|_| {
        let session = session.clone();
        tokio::spawn(async move { session.rotate_tokens(Some("access-1")).await })
    });
    let results = futures::future::join_all(rotations).await;

    for result in results {
        let tokens = result.unwrap().unwrap();
        assert_eq!(tokens, SessionTokens::new("access-2", "refresh-2"));
    }
    assert_eq!(session.access_token().as_deref(), Some("access-2"));
}

#[tokio::test]
async fn failed_rotation_expires_every_waiter() {
    let mut gateway = MockAuthGateway::new();
    gateway
        .expect_refresh_tokens()
        .times(1)
        .returning(|_| Err(unauthorized()));

    let storage = seeded_storage("access-1", "refresh-1");
    let session = store(gateway, storage.clone());

    let rotations = (0..4).map(|_| {
        let session = session.clone();
        tokio::spawn(async move { session.rotate_tokens(Some("access-1")).await })
    });
    let results = futures::future::join_all(rotations).await;

    for result in results {
        let err = result.unwrap().unwrap_err();
        assert!(err.ends_session());
    }
    assert!(storage.is_empty());
    assert_eq!(session.state(), AuthState::unauthenticated());
}

#[tokio::test]
async fn rotation_without_refresh_token_expires() {
    let mut gateway = MockAuthGateway::new();
    gateway.expect_refresh_tokens().never();

    let storage = Arc::new(MemoryStore::new());
    storage.set_items(&[(ACCESS_TOKEN_KEY, "access-1")]).unwrap();
    let session = store(gateway, storage);

    let err = session.rotate_tokens(Some("access-1")).await.unwrap_err();
    assert!(matches!(err, SessionError::SessionExpired(_)));
}

#[tokio::test]
async fn rotation_yields_to_a_login_that_landed_meanwhile() {
    let storage = seeded_storage("access-1", "refresh-1");
    let side_channel = storage.clone();

    let mut gateway = MockAuthGateway::new();
    gateway
        .expect_refresh_tokens()
        .times(1)
        .returning(move |_| {
            TokenStore::new(side_channel.clone())
                .save(&SessionTokens::new("login-access", "login-refresh"))
                .unwrap();
            Ok(token_response("access-2", "refresh-2"))
        });

    let session = store(gateway, storage);
    let tokens = session.rotate_tokens(Some("access-1")).await.unwrap();

    assert_eq!(tokens, SessionTokens::new("login-access", "login-refresh"));
    assert_eq!(session.access_token().as_deref(), Some("login-access"));
}

#[tokio::test]
async fn failed_rotation_spares_a_login_that_landed_meanwhile() {
    let storage = seeded_storage("access-1", "refresh-1");
    let side_channel = storage.clone();

    let mut gateway = MockAuthGateway::new();
    gateway
        .expect_refresh_tokens()
        .times(1)
        .returning(move |_| {
            TokenStore::new(side_channel.clone())
                .save(&SessionTokens::new("login-access", "login-refresh"))
                .unwrap();
            Err(unauthorized())
        });

    let session = store(gateway, storage);
    let tokens = session.rotate_tokens(Some("access-1")).await.unwrap();

    assert_eq!(tokens.access_token, "login-access");
    assert_eq!(session.access_token().as_deref(), Some("login-access"));
}
