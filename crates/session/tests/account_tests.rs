//! Account settings calls through the authenticated pipeline

use examdesk_core::{AuthState, MemoryStore, SessionTokens, TokenStore};
use examdesk_http::{ClientError, ExamdeskClient};
use examdesk_session::{Navigator, RequestPipeline, SessionStore};
use serde_json::json;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup() -> (
    MockServer,
    RequestPipeline,
    Arc<MemoryStore>,
    Arc<Mutex<Vec<String>>>,
) {
    let server = MockServer::start().await;
    let client = ExamdeskClient::new(server.uri()).unwrap();

    let storage = Arc::new(MemoryStore::new());
    TokenStore::new(storage.clone())
        .save(&SessionTokens::new("access-1", "refresh-1"))
        .unwrap();
    let session = SessionStore::new(Arc::new(client.clone()), storage.clone());

    let redirects = Arc::new(Mutex::new(Vec::new()));
    let sink = redirects.clone();
    let navigator: Arc<dyn Navigator> =
        Arc::new(move |path: &str| sink.lock().unwrap().push(path.to_string()));

    (
        server,
        RequestPipeline::new(client, session, navigator),
        storage,
        redirects,
    )
}

#[tokio::test]
async fn change_password_sends_both_passwords_as_query() {
    let (server, pipeline, storage, redirects) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/auth/change-password"))
        .and(query_param("old_password", "old pw&1"))
        .and(query_param("new_password", "n3w-secret"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "message": "Mot de passe modifié avec succès" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = pipeline
        .change_password("old pw&1", "n3w-secret")
        .await
        .unwrap();

    assert_eq!(response.message, "Mot de passe modifié avec succès");
    assert_eq!(storage.len(), 2);
    assert!(redirects.lock().unwrap().is_empty());
}

#[tokio::test]
async fn change_password_surfaces_server_detail() {
    let (server, pipeline, _, _) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/auth/change-password"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "detail": "Mot de passe actuel incorrect" })),
        )
        .mount(&server)
        .await;

    let err = pipeline.change_password("wrong", "n3w-secret").await.unwrap_err();

    assert!(matches!(err, ClientError::BadRequest(ref m) if m == "Mot de passe actuel incorrect"));
}

#[tokio::test]
async fn change_password_refreshes_an_expired_token() {
    let (server, pipeline, _, _) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/auth/change-password"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "expired" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/auth/change-password"))
        .and(header("authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "refresh_token": "refresh-2",
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = pipeline.change_password("old", "new-secret").await.unwrap();
    assert_eq!(response.message, "ok");
}

#[tokio::test]
async fn change_email_ends_session_and_redirects() {
    let (server, pipeline, storage, redirects) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/auth/change-email"))
        .and(header("authorization", "Bearer access-1"))
        .and(body_json(json!({ "new_email": "new@univ.edu", "password": "pw" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "Email modifié avec succès" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .mount(&server)
        .await;

    let response = pipeline.change_email("new@univ.edu", "pw").await.unwrap();

    assert_eq!(response.message, "Email modifié avec succès");
    assert!(storage.is_empty());
    assert_eq!(pipeline.session().state(), AuthState::unauthenticated());
    assert_eq!(*redirects.lock().unwrap(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn rejected_email_change_keeps_session() {
    let (server, pipeline, storage, redirects) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/auth/change-email"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "detail": "Cet email est déjà utilisé par un autre compte" })),
        )
        .mount(&server)
        .await;

    let err = pipeline.change_email("taken@univ.edu", "pw").await.unwrap_err();

    assert!(matches!(err, ClientError::BadRequest(_)));
    assert_eq!(storage.len(), 2);
    assert!(redirects.lock().unwrap().is_empty());
}
