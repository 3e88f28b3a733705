//! Authenticated request pipeline
//!
//! Every business API call goes through [`RequestPipeline::send`]. The current
//! access token rides along as a bearer credential; a 401 triggers at most
//! one refresh-and-retry for that request.

use crate::navigator::Navigator;
use crate::store::SessionStore;
use examdesk_core::routing::LOGIN_PATH;
use examdesk_http::{ClientError, ExamdeskClient};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// A request that can be issued more than once
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

/// Sends API calls on behalf of the session
#[derive(Clone)]
pub struct RequestPipeline {
    client: ExamdeskClient,
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
}

impl RequestPipeline {
    pub fn new(client: ExamdeskClient, session: SessionStore, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            client,
            session,
            navigator,
        }
    }

    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    pub(crate) fn navigator(&self) -> &dyn Navigator {
        self.navigator.as_ref()
    }

    fn build(&self, request: &ApiRequest, access_token: Option<&str>) -> reqwest::RequestBuilder {
        let mut builder = match access_token {
            Some(token) => self
                .client
                .authorized(request.method.clone(), &request.path, token),
            None => self.client.request(request.method.clone(), &request.path),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder
    }

    /// Send a request, refreshing the session once if it is rejected with 401
    ///
    /// Any response other than 401 is returned untouched, error statuses
    /// included. A 401 that survives the refresh, or a refresh that cannot
    /// happen, comes back as [`ClientError::AuthenticationFailed`].
    pub async fn send(&self, request: &ApiRequest) -> Result<Response, ClientError> {
        let mut access_token = self.session.access_token();
        let mut retried = false;

        loop {
            let response = self.build(request, access_token.as_deref()).send().await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            if retried {
                debug!(path = %request.path, "Request rejected again after refresh");
                return Err(ClientError::from_response(response).await);
            }
            retried = true;

            match self.session.rotate_tokens(access_token.as_deref()).await {
                Ok(tokens) => {
                    debug!(path = %request.path, "Retrying with refreshed token");
                    access_token = Some(tokens.access_token);
                }
                Err(e) => {
                    warn!(path = %request.path, error = %e, "Cannot refresh session");
                    self.navigator.redirect(LOGIN_PATH);
                    return Err(ClientError::from_response(response).await);
                }
            }
        }
    }

    /// Send and decode a JSON success body
    pub async fn execute<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        if response.status().is_success() {
            let body = response.bytes().await?;
            Ok(serde_json::from_slice(&body)?)
        } else {
            Err(ClientError::from_response(response).await)
        }
    }

    /// Send and discard a success body
    pub async fn execute_empty(&self, request: &ApiRequest) -> Result<(), ClientError> {
        let response = self.send(request).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::from_response(response).await)
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(&ApiRequest::get(path)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(&ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(&ApiRequest::put(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.execute_empty(&ApiRequest::delete(path)).await
    }
}
