//! HTTP interceptor
//!
//! All dashboard API traffic goes through the `Interceptor`, which decorates requests with the
//! session token and turns failed responses into `ApiError`s. The actual sending is abstracted by
//! the `Transport` trait.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::auth::AuthService;

/// Endpoints which never carry the session token
const AUTH_ENDPOINTS: [&str; 2] = ["/Auth/login", "/Auth/logout"];

/// Attempts made for reads failing on connectivity
const READ_ATTEMPTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: vec![],
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, path).with_body(body)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the header, replacing any previous value of it
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .retain(|(header, _)| !header.eq_ignore_ascii_case(name));
        self.headers.push((name.to_owned(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Checks if this is a login or logout call
    pub fn is_auth_request(&self) -> bool {
        AUTH_ENDPOINTS
            .iter()
            .any(|endpoint| self.path.contains(endpoint))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status, `0` when the request never reached the server
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),
}

/// Sends requests to the dashboard API
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Your session has expired. Please log in again.")]
    SessionExpired,
    #[error("You do not have permission to access this resource.")]
    Forbidden,
    #[error("Unable to connect to the server. Check the network connection.")]
    Connectivity,
    #[error("An error occurred on the server. Please try again later.")]
    Server,
    #[error("Request failed with status {0}")]
    Status(u16),
    #[error("Malformed JSON payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Counts the request as in flight until dropped
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Interceptor {
    transport: Arc<dyn Transport>,
    auth: AuthService,
    active: AtomicUsize,
}

impl Interceptor {
    pub fn new(transport: Arc<dyn Transport>, auth: AuthService) -> Self {
        Self {
            transport,
            auth,
            active: AtomicUsize::new(0),
        }
    }

    /// Number of requests in flight
    pub fn active_requests(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Adds content negotiation and authorization headers
    async fn prepare(&self, request: ApiRequest) -> ApiRequest {
        let token = if request.is_auth_request() {
            None
        } else {
            self.auth.token().await
        };

        let request = request
            .with_header("Content-Type", "application/json")
            .with_header("Accept", "application/json")
            .with_header("X-Requested-With", "XMLHttpRequest");

        match token {
            Some(token) => request.with_header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    /// Sends the request classifying failures
    #[instrument(skip_all, fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let request = self.prepare(request).await;
        let _in_flight = InFlight::start(&self.active);

        let attempts = match request.method {
            Method::Get => READ_ATTEMPTS,
            _ => 1,
        };

        let mut attempt = 0;
        let response = loop {
            attempt += 1;
            match self.transport.send(request.clone()).await {
                Ok(response) if response.status != 0 => break response,
                Ok(_) => warn!(attempt, "Server unreachable"),
                Err(err) => warn!(attempt, %err, "Server unreachable"),
            }

            if attempt >= attempts {
                return Err(ApiError::Connectivity);
            }
        };

        match response.status {
            200..=299 => {
                debug!(status = response.status, "Request succeeded");
                Ok(response)
            }
            401 => {
                warn!("Unauthorized request, closing the session");
                self.auth.expire().await;
                Err(ApiError::SessionExpired)
            }
            403 => {
                warn!("Permission denied");
                Err(ApiError::Forbidden)
            }
            500 => Err(ApiError::Server),
            status => Err(ApiError::Status(status)),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(ApiRequest::get(path)).await?;
        Ok(serde_json::from_value(response.body)?)
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        let response = self.send(ApiRequest::post(path, body)).await?;
        Ok(serde_json::from_value(response.body)?)
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        let response = self.send(ApiRequest::put(path, body)).await?;
        Ok(serde_json::from_value(response.body)?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;

    use serde_json::json;
    use tokio::sync::Mutex;

    use super::*;
    use crate::auth::backend::TokenBackend;
    use crate::model::role::Role;
    use crate::storage::MemoryStorage;

    /// Transport replaying scripted responses and recording requests
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
        pub(crate) requests: Mutex<Vec<ApiRequest>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(
            responses: impl IntoIterator<Item = Result<ApiResponse, TransportError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into_iter().collect()),
                requests: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
            self.requests.lock().await.push(request);
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Connection("no response".into())))
        }
    }

    fn ok(body: Value) -> Result<ApiResponse, TransportError> {
        Ok(ApiResponse::new(200, body))
    }

    fn status(status: u16) -> Result<ApiResponse, TransportError> {
        Ok(ApiResponse::new(status, Value::Null))
    }

    async fn logged_in() -> AuthService {
        let auth = AuthService::mock();
        auth.login("spoc", "spoc123").await.unwrap();
        auth
    }

    #[tokio::test]
    async fn bearer_token_added_except_auth_endpoints() {
        let auth = AuthService::new(TokenBackend::demo(), MemoryStorage::new());
        auth.login("spoc", "spoc123").await.unwrap();
        let token = auth.token().await.unwrap();

        let transport = ScriptedTransport::new([ok(json!([])), ok(json!({})), ok(json!({}))]);
        let interceptor = Interceptor::new(transport.clone(), auth);

        let _: Value = interceptor.get("/InternPerformance").await.unwrap();
        let _: Value = interceptor
            .post("/Auth/login", &json!({"username": "spoc"}))
            .await
            .unwrap();
        let _: Value = interceptor.post("/Auth/logout", &json!({})).await.unwrap();

        let requests = transport.requests.lock().await;
        let bearer = format!("Bearer {token}");
        assert_eq!(requests[0].header("authorization"), Some(bearer.as_str()));
        assert_eq!(requests[0].header("content-type"), Some("application/json"));
        assert_eq!(requests[1].header("authorization"), None);
        assert_eq!(requests[2].header("authorization"), None);
    }

    #[tokio::test]
    async fn unauthorized_response_logs_out() {
        let auth = logged_in().await;
        let transport = ScriptedTransport::new([status(401)]);
        let interceptor = Interceptor::new(transport, auth.clone());

        let err = interceptor.get::<Value>("/InternPerformance").await.unwrap_err();
        assert!(matches!(err, ApiError::SessionExpired));
        assert!(!auth.is_authenticated().await);
        assert_eq!(auth.role().await, None);
        assert!(auth.take_session_expired());
    }

    #[tokio::test]
    async fn failures_are_classified() {
        let auth = logged_in().await;
        let transport = ScriptedTransport::new([status(403), status(500), status(404)]);
        let interceptor = Interceptor::new(transport, auth.clone());

        let path = "/InternPerformance/1/approve";
        let body = json!({});
        assert!(matches!(
            interceptor.post::<_, Value>(path, &body).await,
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(
            interceptor.post::<_, Value>(path, &body).await,
            Err(ApiError::Server)
        ));
        assert!(matches!(
            interceptor.post::<_, Value>(path, &body).await,
            Err(ApiError::Status(404))
        ));
        assert_eq!(auth.role().await, Some(Role::Spoc));
    }

    #[tokio::test]
    async fn reads_are_retried_on_connectivity_only() {
        let auth = logged_in().await;
        let transport = ScriptedTransport::new([
            Err(TransportError::Connection("reset".into())),
            ok(json!([1, 2])),
            status(0),
            status(0),
            status(0),
        ]);
        let interceptor = Interceptor::new(transport.clone(), auth);

        let values: Vec<u32> = interceptor.get("/InternPerformance").await.unwrap();
        assert_eq!(values, vec![1, 2]);

        let err = interceptor.get::<Value>("/InternPerformance").await.unwrap_err();
        assert!(matches!(err, ApiError::Connectivity));

        // Writes are never retried
        let err = interceptor
            .put::<_, Value>("/InternPerformance/1", &json!({"score": 80}))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Connectivity));

        assert_eq!(transport.requests.lock().await.len(), 5);
        assert_eq!(interceptor.active_requests(), 0);
    }
}
