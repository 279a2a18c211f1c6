//! Credential checking backends

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::api::{ApiRequest, Transport};
use crate::auth::AuthError;
use crate::auth::directory::UserDirectory;
use crate::auth::token::{self, SessionToken, TokenIssuer};
use crate::model::role::Role;
use crate::model::users::User;

/// Outcome of a successful authentication
#[derive(Debug, Clone, PartialEq)]
pub struct Grant {
    pub user: User,
    pub token: Option<SessionToken>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Checks credentials, granting a session on success
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Fails with `AuthError::InvalidCredentials` when the pair doesn't match an account
    async fn authenticate(&self, username: &str, password: &str) -> Result<Grant, AuthError>;

    /// Invalidates the session token, if the backend tracks them
    async fn revoke(&self, _token: &SessionToken) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Fixed demo credentials, sessions have neither token nor expiration
#[derive(Debug, Clone, Copy, Default)]
pub struct MockBackend;

impl MockBackend {
    const ACCOUNTS: [(&'static str, &'static str, &'static str, Role); 3] = [
        ("intern", "intern123", "Intern User", Role::Intern),
        ("spoc", "spoc123", "SPOC User", Role::Spoc),
        ("manager", "manager123", "Manager User", Role::Manager),
    ];
}

#[async_trait]
impl AuthBackend for MockBackend {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Grant, AuthError> {
        let (id, (username, _, name, role)) = Self::ACCOUNTS
            .into_iter()
            .enumerate()
            .find(|(_, (user, pass, _, _))| *user == username && *pass == password)
            .ok_or(AuthError::InvalidCredentials)?;

        Ok(Grant {
            user: User::new(id as u32 + 1, username, name, role),
            token: None,
            expires_at: None,
        })
    }
}

/// Backend verifying password digests and issuing PASETO session tokens
///
/// The role of the session is the one carried by the issued token.
#[derive(Clone)]
pub struct TokenBackend {
    directory: Arc<UserDirectory>,
    issuer: Arc<TokenIssuer>,
}

impl TokenBackend {
    pub fn new(directory: UserDirectory, issuer: Arc<TokenIssuer>) -> Self {
        Self {
            directory: Arc::new(directory),
            issuer,
        }
    }

    /// Demo accounts with day long sessions
    pub fn demo() -> Self {
        Self::new(
            UserDirectory::demo(),
            Arc::new(TokenIssuer::new(Duration::from_secs(24 * 60 * 60))),
        )
    }

    pub fn issuer(&self) -> &Arc<TokenIssuer> {
        &self.issuer
    }

    pub fn directory(&self) -> &UserDirectory {
        &self.directory
    }
}

#[async_trait]
impl AuthBackend for TokenBackend {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Grant, AuthError> {
        let user = self
            .directory
            .verify(username, password)
            .ok_or(AuthError::InvalidCredentials)?;

        let token = self.issuer.issue(user).await?;
        let claims = self.issuer.verify(token.as_str()).await?;
        debug!(role = %claims.user.role, "Session token issued");

        Ok(Grant {
            user: claims.user,
            token: Some(token),
            expires_at: Some(claims.expires_at),
        })
    }

    async fn revoke(&self, token: &SessionToken) -> Result<(), AuthError> {
        self.issuer.revoke(token.as_str()).await?;
        Ok(())
    }
}

/// Login request body of the dashboard API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Login response body of the dashboard API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: SessionToken,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// Backend delegating to the dashboard server `/Auth` endpoints
///
/// The transport is used directly, the session token is never attached to these calls.
#[derive(Clone)]
pub struct RemoteBackend {
    transport: Arc<dyn Transport>,
}

impl RemoteBackend {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl AuthBackend for RemoteBackend {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Grant, AuthError> {
        let credentials = Credentials {
            username: username.to_owned(),
            password: password.to_owned(),
        };
        let request = ApiRequest::post("/Auth/login", serde_json::to_value(&credentials)?)
            .with_header("Content-Type", "application/json");

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|err| AuthError::Remote(err.to_string()))?;

        match response.status {
            200..=299 => (),
            401 => return Err(AuthError::InvalidCredentials),
            status => return Err(AuthError::Remote(format!("login failed with status {status}"))),
        }

        let login: LoginResponse = serde_json::from_value(response.body)?;
        let claims = token::decode_unverified(&login.token)?;

        Ok(Grant {
            user: claims.user,
            token: Some(login.token),
            expires_at: Some(claims.expires_at),
        })
    }

    async fn revoke(&self, token: &SessionToken) -> Result<(), AuthError> {
        let request = ApiRequest::post("/Auth/logout", json!({ "token": token }))
            .with_header("Content-Type", "application/json");
        self.transport
            .send(request)
            .await
            .map_err(|err| AuthError::Remote(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiResponse;
    use crate::api::tests::ScriptedTransport;

    #[tokio::test]
    async fn mock_backend_accounts() {
        let backend = MockBackend;
        let grant = backend.authenticate("manager", "manager123").await.unwrap();
        assert_eq!(grant.user.role, Role::Manager);
        assert_eq!(grant.user.name, "Manager User");
        assert_eq!(grant.token, None);
        assert_eq!(grant.expires_at, None);

        assert!(matches!(
            backend.authenticate("manager", "spoc123").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn token_backend_role_comes_from_token() {
        let backend = TokenBackend::demo();
        let grant = backend.authenticate("spoc", "spoc123").await.unwrap();
        let token = grant.token.unwrap();

        let claims = backend.issuer().verify(token.as_str()).await.unwrap();
        assert_eq!(claims.user.role, Role::Spoc);
        assert_eq!(grant.user, claims.user);
        assert_eq!(grant.expires_at, Some(claims.expires_at));

        backend.revoke(&token).await.unwrap();
        let _ = backend.issuer().verify(token.as_str()).await.unwrap_err();
    }

    #[tokio::test]
    async fn remote_backend_decodes_token() {
        let server = TokenBackend::demo();
        let grant = server.authenticate("intern", "intern123").await.unwrap();
        let response = serde_json::to_value(LoginResponse {
            token: grant.token.clone().unwrap(),
            role: Role::Intern,
            expires_at: grant.expires_at.unwrap(),
        })
        .unwrap();

        let transport = ScriptedTransport::new([
            Ok(ApiResponse::new(200, response)),
            Ok(ApiResponse::new(401, serde_json::Value::Null)),
        ]);
        let backend = RemoteBackend::new(transport.clone());

        let remote = backend.authenticate("intern", "intern123").await.unwrap();
        assert_eq!(remote, grant);

        assert!(matches!(
            backend.authenticate("intern", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));

        let requests = transport.requests.lock().await;
        assert_eq!(requests[0].path, "/Auth/login");
        assert_eq!(requests[0].header("authorization"), None);
    }
}
