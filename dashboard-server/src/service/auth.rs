//! Sign in and out endpoints

use actix_web::error::{ErrorInternalServerError, ErrorUnauthorized};
use actix_web::web::{Data, Json};
use actix_web::{HttpRequest, HttpResponse, Result, post};
use dashboard::AuthError;
use dashboard::auth::backend::{Credentials, LoginResponse};
use dashboard::auth::{AuthBackend, SessionToken};
use serde::Deserialize;
use tracing::{info, warn};

use crate::model::Model;
use crate::service::session;

/// Logout body, the session token being revoked
#[derive(Debug, Deserialize)]
pub struct Logout {
    token: Option<SessionToken>,
}

#[post("/login")]
pub async fn login(model: Data<Model>, credentials: Json<Credentials>) -> Result<Json<LoginResponse>> {
    let grant = model
        .auth()
        .authenticate(&credentials.username, &credentials.password)
        .await
        .map_err(|err| match err {
            AuthError::InvalidCredentials => ErrorUnauthorized(err.to_string()),
            err => ErrorInternalServerError(err.to_string()),
        })?;

    let (Some(token), Some(expires_at)) = (grant.token, grant.expires_at) else {
        return Err(ErrorInternalServerError("Session token not issued"));
    };

    info!(user = %grant.user.username, role = %grant.user.role, "User signed in");
    Ok(Json(LoginResponse {
        token,
        role: grant.user.role,
        expires_at,
    }))
}

/// Revokes the session token
///
/// The token comes in the body, or in the bearer header. Signing out always succeeds, also with
/// a lapsed or revoked token.
#[post("/logout")]
pub async fn logout(
    req: HttpRequest,
    model: Data<Model>,
    body: Option<Json<Logout>>,
) -> HttpResponse {
    let token = body.and_then(|body| body.into_inner().token).or_else(|| {
        session::bearer(req.headers())
            .ok()
            .flatten()
            .map(SessionToken::new)
    });

    if let Some(token) = token {
        match model.auth().revoke(&token).await {
            Ok(()) => info!("User signed out"),
            Err(err) => warn!(%err, "Revoking session token failed"),
        }
    }

    HttpResponse::Ok().finish()
}
