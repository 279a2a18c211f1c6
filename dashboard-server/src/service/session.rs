//! Session management

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::error::ErrorUnauthorized;
use actix_web::http::header::{self, HeaderMap};
use actix_web::middleware::Next;
use actix_web::web::Data;
use actix_web::{Error, HttpMessage};
use dashboard::auth::SessionToken;
use tracing::{debug, warn};

use crate::model::Model;

/// Token of the `Authorization: Bearer` header, `None` if the header is missing
pub fn bearer(headers: &HeaderMap) -> Result<Option<&str>, Error> {
    let Some(auth_header) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_header = auth_header
        .to_str()
        .map_err(|err| ErrorUnauthorized(err.to_string()))?;

    let (scheme, token) = auth_header
        .split_once(' ')
        .ok_or_else(|| ErrorUnauthorized("Invalid Authorization header"))?;

    if scheme != "Bearer" {
        return Err(ErrorUnauthorized("Invalid Authorization token scheme"));
    }

    Ok(Some(token))
}

/// Verifies the bearer token, attaching the session to the request
async fn authorize(req: &ServiceRequest) -> Result<(), Error> {
    let Some(token) = bearer(req.headers())? else {
        return Ok(());
    };

    let model: Data<Model> = req
        .app_data()
        .cloned()
        .ok_or_else(|| ErrorUnauthorized("Missing context"))?;

    let claims = model
        .auth()
        .issuer()
        .verify(token)
        .await
        .map_err(|err| ErrorUnauthorized(err.to_string()))?;

    debug!(user = %claims.user.username, role = %claims.user.role, "Session verified");
    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(SessionToken::new(token));
    Ok(())
}

/// Session middleware
///
/// On success the request carries both the `SessionClaims` and the `SessionToken`. Requests without
/// the `Authorization` header pass through, handlers decide whether they need a session. Invalid
/// tokens are answered with 401 right away.
pub async fn middleware<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error>
where
    B: MessageBody + 'static,
{
    match authorize(&req).await {
        Ok(()) => next
            .call(req)
            .await
            .map(ServiceResponse::map_into_left_body),
        Err(err) => {
            warn!(%err, path = req.path(), "Rejected session");
            Ok(req.error_response(err).map_into_right_body())
        }
    }
}
