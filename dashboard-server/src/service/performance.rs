//! Performance review table endpoints

use actix_web::error::{
    ErrorBadRequest, ErrorForbidden, ErrorInternalServerError, ErrorNotFound, ErrorUnauthorized,
};
use actix_web::web::{Data, Json, Path, Query};
use actix_web::{Error, HttpMessage, HttpRequest, Result, get, post, put};
use dashboard::auth::SessionClaims;
use dashboard::model::performance::{PerformanceRecord, RecordEdit};
use dashboard::service::ServiceError;
use dashboard::service::performance::{SortColumn, SortDirection, SortState};
use serde::Deserialize;

use crate::model::Model;

/// Listing options
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    search: Option<String>,
    #[serde(default)]
    sort: SortColumn,
    #[serde(default)]
    direction: SortDirection,
}

fn session(req: &HttpRequest) -> Result<SessionClaims> {
    req.extensions_mut()
        .remove::<SessionClaims>()
        .ok_or_else(|| ErrorUnauthorized("Missing session"))
}

fn service_error(err: ServiceError) -> Error {
    match err {
        ServiceError::Validation(_) => ErrorBadRequest(err.to_string()),
        ServiceError::PermissionDenied { .. } => ErrorForbidden(err.to_string()),
        ServiceError::NotFound(_) => ErrorNotFound(err.to_string()),
        err => ErrorInternalServerError(err.to_string()),
    }
}

#[get("")]
pub async fn list(
    req: HttpRequest,
    model: Data<Model>,
    query: Query<ListQuery>,
) -> Result<Json<Vec<PerformanceRecord>>> {
    session(&req)?;

    let ListQuery {
        search,
        sort,
        direction,
    } = query.into_inner();
    let mut records = model
        .performance()
        .search(search.as_deref().unwrap_or_default())
        .await;
    SortState {
        column: sort,
        direction,
    }
    .sort(&mut records);

    Ok(Json(records))
}

#[get("/{id}")]
pub async fn by_id(
    req: HttpRequest,
    model: Data<Model>,
    id: Path<u32>,
) -> Result<Json<PerformanceRecord>> {
    session(&req)?;

    let record = model
        .performance()
        .by_id(id.into_inner())
        .await
        .ok_or_else(|| service_error(ServiceError::NotFound("Record")))?;
    Ok(Json(record))
}

#[put("/{id}")]
pub async fn update(
    req: HttpRequest,
    model: Data<Model>,
    id: Path<u32>,
    edit: Json<RecordEdit>,
) -> Result<Json<PerformanceRecord>> {
    let session = session(&req)?;

    let record = model
        .performance()
        .update_as(session.user.role, id.into_inner(), edit.into_inner())
        .await
        .map_err(service_error)?;
    Ok(Json(record))
}

#[post("/{id}/approve")]
pub async fn approve(
    req: HttpRequest,
    model: Data<Model>,
    id: Path<u32>,
) -> Result<Json<PerformanceRecord>> {
    let session = session(&req)?;

    let record = model
        .performance()
        .approve_as(session.user.role, id.into_inner())
        .await
        .map_err(service_error)?;
    Ok(Json(record))
}
