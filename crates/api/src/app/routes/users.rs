use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::app::{dto, errors, services::AppServices};
use crate::context::OriginContext;

/// `GET /users?domain=`: list a tenant's users from the primary store.
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(origin): Extension<OriginContext>,
    Query(query): Query<dto::UserQuery>,
) -> Response {
    let domain = services
        .resolver()
        .resolve(query.domain.as_deref(), None, Some(origin.origin().as_str()));

    match services.sync().list(domain).await {
        Ok(data) => (StatusCode::OK, Json(dto::ListResponse { success: true, data })).into_response(),
        Err(e) => errors::sync_error_to_response(e),
    }
}

/// `POST /users`: register in the primary store, then the mirror.
pub async fn register_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(origin): Extension<OriginContext>,
    Query(query): Query<dto::UserQuery>,
    body: Option<Json<dto::UserBody>>,
) -> Response {
    // Unparseable bodies are treated as empty so the caller gets a field-level 400.
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let domain = services.resolver().resolve(
        query.domain.as_deref(),
        body.domain.as_deref(),
        Some(origin.origin().as_str()),
    );

    match services
        .sync()
        .register(body.name.as_deref(), body.email.as_deref(), domain)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(dto::WriteResponse::from(&outcome))).into_response(),
        Err(e) => errors::sync_error_to_response(e),
    }
}

/// `PUT /users?email=&domain=`: rename in the primary store, then the mirror.
pub async fn modify_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(origin): Extension<OriginContext>,
    Query(query): Query<dto::UserQuery>,
    body: Option<Json<dto::UserBody>>,
) -> Response {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let domain = services.resolver().resolve(
        query.domain.as_deref(),
        body.domain.as_deref(),
        Some(origin.origin().as_str()),
    );
    let email = query
        .email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .or(body.email.as_deref());

    match services
        .sync()
        .modify(email, domain, body.name.as_deref())
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(dto::WriteResponse::from(&outcome))).into_response(),
        Err(e) => errors::sync_error_to_response(e),
    }
}
