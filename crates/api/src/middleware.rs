use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue, Method, StatusCode,
        header::{
            ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ORIGIN, VARY,
        },
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

use usersync_access::{OriginGate, ValidatedOrigin};

use crate::app::errors;
use crate::context::OriginContext;

const ALLOW_METHODS: &str = "GET, POST, PUT, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";
const EXPOSE_HEADERS: &str = "Content-Type";

#[derive(Clone)]
pub struct GateState {
    pub gate: Arc<OriginGate>,
}

impl GateState {
    pub fn new(gate: OriginGate) -> Self {
        Self { gate: Arc::new(gate) }
    }
}

/// Origin gate for every data route, preflight included.
///
/// Denied origins get 403 regardless of method. Allowed `OPTIONS` requests are
/// answered here with 204; everything else continues with an [`OriginContext`]
/// and gets CORS headers echoing the validated origin.
pub async fn origin_gate(State(state): State<GateState>, mut req: Request, next: Next) -> Response {
    let raw = req
        .headers()
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let origin = match state.gate.validate(raw.as_deref()) {
        Ok(origin) => origin,
        Err(e) => {
            tracing::warn!(
                method = %req.method(),
                path = %req.uri().path(),
                reason = %e,
                "blocked origin"
            );
            return errors::json_error(StatusCode::FORBIDDEN, "origin_not_allowed", "Origin not allowed");
        }
    };

    if req.method() == Method::OPTIONS {
        let mut res = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(res.headers_mut(), &origin);
        return res;
    }

    req.extensions_mut().insert(OriginContext::new(origin.clone()));

    let mut res = next.run(req).await;
    apply_cors_headers(res.headers_mut(), &origin);
    res
}

fn apply_cors_headers(headers: &mut HeaderMap, origin: &ValidatedOrigin) {
    // The value came from a request header, so it is always a valid header value.
    if let Ok(value) = HeaderValue::from_str(origin.as_str()) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
    headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
    headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_static(EXPOSE_HEADERS));
    headers.append(VARY, HeaderValue::from_static("Origin"));
}
