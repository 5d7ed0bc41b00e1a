//! Pre-routing origin filter. Runs before the guard and before any route
//! dispatch; a disallowed origin never reaches an auth check.

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::server::AppState;

const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "content-type, authorization, x-user-id, x-session-id";

fn cors_headers(resp: &mut Response, origin: &HeaderValue) {
    let h = resp.headers_mut();
    h.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
    h.insert(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
    h.insert(header::VARY, HeaderValue::from_static("Origin"));
}

/// Middleware enforcing the configured origin allow-list.
///
/// Requests without an `Origin` header (same-origin, curl, server-to-server)
/// pass through untouched. A present but disallowed or unreadable origin is
/// rejected with the same fixed 401 body the guard uses. Allowed preflights
/// short-circuit with 204; allowed requests proceed and the response echoes
/// the origin back.
pub async fn origin_filter(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(origin) = req.headers().get(header::ORIGIN).cloned() else {
        return next.run(req).await;
    };
    let Ok(origin_str) = origin.to_str() else {
        return AppError::Unauthorized.into_response();
    };
    if let Err(e) = state.origins.verify(origin_str) {
        tracing::warn!(origin = origin_str, "request from disallowed origin");
        return e.into_response();
    }
    if req.method() == Method::OPTIONS {
        let mut resp = StatusCode::NO_CONTENT.into_response();
        cors_headers(&mut resp, &origin);
        let h = resp.headers_mut();
        h.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        h.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        return resp;
    }
    let mut resp = next.run(req).await;
    cors_headers(&mut resp, &origin);
    resp
}
