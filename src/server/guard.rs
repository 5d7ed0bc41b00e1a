//! Request guard: gates every protected route on a live session before any
//! domain handler runs.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::identity::CurrentUser;
use crate::server::AppState;

/// Credentials carried on an authenticated request: `x-user-id`,
/// `x-session-id` and an `Authorization: Bearer` token. The bearer slot
/// holds the access token on guarded routes and the refresh token on the
/// refresh endpoint.
#[derive(Debug)]
pub(crate) struct SessionCredentials {
    pub user_id: String,
    pub session_id: String,
    pub token: String,
}

impl SessionCredentials {
    /// Parse the carrier headers. Anything missing or malformed yields
    /// `None`; the caller turns that into the generic denial.
    pub(crate) fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let user_id = headers.get("x-user-id")?.to_str().ok()?.trim();
        let session_id = headers.get("x-session-id")?.to_str().ok()?.trim();
        let auth = headers.get("authorization")?.to_str().ok()?;
        let token = auth.strip_prefix("Bearer ")?.trim();
        if user_id.is_empty() || session_id.is_empty() || token.is_empty() {
            return None;
        }
        Some(Self {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            token: token.to_string(),
        })
    }
}

/// Middleware gating protected routes.
///
/// On a live session the resolved [`CurrentUser`] is attached to the request
/// extensions and the inner handler runs; on any auth failure the request is
/// short-circuited with the fixed 401 body. The guard never rotates tokens:
/// an expired access token is a plain denial, pushing the client to the
/// explicit refresh endpoint. Store failures surface as 503, not as a
/// denial.
pub async fn require_session(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(creds) = SessionCredentials::from_headers(req.headers()) else {
        return AppError::Unauthorized.into_response();
    };
    match state.sessions.validate_access(&creds.user_id, &creds.session_id, &creds.token).await {
        Ok(true) => {
            req.extensions_mut().insert(CurrentUser {
                user_id: creds.user_id,
                session_id: creds.session_id,
            });
            next.run(req).await
        }
        Ok(false) => AppError::Unauthorized.into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(user: &str, sid: &str, auth: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert("x-user-id", HeaderValue::from_str(user).unwrap());
        h.insert("x-session-id", HeaderValue::from_str(sid).unwrap());
        h.insert("authorization", HeaderValue::from_str(auth).unwrap());
        h
    }

    #[test]
    fn parses_well_formed_carrier() {
        let h = headers("u1", "s1", "Bearer tok123");
        let c = SessionCredentials::from_headers(&h).unwrap();
        assert_eq!(c.user_id, "u1");
        assert_eq!(c.session_id, "s1");
        assert_eq!(c.token, "tok123");
    }

    #[test]
    fn rejects_missing_or_malformed_carrier() {
        assert!(SessionCredentials::from_headers(&HeaderMap::new()).is_none());

        let mut partial = HeaderMap::new();
        partial.insert("x-user-id", HeaderValue::from_static("u1"));
        assert!(SessionCredentials::from_headers(&partial).is_none());

        // wrong scheme
        let h = headers("u1", "s1", "Basic dXNlcjpwdw==");
        assert!(SessionCredentials::from_headers(&h).is_none());

        // empty token
        let h = headers("u1", "s1", "Bearer ");
        assert!(SessionCredentials::from_headers(&h).is_none());
    }
}
