//!
//! plenario HTTP server
//! --------------------
//! Axum-based HTTP surface for the authentication and access-control
//! boundary of the platform.
//!
//! Responsibilities:
//! - Sign-up, activation, login, refresh, logout and credential-update
//!   endpoints backed by the identity store and the session manager.
//! - The session guard gating every protected route.
//! - The origin allow-list filter applied before routing decisions matter.
//! - A background sweeper dropping refresh-expired session rows.
//!
//! Domain resources (news, propositions, newsletters, ...) mount their own
//! routers behind the same guard; none of them live in this crate.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::identity::{
    ActivationState, CurrentUser, IdentityStore, MemoryIdentityStore, MemorySessionStore,
    SessionManager, SessionStore, User,
};
use crate::security::{self, OriginPolicy};

pub mod cors;
pub mod guard;

/// Shared server state injected into all handlers and middleware.
///
/// Holds handles to the durable identity store and the ephemeral session
/// store (through the manager), plus the origin policy. Everything is
/// clone-cheap and nothing is process-global, so the guard stays stateless
/// and the service replicates horizontally.
#[derive(Clone)]
pub struct AppState {
    pub identities: Arc<dyn IdentityStore>,
    pub sessions: SessionManager,
    pub origins: OriginPolicy,
}

impl AppState {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        session_store: Arc<dyn SessionStore>,
        origins: OriginPolicy,
    ) -> Self {
        Self { identities, sessions: SessionManager::new(session_store), origins }
    }
}

/// Build the full router: public auth endpoints, guarded routes behind the
/// session guard, and the origin filter wrapped around everything.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/me", get(me))
        .route("/auth/logout", post(logout))
        .route("/auth/logout-all", post(logout_all))
        .route("/auth/password", put(change_password))
        .route_layer(middleware::from_fn_with_state(state.clone(), guard::require_session));

    Router::new()
        .route("/", get(|| async { "plenario ok" }))
        .route("/auth/signup", post(signup))
        .route("/auth/activate", post(activate))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .merge(protected)
        .layer(middleware::from_fn_with_state(state.clone(), cors::origin_filter))
        .with_state(state)
}

/// Start the HTTP server with in-memory stores and the given configuration.
pub async fn run_with_config(cfg: Config) -> anyhow::Result<()> {
    let session_store = Arc::new(MemorySessionStore::new(cfg.access_ttl, cfg.refresh_ttl));

    // Background sweeper for refresh-expired session rows
    {
        let store = session_store.clone();
        tokio::spawn(async move {
            use std::time::Duration;
            loop {
                let removed = store.sweep();
                if removed > 0 {
                    tracing::debug!(removed, "session_sweep");
                }
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        });
    }

    let state = AppState::new(
        Arc::new(MemoryIdentityStore::new()),
        session_store,
        cfg.origins.clone(),
    );
    let app = router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignupPayload {
    email: String,
    password: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivatePayload {
    email: String,
    code: String,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    user_id: String,
    session_id: String,
    access_token: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordPayload {
    current_password: String,
    new_password: String,
}

async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupPayload>,
) -> AppResult<impl IntoResponse> {
    if payload.email.trim().is_empty() || !payload.email.contains('@') {
        return Err(AppError::UserInput("a valid email is required".into()));
    }
    if payload.password.len() < 8 {
        return Err(AppError::UserInput("password must be at least 8 characters".into()));
    }
    let code = security::generate_activation_code()?;
    let now = Utc::now();
    let user = User {
        id: security::random_hex(16)?,
        email: payload.email.trim().to_string(),
        first_name: payload.first_name,
        last_name: payload.last_name,
        password_hash: security::hash_password(&payload.password)?,
        activation: ActivationState::Pending { code: code.clone() },
        created_at: now,
        updated_at: now,
    };
    let user_id = user.id.clone();
    state.identities.create_user(user).await?;
    // Delivery of the code (mail-out) is a domain concern; it is logged here
    // so the delivery worker can pick it up in development setups.
    info!(user_id, code, "activation code issued");
    Ok((StatusCode::CREATED, Json(json!({ "id": user_id, "status": "pending" }))))
}

async fn activate(
    State(state): State<AppState>,
    Json(payload): Json<ActivatePayload>,
) -> AppResult<impl IntoResponse> {
    let mut user = match state.identities.get_user_by_email(payload.email.trim()).await {
        Ok(u) => u,
        Err(AppError::NotFound(_)) => return Err(AppError::Unauthorized),
        Err(e) => return Err(e),
    };
    match &user.activation {
        ActivationState::Pending { code } if *code == payload.code => {
            user.activation = ActivationState::Active;
            state.identities.update_user(user).await?;
            Ok(Json(json!({ "status": "active" })))
        }
        // wrong code, or already active: same generic denial either way
        _ => Err(AppError::Unauthorized),
    }
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> AppResult<Json<LoginResponse>> {
    let user = match state.identities.get_user_by_email(payload.email.trim()).await {
        Ok(u) => u,
        Err(AppError::NotFound(_)) => return Err(AppError::Unauthorized),
        Err(e) => return Err(e),
    };
    if !user.activation.is_active() || !security::verify_password(&user.password_hash, &payload.password) {
        return Err(AppError::Unauthorized);
    }
    let issued = state.sessions.issue(&user.id).await?;
    Ok(Json(LoginResponse {
        user_id: user.id,
        session_id: issued.session_id,
        access_token: issued.access_token,
        refresh_token: issued.refresh_token,
    }))
}

/// Explicit rotation endpoint. The carrier's bearer slot holds the refresh
/// token here; the guard is deliberately not in front of this route.
async fn refresh(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> AppResult<impl IntoResponse> {
    let Some(creds) = guard::SessionCredentials::from_headers(&headers) else {
        return Err(AppError::Unauthorized);
    };
    let access_token = state.sessions.rotate(&creds.user_id, &creds.session_id, &creds.token).await?;
    Ok(Json(json!({ "accessToken": access_token })))
}

async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    state.sessions.revoke(&current.user_id, &current.session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn logout_all(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    state.sessions.revoke_all(&current.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Credential rotation. Every session of the user is revoked once the new
/// hash is stored; clients re-authenticate with the new password.
async fn change_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<ChangePasswordPayload>,
) -> AppResult<impl IntoResponse> {
    if payload.new_password.len() < 8 {
        return Err(AppError::UserInput("password must be at least 8 characters".into()));
    }
    let mut user = state.identities.get_user_by_id(&current.user_id).await?;
    if !security::verify_password(&user.password_hash, &payload.current_password) {
        return Err(AppError::Unauthorized);
    }
    user.password_hash = security::hash_password(&payload.new_password)?;
    state.identities.update_user(user).await?;
    state.sessions.revoke_all(&current.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    let user = state.identities.get_user_by_id(&current.user_id).await?;
    Ok(Json(json!({
        "id": user.id,
        "email": user.email,
        "firstName": user.first_name,
        "lastName": user.last_name,
    })))
}
