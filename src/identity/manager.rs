use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::identity::session::{SessionRecord, SessionStore};
use crate::security::random_hex;

/// Tokens handed back to a client at login.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub session_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// Session state machine over the externally owned store. Stateless apart
/// from the store handle, so it can be cloned into every request path.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Mint a new session for the user: fresh session id plus access and
    /// refresh tokens. The pair is re-minted in the (practically
    /// unreachable) case the two tokens come out equal; the invariant that
    /// they differ holds unconditionally.
    pub async fn issue(&self, user_id: &str) -> AppResult<IssuedSession> {
        let session_id = random_hex(16)?;
        let access_token = random_hex(32)?;
        let mut refresh_token = random_hex(32)?;
        while refresh_token == access_token {
            refresh_token = random_hex(32)?;
        }
        self.store
            .create_session(SessionRecord {
                user_id: user_id.to_string(),
                session_id: session_id.clone(),
                access_token: access_token.clone(),
                refresh_token: refresh_token.clone(),
            })
            .await?;
        tracing::info!(user_id, session_id, "session issued");
        Ok(IssuedSession { session_id, access_token, refresh_token })
    }

    /// Access-slot check used by the guard on every protected request.
    pub async fn validate_access(
        &self,
        user_id: &str,
        session_id: &str,
        access_token: &str,
    ) -> AppResult<bool> {
        self.store.session_exists(user_id, session_id, access_token).await
    }

    /// Exchange a valid refresh token for a new access token.
    ///
    /// The access slot is overwritten in place (same session id, same
    /// refresh token); the previous access token is invalid the moment this
    /// returns. A refresh token that matches no live row is treated as a
    /// replay or forgery: the session, if any still exists under that id, is
    /// revoked before the error is returned, so an invalidated refresh token
    /// can never be replayed into a live session.
    pub async fn rotate(
        &self,
        user_id: &str,
        session_id: &str,
        refresh_token: &str,
    ) -> AppResult<String> {
        if !self.store.refresh_token_exists(user_id, session_id, refresh_token).await? {
            tracing::warn!(user_id, session_id, "refresh token replay or forgery; revoking session");
            self.store.delete_session(user_id, session_id).await?;
            return Err(AppError::InvalidCredential);
        }
        let mut access_token = random_hex(32)?;
        while access_token == refresh_token {
            access_token = random_hex(32)?;
        }
        self.store
            .create_session(SessionRecord {
                user_id: user_id.to_string(),
                session_id: session_id.to_string(),
                access_token: access_token.clone(),
                refresh_token: refresh_token.to_string(),
            })
            .await?;
        tracing::info!(user_id, session_id, "access token rotated");
        Ok(access_token)
    }

    /// Revoke one session (logout). Idempotent.
    pub async fn revoke(&self, user_id: &str, session_id: &str) -> AppResult<()> {
        self.store.delete_session(user_id, session_id).await?;
        tracing::info!(user_id, session_id, "session revoked");
        Ok(())
    }

    /// Revoke every session for the user: logout-all, credential rotation
    /// and account deactivation all funnel through here.
    pub async fn revoke_all(&self, user_id: &str) -> AppResult<()> {
        self.store.delete_sessions_by_user_id(user_id).await?;
        tracing::info!(user_id, "all sessions revoked");
        Ok(())
    }
}
