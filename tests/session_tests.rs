//! Session store and manager properties: creation, lookup, revocation,
//! multi-session support and store-enforced expiry.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use plenario::identity::{MemorySessionStore, SessionManager, SessionStore};

fn store(access_ttl: Duration, refresh_ttl: Duration) -> Arc<MemorySessionStore> {
    Arc::new(MemorySessionStore::new(access_ttl, refresh_ttl))
}

fn long_lived() -> Arc<MemorySessionStore> {
    store(Duration::from_secs(60), Duration::from_secs(600))
}

#[tokio::test]
async fn created_session_is_immediately_visible() -> Result<()> {
    let store = long_lived();
    let sm = SessionManager::new(store.clone());

    let issued = sm.issue("user-1").await?;
    assert!(sm.validate_access("user-1", &issued.session_id, &issued.access_token).await?);
    // tokens of one session never collide with each other
    assert_ne!(issued.access_token, issued.refresh_token);
    Ok(())
}

#[tokio::test]
async fn wrong_access_token_is_false_not_error() -> Result<()> {
    let store = long_lived();
    let sm = SessionManager::new(store.clone());

    let issued = sm.issue("user-1").await?;
    assert!(!sm.validate_access("user-1", &issued.session_id, "not-the-token").await?);
    // unknown session id and unknown user likewise
    assert!(!sm.validate_access("user-1", "no-such-session", &issued.access_token).await?);
    assert!(!sm.validate_access("someone-else", &issued.session_id, &issued.access_token).await?);
    Ok(())
}

#[tokio::test]
async fn delete_session_is_idempotent() -> Result<()> {
    let store = long_lived();
    let sm = SessionManager::new(store.clone());

    let issued = sm.issue("user-1").await?;
    sm.revoke("user-1", &issued.session_id).await?;
    assert!(!sm.validate_access("user-1", &issued.session_id, &issued.access_token).await?);
    // second delete of an absent row is a no-op
    sm.revoke("user-1", &issued.session_id).await?;
    Ok(())
}

#[tokio::test]
async fn bulk_delete_removes_every_session_of_the_user() -> Result<()> {
    let store = long_lived();
    let sm = SessionManager::new(store.clone());

    let a = sm.issue("user-1").await?;
    let b = sm.issue("user-1").await?;
    let other = sm.issue("user-2").await?;

    sm.revoke_all("user-1").await?;
    assert!(!sm.validate_access("user-1", &a.session_id, &a.access_token).await?);
    assert!(!sm.validate_access("user-1", &b.session_id, &b.access_token).await?);
    // other users are untouched
    assert!(sm.validate_access("user-2", &other.session_id, &other.access_token).await?);
    // idempotent
    sm.revoke_all("user-1").await?;
    Ok(())
}

#[tokio::test]
async fn concurrent_sessions_for_one_user_are_independent() -> Result<()> {
    let store = long_lived();
    let sm = SessionManager::new(store.clone());

    let (a, b) = tokio::join!(sm.issue("user-1"), sm.issue("user-1"));
    let (a, b) = (a?, b?);
    assert_ne!(a.session_id, b.session_id);
    assert!(sm.validate_access("user-1", &a.session_id, &a.access_token).await?);
    assert!(sm.validate_access("user-1", &b.session_id, &b.access_token).await?);

    // logging out one device leaves the other alone
    sm.revoke("user-1", &a.session_id).await?;
    assert!(!sm.validate_access("user-1", &a.session_id, &a.access_token).await?);
    assert!(sm.validate_access("user-1", &b.session_id, &b.access_token).await?);
    Ok(())
}

#[tokio::test]
async fn access_expiry_leaves_refresh_slot_valid() -> Result<()> {
    let store = store(Duration::from_millis(20), Duration::from_secs(600));
    let sm = SessionManager::new(store.clone());

    let issued = sm.issue("user-1").await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // access slot expired, refresh slot still live
    assert!(!store.session_exists("user-1", &issued.session_id, &issued.access_token).await?);
    assert!(
        store
            .refresh_token_exists("user-1", &issued.session_id, &issued.refresh_token)
            .await?
    );
    Ok(())
}

#[tokio::test]
async fn refresh_expiry_collapses_to_not_found() -> Result<()> {
    let store = store(Duration::from_millis(10), Duration::from_millis(30));
    let sm = SessionManager::new(store.clone());

    let issued = sm.issue("user-1").await?;
    tokio::time::sleep(Duration::from_millis(60)).await;

    // once the refresh window elapses the store reports the row as gone
    assert!(!store.session_exists("user-1", &issued.session_id, &issued.access_token).await?);
    assert!(
        !store
            .refresh_token_exists("user-1", &issued.session_id, &issued.refresh_token)
            .await?
    );
    Ok(())
}

#[tokio::test]
async fn sweep_drops_refresh_expired_rows() -> Result<()> {
    let store = store(Duration::from_millis(10), Duration::from_millis(20));
    let sm = SessionManager::new(store.clone());

    sm.issue("user-1").await?;
    sm.issue("user-2").await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(store.sweep(), 2);
    assert_eq!(store.sweep(), 0);
    Ok(())
}
