use serde::{Deserialize, Serialize};

/// Identity resolved by the request guard and handed to downstream handlers
/// through the request extensions. Handlers receive this typed value rather
/// than re-reading credential headers or consulting ambient state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: String,
    pub session_id: String,
}
