//! Identity and session management for the auth boundary.
//! Keep the public surface thin and split implementation across sub-modules.

mod manager;
mod principal;
mod provider;
mod session;

pub use manager::{IssuedSession, SessionManager};
pub use principal::CurrentUser;
pub use provider::{ActivationState, IdentityStore, MemoryIdentityStore, User};
pub use session::{MemorySessionStore, SessionRecord, SessionStore};
