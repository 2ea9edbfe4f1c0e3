//! Anonymous session identity.
//!
//! A session is a persistent anonymous identity correlating one local
//! storage scope with its remote conversation history.

pub mod identity;
pub mod model;
pub mod storage;

pub use identity::{SESSION_ID_KEY, SessionIdentityManager};
pub use model::SessionId;
pub use storage::{LocalStorage, MemoryLocalStorage};
