//! Domain model and contracts of the SalesDesk chat client.
//!
//! Everything here is free of I/O: storage and the remote backend are
//! reached through the [`session::LocalStorage`] and
//! [`backend::ChatBackend`] traits.

pub mod backend;
pub mod config;
pub mod conversation;
pub mod error;
pub mod render;
pub mod session;

// Re-export common error type
pub use error::SalesdeskError;
