//! File-backed implementations of the SalesDesk client's local state.

pub mod config_service;
pub mod local_storage;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::local_storage::TomlLocalStorage;
pub use crate::paths::{PathError, SalesdeskPaths};
