//! Network access to the SalesDesk assistant backend.

pub mod http_backend;

pub use http_backend::HttpChatBackend;
