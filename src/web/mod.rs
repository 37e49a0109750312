//! HTTP surface: routing, extraction and handlers.

pub mod extract;
pub mod handlers;
pub mod routes;

pub use extract::AuthedUser;
