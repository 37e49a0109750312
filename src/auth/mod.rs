//! Credentials, sessions and federated sign-in.

pub mod jwt;
pub mod nonce;
pub mod oauth;
pub mod password;

pub use jwt::{Claims, SESSION_COOKIE};
pub use nonce::{MemoryNonceStore, NonceStore};
pub use oauth::{GoogleOAuth, GoogleProfile};
