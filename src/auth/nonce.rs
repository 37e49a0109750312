//! One-time state tokens for the OAuth redirect dance.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use uuid::Uuid;

pub const NONCE_TTL: Duration = Duration::from_secs(10 * 60);

/// Issued before redirecting to the provider, consumed on callback.
/// A token is good for exactly one consume within [`NONCE_TTL`].
pub trait NonceStore: Send + Sync {
    fn issue(&self) -> String;
    fn consume(&self, token: &str) -> bool;
}

/// In-process store. Sufficient for a single instance; a multi-instance
/// deployment would need a shared backend behind the same trait.
#[derive(Default)]
pub struct MemoryNonceStore {
    inner: Mutex<HashMap<String, Instant>>,
}

impl MemoryNonceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NonceStore for MemoryNonceStore {
    fn issue(&self) -> String {
        let token = Uuid::new_v4().to_string();
        let mut map = self.inner.lock();
        let now = Instant::now();
        // abandoned logins must not accumulate
        map.retain(|_, issued| now.duration_since(*issued) < NONCE_TTL);
        map.insert(token.clone(), now);
        token
    }

    fn consume(&self, token: &str) -> bool {
        match self.inner.lock().remove(token) {
            Some(issued) => issued.elapsed() < NONCE_TTL,
            None => false,
        }
    }
}
