//! Credential storage.

use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// Source of the bearer credential attached to outgoing requests.
///
/// Owned by the application (e.g. a session store); the pipeline only reads,
/// replaces or clears it.
pub trait CredentialStore: Send + Sync {
    fn get_token(&self) -> Option<String>;
    fn set_token(&self, token: String);
    fn clear(&self);
}

/// Process-memory credential store with lock-free reads.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: ArcSwapOption<String>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.set_token(token.into());
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get_token(&self) -> Option<String> {
        self.token.load_full().map(|t| t.as_ref().clone())
    }

    fn set_token(&self, token: String) {
        self.token.store(Some(Arc::new(token)));
    }

    fn clear(&self) {
        self.token.store(None);
    }
}
