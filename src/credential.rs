use std::sync::RwLock;

/// Single-slot bearer credential shared between the token-ingestion
/// endpoint and the dispatch loop.
///
/// Absent until the out-of-band login flow delivers a token. The loop
/// reads it every tick and never writes it; absence is a steady state,
/// not an error.
#[derive(Default)]
pub struct CredentialStore {
    token: RwLock<Option<String>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set(&self, token: String) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token);
    }
}
