//! # Session Tokens
//!
//! The identity provider is external; this module only holds whatever bearer
//! token the active session currently has.

use async_trait::async_trait;
use log::info;
use tokio::sync::RwLock;

/// Source of the bearer token attached to authenticated requests
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current token, or `None` when signed out or expired
    async fn token(&self) -> Option<String>;
}

/// Token slot for the signed-in user, replaced on sign-in/refresh
#[derive(Debug, Default)]
pub struct SessionToken {
    token: RwLock<Option<String>>,
}

impl SessionToken {
    pub fn new(token: Option<String>) -> Self {
        SessionToken {
            token: RwLock::new(token),
        }
    }

    pub async fn sign_in(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
        info!("Session token updated");
    }

    pub async fn sign_out(&self) {
        *self.token.write().await = None;
        info!("Session token cleared");
    }
}

#[async_trait]
impl TokenProvider for SessionToken {
    async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }
}
