//! # auth-adapters
//!
//! `SessionProvider` implementations. Signing in happens outside this
//! workspace; what arrives here is the identity it produced.

use async_trait::async_trait;
use domains::{DomainResult, Identity, SessionProvider};
use tracing::debug;

/// Identity fixed when the session starts.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    identity: Option<Identity>,
}

impl StaticSession {
    pub fn anonymous() -> Self {
        Self { identity: None }
    }

    pub fn signed_in(identity: Identity) -> Self {
        Self { identity: Some(identity) }
    }

    /// Builds a session from optional user id and email; no user id means signed out.
    pub fn from_parts(user_id: Option<String>, email: Option<String>) -> Self {
        let identity = user_id.filter(|id| !id.trim().is_empty()).map(|id| Identity { user_id: id, email });
        Self { identity }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn current_identity(&self) -> DomainResult<Option<Identity>> {
        debug!(signed_in = self.identity.is_some(), "session lookup");
        Ok(self.identity.clone())
    }
}
