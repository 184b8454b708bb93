//! Identity provider port.
//!
//! The platform trusts an upstream identity source and never manages
//! credentials itself; this port only exchanges participant names for
//! session tokens and resolves tokens back to identities.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// An authenticated participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable participant name supplied by the upstream identity source
    pub participant: String,
}

/// Session-token identity contract.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Start a session for a participant and return its token.
    async fn login(&self, participant: &str) -> DomainResult<String>;

    /// Resolve a session token to the identity it was issued for.
    async fn resolve(&self, token: &str) -> DomainResult<Option<Identity>>;

    /// Revoke a session token. Revoking an unknown token is a no-op.
    async fn logout(&self, token: &str) -> DomainResult<()>;
}
