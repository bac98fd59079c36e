//! Authentication hook for the identity handshake.
//!
//! This crate doesn't implement authentication itself — that's the
//! deployment's job (a provider's JWKS, a session cookie store, whatever
//! issues tokens upstream). Instead it defines the [`Authenticator`] trait:
//! a single async method that takes the bearer token from the client's
//! first `IDENTIFY` frame and returns a verified identity or an error.
//!
//! # Why a trait?
//!
//! It lets production wire up real token verification while local runs and
//! tests use [`DevAuthenticator`], without either side touching dispatcher
//! code.

use crate::SessionError;
use chess_protocol::UserId;

/// A verified identity produced by an [`Authenticator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    /// Name of the identity provider that vouched for this token
    /// (`"dev"`, `"oauth"`, ...), carried through for logging.
    pub provider: String,
}

/// Validates a client's bearer token and returns their identity.
///
/// `Send + Sync + 'static`: the authenticator is shared across connection
/// tasks and lives as long as the server.
pub trait Authenticator: Send + Sync + 'static {
    /// Validates `token` (as sent in the `IDENTIFY` frame's payload) and
    /// returns the identity it names.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] if the token is invalid, expired, or
    /// rejected outright.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Identity, SessionError>> + Send;
}

/// Accepts any non-empty token and treats it as a literal user id.
///
/// Never select this authenticator in production — the top-level
/// configuration layer refuses to start with it unless the environment is
/// explicitly `development`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DevAuthenticator;

impl Authenticator for DevAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Identity, SessionError> {
        if token.trim().is_empty() {
            return Err(SessionError::AuthFailed("token must not be empty".into()));
        }
        Ok(Identity {
            user_id: UserId::from(token.trim()),
            provider: "dev".to_string(),
        })
    }
}
