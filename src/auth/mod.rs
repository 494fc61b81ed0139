mod basic;
mod bearer;
mod cookie;
mod login;
mod registry;
mod session;

pub use basic::{BasicAuthenticator, BasicSession};
pub use bearer::{BearerAuthenticator, BearerSession};
pub use cookie::{CookieAuthenticator, CookieSession, SessionCookie};
pub use login::LoginClient;
pub use registry::AuthenticatorRegistry;
pub use session::{Session, SessionGeneration, SessionManager};

use std::fmt;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use thiserror::Error;

use crate::api::AuthenticatorKind;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub identifier: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("password", &"******")
            .finish()
    }
}

#[derive(Error, Debug)]
pub enum AuthenticationError {
    #[error("authentication endpoint '{url}' is unreachable: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("authentication endpoint reachable but rejected credentials, status code {status}")]
    Rejected { status: u16 },

    #[error("no token found in field '{0}' of the login response")]
    MissingToken(String),

    #[error("no cookies found in the login response")]
    MissingCookies,

    #[error("invalid login request description: {0}")]
    InvalidDescription(String),

    #[error("invalid login response: {0}")]
    InvalidResponse(String),
}

/// Decorates outgoing requests with the authentication artifact of one
/// scheme, logging in first when no session is cached for the user.
#[async_trait]
pub trait RequestAuthenticator: Send + Sync {
    fn kind(&self) -> AuthenticatorKind;

    /// Returns the decorated request and the generation of the session it
    /// carries.
    async fn authenticate_request(
        &self,
        req: RequestBuilder,
        credentials: &Credentials,
    ) -> Result<(RequestBuilder, SessionGeneration), AuthenticationError>;

    /// Drops the cached session, the next request logs in again.
    async fn clear_session(&self, credentials: &Credentials);

    /// Drops the cached session if it is still the one of `generation`.
    /// Returns false when another request has already renewed it.
    async fn invalidate_session(&self, credentials: &Credentials, generation: SessionGeneration) -> bool;
}

pub enum UnionAuthenticator {
    Basic(BasicAuthenticator),
    Bearer(BearerAuthenticator),
    Cookie(CookieAuthenticator),
}

#[async_trait]
impl RequestAuthenticator for UnionAuthenticator {
    fn kind(&self) -> AuthenticatorKind {
        match self {
            UnionAuthenticator::Basic(auth) => auth.kind(),
            UnionAuthenticator::Bearer(auth) => auth.kind(),
            UnionAuthenticator::Cookie(auth) => auth.kind(),
        }
    }

    async fn authenticate_request(
        &self,
        req: RequestBuilder,
        credentials: &Credentials,
    ) -> Result<(RequestBuilder, SessionGeneration), AuthenticationError> {
        match self {
            UnionAuthenticator::Basic(auth) => auth.authenticate_request(req, credentials).await,
            UnionAuthenticator::Bearer(auth) => auth.authenticate_request(req, credentials).await,
            UnionAuthenticator::Cookie(auth) => auth.authenticate_request(req, credentials).await,
        }
    }

    async fn clear_session(&self, credentials: &Credentials) {
        match self {
            UnionAuthenticator::Basic(auth) => auth.clear_session(credentials).await,
            UnionAuthenticator::Bearer(auth) => auth.clear_session(credentials).await,
            UnionAuthenticator::Cookie(auth) => auth.clear_session(credentials).await,
        }
    }

    async fn invalidate_session(&self, credentials: &Credentials, generation: SessionGeneration) -> bool {
        match self {
            UnionAuthenticator::Basic(auth) => auth.invalidate_session(credentials, generation).await,
            UnionAuthenticator::Bearer(auth) => auth.invalidate_session(credentials, generation).await,
            UnionAuthenticator::Cookie(auth) => auth.invalidate_session(credentials, generation).await,
        }
    }
}
