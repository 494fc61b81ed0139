use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use reqwest::header::COOKIE;
use reqwest::RequestBuilder;

use crate::api::AuthenticatorKind;

use super::{
    AuthenticationError, Credentials, LoginClient, RequestAuthenticator, Session,
    SessionGeneration, SessionManager,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSession {
    cookies: Vec<SessionCookie>,
    expires_at: Option<DateTime<Utc>>,
}

impl CookieSession {
    pub fn new(cookies: Vec<SessionCookie>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { cookies, expires_at }
    }

    pub fn cookies(&self) -> &[SessionCookie] {
        &self.cookies
    }

    pub fn header_value(&self) -> String {
        self.cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl Session for CookieSession {
    fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

/// Cookie based authentication. Every cookie set by the login response is
/// replayed on later requests.
pub struct CookieAuthenticator {
    login: LoginClient,
    sessions: SessionManager<CookieSession>,
}

impl CookieAuthenticator {
    pub fn new(login: LoginClient) -> Self {
        Self {
            login,
            sessions: SessionManager::new(),
        }
    }

    async fn initialize(&self, credentials: &Credentials) -> Result<CookieSession, AuthenticationError> {
        let resp = self.login.login(credentials).await?;
        let session_name = &self.login.endpoint().response_field.name;

        let mut cookies = Vec::new();
        let mut expires_at = None;
        for cookie in resp.cookies() {
            if cookie.name() == session_name {
                expires_at = match (cookie.max_age(), cookie.expires()) {
                    (Some(max_age), _) => chrono::Duration::from_std(max_age)
                        .ok()
                        .map(|max_age| Utc::now() + max_age),
                    (None, Some(expires)) => Some(DateTime::<Utc>::from(expires)),
                    (None, None) => None,
                };
            }
            cookies.push(SessionCookie {
                name: cookie.name().to_string(),
                value: cookie.value().to_string(),
            });
        }

        if cookies.is_empty() {
            return Err(AuthenticationError::MissingCookies);
        }
        if !cookies.iter().any(|c| &c.name == session_name) {
            warn!(
                "Login response of user '{}' did not set cookie '{session_name}'",
                credentials.identifier
            );
        }

        debug!(
            "Obtained {} cookie(s) for user '{}'",
            cookies.len(),
            credentials.identifier
        );
        Ok(CookieSession::new(cookies, expires_at))
    }
}

#[async_trait]
impl RequestAuthenticator for CookieAuthenticator {
    fn kind(&self) -> AuthenticatorKind {
        AuthenticatorKind::ApiKeyCookie
    }

    async fn authenticate_request(
        &self,
        req: RequestBuilder,
        credentials: &Credentials,
    ) -> Result<(RequestBuilder, SessionGeneration), AuthenticationError> {
        let (session, generation) = self
            .sessions
            .find_or_initialize(credentials, || self.initialize(credentials))
            .await?;
        Ok((req.header(COOKIE, session.header_value()), generation))
    }

    async fn clear_session(&self, credentials: &Credentials) {
        self.sessions.clear(credentials).await;
    }

    async fn invalidate_session(&self, credentials: &Credentials, generation: SessionGeneration) -> bool {
        self.sessions.invalidate(credentials, generation).await
    }
}
