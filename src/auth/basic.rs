use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64Engine;
use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::RequestBuilder;

use crate::api::AuthenticatorKind;

use super::{
    AuthenticationError, Credentials, RequestAuthenticator, Session, SessionGeneration,
    SessionManager,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicSession {
    payload: String,
}

impl BasicSession {
    pub fn new(credentials: &Credentials) -> Self {
        let raw = format!("{}:{}", credentials.identifier, credentials.password);
        Self {
            payload: B64Engine.encode(raw),
        }
    }

    pub fn header_value(&self) -> String {
        format!("Basic {}", self.payload)
    }
}

impl Session for BasicSession {
    fn expires_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// HTTP basic authentication. The session is derived from the credentials,
/// no login request is sent.
#[derive(Default)]
pub struct BasicAuthenticator {
    sessions: SessionManager<BasicSession>,
}

impl BasicAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestAuthenticator for BasicAuthenticator {
    fn kind(&self) -> AuthenticatorKind {
        AuthenticatorKind::HttpBasic
    }

    async fn authenticate_request(
        &self,
        req: RequestBuilder,
        credentials: &Credentials,
    ) -> Result<(RequestBuilder, SessionGeneration), AuthenticationError> {
        let (session, generation) = self
            .sessions
            .find_or_initialize(credentials, || async { Ok(BasicSession::new(credentials)) })
            .await?;
        Ok((req.header(AUTHORIZATION, session.header_value()), generation))
    }

    async fn clear_session(&self, credentials: &Credentials) {
        self.sessions.clear(credentials).await;
    }

    async fn invalidate_session(&self, credentials: &Credentials, generation: SessionGeneration) -> bool {
        self.sessions.invalidate(credentials, generation).await
    }
}
