use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use log::debug;
use reqwest::header::HeaderName;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;

use crate::api::{AuthenticatorKind, FieldDescriptor, ParameterLocation};

use super::login::lookup_json_field;
use super::{
    AuthenticationError, Credentials, LoginClient, RequestAuthenticator, Session,
    SessionGeneration, SessionManager,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerSession {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl BearerSession {
    /// Builds a session from a token. When the token is a JWT carrying an
    /// `exp` claim, the session expires with it.
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let expires_at = token_expiry(&token);
        Self { token, expires_at }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Session for BearerSession {
    fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    #[serde(default)]
    exp: Option<i64>,
}

/// Reads the `exp` claim without verifying the token, the signing key
/// belongs to the API under test.
fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let claims = decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()?
        .claims;
    DateTime::from_timestamp(claims.exp?, 0)
}

/// HTTP bearer authentication. Logs in against the auth endpoint and sends
/// the returned token in the `Authorization` header.
pub struct BearerAuthenticator {
    login: LoginClient,
    sessions: SessionManager<BearerSession>,
}

impl BearerAuthenticator {
    pub fn new(login: LoginClient) -> Self {
        Self {
            login,
            sessions: SessionManager::new(),
        }
    }

    async fn initialize(&self, credentials: &Credentials) -> Result<BearerSession, AuthenticationError> {
        let resp = self.login.login(credentials).await?;
        let token = extract_token(resp, &self.login.endpoint().response_field).await?;
        let session = BearerSession::new(token);
        match session.expires_at {
            Some(expires_at) => debug!(
                "Obtained bearer token for user '{}', expires at {}",
                credentials.identifier,
                expires_at.to_rfc3339()
            ),
            None => debug!("Obtained bearer token for user '{}'", credentials.identifier),
        }
        Ok(session)
    }
}

async fn extract_token(resp: Response, field: &FieldDescriptor) -> Result<String, AuthenticationError> {
    let missing = || AuthenticationError::MissingToken(field.name.clone());
    match field.location {
        ParameterLocation::Header => {
            let name = HeaderName::from_bytes(field.name.as_bytes()).map_err(|_| {
                AuthenticationError::InvalidDescription(format!(
                    "invalid header name '{}'",
                    field.name
                ))
            })?;
            let value = resp.headers().get(name).ok_or_else(missing)?;
            let value = value.to_str().map_err(|_| missing())?;
            let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
            if token.is_empty() {
                return Err(missing());
            }
            Ok(token.to_string())
        }
        _ => {
            let body: Value = resp
                .json()
                .await
                .map_err(|e| AuthenticationError::InvalidResponse(format!("{e}")))?;
            match lookup_json_field(&body, &field.name) {
                Some(Value::String(token)) if !token.is_empty() => Ok(token.clone()),
                _ => Err(missing()),
            }
        }
    }
}

#[async_trait]
impl RequestAuthenticator for BearerAuthenticator {
    fn kind(&self) -> AuthenticatorKind {
        AuthenticatorKind::HttpBearer
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
        Ok((req.bearer_auth(session.token()), generation))
    }

    async fn clear_session(&self, credentials: &Credentials) {
        self.sessions.clear(credentials).await;
    }

    async fn invalidate_session(&self, credentials: &Credentials, generation: SessionGeneration) -> bool {
        self.sessions.invalidate(credentials, generation).await
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct TestClaims {
        sub: String,
        exp: i64,
    }

    fn make_token(exp: i64) -> String {
        let claims = TestClaims {
            sub: String::from("alice"),
            exp,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"server-side-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_jwt_expiry() {
        let exp = Utc::now().timestamp() + 3600;
        let session = BearerSession::new(make_token(exp));
        assert_eq!(session.expires_at().unwrap().timestamp(), exp);
        assert!(!session.is_expired());

        let session = BearerSession::new(make_token(Utc::now().timestamp() - 10));
        assert!(session.is_expired());
    }

    #[test]
    fn test_opaque_token() {
        let session = BearerSession::new("opaque-token");
        assert_eq!(session.expires_at(), None);
        assert!(!session.is_expired());
        assert_eq!(session.token(), "opaque-token");
    }
}
