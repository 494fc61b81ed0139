use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use reqwest::Client;
use tokio::sync::Mutex;

use crate::api::{ApiDescription, AuthenticatorKind, Route, SecuritySchemeDescriptor};
use crate::error::ConfigurationError;

use super::{
    BasicAuthenticator, BearerAuthenticator, CookieAuthenticator, LoginClient, UnionAuthenticator,
};

/// Run scoped registry holding one authenticator per security scheme, so
/// that sessions are shared by every route protected by the same scheme.
pub struct AuthenticatorRegistry {
    client: Client,
    base_url: String,
    authenticators: Mutex<HashMap<String, Arc<UnionAuthenticator>>>,
}

impl AuthenticatorRegistry {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            authenticators: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the authenticator of the route's security scheme, `None` for
    /// public routes.
    pub async fn authenticator_for(
        &self,
        api: &ApiDescription,
        route: &Route,
    ) -> Result<Option<Arc<UnionAuthenticator>>, ConfigurationError> {
        let name = match route.security {
            Some(ref name) => name,
            None => return Ok(None),
        };
        let scheme = match api.security_scheme(name) {
            Some(scheme) => scheme,
            None => {
                return Err(ConfigurationError::UnknownSecurityScheme {
                    method: route.method.to_string(),
                    path: route.url.clone(),
                    scheme: name.clone(),
                })
            }
        };
        self.get_or_create(scheme).await.map(Some)
    }

    pub async fn get_or_create(
        &self,
        scheme: &SecuritySchemeDescriptor,
    ) -> Result<Arc<UnionAuthenticator>, ConfigurationError> {
        let mut authenticators = self.authenticators.lock().await;
        if let Some(auth) = authenticators.get(&scheme.name) {
            return Ok(auth.clone());
        }

        let auth = Arc::new(self.build(scheme)?);
        debug!(
            "Created {} authenticator for security scheme '{}'",
            scheme.kind, scheme.name
        );
        authenticators.insert(scheme.name.clone(), auth.clone());
        Ok(auth)
    }

    fn build(&self, scheme: &SecuritySchemeDescriptor) -> Result<UnionAuthenticator, ConfigurationError> {
        if let AuthenticatorKind::HttpBasic = scheme.kind {
            return Ok(UnionAuthenticator::Basic(BasicAuthenticator::new()));
        }

        let endpoint = match scheme.auth_endpoint {
            Some(ref endpoint) => endpoint.clone(),
            None => return Err(ConfigurationError::MissingAuthEndpoint(scheme.name.clone())),
        };
        let login = LoginClient::new(self.client.clone(), self.base_url.clone(), endpoint);

        Ok(match scheme.kind {
            AuthenticatorKind::HttpBearer => UnionAuthenticator::Bearer(BearerAuthenticator::new(login)),
            AuthenticatorKind::ApiKeyCookie => UnionAuthenticator::Cookie(CookieAuthenticator::new(login)),
            AuthenticatorKind::HttpBasic => UnionAuthenticator::Basic(BasicAuthenticator::new()),
        })
    }
}
