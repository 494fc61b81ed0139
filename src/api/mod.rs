//! Route and security scheme descriptors. These are produced outside of the
//! engine (typically extracted from an OpenAPI document) and consumed as is.

mod url;
mod validate;

pub use url::{
    append_query, combine_url, expand_path_template, path_contains_parameter, BoundParameter, Route,
};
pub use validate::validate_api;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::policy::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[serde(alias = "GET")]
    Get,
    #[serde(alias = "POST")]
    Post,
    #[serde(alias = "PUT")]
    Put,
    #[serde(alias = "PATCH")]
    Patch,
    #[serde(alias = "DELETE")]
    Delete,
    #[serde(alias = "HEAD")]
    Head,
    #[serde(alias = "OPTIONS")]
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    Body,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
            ParameterLocation::Body => "body",
        }
    }
}

/// Where a resource identifier appears in a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLocationDescriptor {
    pub resource_name: String,
    pub resource_access: Action,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_location: Option<ParameterLocation>,
}

impl ResourceLocationDescriptor {
    /// A located resource needs a concrete identifier to build a request. An
    /// unlocated one (for example `GET /users`) addresses the resource type.
    pub fn requires_identifier(&self) -> bool {
        self.parameter_name.is_some() && self.parameter_location.is_some()
    }
}

/// One API operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub path: String,
    pub method: HttpMethod,

    /// Name of the security scheme protecting this route; absent for public
    /// routes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,

    #[serde(default)]
    pub resources: Vec<ResourceLocationDescriptor>,
}

impl RouteDescriptor {
    pub fn is_public(&self) -> bool {
        self.security.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticatorKind {
    HttpBasic,
    HttpBearer,
    ApiKeyCookie,
}

impl fmt::Display for AuthenticatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthenticatorKind::HttpBasic => write!(f, "http basic"),
            AuthenticatorKind::HttpBearer => write!(f, "http bearer"),
            AuthenticatorKind::ApiKeyCookie => write!(f, "cookie"),
        }
    }
}

/// Name and location of one field of the login request or response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,

    #[serde(default = "FieldDescriptor::default_location")]
    pub location: ParameterLocation,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, location: ParameterLocation) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }

    pub fn default_location() -> ParameterLocation {
        ParameterLocation::Body
    }
}

/// The login operation of a security scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEndpointDescriptor {
    pub path: String,

    #[serde(default = "AuthEndpointDescriptor::default_method")]
    pub method: HttpMethod,

    pub identifier_field: FieldDescriptor,
    pub password_field: FieldDescriptor,

    /// Where the session artifact is found in the login response: the token
    /// field for bearer schemes, the session cookie for cookie schemes.
    pub response_field: FieldDescriptor,
}

impl AuthEndpointDescriptor {
    pub fn default_method() -> HttpMethod {
        HttpMethod::Post
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecuritySchemeDescriptor {
    pub name: String,
    pub kind: AuthenticatorKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_endpoint: Option<AuthEndpointDescriptor>,
}

/// Everything known about the API under test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDescription {
    #[serde(default)]
    pub routes: Vec<RouteDescriptor>,

    #[serde(default)]
    pub security_schemes: Vec<SecuritySchemeDescriptor>,
}

impl ApiDescription {
    pub fn security_scheme(&self, name: &str) -> Option<&SecuritySchemeDescriptor> {
        self.security_schemes.iter().find(|s| s.name == name)
    }

    pub fn extend(&mut self, other: ApiDescription) {
        self.routes.extend(other.routes);
        self.security_schemes.extend(other.security_schemes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_descriptor() {
        let json = r#"{
            "routes": [
                {
                    "path": "/todos/{id}",
                    "method": "GET",
                    "security": "bearerAuth",
                    "resources": [
                        {
                            "resource_name": "Todo",
                            "resource_access": "read",
                            "parameter_name": "id",
                            "parameter_location": "path"
                        }
                    ]
                },
                { "path": "/health", "method": "get" }
            ],
            "security_schemes": [
                {
                    "name": "bearerAuth",
                    "kind": "http_bearer",
                    "auth_endpoint": {
                        "path": "/login",
                        "identifier_field": { "name": "email" },
                        "password_field": { "name": "password" },
                        "response_field": { "name": "token" }
                    }
                }
            ]
        }"#;

        let api: ApiDescription = serde_json::from_str(json).unwrap();
        assert_eq!(api.routes.len(), 2);
        assert!(!api.routes[0].is_public());
        assert!(api.routes[1].is_public());
        assert!(api.routes[0].resources[0].requires_identifier());

        let scheme = api.security_scheme("bearerAuth").unwrap();
        assert_eq!(scheme.kind, AuthenticatorKind::HttpBearer);
        let endpoint = scheme.auth_endpoint.as_ref().unwrap();
        assert_eq!(endpoint.method, HttpMethod::Post);
        assert_eq!(endpoint.identifier_field.location, ParameterLocation::Body);
    }
}
