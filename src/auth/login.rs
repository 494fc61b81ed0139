use std::collections::HashMap;

use log::debug;
use reqwest::{Client, Response};
use serde_json::{Map, Value};

use crate::api::{
    combine_url, expand_path_template, AuthEndpointDescriptor, FieldDescriptor, ParameterLocation,
};

use super::{AuthenticationError, Credentials};

/// Sends login requests to the auth endpoint of one security scheme.
pub struct LoginClient {
    client: Client,
    base_url: String,
    endpoint: AuthEndpointDescriptor,
}

impl LoginClient {
    pub fn new(client: Client, base_url: impl Into<String>, endpoint: AuthEndpointDescriptor) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &AuthEndpointDescriptor {
        &self.endpoint
    }

    /// Logs in with the given credentials. Returns the response when the
    /// endpoint answered with a 2xx status.
    pub async fn login(&self, credentials: &Credentials) -> Result<Response, AuthenticationError> {
        let fields = [
            (&self.endpoint.identifier_field, credentials.identifier.as_str()),
            (&self.endpoint.password_field, credentials.password.as_str()),
        ];

        let mut path_values = HashMap::new();
        let mut query: Vec<(&str, &str)> = Vec::new();
        let mut headers: Vec<(&str, &str)> = Vec::new();
        let mut cookies: Vec<String> = Vec::new();
        let mut body = Map::new();

        for (field, value) in fields {
            Self::check_field(field)?;
            match field.location {
                ParameterLocation::Path => {
                    path_values.insert(field.name.clone(), value.to_string());
                }
                ParameterLocation::Query => query.push((field.name.as_str(), value)),
                ParameterLocation::Header => headers.push((field.name.as_str(), value)),
                ParameterLocation::Cookie => cookies.push(format!("{}={}", field.name, value)),
                ParameterLocation::Body => {
                    body.insert(field.name.clone(), Value::String(value.to_string()));
                }
            }
        }

        let path = expand_path_template(&self.endpoint.path, &path_values);
        let url = combine_url(&self.base_url, &path);
        debug!(
            "Logging in user '{}' via {} {url}",
            credentials.identifier, self.endpoint.method
        );

        let mut req = self.client.request(self.endpoint.method.to_reqwest(), &url);
        if !query.is_empty() {
            req = req.query(&query);
        }
        for (name, value) in headers {
            req = req.header(name, value);
        }
        if !cookies.is_empty() {
            req = req.header(reqwest::header::COOKIE, cookies.join("; "));
        }
        if !body.is_empty() {
            req = req.json(&Value::Object(body));
        }

        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) => return Err(AuthenticationError::Unreachable { url, source: e }),
        };

        let status = resp.status();
        if !status.is_success() {
            return Err(AuthenticationError::Rejected {
                status: status.as_u16(),
            });
        }

        Ok(resp)
    }

    fn check_field(field: &FieldDescriptor) -> Result<(), AuthenticationError> {
        if field.name.is_empty() {
            return Err(AuthenticationError::InvalidDescription(String::from(
                "identifier and password field names are required",
            )));
        }
        Ok(())
    }
}

/// Looks up a dotted path such as `data.token` in a JSON document.
pub(super) fn lookup_json_field<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, key| current.as_object()?.get(key))
}
