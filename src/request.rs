use log::debug;
use reqwest::header::COOKIE;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::api::{ParameterLocation, Route};
use crate::auth::{AuthenticationError, Credentials, RequestAuthenticator, UnionAuthenticator};

/// How many times a request is sent again after the API answered 401.
pub const MAX_REQUEST_RETRIES: usize = 2;

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("could not authenticate user '{user}': {source}")]
    Authentication {
        user: String,
        #[source]
        source: AuthenticationError,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Status of the final attempt of one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOutcome {
    pub status: StatusCode,
    pub attempts: usize,
}

/// Performs single HTTP exchanges against the API under test. Any status
/// returned by the API is a valid outcome; only login and transport
/// failures are errors.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    client: Client,
}

impl RequestExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn perform_request(
        &self,
        route: &Route,
        authenticator: Option<&UnionAuthenticator>,
        credentials: Option<&Credentials>,
        body: Option<&Value>,
    ) -> Result<RequestOutcome, RequestError> {
        let auth = match (authenticator, credentials) {
            (Some(authenticator), Some(credentials)) => Some((authenticator, credentials)),
            _ => None,
        };
        let max_attempts = match auth {
            Some(_) => MAX_REQUEST_RETRIES + 1,
            None => 1,
        };

        let mut attempts = 0;
        loop {
            attempts += 1;
            let mut req = self.build_request(route, body);
            let mut generation = None;
            if let Some((authenticator, credentials)) = auth {
                req = match authenticator.authenticate_request(req, credentials).await {
                    Ok((req, applied)) => {
                        generation = Some(applied);
                        req
                    }
                    Err(e) => {
                        return Err(RequestError::Authentication {
                            user: credentials.identifier.clone(),
                            source: e,
                        })
                    }
                };
            }

            let resp = req.send().await?;
            let status = resp.status();

            if status == StatusCode::UNAUTHORIZED {
                if let (Some((authenticator, credentials)), Some(generation)) = (auth, generation) {
                    // Only the session this request carried is dropped, one
                    // renewed by a concurrent request stays cached.
                    authenticator.invalidate_session(credentials, generation).await;
                    if attempts < max_attempts {
                        debug!(
                            "{route} answered 401 for user '{}', retrying with a new session ({attempts}/{max_attempts})",
                            credentials.identifier
                        );
                        continue;
                    }
                }
            }

            return Ok(RequestOutcome { status, attempts });
        }
    }

    fn build_request(&self, route: &Route, body: Option<&Value>) -> RequestBuilder {
        let mut req = self.client.request(route.method.to_reqwest(), &route.url);

        let mut cookies = Vec::new();
        let mut fields = Map::new();
        for param in route.parameters.iter() {
            match param.location {
                ParameterLocation::Header => {
                    req = req.header(param.name.as_str(), param.value.as_str());
                }
                ParameterLocation::Cookie => {
                    cookies.push(format!("{}={}", param.name, param.value));
                }
                ParameterLocation::Body => {
                    fields.insert(param.name.clone(), Value::String(param.value.clone()));
                }
                // Already part of the URL.
                ParameterLocation::Path | ParameterLocation::Query => {}
            }
        }
        if !cookies.is_empty() {
            req = req.header(COOKIE, cookies.join("; "));
        }

        match (body, fields.is_empty()) {
            (Some(Value::Object(body)), false) => {
                let mut merged = body.clone();
                merged.extend(fields);
                req.json(&merged)
            }
            (Some(body), _) => req.json(body),
            (None, false) => req.json(&fields),
            (None, true) => req,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::api::{BoundParameter, HttpMethod};

    use super::*;

    #[test]
    fn test_build_request_parameters() {
        let executor = RequestExecutor::new(Client::new());
        let mut route = Route::new(HttpMethod::Put, "http://127.0.0.1:8080/todos");
        route.parameters = vec![
            BoundParameter {
                name: String::from("x-todo-id"),
                location: ParameterLocation::Header,
                value: String::from("7"),
            },
            BoundParameter {
                name: String::from("todo"),
                location: ParameterLocation::Cookie,
                value: String::from("7"),
            },
            BoundParameter {
                name: String::from("id"),
                location: ParameterLocation::Body,
                value: String::from("7"),
            },
        ];

        let body = json!({ "title": "buy milk" });
        let req = executor.build_request(&route, Some(&body)).build().unwrap();
        assert_eq!(req.method(), reqwest::Method::PUT);
        assert_eq!(req.headers().get("x-todo-id").unwrap(), "7");
        assert_eq!(req.headers().get(COOKIE).unwrap(), "todo=7");

        let sent: Value = serde_json::from_slice(req.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(sent, json!({ "title": "buy milk", "id": "7" }));
    }

    #[test]
    fn test_build_request_without_body() {
        let executor = RequestExecutor::new(Client::new());
        let route = Route::new(HttpMethod::Get, "http://127.0.0.1:8080/todos?id=1");
        let req = executor.build_request(&route, None).build().unwrap();
        assert!(req.body().is_none());
        assert_eq!(req.url().query(), Some("id=1"));
    }
}
