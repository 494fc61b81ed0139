use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use log::{error, info, warn};
use reqwest::StatusCode;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::api::{ApiDescription, Route};
use crate::auth::AuthenticatorRegistry;
use crate::generator::{AccessControlResult, TestCombination};
use crate::request::{RequestError, RequestExecutor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSymbol {
    Pass,
    Fail,
    Skip,
}

impl ResultSymbol {
    pub fn symbol(&self) -> &'static str {
        match self {
            ResultSymbol::Pass => "✅",
            ResultSymbol::Fail => "❌",
            ResultSymbol::Skip => "⏭️",
        }
    }
}

impl fmt::Display for ResultSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub user: Option<String>,
    pub route: Route,
    pub expected: AccessControlResult,
    pub actual: Option<AccessControlResult>,
    pub status_code: Option<u16>,
    pub result: ResultSymbol,
    pub explanation: String,
}

impl TestResult {
    fn skipped(combination: &TestCombination, explanation: String) -> Self {
        Self {
            user: combination.user.as_ref().map(|u| u.identifier().to_string()),
            route: combination.route.clone(),
            expected: combination.expected,
            actual: None,
            status_code: None,
            result: ResultSymbol::Skip,
            explanation,
        }
    }

    pub fn user_name(&self) -> &str {
        self.user.as_deref().unwrap_or("anonymous")
    }
}

/// Outcome of comparing a response status against the expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub actual: AccessControlResult,
    pub passed: bool,
    pub explanation: String,
}

/// Classifies a response. A 403 counts as a denial. An anonymous request
/// expected to be denied is also denied by a 401, an authenticated one must
/// get exactly 403.
pub fn classify(expected: AccessControlResult, anonymous: bool, status: StatusCode) -> Classification {
    let anonymous_denial = anonymous && expected == AccessControlResult::Denied;
    let actual = if status == StatusCode::FORBIDDEN
        || (anonymous_denial && status == StatusCode::UNAUTHORIZED)
    {
        AccessControlResult::Denied
    } else {
        AccessControlResult::Permitted
    };
    let code = status.as_u16();

    let (passed, explanation) = match expected {
        AccessControlResult::Permitted => {
            if actual == AccessControlResult::Permitted {
                (true, format!("access permitted as expected, status code {code}"))
            } else {
                (false, String::from("expected access to be permitted, but got 403"))
            }
        }
        AccessControlResult::Denied if anonymous => {
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                (true, format!("anonymous access denied as expected, status code {code}"))
            } else {
                (
                    false,
                    format!("expected anonymous access to be denied with 401 or 403, but got {code}"),
                )
            }
        }
        AccessControlResult::Denied => {
            if status == StatusCode::FORBIDDEN {
                (true, String::from("access denied as expected, status code 403"))
            } else if status == StatusCode::UNAUTHORIZED {
                (
                    false,
                    String::from("expected 403 but got 401, the user could not be authenticated"),
                )
            } else {
                (false, format!("expected access to be denied with 403, but got {code}"))
            }
        }
    };

    Classification {
        actual,
        passed,
        explanation,
    }
}

/// Executes test combinations one at a time. Users whose login failed once
/// are blocked for the rest of the run.
pub struct TestCaseExecutor {
    api: Arc<ApiDescription>,
    registry: Arc<AuthenticatorRegistry>,
    requests: RequestExecutor,
    blocked: Mutex<HashSet<String>>,
}

impl TestCaseExecutor {
    pub fn new(
        api: Arc<ApiDescription>,
        registry: Arc<AuthenticatorRegistry>,
        requests: RequestExecutor,
    ) -> Self {
        Self {
            api,
            registry,
            requests,
            blocked: Mutex::new(HashSet::new()),
        }
    }

    pub async fn is_blocked(&self, identifier: &str) -> bool {
        self.blocked.lock().await.contains(identifier)
    }

    pub async fn execute(&self, combination: &TestCombination) -> TestResult {
        let credentials = combination.user.as_ref().map(|u| u.credentials());

        if let Some(ref credentials) = credentials {
            if self.is_blocked(&credentials.identifier).await {
                info!(
                    "Skipping {} for user '{}', an earlier login of this user failed",
                    combination.route, credentials.identifier
                );
                return TestResult::skipped(
                    combination,
                    format!(
                        "user '{}' is blocked because an earlier login failed",
                        credentials.identifier
                    ),
                );
            }
        }

        // Anonymous requests are sent without any authenticator.
        let authenticator = match credentials {
            Some(_) => match self.registry.authenticator_for(&self.api, &combination.route).await {
                Ok(authenticator) => authenticator,
                Err(e) => {
                    error!("Cannot authenticate requests to {}: {e}", combination.route);
                    return TestResult::skipped(combination, format!("{e}"));
                }
            },
            None => None,
        };

        let outcome = self
            .requests
            .perform_request(
                &combination.route,
                authenticator.as_deref(),
                credentials.as_ref(),
                None,
            )
            .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(RequestError::Authentication { user, source }) => {
                error!("Login of user '{user}' failed: {source}");
                warn!("Could not impersonate user '{user}', skipping all of their remaining tests");
                self.blocked.lock().await.insert(user.clone());
                return TestResult::skipped(
                    combination,
                    format!("could not impersonate user '{user}': {source}"),
                );
            }
            Err(e) => {
                warn!("Request {} failed: {e}", combination.route);
                return TestResult::skipped(combination, format!("{e}"));
            }
        };

        let classification = classify(combination.expected, combination.is_anonymous(), outcome.status);
        TestResult {
            user: combination.user.as_ref().map(|u| u.identifier().to_string()),
            route: combination.route.clone(),
            expected: combination.expected,
            actual: Some(classification.actual),
            status_code: Some(outcome.status.as_u16()),
            result: if classification.passed {
                ResultSymbol::Pass
            } else {
                ResultSymbol::Fail
            },
            explanation: classification.explanation,
        }
    }
}
