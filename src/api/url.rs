use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::{HttpMethod, ParameterLocation};

/// A parameter that is not part of the URL and has to be attached to the
/// request itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BoundParameter {
    pub name: String,
    pub location: ParameterLocation,
    pub value: String,
}

/// A concrete, fully expanded request target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Route {
    pub method: HttpMethod,
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<BoundParameter>,
}

impl Route {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            security: None,
            parameters: Vec::new(),
        }
    }

    pub fn with_security(mut self, security: Option<String>) -> Self {
        self.security = security;
        self
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Joins base and path with exactly one '/'.
pub fn combine_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return format!("{base}/");
    }
    format!("{base}/{path}")
}

pub fn path_contains_parameter(path: &str, name: &str) -> bool {
    path.contains(&format!("{{{name}}}"))
}

/// Substitutes `{name}` placeholders in a path template. Values are
/// percent-encoded; placeholders without a value are left untouched.
pub fn expand_path_template(template: &str, values: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let end = start + len;
        let name = &rest[start + 1..end];

        out.push_str(&rest[..start]);
        match values.get(name) {
            Some(value) => out.push_str(&urlencoding::encode(value)),
            None => out.push_str(&rest[start..=end]),
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Appends one query parameter to a URL that may already carry a query.
pub fn append_query(url: &str, name: &str, value: &str) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!(
        "{url}{sep}{}={}",
        urlencoding::encode(name),
        urlencoding::encode(value)
    )
}
