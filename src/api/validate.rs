use std::collections::HashSet;

use crate::error::ConfigurationError;
use crate::policy::Resource;

use super::{path_contains_parameter, ApiDescription, AuthenticatorKind, ParameterLocation};

/// Checks the route annotations and security schemes against the declared
/// resources. Any error here must stop the run before a request is sent.
pub fn validate_api(api: &ApiDescription, resources: &[Resource]) -> Result<(), ConfigurationError> {
    let resource_names: HashSet<&str> = resources.iter().map(|r| r.name()).collect();

    let mut scheme_names = HashSet::new();
    for scheme in api.security_schemes.iter() {
        if !scheme_names.insert(scheme.name.as_str()) {
            return Err(ConfigurationError::DuplicateSecurityScheme(scheme.name.clone()));
        }
        let needs_endpoint = matches!(
            scheme.kind,
            AuthenticatorKind::HttpBearer | AuthenticatorKind::ApiKeyCookie
        );
        if needs_endpoint && scheme.auth_endpoint.is_none() {
            return Err(ConfigurationError::MissingAuthEndpoint(scheme.name.clone()));
        }
    }

    for route in api.routes.iter() {
        let method = route.method.to_string();

        if let Some(ref scheme) = route.security {
            if !scheme_names.contains(scheme.as_str()) {
                return Err(ConfigurationError::UnknownSecurityScheme {
                    method: method.clone(),
                    path: route.path.clone(),
                    scheme: scheme.clone(),
                });
            }
        }

        for location in route.resources.iter() {
            let incomplete = |reason: String| ConfigurationError::IncompleteAnnotation {
                method: method.clone(),
                path: route.path.clone(),
                reason,
            };

            if location.resource_name.is_empty() {
                return Err(incomplete(String::from("resource name is empty")));
            }
            if !resource_names.contains(location.resource_name.as_str()) {
                return Err(ConfigurationError::UnknownResource {
                    method: method.clone(),
                    path: route.path.clone(),
                    resource: location.resource_name.clone(),
                });
            }

            match (&location.parameter_name, location.parameter_location) {
                (Some(name), Some(ParameterLocation::Path)) => {
                    if !path_contains_parameter(&route.path, name) {
                        return Err(incomplete(format!(
                            "path parameter '{name}' does not appear in the path"
                        )));
                    }
                }
                (Some(name), None) => {
                    return Err(incomplete(format!(
                        "parameter '{name}' has no parameter location"
                    )));
                }
                (None, Some(loc)) => {
                    return Err(incomplete(format!(
                        "parameter location '{}' has no parameter name",
                        loc.as_str()
                    )));
                }
                _ => {}
            }
        }
    }

    Ok(())
}
