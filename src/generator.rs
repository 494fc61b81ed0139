use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;

use crate::api::{
    append_query, combine_url, expand_path_template, path_contains_parameter, BoundParameter,
    ParameterLocation, ResourceLocationDescriptor, Route, RouteDescriptor,
};
use crate::policy::{Action, PolicyDecisionPoint, Resource, ResourceAccess, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessControlResult {
    Permitted,
    Denied,
}

impl fmt::Display for AccessControlResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessControlResult::Permitted => write!(f, "permitted"),
            AccessControlResult::Denied => write!(f, "denied"),
        }
    }
}

/// One (user, concrete route, expected outcome) unit to execute. A missing
/// user means the request is sent anonymously.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestCombination {
    pub user: Option<Arc<User>>,
    pub route: Route,
    pub expected: AccessControlResult,
    pub action: Option<Action>,
}

impl TestCombination {
    pub fn is_anonymous(&self) -> bool {
        self.user.is_none()
    }

    pub fn user_name(&self) -> &str {
        match self.user {
            Some(ref user) => user.identifier(),
            None => "anonymous",
        }
    }
}

/// A declared access paired with the user it is tested for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Candidate {
    user: Arc<User>,
    access: ResourceAccess,
}

/// Turns declared relationships and route descriptors into an ordered,
/// deduplicated test matrix.
pub struct CombinationGenerator<'a> {
    base_url: &'a str,
    users: &'a [Arc<User>],
}

impl<'a> CombinationGenerator<'a> {
    pub fn new(base_url: &'a str, users: &'a [Arc<User>]) -> Self {
        Self { base_url, users }
    }

    pub fn generate(&self, routes: &[RouteDescriptor]) -> Vec<TestCombination> {
        let candidates = self.candidates();
        debug!("Built {} test candidate(s) from declared relationships", candidates.len());

        let mut combinations = Vec::new();
        for route in routes.iter() {
            self.map_route(route, &candidates, &mut combinations);
        }

        let mut seen = HashSet::with_capacity(combinations.len());
        combinations.retain(|c| seen.insert(c.clone()));

        // Destructive calls run last, and within each group denials are
        // checked before permissions. The sort is stable, so route order
        // is kept otherwise.
        combinations.sort_by_key(|c| {
            (
                c.action == Some(Action::Delete),
                c.expected == AccessControlResult::Permitted,
            )
        });
        combinations
    }

    /// Every declared access of every user, paired with every user of the
    /// roster, so the owner gets the positive case and the others the
    /// negative ones.
    fn candidates(&self) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for owner in self.users.iter() {
            for access in owner.list_resource_accesses() {
                for user in self.users.iter() {
                    let candidate = Candidate {
                        user: user.clone(),
                        access: access.clone(),
                    };
                    if seen.insert(candidate.clone()) {
                        candidates.push(candidate);
                    }
                }
            }
        }
        candidates
    }

    fn map_route(
        &self,
        route: &RouteDescriptor,
        candidates: &[Candidate],
        out: &mut Vec<TestCombination>,
    ) {
        let location = match route.resources.first() {
            Some(location) => location,
            None => {
                if !route.is_public() {
                    out.push(TestCombination {
                        user: None,
                        route: Route::new(route.method, combine_url(self.base_url, &route.path))
                            .with_security(route.security.clone()),
                        expected: AccessControlResult::Denied,
                        action: None,
                    });
                }
                return;
            }
        };
        if route.resources.len() > 1 {
            warn!(
                "Route {} '{}' has {} resource annotations, only '{}' is tested",
                route.method,
                route.path,
                route.resources.len(),
                location.resource_name
            );
        }

        let resource = Resource::new(location.resource_name.as_str());
        let action = location.resource_access;
        let located = location.requires_identifier();

        for candidate in candidates.iter() {
            let access = &candidate.access;
            if access.resource_name != location.resource_name || access.action != action {
                continue;
            }
            // Located routes need an instance to address, collection routes
            // are tested against type level grants only.
            if located != access.identifier.is_some() {
                continue;
            }

            let identifier = access.identifier.as_ref();
            let concrete = match identifier {
                Some(id) => match self.expand_route(route, location, id.as_str()) {
                    Some(concrete) => concrete,
                    None => continue,
                },
                None => Route::new(route.method, combine_url(self.base_url, &route.path)),
            };

            let allowed = PolicyDecisionPoint::is_allowed(&candidate.user, action, &resource, identifier);
            out.push(TestCombination {
                user: Some(candidate.user.clone()),
                route: concrete.with_security(route.security.clone()),
                expected: if allowed {
                    AccessControlResult::Permitted
                } else {
                    AccessControlResult::Denied
                },
                action: Some(action),
            });
        }
    }

    /// Places the identifier at the annotated location. Returns `None` when
    /// the path does not contain the annotated parameter.
    fn expand_route(
        &self,
        route: &RouteDescriptor,
        location: &ResourceLocationDescriptor,
        identifier: &str,
    ) -> Option<Route> {
        let name = location.parameter_name.as_deref()?;
        let param_location = location.parameter_location?;

        let route = match param_location {
            ParameterLocation::Path => {
                if !path_contains_parameter(&route.path, name) {
                    return None;
                }
                let values = HashMap::from([(name.to_string(), identifier.to_string())]);
                let path = expand_path_template(&route.path, &values);
                Route::new(route.method, combine_url(self.base_url, &path))
            }
            ParameterLocation::Query => {
                let url = combine_url(self.base_url, &route.path);
                Route::new(route.method, append_query(&url, name, identifier))
            }
            ParameterLocation::Header | ParameterLocation::Cookie | ParameterLocation::Body => {
                let mut concrete = Route::new(route.method, combine_url(self.base_url, &route.path));
                concrete.parameters.push(BoundParameter {
                    name: name.to_string(),
                    location: param_location,
                    value: identifier.to_string(),
                });
                concrete
            }
        };
        Some(route)
    }
}
