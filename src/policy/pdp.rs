use super::{Action, Resource, ResourceDescription, ResourceIdentifier, User};

/// Policy Decision Point: decides from the declared relationships whether a
/// user should be able to perform an action.
pub struct PolicyDecisionPoint;

impl PolicyDecisionPoint {
    /// Returns true when the privilege required for `action` is granted
    /// either on the instance (`resource`, `identifier`) or on the resource
    /// type as a whole. A type level grant covers every instance; an
    /// instance grant never covers the type.
    pub fn is_allowed(
        user: &User,
        action: Action,
        resource: &Resource,
        identifier: Option<&ResourceIdentifier>,
    ) -> bool {
        let required = action.privilege();

        let type_desc = ResourceDescription::type_level(resource);
        let granted_on_type = user
            .resource_privileges(&type_desc)
            .is_some_and(|privileges| privileges.contains(&required));
        if granted_on_type {
            return true;
        }

        match identifier {
            Some(id) => {
                let desc = ResourceDescription::new(resource, Some(id.clone()));
                user.resource_privileges(&desc)
                    .is_some_and(|privileges| privileges.contains(&required))
            }
            None => false,
        }
    }
}
