use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::auth::Credentials;
use crate::error::ConfigurationError;

use super::{
    Privilege, Relationship, RelationshipManager, Resource, ResourceAccess, ResourceDescription,
    ResourceIdentifier,
};

/// An identity under test. Users are created through a [`Roster`], which
/// guarantees identifiers are unique within a run, so equality and hashing
/// only look at the identifier.
#[derive(Clone)]
pub struct User {
    identifier: String,
    password: String,
    relationships: RelationshipManager,
}

impl User {
    fn new(identifier: String, password: String) -> Self {
        Self {
            identifier,
            password,
            relationships: RelationshipManager::new(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            identifier: self.identifier.clone(),
            password: self.password.clone(),
        }
    }

    pub fn relate_to(
        &mut self,
        resource: &Resource,
        relationship: Relationship,
        identifier: Option<ResourceIdentifier>,
    ) -> &mut Self {
        self.relationships
            .relate_to(resource, relationship, identifier);
        self
    }

    /// The user owns the resource type, or one instance of it.
    pub fn owns(&mut self, resource: &Resource, identifier: Option<ResourceIdentifier>) -> &mut Self {
        self.relate_to(resource, Relationship::Ownership, identifier)
    }

    /// The user can create resources of the given type.
    pub fn can_create(&mut self, resource: &Resource) -> &mut Self {
        self.relate_to(resource, Relationship::Creator, None)
    }

    pub fn can_view(&mut self, resource: &Resource, identifier: Option<ResourceIdentifier>) -> &mut Self {
        self.relate_to(resource, Relationship::Viewer, identifier)
    }

    pub fn can_edit(&mut self, resource: &Resource, identifier: Option<ResourceIdentifier>) -> &mut Self {
        self.relate_to(resource, Relationship::Editor, identifier)
    }

    pub fn can_delete(
        &mut self,
        resource: &Resource,
        identifier: Option<ResourceIdentifier>,
    ) -> &mut Self {
        self.relate_to(resource, Relationship::Deleter, identifier)
    }

    pub fn resource_privileges(&self, desc: &ResourceDescription) -> Option<BTreeSet<Privilege>> {
        self.relationships.resource_privileges(desc)
    }

    pub fn list_resource_accesses(&self) -> Vec<ResourceAccess> {
        self.relationships.list_resource_accesses()
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("identifier", &self.identifier)
            .field("relationships", &self.relationships)
            .finish_non_exhaustive()
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for User {}

impl Hash for User {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier)
    }
}

/// The users declared for one run.
#[derive(Debug, Default)]
pub struct Roster {
    users: Vec<User>,
    identifiers: HashSet<String>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new user. Fails if the identifier has already been used in
    /// this roster.
    pub fn create_user(
        &mut self,
        identifier: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<&mut User, ConfigurationError> {
        let identifier = identifier.into();
        if !self.identifiers.insert(identifier.clone()) {
            return Err(ConfigurationError::DuplicateUser(identifier));
        }

        self.users.push(User::new(identifier, password.into()));
        let idx = self.users.len() - 1;
        Ok(&mut self.users[idx])
    }

    pub fn get(&self, identifier: &str) -> Option<&User> {
        self.users.iter().find(|u| u.identifier == identifier)
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Freezes the roster; the returned users are shared by the generated
    /// test combinations.
    pub fn into_shared(self) -> Vec<Arc<User>> {
        self.users.into_iter().map(Arc::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_user() {
        let mut roster = Roster::new();
        assert!(roster.is_empty());
        roster.create_user("bob", "secret").unwrap();

        let err = roster.create_user("bob", "other").unwrap_err();
        assert_eq!(err, ConfigurationError::DuplicateUser("bob".to_string()));
        assert_eq!(
            err.to_string(),
            "user with identifier 'bob' has already been created in this run"
        );
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.get("bob").unwrap().password(), "secret");
    }

    #[test]
    fn test_relate_chain() {
        let todo = Resource::new("Todo");
        let mut roster = Roster::new();
        roster
            .create_user("alice", "pw")
            .unwrap()
            .owns(&todo, Some("1".into()))
            .can_create(&todo);

        let alice = roster.get("alice").unwrap();
        let accesses = alice.list_resource_accesses();
        assert_eq!(accesses.len(), 5);
        assert_eq!(alice.credentials().identifier, "alice");
    }
}
