mod pdp;
mod relationship;
mod user;

pub use pdp::PolicyDecisionPoint;
pub use relationship::{RelationshipManager, ResourceAccess};
pub use user::{Roster, User};

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named type of protected entity, for example "Todo".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Resource {
    name: String,
}

impl Resource {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Identifier of one concrete resource instance. Numeric identifiers are kept
/// in their decimal string form so that `Todo:123` and `Todo:"123"` are the
/// same instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawIdentifier")]
pub struct ResourceIdentifier(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawIdentifier {
    Text(String),
    Number(i64),
}

impl From<RawIdentifier> for ResourceIdentifier {
    fn from(raw: RawIdentifier) -> Self {
        match raw {
            RawIdentifier::Text(s) => Self(s),
            RawIdentifier::Number(n) => Self(n.to_string()),
        }
    }
}

impl ResourceIdentifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ResourceIdentifier {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ResourceIdentifier {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

macro_rules! identifier_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ResourceIdentifier {
                fn from(n: $t) -> Self {
                    Self(n.to_string())
                }
            }
        )*
    };
}

identifier_from_int!(i32, i64, u32, u64);

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key under which relationships are stored: a resource type, optionally
/// narrowed to one instance. Kept as a struct rather than a `name:id` string,
/// so identifiers containing ':' cannot collide with other keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceDescription {
    pub name: String,
    pub identifier: Option<ResourceIdentifier>,
}

impl ResourceDescription {
    pub fn new(resource: &Resource, identifier: Option<ResourceIdentifier>) -> Self {
        Self {
            name: resource.name().to_string(),
            identifier,
        }
    }

    pub fn type_level(resource: &Resource) -> Self {
        Self::new(resource, None)
    }

    pub fn is_type_level(&self) -> bool {
        self.identifier.is_none()
    }
}

impl fmt::Display for ResourceDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.identifier {
            Some(ref id) => write!(f, "{}:{}", self.name, id),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    #[serde(alias = "owns")]
    Ownership,
    #[serde(alias = "edit")]
    Editor,
    #[serde(alias = "view")]
    Viewer,
    #[serde(alias = "create")]
    Creator,
    #[serde(alias = "delete")]
    Deleter,
}

impl Relationship {
    /// The static relationship to privilege table.
    pub fn privileges(&self) -> &'static [Privilege] {
        match self {
            Relationship::Ownership => &[
                Privilege::Create,
                Privilege::Read,
                Privilege::Update,
                Privilege::Delete,
            ],
            // Editing always includes reading.
            Relationship::Editor => &[Privilege::Read, Privilege::Update],
            Relationship::Viewer => &[Privilege::Read],
            Relationship::Creator => &[Privilege::Create],
            Relationship::Deleter => &[Privilege::Delete],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Privilege {
    Create,
    Read,
    Update,
    Delete,
}

impl Privilege {
    pub fn action(&self) -> Action {
        match self {
            Privilege::Create => Action::Create,
            Privilege::Read => Action::Read,
            Privilege::Update => Action::Update,
            Privilege::Delete => Action::Delete,
        }
    }
}

/// Verb form of [`Privilege`], used in route annotations and PDP queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub fn privilege(&self) -> Privilege {
        match self {
            Action::Create => Privilege::Create,
            Action::Read => Privilege::Read,
            Action::Update => Privilege::Update,
            Action::Delete => Privilege::Delete,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_privileges() {
        use Privilege::*;

        let cases = [
            (Relationship::Ownership, vec![Create, Read, Update, Delete]),
            (Relationship::Editor, vec![Read, Update]),
            (Relationship::Viewer, vec![Read]),
            (Relationship::Creator, vec![Create]),
            (Relationship::Deleter, vec![Delete]),
        ];
        for (relationship, expect) in cases {
            assert_eq!(relationship.privileges(), expect.as_slice(), "{relationship:?}");
        }
    }

    #[test]
    fn test_action_privilege_mapping() {
        for action in [Action::Create, Action::Read, Action::Update, Action::Delete] {
            assert_eq!(action.privilege().action(), action);
        }
    }

    #[test]
    fn test_resource_description() {
        let todo = Resource::new("Todo");
        let desc = ResourceDescription::new(&todo, Some("123".into()));
        assert_eq!(desc.to_string(), "Todo:123");
        assert!(!desc.is_type_level());

        let desc = ResourceDescription::type_level(&todo);
        assert_eq!(desc.to_string(), "Todo");
        assert!(desc.is_type_level());
    }

    #[test]
    fn test_description_with_separator_in_identifier() {
        let a = Resource::new("a");
        let ab = Resource::new("a:b");
        let left = ResourceDescription::new(&a, Some("b:c".into()));
        let right = ResourceDescription::new(&ab, Some("c".into()));
        assert_ne!(left, right);
    }

    #[test]
    fn test_identifier_deserialize() {
        let id: ResourceIdentifier = serde_json::from_str("123").unwrap();
        assert_eq!(id, ResourceIdentifier::from(123));
        let id: ResourceIdentifier = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(id.as_str(), "abc");
    }
}
