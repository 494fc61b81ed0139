use std::collections::{BTreeMap, BTreeSet};

use super::{Action, Privilege, Relationship, Resource, ResourceDescription, ResourceIdentifier};

/// One way a user can access a resource type or instance, derived from the
/// declared relationships.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceAccess {
    pub resource_name: String,
    pub identifier: Option<ResourceIdentifier>,
    pub action: Action,
}

/// Holds the relationships of one user. Relationships are only ever added,
/// so the privileges for a description can grow but never shrink.
#[derive(Debug, Clone, Default)]
pub struct RelationshipManager {
    related: BTreeMap<ResourceDescription, Vec<Relationship>>,
}

impl RelationshipManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `relationship` to the resource (or resource instance). Relating
    /// the same relationship twice is a no-op.
    pub fn relate_to(
        &mut self,
        resource: &Resource,
        relationship: Relationship,
        identifier: Option<ResourceIdentifier>,
    ) {
        let desc = ResourceDescription::new(resource, identifier);
        let relationships = self.related.entry(desc).or_default();
        if !relationships.contains(&relationship) {
            relationships.push(relationship);
        }
    }

    /// Returns the union of privileges granted for exactly this description,
    /// or `None` when nothing has been related to it.
    pub fn resource_privileges(&self, desc: &ResourceDescription) -> Option<BTreeSet<Privilege>> {
        self.related
            .get(desc)
            .map(|relationships| Self::privileges_of(relationships))
    }

    pub fn relationships(&self, desc: &ResourceDescription) -> Option<&[Relationship]> {
        self.related.get(desc).map(|r| r.as_slice())
    }

    /// Lists every (resource, identifier, action) the relationships grant.
    pub fn list_resource_accesses(&self) -> Vec<ResourceAccess> {
        self.related
            .iter()
            .flat_map(|(desc, relationships)| {
                Self::privileges_of(relationships)
                    .into_iter()
                    .map(|privilege| ResourceAccess {
                        resource_name: desc.name.clone(),
                        identifier: desc.identifier.clone(),
                        action: privilege.action(),
                    })
            })
            .collect()
    }

    fn privileges_of(relationships: &[Relationship]) -> BTreeSet<Privilege> {
        relationships
            .iter()
            .flat_map(|r| r.privileges().iter().copied())
            .collect()
    }
}
