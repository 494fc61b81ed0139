use std::collections::HashSet;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::policy::{Relationship, ResourceIdentifier};

use super::expandenv;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub identifier: String,

    /// Environment variables are expanded, e.g. `$ALICE_PASSWORD`.
    pub password: String,

    #[serde(default)]
    pub relationships: Vec<RelationshipConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipConfig {
    pub resource: String,
    pub relationship: Relationship,

    /// Absent for a relationship with the resource type as a whole.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<ResourceIdentifier>,
}

impl UserConfig {
    pub(super) fn complete(&mut self, resources: &HashSet<&str>) -> Result<()> {
        if self.identifier.is_empty() {
            bail!("identifier cannot be empty");
        }
        self.password = expandenv("password", &self.password)?;

        for rel in self.relationships.iter() {
            if !resources.contains(rel.resource.as_str()) {
                return Err(ConfigurationError::UnknownRelationshipResource {
                    user: self.identifier.clone(),
                    resource: rel.resource.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}
