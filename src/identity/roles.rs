//! Roles and role mappings

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Created at boot
pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub created: DateTime<Utc>,
}

/// Grants a role to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMapping {
    pub id: Uuid,
    pub role_id: Uuid,
    pub principal_id: Uuid,
}

#[derive(Default)]
struct RoleTables {
    roles: HashMap<String, Role>,
    mappings: Vec<RoleMapping>,
}

/// Registry of roles and the users holding them
#[derive(Default)]
pub struct RoleRegistry {
    tables: RwLock<RoleTables>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a role, returning the existing one when the name is taken
    pub fn create_role(&self, name: &str) -> Result<Role> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let role = tables
            .roles
            .entry(name.to_string())
            .or_insert_with(|| Role {
                id: Uuid::new_v4(),
                name: name.to_string(),
                created: Utc::now(),
            });
        Ok(role.clone())
    }

    pub fn find_role(&self, name: &str) -> Result<Option<Role>> {
        let tables = self
            .tables
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(tables.roles.get(name).cloned())
    }

    pub fn assign_role(&self, user_id: &Uuid, name: &str) -> Result<RoleMapping> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let role_id = tables
            .roles
            .get(name)
            .map(|role| role.id)
            .ok_or_else(|| anyhow!("Unknown role '{}'", name))?;

        if let Some(existing) = tables
            .mappings
            .iter()
            .find(|m| m.role_id == role_id && m.principal_id == *user_id)
        {
            return Ok(existing.clone());
        }

        let mapping = RoleMapping {
            id: Uuid::new_v4(),
            role_id,
            principal_id: *user_id,
        };
        tables.mappings.push(mapping.clone());
        Ok(mapping)
    }

    /// Names of the roles held by a user
    pub fn roles_of(&self, user_id: &Uuid) -> Result<Vec<String>> {
        let tables = self
            .tables
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let mut names: Vec<String> = tables
            .roles
            .values()
            .filter(|role| {
                tables
                    .mappings
                    .iter()
                    .any(|m| m.role_id == role.id && m.principal_id == *user_id)
            })
            .map(|role| role.name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Drop every mapping of a user
    pub fn revoke_all(&self, user_id: &Uuid) -> Result<usize> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let before = tables.mappings.len();
        tables.mappings.retain(|m| m.principal_id != *user_id);
        Ok(before - tables.mappings.len())
    }
}

/// Roles every deployment starts with
pub fn bootstrap_roles(registry: &RoleRegistry) -> Result<()> {
    tracing::info!("creating roles: {}", ADMIN_ROLE);
    registry.create_role(ADMIN_ROLE)?;
    Ok(())
}
