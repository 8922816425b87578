//! In-memory store implementation

use super::{Filter, RbacStore, Row};
use crate::error::Result;
use crate::types::{Ability, Permission, Role, RoleAbility, RoleAssignment};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

type Table<T> = Arc<RwLock<Vec<T>>>;

/// In-memory store keeping every table as an insertion-ordered vector
#[derive(Clone, Default)]
pub struct InMemoryStore {
    abilities: Table<Ability>,
    roles: Table<Role>,
    permissions: Table<Permission>,
    role_assignments: Table<RoleAssignment>,
    role_abilities: Table<RoleAbility>,
}

impl InMemoryStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

async fn select<T: Row + Clone>(table: &Table<T>, filter: &Filter) -> Vec<T> {
    let rows = table.read().await;
    rows.iter().filter(|row| filter.matches(*row)).cloned().collect()
}

async fn remove<T: Row>(table: &Table<T>, filter: &Filter) -> usize {
    let mut rows = table.write().await;
    let before = rows.len();
    rows.retain(|row| !filter.matches(row));
    before - rows.len()
}

#[async_trait]
impl RbacStore for InMemoryStore {
    async fn insert_ability(&self, ability: Ability) -> Result<()> {
        self.abilities.write().await.push(ability);
        Ok(())
    }

    async fn abilities(&self, filter: &Filter) -> Result<Vec<Ability>> {
        Ok(select(&self.abilities, filter).await)
    }

    async fn insert_role(&self, role: Role) -> Result<()> {
        self.roles.write().await.push(role);
        Ok(())
    }

    async fn roles(&self, filter: &Filter) -> Result<Vec<Role>> {
        Ok(select(&self.roles, filter).await)
    }

    async fn insert_permission(&self, permission: Permission) -> Result<()> {
        self.permissions.write().await.push(permission);
        Ok(())
    }

    async fn permissions(&self, filter: &Filter) -> Result<Vec<Permission>> {
        Ok(select(&self.permissions, filter).await)
    }

    async fn delete_permissions(&self, filter: &Filter) -> Result<usize> {
        Ok(remove(&self.permissions, filter).await)
    }

    async fn insert_role_assignment(&self, assignment: RoleAssignment) -> Result<()> {
        self.role_assignments.write().await.push(assignment);
        Ok(())
    }

    async fn role_assignments(&self, filter: &Filter) -> Result<Vec<RoleAssignment>> {
        Ok(select(&self.role_assignments, filter).await)
    }

    async fn delete_role_assignments(&self, filter: &Filter) -> Result<usize> {
        Ok(remove(&self.role_assignments, filter).await)
    }

    async fn insert_role_ability(&self, link: RoleAbility) -> Result<()> {
        self.role_abilities.write().await.push(link);
        Ok(())
    }

    async fn role_abilities(&self, filter: &Filter) -> Result<Vec<RoleAbility>> {
        Ok(select(&self.role_abilities, filter).await)
    }

    async fn delete_role_abilities(&self, filter: &Filter) -> Result<usize> {
        Ok(remove(&self.role_abilities, filter).await)
    }
}
