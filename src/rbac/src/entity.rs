//! Entity store: ability and role definitions
//!
//! New rows are stamped from the scope context at the instant of the call:
//! the active scope, unless `only_relations` keeps definitions global.

use crate::error::{RbacError, Result};
use crate::scope::ScopeContext;
use crate::store::{Filter, RbacStore};
use crate::types::{Ability, AbilityId, AbilitySpec, Role, RoleId};
use std::sync::Arc;
use tracing::debug;

/// Creates and lists abilities and roles
#[derive(Clone)]
pub struct EntityStore {
    store: Arc<dyn RbacStore>,
}

impl EntityStore {
    pub fn new(store: Arc<dyn RbacStore>) -> Self {
        Self { store }
    }

    /// Create an allow-ability
    ///
    /// Every call inserts a new row; use [`find_or_create_ability`] to reuse
    /// an existing definition.
    ///
    /// [`find_or_create_ability`]: EntityStore::find_or_create_ability
    pub async fn create_ability(&self, ctx: &ScopeContext, spec: &AbilitySpec) -> Result<Ability> {
        self.insert_ability(ctx, spec, false).await
    }

    /// Create a forbid-ability for the same capability tuple
    pub async fn create_forbidden_ability(
        &self,
        ctx: &ScopeContext,
        spec: &AbilitySpec,
    ) -> Result<Ability> {
        self.insert_ability(ctx, spec, true).await
    }

    /// Reuse an ability this context would otherwise create, or create it
    ///
    /// A row is reused only when it is visible, describes the same tuple with
    /// the same `forbidden` flag, and carries the scope a new row would get.
    pub async fn find_or_create_ability(
        &self,
        ctx: &ScopeContext,
        spec: &AbilitySpec,
        forbidden: bool,
    ) -> Result<Ability> {
        ctx.validate()?;
        spec.validate()?;
        let stamp = ctx.entity_scope();

        let existing = self
            .store
            .abilities(&Filter::new().name(spec.action.clone()).visible_under(ctx))
            .await?
            .into_iter()
            .find(|a| a.is_capability(spec) && a.forbidden == forbidden && a.scope == stamp);

        match existing {
            Some(ability) => Ok(ability),
            None => self.insert_ability(ctx, spec, forbidden).await,
        }
    }

    /// Create a role
    pub async fn create_role(&self, ctx: &ScopeContext, name: &str) -> Result<Role> {
        ctx.validate()?;
        if name.trim().is_empty() {
            return Err(RbacError::Validation("Role name cannot be empty".to_string()));
        }

        let role = Role::new(name, ctx.entity_scope());
        debug!("Creating role '{}' (scope={:?})", role.name, role.scope);

        self.store.insert_role(role.clone()).await?;
        Ok(role)
    }

    /// Reuse a visible role with this name, or create one
    pub async fn find_or_create_role(&self, ctx: &ScopeContext, name: &str) -> Result<Role> {
        ctx.validate()?;
        match self.role_named(ctx, name).await? {
            Some(role) => Ok(role),
            None => self.create_role(ctx, name).await,
        }
    }

    /// Abilities visible under the active scope
    pub async fn abilities(&self, ctx: &ScopeContext) -> Result<Vec<Ability>> {
        self.store.abilities(&Filter::new().visible_under(ctx)).await
    }

    /// Roles visible under the active scope
    pub async fn roles(&self, ctx: &ScopeContext) -> Result<Vec<Role>> {
        self.store.roles(&Filter::new().visible_under(ctx)).await
    }

    /// Every visible role with this name, in stored order
    pub async fn roles_named(&self, ctx: &ScopeContext, name: &str) -> Result<Vec<Role>> {
        self.store.roles(&Filter::new().name(name).visible_under(ctx)).await
    }

    /// Visible role with this name, preferring the tenant's own over a global one
    pub async fn role_named(&self, ctx: &ScopeContext, name: &str) -> Result<Option<Role>> {
        let candidates = self.roles_named(ctx, name).await?;

        let scoped = candidates.iter().find(|r| r.scope.is_some()).cloned();
        Ok(scoped.or_else(|| candidates.into_iter().next()))
    }

    /// Ability by id, regardless of scope
    pub async fn ability(&self, id: AbilityId) -> Result<Option<Ability>> {
        self.store.ability(id).await
    }

    /// Role by id, regardless of scope
    pub async fn role(&self, id: RoleId) -> Result<Option<Role>> {
        self.store.role(id).await
    }

    async fn insert_ability(
        &self,
        ctx: &ScopeContext,
        spec: &AbilitySpec,
        forbidden: bool,
    ) -> Result<Ability> {
        ctx.validate()?;
        spec.validate()?;

        let ability = Ability::from_spec(spec, forbidden, ctx.entity_scope());
        debug!(
            "Creating {} ability '{}' on '{}' (scope={:?})",
            if forbidden { "forbid" } else { "allow" },
            ability.action,
            ability.entity_type,
            ability.scope
        );

        self.store.insert_ability(ability.clone()).await?;
        Ok(ability)
    }
}
