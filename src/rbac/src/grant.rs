//! Grant store: permission, role assignment and role ability links
//!
//! Each link kind is stamped on its own (see [`ScopeContext::link_scope`]).
//! Removals only touch links visible under the active scope and report how
//! many rows went away; removing something that is not there removes zero.

use crate::entity::EntityStore;
use crate::error::{RbacError, Result};
use crate::scope::ScopeContext;
use crate::store::{Filter, RbacStore, ScopeFilter};
use crate::types::{
    Ability, AbilityId, AbilitySpec, LinkKind, Permission, Role, RoleAbility, RoleAssignment,
    SubjectRef,
};
use std::sync::Arc;
use tracing::debug;

/// Creates and removes grant links
#[derive(Clone)]
pub struct GrantStore {
    store: Arc<dyn RbacStore>,
    entities: EntityStore,
}

impl GrantStore {
    pub fn new(store: Arc<dyn RbacStore>, entities: EntityStore) -> Self {
        Self { store, entities }
    }

    // ------------------------------------------------------------------
    // subject ↔ ability
    // ------------------------------------------------------------------

    /// Link `subject` to `ability`
    ///
    /// Re-granting a link already stored with the same stamp returns the
    /// stored link without inserting a duplicate.
    pub async fn grant(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        ability: &Ability,
    ) -> Result<Permission> {
        ctx.validate()?;
        subject.validate()?;
        self.ensure_ability(ability.id).await?;

        let scope = ctx.link_scope(LinkKind::Permission);
        let same = Filter::new()
            .subject(subject)
            .ability(ability.id)
            .scope(ScopeFilter::Exactly(scope.clone()));

        if let Some(existing) = self.store.permissions(&same).await?.into_iter().next() {
            debug!("Permission {} -> {} already granted", subject, ability.id);
            return Ok(existing);
        }

        let permission = Permission {
            subject: subject.clone(),
            ability_id: ability.id,
            scope,
        };
        debug!(
            "Granting {} '{}' on '{}' to {} (scope={:?})",
            if ability.forbidden { "forbid" } else { "allow" },
            ability.action,
            ability.entity_type,
            subject,
            permission.scope
        );

        self.store.insert_permission(permission.clone()).await?;
        Ok(permission)
    }

    /// Remove visible links between `subject` and `ability`
    pub async fn revoke(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        ability: &Ability,
    ) -> Result<usize> {
        let removed = self
            .store
            .delete_permissions(&Filter::new().subject(subject).ability(ability.id).visible_under(ctx))
            .await?;

        debug!("Revoked {} permission(s) {} -> {}", removed, subject, ability.id);
        Ok(removed)
    }

    /// Grant a forbid-ability for the capability
    pub async fn forbid(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        spec: &AbilitySpec,
    ) -> Result<Permission> {
        let ability = self.entities.find_or_create_ability(ctx, spec, true).await?;
        self.grant(ctx, subject, &ability).await
    }

    /// Remove the visible forbidding grants for the capability
    ///
    /// Forbids granted under other scopes stay in place.
    pub async fn unforbid(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        spec: &AbilitySpec,
    ) -> Result<usize> {
        self.remove_subject_capability(ctx, subject, spec, true).await
    }

    /// Remove the visible allowing grants for the capability
    pub async fn disallow(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        spec: &AbilitySpec,
    ) -> Result<usize> {
        self.remove_subject_capability(ctx, subject, spec, false).await
    }

    // ------------------------------------------------------------------
    // subject ↔ role
    // ------------------------------------------------------------------

    /// Assign `role` to `subject`
    pub async fn assign_role(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        role: &Role,
    ) -> Result<RoleAssignment> {
        ctx.validate()?;
        subject.validate()?;
        self.ensure_role(role).await?;

        let scope = ctx.link_scope(LinkKind::RoleAssignment);
        let same = Filter::new()
            .subject(subject)
            .role(role.id)
            .scope(ScopeFilter::Exactly(scope.clone()));

        if let Some(existing) = self.store.role_assignments(&same).await?.into_iter().next() {
            return Ok(existing);
        }

        let assignment = RoleAssignment {
            subject: subject.clone(),
            role_id: role.id,
            scope,
        };
        debug!("Assigning role '{}' to {} (scope={:?})", role.name, subject, assignment.scope);

        self.store.insert_role_assignment(assignment.clone()).await?;
        Ok(assignment)
    }

    /// Remove visible assignments of `role` to `subject`
    pub async fn retract_role(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        role: &Role,
    ) -> Result<usize> {
        let removed = self
            .store
            .delete_role_assignments(&Filter::new().subject(subject).role(role.id).visible_under(ctx))
            .await?;

        debug!("Retracted role '{}' from {} ({} row(s))", role.name, subject, removed);
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // role ↔ ability
    // ------------------------------------------------------------------

    /// Add `ability` to the bundle of `role`
    pub async fn attach_ability_to_role(
        &self,
        ctx: &ScopeContext,
        role: &Role,
        ability: &Ability,
    ) -> Result<RoleAbility> {
        ctx.validate()?;
        self.ensure_role(role).await?;
        self.ensure_ability(ability.id).await?;

        let scope = ctx.link_scope(LinkKind::RoleAbility);
        let same = Filter::new()
            .role(role.id)
            .ability(ability.id)
            .scope(ScopeFilter::Exactly(scope.clone()));

        if let Some(existing) = self.store.role_abilities(&same).await?.into_iter().next() {
            return Ok(existing);
        }

        let link = RoleAbility {
            role_id: role.id,
            ability_id: ability.id,
            scope,
        };
        debug!(
            "Attaching '{}' on '{}' to role '{}' (scope={:?})",
            ability.action, ability.entity_type, role.name, link.scope
        );

        self.store.insert_role_ability(link.clone()).await?;
        Ok(link)
    }

    /// Remove visible links between `role` and `ability`
    pub async fn detach_ability_from_role(
        &self,
        ctx: &ScopeContext,
        role: &Role,
        ability: &Ability,
    ) -> Result<usize> {
        self.store
            .delete_role_abilities(&Filter::new().role(role.id).ability(ability.id).visible_under(ctx))
            .await
    }

    /// Add a forbid-ability for the capability to the bundle of `role`
    pub async fn forbid_for_role(
        &self,
        ctx: &ScopeContext,
        role: &Role,
        spec: &AbilitySpec,
    ) -> Result<RoleAbility> {
        let ability = self.entities.find_or_create_ability(ctx, spec, true).await?;
        self.attach_ability_to_role(ctx, role, &ability).await
    }

    /// Remove the visible forbid-abilities for the capability from `role`
    pub async fn unforbid_for_role(
        &self,
        ctx: &ScopeContext,
        role: &Role,
        spec: &AbilitySpec,
    ) -> Result<usize> {
        self.remove_role_capability(ctx, role, spec, true).await
    }

    /// Remove the visible allow-abilities for the capability from `role`
    pub async fn disallow_for_role(
        &self,
        ctx: &ScopeContext,
        role: &Role,
        spec: &AbilitySpec,
    ) -> Result<usize> {
        self.remove_role_capability(ctx, role, spec, false).await
    }

    // ------------------------------------------------------------------
    // helpers
    // ------------------------------------------------------------------

    async fn remove_subject_capability(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        spec: &AbilitySpec,
        forbidden: bool,
    ) -> Result<usize> {
        let linked: Vec<AbilityId> = self
            .store
            .permissions(&Filter::new().subject(subject).visible_under(ctx))
            .await?
            .into_iter()
            .map(|p| p.ability_id)
            .collect();

        let targets = self.capability_ids(linked, spec, forbidden).await?;
        if targets.is_empty() {
            debug!(
                "No {} grant for '{}' on '{}' visible to {}",
                kind_label(forbidden),
                spec.action,
                spec.entity_type,
                subject
            );
            return Ok(0);
        }

        self.store
            .delete_permissions(&Filter::new().subject(subject).abilities(targets).visible_under(ctx))
            .await
    }

    async fn remove_role_capability(
        &self,
        ctx: &ScopeContext,
        role: &Role,
        spec: &AbilitySpec,
        forbidden: bool,
    ) -> Result<usize> {
        let linked: Vec<AbilityId> = self
            .store
            .role_abilities(&Filter::new().role(role.id).visible_under(ctx))
            .await?
            .into_iter()
            .map(|l| l.ability_id)
            .collect();

        let targets = self.capability_ids(linked, spec, forbidden).await?;
        if targets.is_empty() {
            debug!(
                "No {} ability for '{}' on '{}' in role '{}'",
                kind_label(forbidden),
                spec.action,
                spec.entity_type,
                role.name
            );
            return Ok(0);
        }

        self.store
            .delete_role_abilities(&Filter::new().role(role.id).abilities(targets).visible_under(ctx))
            .await
    }

    /// Which of `linked` describe exactly `spec` with the given flag
    async fn capability_ids(
        &self,
        linked: Vec<AbilityId>,
        spec: &AbilitySpec,
        forbidden: bool,
    ) -> Result<Vec<AbilityId>> {
        if linked.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .store
            .abilities(&Filter::new().abilities(linked))
            .await?
            .into_iter()
            .filter(|a| a.forbidden == forbidden && a.is_capability(spec))
            .map(|a| a.id)
            .collect())
    }

    async fn ensure_ability(&self, id: AbilityId) -> Result<()> {
        match self.store.ability(id).await? {
            Some(_) => Ok(()),
            None => Err(RbacError::NotFound(format!("{}", id))),
        }
    }

    async fn ensure_role(&self, role: &Role) -> Result<()> {
        match self.store.role(role.id).await? {
            Some(_) => Ok(()),
            None => Err(RbacError::NotFound(format!("{} ('{}')", role.id, role.name))),
        }
    }
}

fn kind_label(forbidden: bool) -> &'static str {
    if forbidden {
        "forbidding"
    } else {
        "allowing"
    }
}
