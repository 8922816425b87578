//! Capability sources
//!
//! A source turns a subject into the ability ids it reaches under a scope
//! context. Direct grants and role-derived grants are both sources, so the
//! resolver aggregates them the same way.

use crate::error::Result;
use crate::scope::ScopeContext;
use crate::store::{Filter, RbacStore};
use crate::types::{AbilityId, RoleId, SubjectRef};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

/// Where a grant came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Direct,
    Role,
}

/// Anything that can reach abilities on behalf of a subject
#[async_trait]
pub trait CapabilitySource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Ability ids reachable for `subject`, in source-row order
    async fn ability_ids(
        &self,
        store: &dyn RbacStore,
        ctx: &ScopeContext,
        subject: &SubjectRef,
    ) -> Result<Vec<AbilityId>>;
}

/// Permissions linking the subject straight to abilities
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectGrants;

#[async_trait]
impl CapabilitySource for DirectGrants {
    fn kind(&self) -> SourceKind {
        SourceKind::Direct
    }

    async fn ability_ids(
        &self,
        store: &dyn RbacStore,
        ctx: &ScopeContext,
        subject: &SubjectRef,
    ) -> Result<Vec<AbilityId>> {
        let permissions = store
            .permissions(&Filter::new().subject(subject).visible_under(ctx))
            .await?;

        Ok(permissions.into_iter().map(|p| p.ability_id).collect())
    }
}

/// Abilities bundled into roles the subject is assigned
///
/// Only the assignment and role ↔ ability links are filtered by scope; the
/// role rows themselves are not consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleGrants;

impl RoleGrants {
    /// Role ids visibly assigned to `subject`, first assignment first
    pub async fn role_ids(
        store: &dyn RbacStore,
        ctx: &ScopeContext,
        subject: &SubjectRef,
    ) -> Result<Vec<RoleId>> {
        let assignments = store
            .role_assignments(&Filter::new().subject(subject).visible_under(ctx))
            .await?;

        let mut ids: Vec<RoleId> = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            if !ids.contains(&assignment.role_id) {
                ids.push(assignment.role_id);
            }
        }
        Ok(ids)
    }
}

#[async_trait]
impl CapabilitySource for RoleGrants {
    fn kind(&self) -> SourceKind {
        SourceKind::Role
    }

    async fn ability_ids(
        &self,
        store: &dyn RbacStore,
        ctx: &ScopeContext,
        subject: &SubjectRef,
    ) -> Result<Vec<AbilityId>> {
        let roles = Self::role_ids(store, ctx, subject).await?;

        let per_role = try_join_all(roles.into_iter().map(|role_id| async move {
            store
                .role_abilities(&Filter::new().role(role_id).visible_under(ctx))
                .await
        }))
        .await?;

        Ok(per_role
            .into_iter()
            .flatten()
            .map(|link| link.ability_id)
            .collect())
    }
}
