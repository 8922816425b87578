//! Scope-aware authorization resolver
//!
//! Aggregates direct and role-derived grants visible under the active scope
//! and decides with forbid-over-allow precedence.
//!
//! # Pipeline
//!
//! ```text
//! ScopeContext → visible Permission / RoleAssignment → visible RoleAbility
//!              → abilities → match (action, target) → forbid? allow? deny
//! ```

pub mod decision;
pub mod source;

pub use decision::{evaluate, AuthDecision, DecisionReason, Grant, Verdict};
pub use source::{CapabilitySource, DirectGrants, RoleGrants, SourceKind};

use crate::error::Result;
use crate::scope::ScopeContext;
use crate::store::{Filter, RbacStore};
use crate::types::{Ability, AbilityId, Role, SubjectRef, Target, WILDCARD};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Answers authorization and relation queries for subjects
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn RbacStore>,
    sources: Vec<Arc<dyn CapabilitySource>>,
    wildcard: String,
}

impl Resolver {
    /// Resolver over direct and role-derived grants, direct first
    pub fn new(store: Arc<dyn RbacStore>) -> Self {
        Self {
            store,
            sources: vec![Arc::new(DirectGrants), Arc::new(RoleGrants)],
            wildcard: WILDCARD.to_string(),
        }
    }

    /// Use a different wildcard token for actions and entity types
    pub fn with_wildcard(mut self, wildcard: impl Into<String>) -> Self {
        self.wildcard = wildcard.into();
        self
    }

    /// Every ability reachable by `subject` under the active scope
    ///
    /// Direct abilities come first, then role-derived ones, each in the order
    /// their source rows were stored. An ability reached twice is listed once.
    pub async fn abilities_for(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
    ) -> Result<Vec<Ability>> {
        let mut ids: Vec<AbilityId> = Vec::new();

        for source in &self.sources {
            let reached = source.ability_ids(self.store.as_ref(), ctx, subject).await?;
            debug!("{:?} source reached {} ability link(s) for {}", source.kind(), reached.len(), subject);

            for id in reached {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut rows: HashMap<AbilityId, Ability> = self
            .store
            .abilities(&Filter::new().abilities(ids.clone()))
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        Ok(ids.into_iter().filter_map(|id| rows.remove(&id)).collect())
    }

    /// Visible abilities covering `action` on `target`, tagged allow/forbid
    pub async fn candidates(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        action: &str,
        target: &Target,
    ) -> Result<Vec<Grant>> {
        Ok(self
            .abilities_for(ctx, subject)
            .await?
            .into_iter()
            .filter(|a| a.matches(action, target, &self.wildcard))
            .map(Grant::from)
            .collect())
    }

    /// Allow or deny `action` on `target` for `subject`
    pub async fn authorize(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        action: &str,
        target: &Target,
    ) -> Result<Verdict> {
        Ok(self.decide(ctx, subject, action, target).await?.verdict)
    }

    /// Like [`authorize`](Resolver::authorize), with the deciding ability
    pub async fn decide(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        action: &str,
        target: &Target,
    ) -> Result<AuthDecision> {
        let grants = self.candidates(ctx, subject, action, target).await?;
        let decision = AuthDecision::new(subject, action, ctx.current().cloned(), &grants);

        debug!(
            "Decision: {:?} for {} {} on {} (scope={:?}, {} candidate(s), {})",
            decision.verdict,
            subject,
            action,
            target.entity_type,
            decision.scope,
            decision.candidates,
            decision.reason
        );

        Ok(decision)
    }

    /// Roles visibly assigned to `subject`
    pub async fn roles_for(&self, ctx: &ScopeContext, subject: &SubjectRef) -> Result<Vec<Role>> {
        let ids = RoleGrants::role_ids(self.store.as_ref(), ctx, subject).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut rows: HashMap<_, Role> = self
            .store
            .roles(&Filter::new().roles(ids.clone()))
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        Ok(ids.into_iter().filter_map(|id| rows.remove(&id)).collect())
    }

    /// Whether `subject` visibly holds a role named `name`
    pub async fn has_role(&self, ctx: &ScopeContext, subject: &SubjectRef, name: &str) -> Result<bool> {
        Ok(self.roles_for(ctx, subject).await?.iter().any(|r| r.name == name))
    }

    /// Whether `subject` visibly holds at least one of `names`
    pub async fn has_any_role(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        names: &[&str],
    ) -> Result<bool> {
        let roles = self.roles_for(ctx, subject).await?;
        Ok(names.iter().any(|name| roles.iter().any(|r| r.name == *name)))
    }

    /// Whether `subject` visibly holds every one of `names`
    pub async fn has_all_roles(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        names: &[&str],
    ) -> Result<bool> {
        let roles = self.roles_for(ctx, subject).await?;
        Ok(names.iter().all(|name| roles.iter().any(|r| r.name == *name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityStore;
    use crate::grant::GrantStore;
    use crate::store::InMemoryStore;
    use crate::types::AbilitySpec;

    fn setup() -> (EntityStore, GrantStore, Resolver) {
        let store: Arc<dyn RbacStore> = Arc::new(InMemoryStore::new());
        let entities = EntityStore::new(store.clone());
        let grants = GrantStore::new(store.clone(), entities.clone());
        (entities, grants, Resolver::new(store))
    }

    #[tokio::test]
    async fn test_direct_before_role_derived() {
        let (entities, grants, resolver) = setup();
        let ctx = ScopeContext::global();
        let alice = SubjectRef::new("user:alice");

        let role = entities.create_role(&ctx, "editor").await.unwrap();
        let edit = entities.create_ability(&ctx, &AbilitySpec::new("edit", "Post")).await.unwrap();
        let create = entities.create_ability(&ctx, &AbilitySpec::new("create", "Post")).await.unwrap();

        grants.attach_ability_to_role(&ctx, &role, &edit).await.unwrap();
        grants.assign_role(&ctx, &alice, &role).await.unwrap();
        grants.grant(&ctx, &alice, &create).await.unwrap();

        let names: Vec<String> = resolver
            .abilities_for(&ctx, &alice)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.action)
            .collect();
        assert_eq!(names, vec!["create", "edit"]);
    }

    #[tokio::test]
    async fn test_same_ability_through_two_sources_listed_once() {
        let (entities, grants, resolver) = setup();
        let ctx = ScopeContext::global();
        let alice = SubjectRef::new("user:alice");

        let role = entities.create_role(&ctx, "editor").await.unwrap();
        let edit = entities.create_ability(&ctx, &AbilitySpec::new("edit", "Post")).await.unwrap();

        grants.grant(&ctx, &alice, &edit).await.unwrap();
        grants.attach_ability_to_role(&ctx, &role, &edit).await.unwrap();
        grants.assign_role(&ctx, &alice, &role).await.unwrap();

        assert_eq!(resolver.abilities_for(&ctx, &alice).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_role_forbid_overrides_direct_allow() {
        let (entities, grants, resolver) = setup();
        let ctx = ScopeContext::global();
        let alice = SubjectRef::new("user:alice");
        let spec = AbilitySpec::new("delete", "Post");

        let allow = entities.create_ability(&ctx, &spec).await.unwrap();
        grants.grant(&ctx, &alice, &allow).await.unwrap();

        let role = entities.create_role(&ctx, "restricted").await.unwrap();
        grants.forbid_for_role(&ctx, &role, &spec).await.unwrap();
        grants.assign_role(&ctx, &alice, &role).await.unwrap();

        let decision = resolver.decide(&ctx, &alice, "delete", &Target::new("Post")).await.unwrap();
        assert_eq!(decision.verdict, Verdict::Deny);
        assert!(matches!(decision.reason, DecisionReason::Forbidden { .. }));
        assert_eq!(decision.candidates, 2);
    }

    #[tokio::test]
    async fn test_custom_wildcard() {
        let (entities, grants, resolver) = setup();
        let resolver = resolver.with_wildcard("any");
        let ctx = ScopeContext::global();
        let alice = SubjectRef::new("user:alice");

        let any = entities.create_ability(&ctx, &AbilitySpec::new("any", "Post")).await.unwrap();
        grants.grant(&ctx, &alice, &any).await.unwrap();

        let verdict = resolver.authorize(&ctx, &alice, "publish", &Target::new("Post")).await.unwrap();
        assert_eq!(verdict, Verdict::Allow);
    }

    #[tokio::test]
    async fn test_role_queries() {
        let (entities, grants, resolver) = setup();
        let ctx = ScopeContext::to(1);
        let alice = SubjectRef::new("user:alice");

        let admin = entities.create_role(&ctx, "admin").await.unwrap();
        let editor = entities.create_role(&ctx, "editor").await.unwrap();
        grants.assign_role(&ctx, &alice, &admin).await.unwrap();

        assert!(resolver.has_role(&ctx, &alice, "admin").await.unwrap());
        assert!(!resolver.has_role(&ctx, &alice, "editor").await.unwrap());
        assert!(resolver.has_any_role(&ctx, &alice, &["editor", "admin"]).await.unwrap());
        assert!(!resolver.has_all_roles(&ctx, &alice, &["editor", "admin"]).await.unwrap());

        grants.assign_role(&ctx, &alice, &editor).await.unwrap();
        assert!(resolver.has_all_roles(&ctx, &alice, &["editor", "admin"]).await.unwrap());
        assert_eq!(resolver.roles_for(&ctx, &alice).await.unwrap().len(), 2);

        assert!(!resolver.has_role(&ScopeContext::to(2), &alice, "admin").await.unwrap());
    }
}
