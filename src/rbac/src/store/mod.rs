//! Relational store interface for abilities, roles and grant links
//!
//! The resolver only ever asks for equality matches and for rows visible
//! under a scope, so any relational backend can implement [`RbacStore`].

pub mod memory;

pub use memory::InMemoryStore;

use crate::error::Result;
use crate::scope::ScopeContext;
use crate::types::{
    Ability, AbilityId, Permission, Role, RoleAbility, RoleAssignment, RoleId, ScopeId, SubjectRef,
};
use async_trait::async_trait;

/// Scope constraint of a query or delete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScopeFilter {
    /// No constraint
    #[default]
    Any,
    /// Only global rows
    Global,
    /// Only rows stamped with exactly this tenant (`None` = global)
    Exactly(Option<ScopeId>),
    /// Global rows plus rows of this tenant
    VisibleUnder(Option<ScopeId>),
}

impl ScopeFilter {
    /// Rows visible under the context's active scope
    pub fn visible(ctx: &ScopeContext) -> Self {
        Self::VisibleUnder(ctx.current().cloned())
    }

    pub fn matches(&self, row_scope: Option<&ScopeId>) -> bool {
        match self {
            Self::Any => true,
            Self::Global => row_scope.is_none(),
            Self::Exactly(scope) => row_scope == scope.as_ref(),
            Self::VisibleUnder(active) => match row_scope {
                None => true,
                Some(scope) => active.as_ref() == Some(scope),
            },
        }
    }
}

/// Accessors a [`Filter`] checks against
///
/// Fields a row does not carry return `None`, which fails any constraint on
/// that field.
pub trait Row {
    fn scope(&self) -> Option<&ScopeId>;

    fn subject(&self) -> Option<&SubjectRef> {
        None
    }

    fn ability_id(&self) -> Option<AbilityId> {
        None
    }

    fn role_id(&self) -> Option<RoleId> {
        None
    }

    fn name(&self) -> Option<&str> {
        None
    }
}

impl Row for Ability {
    fn scope(&self) -> Option<&ScopeId> {
        self.scope.as_ref()
    }

    fn ability_id(&self) -> Option<AbilityId> {
        Some(self.id)
    }

    fn name(&self) -> Option<&str> {
        Some(&self.action)
    }
}

impl Row for Role {
    fn scope(&self) -> Option<&ScopeId> {
        self.scope.as_ref()
    }

    fn role_id(&self) -> Option<RoleId> {
        Some(self.id)
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

impl Row for Permission {
    fn scope(&self) -> Option<&ScopeId> {
        self.scope.as_ref()
    }

    fn subject(&self) -> Option<&SubjectRef> {
        Some(&self.subject)
    }

    fn ability_id(&self) -> Option<AbilityId> {
        Some(self.ability_id)
    }
}

impl Row for RoleAssignment {
    fn scope(&self) -> Option<&ScopeId> {
        self.scope.as_ref()
    }

    fn subject(&self) -> Option<&SubjectRef> {
        Some(&self.subject)
    }

    fn role_id(&self) -> Option<RoleId> {
        Some(self.role_id)
    }
}

impl Row for RoleAbility {
    fn scope(&self) -> Option<&ScopeId> {
        self.scope.as_ref()
    }

    fn ability_id(&self) -> Option<AbilityId> {
        Some(self.ability_id)
    }

    fn role_id(&self) -> Option<RoleId> {
        Some(self.role_id)
    }
}

/// Equality constraints for a query or delete; unset fields match anything
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub subject: Option<SubjectRef>,
    pub ability_ids: Option<Vec<AbilityId>>,
    pub role_ids: Option<Vec<RoleId>>,
    pub name: Option<String>,
    pub scope: ScopeFilter,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject: &SubjectRef) -> Self {
        self.subject = Some(subject.clone());
        self
    }

    pub fn ability(mut self, id: AbilityId) -> Self {
        self.ability_ids = Some(vec![id]);
        self
    }

    pub fn abilities(mut self, ids: Vec<AbilityId>) -> Self {
        self.ability_ids = Some(ids);
        self
    }

    pub fn role(mut self, id: RoleId) -> Self {
        self.role_ids = Some(vec![id]);
        self
    }

    pub fn roles(mut self, ids: Vec<RoleId>) -> Self {
        self.role_ids = Some(ids);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn scope(mut self, scope: ScopeFilter) -> Self {
        self.scope = scope;
        self
    }

    /// Shorthand for `scope(ScopeFilter::visible(ctx))`
    pub fn visible_under(self, ctx: &ScopeContext) -> Self {
        self.scope(ScopeFilter::visible(ctx))
    }

    pub fn matches<R: Row>(&self, row: &R) -> bool {
        if !self.scope.matches(row.scope()) {
            return false;
        }

        if let Some(subject) = &self.subject {
            if row.subject() != Some(subject) {
                return false;
            }
        }

        if let Some(ids) = &self.ability_ids {
            match row.ability_id() {
                Some(id) if ids.contains(&id) => {}
                _ => return false,
            }
        }

        if let Some(ids) = &self.role_ids {
            match row.role_id() {
                Some(id) if ids.contains(&id) => {}
                _ => return false,
            }
        }

        if let Some(name) = &self.name {
            if row.name() != Some(name.as_str()) {
                return false;
            }
        }

        true
    }
}

/// Storage backend trait
///
/// Queries return rows in insertion order. Each insert or delete must be
/// applied atomically so a row's scope and payload never diverge.
#[async_trait]
pub trait RbacStore: Send + Sync {
    async fn insert_ability(&self, ability: Ability) -> Result<()>;

    async fn abilities(&self, filter: &Filter) -> Result<Vec<Ability>>;

    async fn insert_role(&self, role: Role) -> Result<()>;

    async fn roles(&self, filter: &Filter) -> Result<Vec<Role>>;

    async fn insert_permission(&self, permission: Permission) -> Result<()>;

    async fn permissions(&self, filter: &Filter) -> Result<Vec<Permission>>;

    /// Delete matching permissions, returning how many were removed
    async fn delete_permissions(&self, filter: &Filter) -> Result<usize>;

    async fn insert_role_assignment(&self, assignment: RoleAssignment) -> Result<()>;

    async fn role_assignments(&self, filter: &Filter) -> Result<Vec<RoleAssignment>>;

    async fn delete_role_assignments(&self, filter: &Filter) -> Result<usize>;

    async fn insert_role_ability(&self, link: RoleAbility) -> Result<()>;

    async fn role_abilities(&self, filter: &Filter) -> Result<Vec<RoleAbility>>;

    async fn delete_role_abilities(&self, filter: &Filter) -> Result<usize>;

    /// Fetch one ability by id regardless of scope
    async fn ability(&self, id: AbilityId) -> Result<Option<Ability>> {
        Ok(self.abilities(&Filter::new().ability(id)).await?.into_iter().next())
    }

    /// Fetch one role by id regardless of scope
    async fn role(&self, id: RoleId) -> Result<Option<Role>> {
        Ok(self.roles(&Filter::new().role(id)).await?.into_iter().next())
    }
}
