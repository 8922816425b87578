//! Scope context value and stamping policy
//!
//! The context is an explicit value threaded through every store and
//! resolver call. Nothing reads it from ambient state.

use serde::{Deserialize, Serialize};

use crate::error::{RbacError, Result};
use crate::types::{LinkKind, ScopeId};

/// Active tenant plus the two write-mode flags
///
/// `to()` always starts from cleared flags; chain `only_relations()` and
/// `dont_scope_role_abilities()` to set them.
///
/// # Examples
///
/// ```
/// use cretoai_rbac::scope::ScopeContext;
/// use cretoai_rbac::types::{LinkKind, ScopeId};
///
/// let ctx = ScopeContext::to(1)
///     .only_relations()
///     .dont_scope_role_abilities();
///
/// assert_eq!(ctx.link_scope(LinkKind::RoleAbility), None);
/// assert_eq!(ctx.link_scope(LinkKind::RoleAssignment), Some(ScopeId::from(1)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeContext {
    /// Active tenant; `None` is global
    scope: Option<ScopeId>,
    /// Stamp only grant links, leave abilities and roles global
    only_relations: bool,
    /// Leave role ↔ ability links global as well
    dont_scope_role_abilities: bool,
}

impl ScopeContext {
    /// Global context with both flags cleared
    pub fn global() -> Self {
        Self::default()
    }

    /// Context for a concrete tenant with both flags cleared
    pub fn to(scope: impl Into<ScopeId>) -> Self {
        Self {
            scope: Some(scope.into()),
            only_relations: false,
            dont_scope_role_abilities: false,
        }
    }

    /// Stamp only grant links with the active scope
    pub fn only_relations(mut self) -> Self {
        self.only_relations = true;
        self
    }

    /// Leave role ↔ ability links global (only meaningful with `only_relations`)
    pub fn dont_scope_role_abilities(mut self) -> Self {
        self.dont_scope_role_abilities = true;
        self
    }

    /// Fresh global context
    pub fn reset(&self) -> Self {
        Self::global()
    }

    /// Same flags, global scope
    pub fn remove(&self) -> Self {
        Self {
            scope: None,
            ..self.clone()
        }
    }

    /// Run `f` against a temporary context for `scope`, keeping the flags
    ///
    /// The receiver is untouched, so the caller's context is what it was
    /// before once `f` returns.
    pub fn once_to<T>(&self, scope: impl Into<ScopeId>, f: impl FnOnce(&ScopeContext) -> T) -> T {
        let temporary = Self {
            scope: Some(scope.into()),
            ..self.clone()
        };
        f(&temporary)
    }

    /// Active tenant, `None` when global
    pub fn current(&self) -> Option<&ScopeId> {
        self.scope.as_ref()
    }

    pub fn is_global(&self) -> bool {
        self.scope.is_none()
    }

    pub fn is_only_relations(&self) -> bool {
        self.only_relations
    }

    pub fn is_dont_scope_role_abilities(&self) -> bool {
        self.dont_scope_role_abilities
    }

    /// Reject a blank tenant id before anything is stamped with it
    pub fn validate(&self) -> Result<()> {
        match &self.scope {
            Some(scope) if scope.as_str().trim().is_empty() => Err(RbacError::Validation(
                "Scope id cannot be empty; use the global context instead".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Visibility predicate: global rows and rows of the active tenant
    pub fn is_visible(&self, row_scope: Option<&ScopeId>) -> bool {
        match row_scope {
            None => true,
            Some(scope) => self.scope.as_ref() == Some(scope),
        }
    }

    /// Scope stamped onto a new ability or role row
    pub fn entity_scope(&self) -> Option<ScopeId> {
        if self.only_relations {
            return None;
        }
        self.scope.clone()
    }

    /// Scope stamped onto a new grant link of `kind`
    ///
    /// `only_relations` never exempts a link; `dont_scope_role_abilities`
    /// exempts role ↔ ability links, and only together with `only_relations`.
    pub fn link_scope(&self, kind: LinkKind) -> Option<ScopeId> {
        match kind {
            LinkKind::RoleAbility if self.only_relations && self.dont_scope_role_abilities => None,
            _ => self.scope.clone(),
        }
    }
}
