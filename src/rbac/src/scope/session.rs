//! Per-session mutable scope holder
//!
//! For callers that prefer configuring the tenant once per request instead
//! of passing a fresh value around. Every store or resolver call still takes
//! a `ScopeContext` by reference, captured from `snapshot()` at call time, so
//! later changes to the session never reach rows already written.

use parking_lot::RwLock;

use super::context::ScopeContext;
use crate::types::ScopeId;

/// One mutable scope context for one logical request or session
///
/// Not meant to be shared across concurrent requests; create one per unit of
/// work and `reset()` between units if it is reused.
#[derive(Debug, Default)]
pub struct ScopeSession {
    context: RwLock<ScopeContext>,
}

impl ScopeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to `scope`, clearing both flags
    pub fn to(&self, scope: impl Into<ScopeId>) -> &Self {
        *self.context.write() = ScopeContext::to(scope);
        self
    }

    pub fn only_relations(&self) -> &Self {
        let mut context = self.context.write();
        *context = context.clone().only_relations();
        self
    }

    pub fn dont_scope_role_abilities(&self) -> &Self {
        let mut context = self.context.write();
        *context = context.clone().dont_scope_role_abilities();
        self
    }

    /// Back to global with both flags cleared
    pub fn reset(&self) {
        *self.context.write() = ScopeContext::global();
    }

    /// Value copy of the current configuration
    pub fn snapshot(&self) -> ScopeContext {
        self.context.read().clone()
    }
}
