//! Tenant scope context module
//!
//! This module decides, for every write, which tenant a new row is stamped
//! with, and for every read, which stored rows are visible.
//!
//! # Examples
//!
//! ```
//! use cretoai_rbac::scope::ScopeContext;
//! use cretoai_rbac::types::{LinkKind, ScopeId};
//!
//! let ctx = ScopeContext::to(1).only_relations();
//!
//! // Entity rows stay global, grant links carry the tenant
//! assert_eq!(ctx.entity_scope(), None);
//! assert_eq!(ctx.link_scope(LinkKind::Permission), Some(ScopeId::from(1)));
//!
//! // Global rows are visible under every tenant
//! assert!(ctx.is_visible(None));
//! assert!(!ctx.is_visible(Some(&ScopeId::from(2))));
//! ```

mod context;
mod session;


pub use context::ScopeContext;
pub use session::ScopeSession;
