//! # CretoAI Tenant-Scoped RBAC
//!
//! Role-based access control where every ability, role and grant link can
//! belong to a tenant, and every query only sees the active tenant's rows
//! plus global ones.
//!
//! ## Features
//!
//! - **Explicit scope context** passed into every call, no ambient state
//! - **Independent stamping** of abilities/roles and of each grant link kind
//! - **Forbid over allow** within the visible set, so forbids stay per tenant
//! - **Role-derived abilities** aggregated with direct grants
//! - **Pluggable store** behind an async trait, with an in-memory backend
//!
//! ## Example
//!
//! ```rust
//! use cretoai_rbac::{AbilitySpec, Rbac, ScopeContext, SubjectRef, Target};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rbac = Rbac::new();
//!     let alice = SubjectRef::new("user:alice@example.com");
//!
//!     // Role bundle shared by every tenant, assignment local to tenant 2
//!     let shared = ScopeContext::to(1).only_relations().dont_scope_role_abilities();
//!     rbac.allow_role(&shared, "admin", &AbilitySpec::new("delete", "User")).await?;
//!
//!     let tenant = ScopeContext::to(2);
//!     rbac.assign(&tenant, &alice, "admin").await?;
//!
//!     if rbac.can(&tenant, &alice, "delete", &Target::new("User")).await? {
//!         println!("Access granted!");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod error;
pub mod scope;
pub mod store;
pub mod entity;
pub mod grant;
pub mod resolver;
pub mod metrics;
pub mod engine;

// Re-export commonly used types
pub use types::{
    Ability, AbilityId, AbilitySpec, LinkKind, Permission, Role, RoleAbility, RoleAssignment,
    RoleId, ScopeId, SubjectRef, Target,
};
pub use error::{RbacError, Result};
pub use scope::{ScopeContext, ScopeSession};
pub use store::{Filter, InMemoryStore, RbacStore, ScopeFilter};
pub use entity::EntityStore;
pub use grant::GrantStore;
pub use resolver::{AuthDecision, DecisionReason, Grant, Resolver, Verdict};
pub use metrics::{MetricsCollector, RbacMetrics};
pub use engine::{Rbac, RbacConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
