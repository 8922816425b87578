//! RBAC facade
//!
//! Wires the entity store, grant store and resolver over one backend and
//! offers the name-based operations callers usually want: allow a subject
//! an action, assign a role by name, ask whether something is allowed.

use crate::entity::EntityStore;
use crate::error::{RbacError, Result};
use crate::grant::GrantStore;
use crate::metrics::{MetricsCollector, RbacMetrics};
use crate::resolver::{AuthDecision, Resolver, Verdict};
use crate::scope::ScopeContext;
use crate::store::{InMemoryStore, RbacStore};
use crate::types::{Ability, AbilitySpec, Role, SubjectRef, Target, WILDCARD};

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// RBAC configuration
#[derive(Debug, Clone)]
pub struct RbacConfig {
    /// Enable metrics collection
    pub enable_metrics: bool,

    /// Log every decision at info level instead of debug
    pub log_decisions: bool,

    /// Token matching any action or entity type
    pub wildcard: String,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            log_decisions: false,
            wildcard: WILDCARD.to_string(),
        }
    }
}

impl RbacConfig {
    /// Load overrides from the process environment
    ///
    /// - `RBAC_ENABLE_METRICS` - true/false (default: true)
    /// - `RBAC_LOG_DECISIONS` - true/false (default: false)
    /// - `RBAC_WILDCARD` - wildcard token (default: `*`)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load overrides through `lookup`, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            enable_metrics: parse_flag(&lookup, "RBAC_ENABLE_METRICS", defaults.enable_metrics)?,
            log_decisions: parse_flag(&lookup, "RBAC_LOG_DECISIONS", defaults.log_decisions)?,
            wildcard: lookup("RBAC_WILDCARD").unwrap_or(defaults.wildcard),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.wildcard.trim().is_empty() {
            return Err(RbacError::Config("wildcard token cannot be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(RbacError::Config(format!("{} must be a boolean, got '{}'", key, other))),
        },
    }
}

/// Tenant-scoped RBAC over one store
///
/// # Example
///
/// ```rust
/// use cretoai_rbac::{AbilitySpec, Rbac, ScopeContext, SubjectRef, Target};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let rbac = Rbac::new();
/// let alice = SubjectRef::new("user:alice");
///
/// let tenant = ScopeContext::to(1);
/// rbac.allow(&tenant, &alice, &AbilitySpec::new("create", "User")).await?;
///
/// assert!(rbac.can(&tenant, &alice, "create", &Target::new("User")).await?);
/// assert!(rbac.cannot(&ScopeContext::to(2), &alice, "create", &Target::new("User")).await?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Rbac {
    config: RbacConfig,
    entities: EntityStore,
    grants: GrantStore,
    resolver: Resolver,
    metrics: Option<MetricsCollector>,
}

impl Rbac {
    /// In-memory RBAC with default configuration
    pub fn new() -> Self {
        let store: Arc<dyn RbacStore> = Arc::new(InMemoryStore::new());
        Self::build(RbacConfig::default(), store)
    }

    /// RBAC over `store` with `config`
    pub fn with_config(config: RbacConfig, store: Arc<dyn RbacStore>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, store))
    }

    fn build(config: RbacConfig, store: Arc<dyn RbacStore>) -> Self {
        let entities = EntityStore::new(store.clone());
        let grants = GrantStore::new(store.clone(), entities.clone());
        let resolver = Resolver::new(store).with_wildcard(config.wildcard.clone());
        let metrics = config.enable_metrics.then(MetricsCollector::new);

        info!(
            "Rbac initialized with metrics={}, wildcard='{}'",
            config.enable_metrics, config.wildcard
        );

        Self {
            config,
            entities,
            grants,
            resolver,
            metrics,
        }
    }

    pub fn config(&self) -> &RbacConfig {
        &self.config
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn grants(&self) -> &GrantStore {
        &self.grants
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Collected metrics, when enabled
    pub async fn metrics(&self) -> Option<RbacMetrics> {
        match &self.metrics {
            Some(metrics) => Some(metrics.snapshot().await),
            None => None,
        }
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Allow `subject` the capability
    pub async fn allow(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        spec: &AbilitySpec,
    ) -> Result<Ability> {
        subject.validate()?;
        let ability = self.entities.find_or_create_ability(ctx, spec, false).await?;
        self.grants.grant(ctx, subject, &ability).await?;
        self.record_write().await;
        Ok(ability)
    }

    /// Forbid `subject` the capability
    pub async fn forbid(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        spec: &AbilitySpec,
    ) -> Result<Ability> {
        subject.validate()?;
        let ability = self.entities.find_or_create_ability(ctx, spec, true).await?;
        self.grants.grant(ctx, subject, &ability).await?;
        self.record_write().await;
        Ok(ability)
    }

    /// Lift visible forbids of the capability for `subject`
    pub async fn unforbid(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        spec: &AbilitySpec,
    ) -> Result<usize> {
        let removed = self.grants.unforbid(ctx, subject, spec).await?;
        self.record_removals(removed).await;
        Ok(removed)
    }

    /// Remove visible allows of the capability for `subject`
    pub async fn disallow(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        spec: &AbilitySpec,
    ) -> Result<usize> {
        let removed = self.grants.disallow(ctx, subject, spec).await?;
        self.record_removals(removed).await;
        Ok(removed)
    }

    /// Assign the role named `role` to `subject`, creating the role if needed
    pub async fn assign(&self, ctx: &ScopeContext, subject: &SubjectRef, role: &str) -> Result<Role> {
        subject.validate()?;
        let role = self.entities.find_or_create_role(ctx, role).await?;
        self.grants.assign_role(ctx, subject, &role).await?;
        self.record_write().await;
        Ok(role)
    }

    /// Retract the visible assignments of every visible role named `name`
    ///
    /// A tenant role and a global role may share a name; both lose the
    /// subject, matching what [`is_a`](Rbac::is_a) considers held.
    pub async fn retract(&self, ctx: &ScopeContext, subject: &SubjectRef, name: &str) -> Result<usize> {
        let roles = self.entities.roles_named(ctx, name).await?;
        if roles.is_empty() {
            debug!("No role '{}' visible; nothing to retract from {}", name, subject);
            return Ok(0);
        }

        let mut removed = 0;
        for role in &roles {
            removed += self.grants.retract_role(ctx, subject, role).await?;
        }

        self.record_removals(removed).await;
        Ok(removed)
    }

    /// Add the capability to the bundle of the role named `role`
    pub async fn allow_role(&self, ctx: &ScopeContext, role: &str, spec: &AbilitySpec) -> Result<Ability> {
        let role = self.entities.find_or_create_role(ctx, role).await?;
        let ability = self.entities.find_or_create_ability(ctx, spec, false).await?;
        self.grants.attach_ability_to_role(ctx, &role, &ability).await?;
        self.record_write().await;
        Ok(ability)
    }

    /// Add a forbid of the capability to the bundle of the role named `role`
    pub async fn forbid_role(&self, ctx: &ScopeContext, role: &str, spec: &AbilitySpec) -> Result<Ability> {
        let role = self.entities.find_or_create_role(ctx, role).await?;
        let link = self.grants.forbid_for_role(ctx, &role, spec).await?;
        self.record_write().await;

        self.entities
            .ability(link.ability_id)
            .await?
            .ok_or_else(|| RbacError::Internal(format!("{} vanished after attach", link.ability_id)))
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Abilities reachable by `subject` under the active scope
    pub async fn abilities_for(&self, ctx: &ScopeContext, subject: &SubjectRef) -> Result<Vec<Ability>> {
        self.resolver.abilities_for(ctx, subject).await
    }

    /// Decide `action` on `target` for `subject`
    pub async fn decide(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        action: &str,
        target: &Target,
    ) -> Result<AuthDecision> {
        let start = Instant::now();
        let decision = self.resolver.decide(ctx, subject, action, target).await?;

        if self.config.log_decisions {
            info!(
                "Decision: {} for {} {} on {} (scope={:?}, {})",
                if decision.allowed() { "ALLOW" } else { "DENY" },
                subject,
                action,
                target.entity_type,
                decision.scope,
                decision.reason
            );
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_decision(decision.allowed(), start.elapsed()).await;
        }

        Ok(decision)
    }

    pub async fn authorize(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        action: &str,
        target: &Target,
    ) -> Result<Verdict> {
        Ok(self.decide(ctx, subject, action, target).await?.verdict)
    }

    pub async fn can(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        action: &str,
        target: &Target,
    ) -> Result<bool> {
        Ok(self.authorize(ctx, subject, action, target).await?.is_allow())
    }

    pub async fn cannot(
        &self,
        ctx: &ScopeContext,
        subject: &SubjectRef,
        action: &str,
        target: &Target,
    ) -> Result<bool> {
        Ok(!self.can(ctx, subject, action, target).await?)
    }

    /// Whether `subject` visibly holds the role named `role`
    pub async fn is_a(&self, ctx: &ScopeContext, subject: &SubjectRef, role: &str) -> Result<bool> {
        self.resolver.has_role(ctx, subject, role).await
    }

    async fn record_write(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_write().await;
        }
    }

    async fn record_removals(&self, count: usize) {
        if let Some(metrics) = &self.metrics {
            metrics.record_removals(count).await;
        }
    }
}

impl Default for Rbac {
    fn default() -> Self {
        Self::new()
    }
}
