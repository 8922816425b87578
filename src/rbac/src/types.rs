//! Core RBAC types: scope identifiers, entity rows and grant links

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{RbacError, Result};

/// Token matching any action or any entity type
pub const WILDCARD: &str = "*";

/// Opaque tenant identifier
///
/// Global scope is represented as `None` wherever an `Option<ScopeId>` is
/// stored, so a `ScopeId` is always a concrete tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(String);

impl ScopeId {
    /// Create a scope identifier from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for ScopeId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<i32> for ScopeId {
    fn from(id: i32) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for ScopeId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ScopeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ScopeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to whoever receives grants (user, service, agent)
///
/// Only ever compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectRef(String);

impl SubjectRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reject an empty reference
    pub fn validate(&self) -> Result<()> {
        if self.0.trim().is_empty() {
            return Err(RbacError::Validation("Subject reference cannot be empty".to_string()));
        }
        Ok(())
    }
}

impl From<&str> for SubjectRef {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique ability identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilityId(Uuid);

impl AbilityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AbilityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ability:{}", self.0)
    }
}

/// Unique role identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(Uuid);

impl RoleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "role:{}", self.0)
    }
}

/// The capability tuple an ability describes: action on an entity type,
/// optionally narrowed to one instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbilitySpec {
    /// Action name (create, delete, ...) or `*`
    pub action: String,

    /// Entity type (e.g. "User") or `*`
    pub entity_type: String,

    /// Specific instance key; `None` covers every instance of the type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

impl AbilitySpec {
    /// Action on every instance of an entity type
    pub fn new(action: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: None,
        }
    }

    /// Narrow the spec to one instance
    pub fn instance(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Every action on every entity type
    pub fn everything() -> Self {
        Self::new(WILDCARD, WILDCARD)
    }

    /// Every action on one entity type
    pub fn manage(entity_type: impl Into<String>) -> Self {
        Self::new(WILDCARD, entity_type)
    }

    /// Reject empty action or entity type
    pub fn validate(&self) -> Result<()> {
        if self.action.trim().is_empty() {
            return Err(RbacError::Validation(
                "Ability action cannot be empty".to_string(),
            ));
        }

        if self.entity_type.trim().is_empty() {
            return Err(RbacError::Validation(format!(
                "Ability '{}' must name an entity type",
                self.action
            )));
        }

        if matches!(&self.entity_id, Some(id) if id.is_empty()) {
            return Err(RbacError::Validation(format!(
                "Ability '{}' on '{}' has an empty entity id",
                self.action, self.entity_type
            )));
        }

        Ok(())
    }
}

/// The thing an authorization query is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Entity type being accessed
    pub entity_type: String,

    /// Instance being accessed; `None` asks about the type as a whole
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

impl Target {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: None,
        }
    }

    pub fn instance(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }
}

/// Capability definition row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub id: AbilityId,

    /// Action name or `*`
    pub action: String,

    /// Entity type or `*`
    pub entity_type: String,

    /// Instance key; `None` matches any instance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// Forbid-ability for the same tuple when true
    #[serde(default)]
    pub forbidden: bool,

    /// Owning tenant; `None` is global
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

impl Ability {
    pub(crate) fn from_spec(spec: &AbilitySpec, forbidden: bool, scope: Option<ScopeId>) -> Self {
        Self {
            id: AbilityId::new(),
            action: spec.action.clone(),
            entity_type: spec.entity_type.clone(),
            entity_id: spec.entity_id.clone(),
            forbidden,
            scope,
        }
    }

    /// Ability name as shown to callers (the action)
    pub fn name(&self) -> &str {
        &self.action
    }

    /// Whether this ability describes the same capability as `spec`
    pub fn is_capability(&self, spec: &AbilitySpec) -> bool {
        self.action == spec.action
            && self.entity_type == spec.entity_type
            && self.entity_id == spec.entity_id
    }

    /// Check if this ability covers `action` on `target`
    ///
    /// Action and entity type match exactly or through the wildcard token.
    /// An ability without an entity id covers every instance; one with an id
    /// only covers that instance.
    pub fn matches(&self, action: &str, target: &Target, wildcard: &str) -> bool {
        let action_ok = self.action == wildcard || self.action == action;
        let type_ok = self.entity_type == wildcard || self.entity_type == target.entity_type;

        let instance_ok = match &self.entity_id {
            None => true,
            Some(id) => target.entity_id.as_deref() == Some(id.as_str()),
        };

        action_ok && type_ok && instance_ok
    }
}

/// Named bundle of abilities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,

    pub name: String,

    /// Owning tenant; `None` is global
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

impl Role {
    pub(crate) fn new(name: impl Into<String>, scope: Option<ScopeId>) -> Self {
        Self {
            id: RoleId::new(),
            name: name.into(),
            scope,
        }
    }
}

/// Grant link kinds, each stamped independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// subject ↔ ability
    Permission,
    /// subject ↔ role
    RoleAssignment,
    /// role ↔ ability
    RoleAbility,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permission => write!(f, "permission"),
            Self::RoleAssignment => write!(f, "role_assignment"),
            Self::RoleAbility => write!(f, "role_ability"),
        }
    }
}

/// subject ↔ ability link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub subject: SubjectRef,
    pub ability_id: AbilityId,
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

/// subject ↔ role link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub subject: SubjectRef,
    pub role_id: RoleId,
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

/// role ↔ ability link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAbility {
    pub role_id: RoleId,
    pub ability_id: AbilityId,
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ability(action: &str, entity_type: &str, entity_id: Option<&str>) -> Ability {
        let mut spec = AbilitySpec::new(action, entity_type);
        if let Some(id) = entity_id {
            spec = spec.instance(id);
        }
        Ability::from_spec(&spec, false, None)
    }

    #[test]
    fn test_scope_id_conversions() {
        assert_eq!(ScopeId::from(1), ScopeId::from("1"));
        assert_eq!(ScopeId::from("acme".to_string()).as_str(), "acme");
        assert_eq!(format!("{}", ScopeId::from(42)), "42");
    }

    #[test]
    fn test_subject_validation() {
        assert!(SubjectRef::new("user:alice").validate().is_ok());
        assert!(matches!(SubjectRef::new("").validate(), Err(RbacError::Validation(_))));
        assert!(matches!(SubjectRef::from("   ").validate(), Err(RbacError::Validation(_))));
    }

    #[test]
    fn test_spec_validation() {
        assert!(AbilitySpec::new("create", "User").validate().is_ok());
        assert!(AbilitySpec::new("", "User").validate().is_err());
        assert!(AbilitySpec::new("create", " ").validate().is_err());
        assert!(AbilitySpec::new("create", "User").instance("").validate().is_err());
        assert!(AbilitySpec::everything().validate().is_ok());
    }

    #[test]
    fn test_exact_matching() {
        let create = ability("create", "User", None);

        assert!(create.matches("create", &Target::new("User"), WILDCARD));
        assert!(create.matches("create", &Target::new("User").instance("7"), WILDCARD));
        assert!(!create.matches("delete", &Target::new("User"), WILDCARD));
        assert!(!create.matches("create", &Target::new("Post"), WILDCARD));
    }

    #[test]
    fn test_instance_matching() {
        let edit_seven = ability("edit", "User", Some("7"));

        assert!(edit_seven.matches("edit", &Target::new("User").instance("7"), WILDCARD));
        assert!(!edit_seven.matches("edit", &Target::new("User").instance("8"), WILDCARD));
        // Type-level queries are not covered by an instance ability
        assert!(!edit_seven.matches("edit", &Target::new("User"), WILDCARD));
    }

    #[test]
    fn test_wildcard_matching() {
        let everything = Ability::from_spec(&AbilitySpec::everything(), false, None);
        assert!(everything.matches("anything", &Target::new("Post").instance("1"), WILDCARD));

        let manage_users = Ability::from_spec(&AbilitySpec::manage("User"), false, None);
        assert!(manage_users.matches("delete", &Target::new("User"), WILDCARD));
        assert!(!manage_users.matches("delete", &Target::new("Post"), WILDCARD));
    }

    #[test]
    fn test_capability_identity_ignores_forbidden_flag() {
        let spec = AbilitySpec::new("create", "User");
        let allow = Ability::from_spec(&spec, false, None);
        let forbid = Ability::from_spec(&spec, true, Some(ScopeId::from(2)));

        assert!(allow.is_capability(&spec));
        assert!(forbid.is_capability(&spec));
        assert_ne!(allow.id, forbid.id);
    }
}
