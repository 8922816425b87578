//! Authorization verdicts and decision records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::types::{Ability, AbilityId, ScopeId, SubjectRef};

/// Final answer of an authorization query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Allow,
    #[default]
    Deny,
}

impl Verdict {
    pub fn is_allow(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// A matching ability, tagged by its effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    Allow(Ability),
    Forbid(Ability),
}

impl Grant {
    pub fn ability(&self) -> &Ability {
        match self {
            Self::Allow(ability) | Self::Forbid(ability) => ability,
        }
    }
}

impl From<Ability> for Grant {
    fn from(ability: Ability) -> Self {
        if ability.forbidden {
            Self::Forbid(ability)
        } else {
            Self::Allow(ability)
        }
    }
}

/// Two-pass evaluation: any forbid denies, else any allow allows, else deny
///
/// Returns the verdict together with the grant that decided it.
pub fn evaluate(grants: &[Grant]) -> (Verdict, Option<&Grant>) {
    if let Some(forbid) = grants.iter().find(|g| matches!(g, Grant::Forbid(_))) {
        return (Verdict::Deny, Some(forbid));
    }

    if let Some(allow) = grants.iter().find(|g| matches!(g, Grant::Allow(_))) {
        return (Verdict::Allow, Some(allow));
    }

    (Verdict::Deny, None)
}

/// Reason for an authorization decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DecisionReason {
    /// A visible forbid-ability matched
    Forbidden { ability_id: AbilityId },

    /// A visible allow-ability matched and nothing forbade it
    Allowed { ability_id: AbilityId },

    /// Nothing visible matched
    NoMatch,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forbidden { ability_id } => write!(f, "forbidden by {}", ability_id),
            Self::Allowed { ability_id } => write!(f, "allowed by {}", ability_id),
            Self::NoMatch => write!(f, "no matching ability"),
        }
    }
}

/// Authorization decision with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthDecision {
    /// Unique decision ID
    pub id: String,

    pub verdict: Verdict,

    pub subject: SubjectRef,

    pub action: String,

    /// Active scope the decision was made under
    pub scope: Option<ScopeId>,

    pub reason: DecisionReason,

    /// Number of matching abilities considered
    pub candidates: usize,

    pub timestamp: DateTime<Utc>,

    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AuthDecision {
    pub(crate) fn new(
        subject: &SubjectRef,
        action: &str,
        scope: Option<ScopeId>,
        grants: &[Grant],
    ) -> Self {
        let (verdict, decisive) = evaluate(grants);
        let reason = match decisive {
            Some(Grant::Forbid(ability)) => DecisionReason::Forbidden { ability_id: ability.id },
            Some(Grant::Allow(ability)) => DecisionReason::Allowed { ability_id: ability.id },
            None => DecisionReason::NoMatch,
        };

        Self {
            id: Uuid::new_v4().to_string(),
            verdict,
            subject: subject.clone(),
            action: action.to_string(),
            scope,
            reason,
            candidates: grants.len(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn allowed(&self) -> bool {
        self.verdict.is_allow()
    }

    /// Add metadata to the decision
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
