use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::lookup::Severity;
use crate::domain::ticket::{OrganizationId, UserId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlaPolicyId(pub String);

/// A policy belongs to exactly one scope. The tagged variant makes the
/// invalid "both set" and "neither set" states unrepresentable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlaScope {
    User { user_id: UserId },
    Organization { organization_id: OrganizationId },
}

impl SlaScope {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self::User { user_id: UserId(user_id.into()) }
    }

    pub fn organization(organization_id: impl Into<String>) -> Self {
        Self::Organization { organization_id: OrganizationId(organization_id.into()) }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::User { user_id } => format!("user:{}", user_id.0),
            Self::Organization { organization_id } => format!("org:{}", organization_id.0),
        }
    }
}

/// Contracted response/resolution targets for one severity, in minutes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaSeverityTarget {
    pub severity: Severity,
    pub response_minutes: u32,
    pub resolution_minutes: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaContract {
    pub contracted_hourly_rate: Decimal,
    pub targets: Vec<SlaSeverityTarget>,
}

impl SlaContract {
    pub fn target_for(&self, severity: Severity) -> Option<&SlaSeverityTarget> {
        self.targets.iter().find(|target| target.severity == severity)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaPolicy {
    pub id: SlaPolicyId,
    pub name: String,
    pub scope: SlaScope,
    pub contract: SlaContract,
    pub effective_from: DateTime<Utc>,
    pub effective_to: DateTime<Utc>,
}

impl SlaPolicy {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.effective_to < self.effective_from {
            return Err(DomainError::ConstraintViolation {
                entity: "sla_policy",
                detail: format!(
                    "effective_to {} precedes effective_from {} on `{}`",
                    self.effective_to, self.effective_from, self.name
                ),
            });
        }
        Ok(())
    }

    pub fn covers(&self, scope: &SlaScope, at: DateTime<Utc>) -> bool {
        &self.scope == scope && self.effective_from <= at && at <= self.effective_to
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::*;

    fn policy(scope: SlaScope) -> SlaPolicy {
        SlaPolicy {
            id: SlaPolicyId("sla-1".to_owned()),
            name: "Gold".to_owned(),
            scope,
            contract: SlaContract {
                contracted_hourly_rate: Decimal::new(12_000, 2),
                targets: vec![SlaSeverityTarget {
                    severity: Severity::Critical,
                    response_minutes: 30,
                    resolution_minutes: 240,
                }],
            },
            effective_from: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            effective_to: Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap(),
        }
    }

    #[test]
    fn scope_isolation_holds_by_construction() {
        let user_policy = policy(SlaScope::user("u-1"));
        let org_scope = SlaScope::organization("o-1");
        let at = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();

        assert!(user_policy.covers(&SlaScope::user("u-1"), at));
        assert!(!user_policy.covers(&org_scope, at));
    }

    #[test]
    fn coverage_is_inclusive_at_window_edges() {
        let p = policy(SlaScope::organization("o-9"));
        assert!(p.covers(&SlaScope::organization("o-9"), p.effective_from));
        assert!(p.covers(&SlaScope::organization("o-9"), p.effective_to));
    }

    #[test]
    fn target_lookup_misses_unlisted_severity() {
        let p = policy(SlaScope::user("u-2"));
        assert!(p.contract.target_for(Severity::Critical).is_some());
        assert!(p.contract.target_for(Severity::Low).is_none());
    }
}
