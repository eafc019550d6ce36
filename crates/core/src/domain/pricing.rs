use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::lookup::{BusinessImpact, EffortLevel, Priority, Severity, TicketType};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateProfileId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalculationRuleId(pub String);

/// Contractual pricing terms for one classification within a validity window.
/// Administrators deactivate profiles rather than deleting them so historical
/// quotes stay auditable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateProfile {
    pub id: RateProfileId,
    pub name: String,
    pub ticket_type: TicketType,
    pub severity: Severity,
    pub impact: BusinessImpact,
    pub base_hourly_rate: Decimal,
    pub multiplier: Decimal,
    pub is_active: bool,
    pub effective_from: DateTime<Utc>,
    pub effective_to: DateTime<Utc>,
}

impl RateProfile {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.effective_to < self.effective_from {
            return Err(DomainError::ConstraintViolation {
                entity: "rate_profile",
                detail: format!(
                    "effective_to {} precedes effective_from {} on `{}`",
                    self.effective_to, self.effective_from, self.name
                ),
            });
        }
        Ok(())
    }

    pub fn matches(
        &self,
        ticket_type: TicketType,
        severity: Severity,
        impact: BusinessImpact,
        at: DateTime<Utc>,
    ) -> bool {
        self.is_active
            && self.ticket_type == ticket_type
            && self.severity == severity
            && self.impact == impact
            && self.effective_from <= at
            && at <= self.effective_to
    }
}

/// One row of the priority/urgency decision table. Lower `priority_order`
/// wins ties, so administrators encode specific rules below broad catch-alls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteCalculationRule {
    pub id: CalculationRuleId,
    pub name: String,
    pub severity: Severity,
    pub impact: BusinessImpact,
    pub suggested_priority: Priority,
    pub users_impacted_min: u32,
    pub users_impacted_max: u32,
    pub urgency_multiplier: Decimal,
    pub priority_order: i32,
    pub is_active: bool,
}

impl QuoteCalculationRule {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.users_impacted_max < self.users_impacted_min {
            return Err(DomainError::ConstraintViolation {
                entity: "calculation_rule",
                detail: format!(
                    "users_impacted_max {} below users_impacted_min {} on `{}`",
                    self.users_impacted_max, self.users_impacted_min, self.name
                ),
            });
        }
        Ok(())
    }

    pub fn matches(&self, severity: Severity, impact: BusinessImpact, users_impacted: u32) -> bool {
        self.is_active
            && self.severity == severity
            && self.impact == impact
            && self.users_impacted_min <= users_impacted
            && users_impacted <= self.users_impacted_max
    }
}

/// Administrator-configured hour range backing an effort level. Bands are
/// advisory classification, not hard limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffortLevelRange {
    pub level: EffortLevel,
    pub hours_minimum: Decimal,
    pub hours_maximum: Decimal,
}

impl EffortLevelRange {
    pub fn contains(&self, hours_minimum: Decimal, hours_maximum: Decimal) -> bool {
        self.hours_minimum <= hours_minimum && hours_maximum <= self.hours_maximum
    }

    pub fn midpoint(&self) -> Decimal {
        (self.hours_minimum + self.hours_maximum) / Decimal::TWO
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::*;
    use crate::errors::DomainError;

    #[test]
    fn inverted_validity_window_is_a_constraint_violation() {
        let profile = RateProfile {
            id: RateProfileId("rp-1".to_owned()),
            name: "Inverted".to_owned(),
            ticket_type: TicketType::Support,
            severity: Severity::Low,
            impact: BusinessImpact::Low,
            base_hourly_rate: Decimal::new(8000, 2),
            multiplier: Decimal::ONE,
            is_active: true,
            effective_from: Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap(),
            effective_to: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        };

        let error = profile.validate().expect_err("window is inverted");
        assert!(matches!(error, DomainError::ConstraintViolation { entity: "rate_profile", .. }));
    }

    #[test]
    fn rule_match_is_inclusive_at_range_edges() {
        let rule = QuoteCalculationRule {
            id: CalculationRuleId("cr-1".to_owned()),
            name: "Edge".to_owned(),
            severity: Severity::High,
            impact: BusinessImpact::Medium,
            suggested_priority: Priority::P2,
            users_impacted_min: 10,
            users_impacted_max: 100,
            urgency_multiplier: Decimal::new(15, 1),
            priority_order: 20,
            is_active: true,
        };

        assert!(rule.matches(Severity::High, BusinessImpact::Medium, 10));
        assert!(rule.matches(Severity::High, BusinessImpact::Medium, 100));
        assert!(!rule.matches(Severity::High, BusinessImpact::Medium, 101));
        assert!(!rule.matches(Severity::High, BusinessImpact::Low, 50));
    }

    #[test]
    fn inverted_users_range_is_a_constraint_violation() {
        let rule = QuoteCalculationRule {
            id: CalculationRuleId("cr-2".to_owned()),
            name: "Inverted range".to_owned(),
            severity: Severity::Low,
            impact: BusinessImpact::Low,
            suggested_priority: Priority::P4,
            users_impacted_min: 50,
            users_impacted_max: 5,
            urgency_multiplier: Decimal::ONE,
            priority_order: 99,
            is_active: true,
        };

        assert!(rule.validate().is_err());
    }
}
