use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::lookup::{BusinessImpact, Priority, Severity};
use crate::domain::pricing::{CalculationRuleId, QuoteCalculationRule};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrioritySuggestion {
    pub priority: Priority,
    pub urgency_multiplier: Decimal,
    pub rule_id: CalculationRuleId,
    pub rule_name: String,
}

/// Maps (severity, impact, users-impacted) to a suggested priority and
/// urgency multiplier via the administrator-maintained decision table.
pub trait PriorityAdvisor: Send + Sync {
    fn suggest(
        &self,
        rules: &[QuoteCalculationRule],
        severity: Severity,
        impact: BusinessImpact,
        users_impacted: u32,
    ) -> Result<PrioritySuggestion, DomainError>;
}

#[derive(Default)]
pub struct DeterministicPriorityAdvisor;

impl PriorityAdvisor for DeterministicPriorityAdvisor {
    fn suggest(
        &self,
        rules: &[QuoteCalculationRule],
        severity: Severity,
        impact: BusinessImpact,
        users_impacted: u32,
    ) -> Result<PrioritySuggestion, DomainError> {
        suggest_priority(rules, severity, impact, users_impacted)
    }
}

/// Among active rules matching severity, impact, and the inclusive
/// users-impacted range, the smallest `priority_order` wins; exact ties
/// break on id. A miss is a configuration gap the caller must surface.
pub fn suggest_priority(
    rules: &[QuoteCalculationRule],
    severity: Severity,
    impact: BusinessImpact,
    users_impacted: u32,
) -> Result<PrioritySuggestion, DomainError> {
    rules
        .iter()
        .filter(|rule| rule.matches(severity, impact, users_impacted))
        .min_by(|a, b| a.priority_order.cmp(&b.priority_order).then_with(|| a.id.0.cmp(&b.id.0)))
        .map(|rule| PrioritySuggestion {
            priority: rule.suggested_priority,
            urgency_multiplier: rule.urgency_multiplier,
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
        })
        .ok_or(DomainError::PriorityRuleNotConfigured { severity, impact, users_impacted })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn rule(
        id: &str,
        name: &str,
        severity: Severity,
        impact: BusinessImpact,
        priority: Priority,
        users: (u32, u32),
        urgency: Decimal,
        order: i32,
    ) -> QuoteCalculationRule {
        QuoteCalculationRule {
            id: CalculationRuleId(id.to_owned()),
            name: name.to_owned(),
            severity,
            impact,
            suggested_priority: priority,
            users_impacted_min: users.0,
            users_impacted_max: users.1,
            urgency_multiplier: urgency,
            priority_order: order,
            is_active: true,
        }
    }

    #[test]
    fn specific_rule_beats_broad_catch_all_on_lower_order() {
        let rules = vec![
            rule(
                "cr-broad",
                "Critical severity catch-all",
                Severity::Critical,
                BusinessImpact::Critical,
                Priority::P2,
                (0, 100_000),
                Decimal::new(15, 1),
                50,
            ),
            rule(
                "cr-p1",
                "P1 - Critical/Critical",
                Severity::Critical,
                BusinessImpact::Critical,
                Priority::P1,
                (100, 100_000),
                Decimal::new(25, 1),
                10,
            ),
        ];

        let suggestion =
            suggest_priority(&rules, Severity::Critical, BusinessImpact::Critical, 500)
                .expect("rule fires");

        assert_eq!(suggestion.rule_name, "P1 - Critical/Critical");
        assert_eq!(suggestion.priority, Priority::P1);
        assert_eq!(suggestion.urgency_multiplier, Decimal::new(25, 1));
    }

    #[test]
    fn suggestion_never_comes_from_a_rule_outside_the_user_range() {
        let rules = vec![
            rule(
                "cr-small",
                "Small blast radius",
                Severity::High,
                BusinessImpact::High,
                Priority::P3,
                (0, 49),
                Decimal::ONE,
                10,
            ),
            rule(
                "cr-large",
                "Large blast radius",
                Severity::High,
                BusinessImpact::High,
                Priority::P2,
                (50, 10_000),
                Decimal::new(12, 1),
                20,
            ),
        ];

        for users in [0, 49, 50, 10_000] {
            let suggestion =
                suggest_priority(&rules, Severity::High, BusinessImpact::High, users)
                    .expect("covered");
            let fired = rules.iter().find(|r| r.id == suggestion.rule_id).expect("known rule");
            assert!(fired.users_impacted_min <= users && users <= fired.users_impacted_max);
        }
    }

    #[test]
    fn range_gap_is_a_configuration_gap() {
        let rules = vec![rule(
            "cr-1",
            "Up to 10 users",
            Severity::Medium,
            BusinessImpact::Low,
            Priority::P4,
            (0, 10),
            Decimal::ONE,
            10,
        )];

        let error = suggest_priority(&rules, Severity::Medium, BusinessImpact::Low, 11)
            .expect_err("11 users falls outside every rule");
        assert!(matches!(
            error,
            DomainError::PriorityRuleNotConfigured { users_impacted: 11, .. }
        ));
    }

    #[test]
    fn inactive_rules_never_fire() {
        let mut only = rule(
            "cr-off",
            "Disabled",
            Severity::Low,
            BusinessImpact::Low,
            Priority::P4,
            (0, 100),
            Decimal::ONE,
            10,
        );
        only.is_active = false;

        assert!(suggest_priority(&[only], Severity::Low, BusinessImpact::Low, 5).is_err());
    }
}
