use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use rately_core::domain::lookup::{BusinessImpact, EffortLevel, Priority, Severity, TicketType};
use rately_core::domain::pricing::{
    CalculationRuleId, EffortLevelRange, QuoteCalculationRule, RateProfile, RateProfileId,
};
use rately_core::domain::sla::{SlaContract, SlaPolicy, SlaPolicyId, SlaScope, SlaSeverityTarget};

use crate::connection::DbPool;
use crate::repositories::{
    CalculationRuleRepository, EffortLevelRepository, RateProfileRepository, RepositoryError,
    SlaPolicyRepository, SqlCatalogRepository, SqlSlaPolicyRepository,
};

/// Baseline catalog the demo and doctor commands rely on: rate profiles and
/// calculation rules covering every severity tier, the three effort bands,
/// and a pair of SLA policies.
pub struct SeedDataset {
    pub rate_profiles: Vec<RateProfile>,
    pub calculation_rules: Vec<QuoteCalculationRule>,
    pub effort_levels: Vec<EffortLevelRange>,
    pub sla_policies: Vec<SlaPolicy>,
}

#[derive(Debug)]
pub struct SeedResult {
    pub rate_profiles: usize,
    pub calculation_rules: usize,
    pub effort_levels: usize,
    pub sla_policies: usize,
}

fn window_2026() -> (DateTime<Utc>, DateTime<Utc>) {
    (
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().unwrap_or_else(Utc::now),
        Utc.with_ymd_and_hms(2027, 12, 31, 23, 59, 59).single().unwrap_or_else(Utc::now),
    )
}

fn profile(
    id: &str,
    name: &str,
    ticket_type: TicketType,
    severity: Severity,
    impact: BusinessImpact,
    rate: Decimal,
    multiplier: Decimal,
) -> RateProfile {
    let (effective_from, effective_to) = window_2026();
    RateProfile {
        id: RateProfileId(id.to_string()),
        name: name.to_string(),
        ticket_type,
        severity,
        impact,
        base_hourly_rate: rate,
        multiplier,
        is_active: true,
        effective_from,
        effective_to,
    }
}

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
        id: CalculationRuleId(id.to_string()),
        name: name.to_string(),
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

impl SeedDataset {
    pub fn baseline() -> Self {
        let (effective_from, effective_to) = window_2026();

        let rate_profiles = vec![
            profile(
                "rp-support-low-critical",
                "Critical Impact - Low Severity",
                TicketType::Support,
                Severity::Low,
                BusinessImpact::Critical,
                Decimal::new(10_000, 2),
                Decimal::new(15, 1),
            ),
            profile(
                "rp-incident-critical-critical",
                "Major Incident",
                TicketType::Incident,
                Severity::Critical,
                BusinessImpact::Critical,
                Decimal::new(15_000, 2),
                Decimal::new(20, 1),
            ),
            profile(
                "rp-incident-high-high",
                "High Severity Incident",
                TicketType::Incident,
                Severity::High,
                BusinessImpact::High,
                Decimal::new(12_000, 2),
                Decimal::new(15, 1),
            ),
            profile(
                "rp-support-medium-medium",
                "Standard Support",
                TicketType::Support,
                Severity::Medium,
                BusinessImpact::Medium,
                Decimal::new(9_000, 2),
                Decimal::ONE,
            ),
            profile(
                "rp-maintenance-low-low",
                "Routine Maintenance",
                TicketType::Maintenance,
                Severity::Low,
                BusinessImpact::Low,
                Decimal::new(7_000, 2),
                Decimal::ONE,
            ),
            profile(
                "rp-installation-medium-low",
                "Scheduled Installation",
                TicketType::Installation,
                Severity::Medium,
                BusinessImpact::Low,
                Decimal::new(8_000, 2),
                Decimal::ONE,
            ),
        ];

        let calculation_rules = vec![
            rule(
                "cr-p1-critical-wide",
                "P1 - Critical/Critical",
                Severity::Critical,
                BusinessImpact::Critical,
                Priority::P1,
                (100, 100_000),
                Decimal::new(25, 1),
                10,
            ),
            rule(
                "cr-p2-critical-narrow",
                "P2 - Critical/Critical small blast radius",
                Severity::Critical,
                BusinessImpact::Critical,
                Priority::P2,
                (0, 99),
                Decimal::new(20, 1),
                50,
            ),
            rule(
                "cr-p2-high-high",
                "P2 - High/High",
                Severity::High,
                BusinessImpact::High,
                Priority::P2,
                (0, 100_000),
                Decimal::new(15, 1),
                20,
            ),
            rule(
                "cr-p2-low-critical",
                "P2 - Critical impact, low severity",
                Severity::Low,
                BusinessImpact::Critical,
                Priority::P2,
                (0, 100_000),
                Decimal::new(15, 1),
                20,
            ),
            rule(
                "cr-p3-medium-medium",
                "P3 - Medium/Medium",
                Severity::Medium,
                BusinessImpact::Medium,
                Priority::P3,
                (0, 100_000),
                Decimal::new(12, 1),
                30,
            ),
            rule(
                "cr-p3-medium-low",
                "P3 - Medium/Low",
                Severity::Medium,
                BusinessImpact::Low,
                Priority::P3,
                (0, 100_000),
                Decimal::ONE,
                30,
            ),
            rule(
                "cr-p4-low-low",
                "P4 - Low/Low",
                Severity::Low,
                BusinessImpact::Low,
                Priority::P4,
                (0, 100_000),
                Decimal::ONE,
                40,
            ),
        ];

        let effort_levels = vec![
            EffortLevelRange {
                level: EffortLevel::Low,
                hours_minimum: Decimal::ONE,
                hours_maximum: Decimal::new(8, 0),
            },
            EffortLevelRange {
                level: EffortLevel::Medium,
                hours_minimum: Decimal::new(8, 0),
                hours_maximum: Decimal::new(24, 0),
            },
            EffortLevelRange {
                level: EffortLevel::High,
                hours_minimum: Decimal::new(24, 0),
                hours_maximum: Decimal::new(80, 0),
            },
        ];

        let sla_policies = vec![
            SlaPolicy {
                id: SlaPolicyId("sla-acme-gold".to_string()),
                name: "Acme Gold".to_string(),
                scope: SlaScope::organization("org-acme"),
                contract: SlaContract {
                    contracted_hourly_rate: Decimal::new(12_000, 2),
                    targets: vec![
                        SlaSeverityTarget {
                            severity: Severity::Critical,
                            response_minutes: 30,
                            resolution_minutes: 240,
                        },
                        SlaSeverityTarget {
                            severity: Severity::High,
                            response_minutes: 60,
                            resolution_minutes: 480,
                        },
                    ],
                },
                effective_from,
                effective_to,
            },
            SlaPolicy {
                id: SlaPolicyId("sla-vip-user".to_string()),
                name: "VIP Direct".to_string(),
                scope: SlaScope::user("user-vip-1"),
                contract: SlaContract {
                    contracted_hourly_rate: Decimal::new(9_000, 2),
                    targets: vec![SlaSeverityTarget {
                        severity: Severity::Critical,
                        response_minutes: 60,
                        resolution_minutes: 480,
                    }],
                },
                effective_from,
                effective_to,
            },
        ];

        Self { rate_profiles, calculation_rules, effort_levels, sla_policies }
    }

    /// Write the dataset through the SQL repositories. Saves are upserts, so
    /// loading is idempotent.
    pub async fn load(&self, pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let catalog = SqlCatalogRepository::new(pool.clone());
        let sla = SqlSlaPolicyRepository::new(pool.clone());

        for rate_profile in &self.rate_profiles {
            catalog.save_rate_profile(rate_profile.clone()).await?;
        }
        for calculation_rule in &self.calculation_rules {
            catalog.save_calculation_rule(calculation_rule.clone()).await?;
        }
        for effort_level in &self.effort_levels {
            catalog.save_effort_level(effort_level.clone()).await?;
        }
        for policy in &self.sla_policies {
            sla.save_sla_policy(policy.clone()).await?;
        }

        Ok(SeedResult {
            rate_profiles: self.rate_profiles.len(),
            calculation_rules: self.calculation_rules.len(),
            effort_levels: self.effort_levels.len(),
            sla_policies: self.sla_policies.len(),
        })
    }
}
