use sqlx::{sqlite::SqliteRow, Row};

use rately_core::domain::lookup::{
    BusinessImpact, EffortLevel, Priority, Severity, TicketType,
};
use rately_core::domain::pricing::{
    CalculationRuleId, EffortLevelRange, QuoteCalculationRule, RateProfile, RateProfileId,
};
use rately_core::domain::sla::{SlaContract, SlaPolicy, SlaPolicyId, SlaScope, SlaSeverityTarget};

use super::{
    parse_decimal, parse_timestamp, CalculationRuleRepository, EffortLevelRepository,
    RateProfileRepository, RepositoryError, SlaPolicyRepository,
};
use crate::DbPool;

/// Backs the rate profile, calculation rule, and effort level catalogs with
/// one sqlite pool. Rows store decimals and timestamps as TEXT.
pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<T>(result: Result<T, rately_core::domain::lookup::UnknownLookupKey>) -> Result<T, RepositoryError> {
    result.map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_rate_profile(row: &SqliteRow) -> Result<RateProfile, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let ticket_type: String =
        row.try_get("ticket_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let severity: String =
        row.try_get("severity").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let impact: String =
        row.try_get("impact").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let base_hourly_rate: String =
        row.try_get("base_hourly_rate").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let multiplier: String =
        row.try_get("multiplier").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_active: bool =
        row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let effective_from: String =
        row.try_get("effective_from").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let effective_to: String =
        row.try_get("effective_to").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(RateProfile {
        id: RateProfileId(id),
        name,
        ticket_type: decode(TicketType::from_stable_key(&ticket_type))?,
        severity: decode(Severity::from_stable_key(&severity))?,
        impact: decode(BusinessImpact::from_stable_key(&impact))?,
        base_hourly_rate: parse_decimal(&base_hourly_rate, "base_hourly_rate")?,
        multiplier: parse_decimal(&multiplier, "multiplier")?,
        is_active,
        effective_from: parse_timestamp(&effective_from, "effective_from")?,
        effective_to: parse_timestamp(&effective_to, "effective_to")?,
    })
}

fn row_to_calculation_rule(row: &SqliteRow) -> Result<QuoteCalculationRule, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let severity: String =
        row.try_get("severity").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let impact: String =
        row.try_get("impact").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let suggested_priority: String =
        row.try_get("suggested_priority").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let users_impacted_min: i64 =
        row.try_get("users_impacted_min").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let users_impacted_max: i64 =
        row.try_get("users_impacted_max").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let urgency_multiplier: String =
        row.try_get("urgency_multiplier").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let priority_order: i32 =
        row.try_get("priority_order").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_active: bool =
        row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(QuoteCalculationRule {
        id: CalculationRuleId(id),
        name,
        severity: decode(Severity::from_stable_key(&severity))?,
        impact: decode(BusinessImpact::from_stable_key(&impact))?,
        suggested_priority: decode(Priority::from_stable_key(&suggested_priority))?,
        users_impacted_min: users_impacted_min as u32,
        users_impacted_max: users_impacted_max as u32,
        urgency_multiplier: parse_decimal(&urgency_multiplier, "urgency_multiplier")?,
        priority_order,
        is_active,
    })
}

fn row_to_effort_level(row: &SqliteRow) -> Result<EffortLevelRange, RepositoryError> {
    let level: String =
        row.try_get("level").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let hours_minimum: String =
        row.try_get("hours_minimum").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let hours_maximum: String =
        row.try_get("hours_maximum").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(EffortLevelRange {
        level: decode(EffortLevel::from_stable_key(&level))?,
        hours_minimum: parse_decimal(&hours_minimum, "hours_minimum")?,
        hours_maximum: parse_decimal(&hours_maximum, "hours_maximum")?,
    })
}

#[async_trait::async_trait]
impl RateProfileRepository for SqlCatalogRepository {
    async fn list_rate_profiles(&self) -> Result<Vec<RateProfile>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, ticket_type, severity, impact, base_hourly_rate, multiplier,
                    is_active, effective_from, effective_to
             FROM rate_profiles
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_rate_profile).collect()
    }

    async fn save_rate_profile(&self, profile: RateProfile) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO rate_profiles (id, name, ticket_type, severity, impact,
                                        base_hourly_rate, multiplier, is_active,
                                        effective_from, effective_to)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 ticket_type = excluded.ticket_type,
                 severity = excluded.severity,
                 impact = excluded.impact,
                 base_hourly_rate = excluded.base_hourly_rate,
                 multiplier = excluded.multiplier,
                 is_active = excluded.is_active,
                 effective_from = excluded.effective_from,
                 effective_to = excluded.effective_to",
        )
        .bind(&profile.id.0)
        .bind(&profile.name)
        .bind(profile.ticket_type.stable_key())
        .bind(profile.severity.stable_key())
        .bind(profile.impact.stable_key())
        .bind(profile.base_hourly_rate.to_string())
        .bind(profile.multiplier.to_string())
        .bind(profile.is_active)
        .bind(profile.effective_from.to_rfc3339())
        .bind(profile.effective_to.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl CalculationRuleRepository for SqlCatalogRepository {
    async fn list_calculation_rules(
        &self,
    ) -> Result<Vec<QuoteCalculationRule>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, severity, impact, suggested_priority,
                    users_impacted_min, users_impacted_max, urgency_multiplier,
                    priority_order, is_active
             FROM calculation_rules
             ORDER BY priority_order, id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_calculation_rule).collect()
    }

    async fn save_calculation_rule(
        &self,
        rule: QuoteCalculationRule,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO calculation_rules (id, name, severity, impact, suggested_priority,
                                            users_impacted_min, users_impacted_max,
                                            urgency_multiplier, priority_order, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 severity = excluded.severity,
                 impact = excluded.impact,
                 suggested_priority = excluded.suggested_priority,
                 users_impacted_min = excluded.users_impacted_min,
                 users_impacted_max = excluded.users_impacted_max,
                 urgency_multiplier = excluded.urgency_multiplier,
                 priority_order = excluded.priority_order,
                 is_active = excluded.is_active",
        )
        .bind(&rule.id.0)
        .bind(&rule.name)
        .bind(rule.severity.stable_key())
        .bind(rule.impact.stable_key())
        .bind(rule.suggested_priority.stable_key())
        .bind(rule.users_impacted_min as i64)
        .bind(rule.users_impacted_max as i64)
        .bind(rule.urgency_multiplier.to_string())
        .bind(rule.priority_order)
        .bind(rule.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl EffortLevelRepository for SqlCatalogRepository {
    async fn list_effort_levels(&self) -> Result<Vec<EffortLevelRange>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT level, hours_minimum, hours_maximum FROM effort_levels ORDER BY level",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_effort_level).collect()
    }

    async fn save_effort_level(&self, range: EffortLevelRange) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO effort_levels (level, hours_minimum, hours_maximum)
             VALUES (?, ?, ?)
             ON CONFLICT(level) DO UPDATE SET
                 hours_minimum = excluded.hours_minimum,
                 hours_maximum = excluded.hours_maximum",
        )
        .bind(range.level.stable_key())
        .bind(range.hours_minimum.to_string())
        .bind(range.hours_maximum.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

pub struct SqlSlaPolicyRepository {
    pool: DbPool,
}

impl SqlSlaPolicyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn scope_columns(scope: &SlaScope) -> (&'static str, &str) {
    match scope {
        SlaScope::User { user_id } => ("user", user_id.0.as_str()),
        SlaScope::Organization { organization_id } => {
            ("organization", organization_id.0.as_str())
        }
    }
}

fn row_to_sla_policy(row: &SqliteRow) -> Result<SlaPolicy, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let scope_kind: String =
        row.try_get("scope_kind").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let scope_id: String =
        row.try_get("scope_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let contracted_hourly_rate: String = row
        .try_get("contracted_hourly_rate")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let targets_json: String =
        row.try_get("targets_json").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let effective_from: String =
        row.try_get("effective_from").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let effective_to: String =
        row.try_get("effective_to").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let scope = match scope_kind.as_str() {
        "user" => SlaScope::user(scope_id),
        "organization" => SlaScope::organization(scope_id),
        other => {
            return Err(RepositoryError::Decode(format!("unknown scope_kind `{other}`")));
        }
    };
    let targets: Vec<SlaSeverityTarget> = serde_json::from_str(&targets_json)
        .map_err(|e| RepositoryError::Decode(format!("column `targets_json`: {e}")))?;

    Ok(SlaPolicy {
        id: SlaPolicyId(id),
        name,
        scope,
        contract: SlaContract {
            contracted_hourly_rate: parse_decimal(
                &contracted_hourly_rate,
                "contracted_hourly_rate",
            )?,
            targets,
        },
        effective_from: parse_timestamp(&effective_from, "effective_from")?,
        effective_to: parse_timestamp(&effective_to, "effective_to")?,
    })
}

#[async_trait::async_trait]
impl SlaPolicyRepository for SqlSlaPolicyRepository {
    async fn list_sla_policies(&self) -> Result<Vec<SlaPolicy>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, scope_kind, scope_id, contracted_hourly_rate, targets_json,
                    effective_from, effective_to
             FROM sla_policies
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_sla_policy).collect()
    }

    async fn save_sla_policy(&self, policy: SlaPolicy) -> Result<(), RepositoryError> {
        let (scope_kind, scope_id) = scope_columns(&policy.scope);
        let targets_json = serde_json::to_string(&policy.contract.targets)
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        sqlx::query(
            "INSERT INTO sla_policies (id, name, scope_kind, scope_id,
                                       contracted_hourly_rate, targets_json,
                                       effective_from, effective_to)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 scope_kind = excluded.scope_kind,
                 scope_id = excluded.scope_id,
                 contracted_hourly_rate = excluded.contracted_hourly_rate,
                 targets_json = excluded.targets_json,
                 effective_from = excluded.effective_from,
                 effective_to = excluded.effective_to",
        )
        .bind(&policy.id.0)
        .bind(&policy.name)
        .bind(scope_kind)
        .bind(scope_id)
        .bind(policy.contract.contracted_hourly_rate.to_string())
        .bind(targets_json)
        .bind(policy.effective_from.to_rfc3339())
        .bind(policy.effective_to.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use rately_core::domain::lookup::{
        BusinessImpact, EffortLevel, Priority, Severity, TicketType,
    };
    use rately_core::domain::pricing::{
        CalculationRuleId, EffortLevelRange, QuoteCalculationRule, RateProfile, RateProfileId,
    };
    use rately_core::domain::sla::{
        SlaContract, SlaPolicy, SlaPolicyId, SlaScope, SlaSeverityTarget,
    };

    use super::{SqlCatalogRepository, SqlSlaPolicyRepository};
    use crate::repositories::{
        CalculationRuleRepository, EffortLevelRepository, RateProfileRepository,
        SlaPolicyRepository,
    };
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn rate_profile_round_trips_through_text_columns() {
        let pool = setup().await;
        let repo = SqlCatalogRepository::new(pool);

        let profile = RateProfile {
            id: RateProfileId("rp-1".to_string()),
            name: "Critical Impact - Low Severity".to_string(),
            ticket_type: TicketType::Support,
            severity: Severity::Low,
            impact: BusinessImpact::Critical,
            base_hourly_rate: Decimal::new(10_000, 2),
            multiplier: Decimal::new(15, 1),
            is_active: true,
            effective_from: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            effective_to: Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap(),
        };
        repo.save_rate_profile(profile.clone()).await.expect("save");

        let listed = repo.list_rate_profiles().await.expect("list");
        assert_eq!(listed, vec![profile]);
    }

    #[tokio::test]
    async fn calculation_rules_come_back_in_priority_order() {
        let pool = setup().await;
        let repo = SqlCatalogRepository::new(pool);

        let rule = |id: &str, order: i32| QuoteCalculationRule {
            id: CalculationRuleId(id.to_string()),
            name: id.to_string(),
            severity: Severity::Critical,
            impact: BusinessImpact::Critical,
            suggested_priority: Priority::P1,
            users_impacted_min: 1,
            users_impacted_max: 1000,
            urgency_multiplier: Decimal::new(25, 1),
            priority_order: order,
            is_active: true,
        };
        repo.save_calculation_rule(rule("cr-broad", 50)).await.expect("save broad");
        repo.save_calculation_rule(rule("cr-specific", 10)).await.expect("save specific");

        let listed = repo.list_calculation_rules().await.expect("list");
        assert_eq!(listed[0].id.0, "cr-specific");
        assert_eq!(listed[1].id.0, "cr-broad");
    }

    #[tokio::test]
    async fn effort_level_save_upserts_the_band() {
        let pool = setup().await;
        let repo = SqlCatalogRepository::new(pool);

        let band = EffortLevelRange {
            level: EffortLevel::Medium,
            hours_minimum: Decimal::new(8, 0),
            hours_maximum: Decimal::new(24, 0),
        };
        repo.save_effort_level(band.clone()).await.expect("save");

        let widened = EffortLevelRange { hours_maximum: Decimal::new(32, 0), ..band };
        repo.save_effort_level(widened.clone()).await.expect("upsert");

        let listed = repo.list_effort_levels().await.expect("list");
        assert_eq!(listed, vec![widened]);
    }

    #[tokio::test]
    async fn sla_policy_round_trips_scope_and_targets() {
        let pool = setup().await;
        let repo = SqlSlaPolicyRepository::new(pool);

        let policy = SlaPolicy {
            id: SlaPolicyId("sla-1".to_string()),
            name: "Gold".to_string(),
            scope: SlaScope::organization("o-1"),
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
        };
        repo.save_sla_policy(policy.clone()).await.expect("save");

        let listed = repo.list_sla_policies().await.expect("list");
        assert_eq!(listed, vec![policy]);
    }
}
