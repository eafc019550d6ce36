use chrono::{DateTime, Utc};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::sla::{SlaPolicy, SlaScope};
use crate::errors::DomainError;

/// Finds the contractual SLA terms applicable to a scope at an instant.
/// Scope isolation is structural: a user query can never surface an
/// organization policy because `SlaScope` equality covers the discriminant.
pub fn resolve_sla_policy<'a>(
    policies: &'a [SlaPolicy],
    scope: &SlaScope,
    at: DateTime<Utc>,
) -> Result<&'a SlaPolicy, DomainError> {
    let matches: Vec<&SlaPolicy> =
        policies.iter().filter(|policy| policy.covers(scope, at)).collect();

    match matches.as_slice() {
        [] => Err(DomainError::SlaPolicyNotConfigured { scope: scope.describe(), at }),
        [only] => Ok(only),
        _ => Ok(pick_latest(&matches)),
    }
}

/// Overlapping windows are a data-quality condition: resolve to the policy
/// with the latest `effective_from` and flag the overlap on the audit
/// channel so administrators can repair the catalog.
pub fn resolve_sla_policy_with_audit<'a, S>(
    policies: &'a [SlaPolicy],
    scope: &SlaScope,
    at: DateTime<Utc>,
    sink: &S,
    audit: &AuditContext,
) -> Result<&'a SlaPolicy, DomainError>
where
    S: AuditSink,
{
    let matches: Vec<&SlaPolicy> =
        policies.iter().filter(|policy| policy.covers(scope, at)).collect();

    match matches.as_slice() {
        [] => Err(DomainError::SlaPolicyNotConfigured { scope: scope.describe(), at }),
        [only] => Ok(only),
        overlapping => {
            let selected = pick_latest(overlapping);
            tracing::warn!(
                scope = %scope.describe(),
                selected = %selected.name,
                candidates = overlapping.len(),
                "overlapping SLA policy windows"
            );
            sink.emit(
                AuditEvent::new(
                    audit.ticket_id.clone(),
                    audit.correlation_id.clone(),
                    "sla.window_overlap",
                    AuditCategory::Sla,
                    audit.actor.clone(),
                    AuditOutcome::Flagged,
                )
                .with_metadata("scope", scope.describe())
                .with_metadata("selected_policy", selected.id.0.clone())
                .with_metadata("candidate_count", overlapping.len().to_string()),
            );
            Ok(selected)
        }
    }
}

fn pick_latest<'a>(candidates: &[&'a SlaPolicy]) -> &'a SlaPolicy {
    candidates
        .iter()
        .copied()
        .max_by(|a, b| a.effective_from.cmp(&b.effective_from).then_with(|| a.id.0.cmp(&b.id.0)))
        .unwrap_or(candidates[0])
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::*;
    use crate::audit::InMemoryAuditSink;
    use crate::domain::sla::{SlaContract, SlaPolicyId};

    fn policy(id: &str, scope: SlaScope, from: (i32, u32, u32), to: (i32, u32, u32)) -> SlaPolicy {
        SlaPolicy {
            id: SlaPolicyId(id.to_owned()),
            name: id.to_owned(),
            scope,
            contract: SlaContract {
                contracted_hourly_rate: Decimal::new(9_000, 2),
                targets: Vec::new(),
            },
            effective_from: Utc.with_ymd_and_hms(from.0, from.1, from.2, 0, 0, 0).unwrap(),
            effective_to: Utc.with_ymd_and_hms(to.0, to.1, to.2, 23, 59, 59).unwrap(),
        }
    }

    #[test]
    fn user_scope_never_resolves_an_organization_policy() {
        let policies = vec![policy(
            "sla-org",
            SlaScope::organization("o-1"),
            (2026, 1, 1),
            (2026, 12, 31),
        )];
        let at = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();

        let error = resolve_sla_policy(&policies, &SlaScope::user("o-1"), at)
            .expect_err("scope isolation");
        assert!(matches!(error, DomainError::SlaPolicyNotConfigured { .. }));
    }

    #[test]
    fn single_covering_policy_resolves_without_flagging() {
        let policies =
            vec![policy("sla-u1", SlaScope::user("u-1"), (2026, 1, 1), (2026, 12, 31))];
        let sink = InMemoryAuditSink::default();
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();

        let resolved = resolve_sla_policy_with_audit(
            &policies,
            &SlaScope::user("u-1"),
            at,
            &sink,
            &AuditContext::new(None, "req-1", "sla-resolver"),
        )
        .expect("covered");

        assert_eq!(resolved.id.0, "sla-u1");
        assert!(sink.events().is_empty());
    }

    #[test]
    fn overlap_selects_latest_effective_from_and_flags_the_audit_channel() {
        let policies = vec![
            policy("sla-old", SlaScope::organization("o-2"), (2025, 1, 1), (2026, 12, 31)),
            policy("sla-new", SlaScope::organization("o-2"), (2026, 3, 1), (2026, 9, 30)),
        ];
        let sink = InMemoryAuditSink::default();
        let at = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();

        let resolved = resolve_sla_policy_with_audit(
            &policies,
            &SlaScope::organization("o-2"),
            at,
            &sink,
            &AuditContext::new(None, "req-2", "sla-resolver"),
        )
        .expect("resolves despite overlap");

        assert_eq!(resolved.id.0, "sla-new");
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "sla.window_overlap");
        assert_eq!(events[0].metadata.get("candidate_count").map(String::as_str), Some("2"));
    }

    #[test]
    fn expired_window_is_a_configuration_gap() {
        let policies =
            vec![policy("sla-u1", SlaScope::user("u-1"), (2025, 1, 1), (2025, 12, 31))];
        let at = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();

        assert!(resolve_sla_policy(&policies, &SlaScope::user("u-1"), at).is_err());
    }
}
