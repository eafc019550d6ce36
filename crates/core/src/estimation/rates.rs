use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::lookup::{BusinessImpact, Severity, TicketType};
use crate::domain::pricing::RateProfile;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuery {
    pub ticket_type: TicketType,
    pub severity: Severity,
    pub impact: BusinessImpact,
    pub at: DateTime<Utc>,
}

/// Finds the single applicable pricing rule for a classification at an
/// instant. Callers must not fabricate a default rate when this misses.
pub trait RateResolver: Send + Sync {
    fn resolve<'a>(
        &self,
        profiles: &'a [RateProfile],
        query: &RateQuery,
    ) -> Result<&'a RateProfile, DomainError>;
}

#[derive(Default)]
pub struct DeterministicRateResolver;

impl RateResolver for DeterministicRateResolver {
    fn resolve<'a>(
        &self,
        profiles: &'a [RateProfile],
        query: &RateQuery,
    ) -> Result<&'a RateProfile, DomainError> {
        resolve_rate(profiles, query)
    }
}

/// Among active, in-window profiles matching the classification, the latest
/// `effective_from` wins so administrators can override older blanket rules
/// without deactivating them immediately. Exact `effective_from` ties break
/// on id so the pick stays total and deterministic.
pub fn resolve_rate<'a>(
    profiles: &'a [RateProfile],
    query: &RateQuery,
) -> Result<&'a RateProfile, DomainError> {
    let picked = profiles
        .iter()
        .filter(|profile| {
            profile.matches(query.ticket_type, query.severity, query.impact, query.at)
        })
        .max_by(|a, b| {
            a.effective_from.cmp(&b.effective_from).then_with(|| a.id.0.cmp(&b.id.0))
        });

    match picked {
        Some(profile) => {
            tracing::debug!(
                profile = %profile.name,
                rate = %profile.base_hourly_rate,
                multiplier = %profile.multiplier,
                "rate profile resolved"
            );
            Ok(profile)
        }
        None => Err(DomainError::RateNotConfigured {
            ticket_type: query.ticket_type,
            severity: query.severity,
            impact: query.impact,
            at: query.at,
        }),
    }
}
