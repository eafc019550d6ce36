use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::lookup::{ConfidenceLevel, EffortLevel, QuoteCreator};
use crate::domain::pricing::{EffortLevelRange, QuoteCalculationRule, RateProfile};
use crate::domain::quote::{Quote, QuoteId};
use crate::domain::ticket::TicketRecord;
use crate::errors::DomainError;
use crate::estimation::priority::{
    DeterministicPriorityAdvisor, PriorityAdvisor, PrioritySuggestion,
};
use crate::estimation::rates::{DeterministicRateResolver, RateQuery, RateResolver};

/// Pricing catalog rows loaded by the caller for one evaluation. The engine
/// never reaches into storage itself.
#[derive(Clone, Debug)]
pub struct EstimationCatalog<'a> {
    pub rate_profiles: &'a [RateProfile],
    pub calculation_rules: &'a [QuoteCalculationRule],
    pub effort_levels: &'a [EffortLevelRange],
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateQuoteRequest {
    pub ticket: TicketRecord,
    pub effort_level: EffortLevel,
    pub estimated_hours_minimum: Decimal,
    pub estimated_hours_maximum: Decimal,
    pub fixed_cost: Option<Decimal>,
    pub confidence_level: ConfidenceLevel,
    pub created_by: QuoteCreator,
    /// Overrides the hours-band midpoint when set.
    pub resolution_time_override: Option<Decimal>,
    pub at: DateTime<Utc>,
}

/// Per-field adjustments for a revision. Unset fields copy forward from the
/// prior version.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteAdjustments {
    pub effort_level: Option<EffortLevel>,
    pub estimated_hours_minimum: Option<Decimal>,
    pub estimated_hours_maximum: Option<Decimal>,
    pub fixed_cost: Option<Decimal>,
    pub confidence_level: Option<ConfidenceLevel>,
    pub resolution_time_override: Option<Decimal>,
}

/// Result of an estimation pass: the draft quote (version allocated at the
/// storage boundary starts from this `version` value) plus the rule context
/// that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimationOutcome {
    pub quote: Quote,
    pub suggestion: PrioritySuggestion,
    pub rate_profile_name: String,
    pub rate_multiplier: Decimal,
}

pub struct QuoteEngine<R, P> {
    rate_resolver: R,
    priority_advisor: P,
}

impl Default for QuoteEngine<DeterministicRateResolver, DeterministicPriorityAdvisor> {
    fn default() -> Self {
        Self::new(DeterministicRateResolver, DeterministicPriorityAdvisor)
    }
}

impl<R, P> QuoteEngine<R, P>
where
    R: RateResolver,
    P: PriorityAdvisor,
{
    pub fn new(rate_resolver: R, priority_advisor: P) -> Self {
        Self { rate_resolver, priority_advisor }
    }

    /// Produce the first estimate for a ticket (version 1). Fails with a
    /// configuration-gap error when no rate profile or calculation rule
    /// covers the classification; those are surfaced, never defaulted.
    pub fn create_quote(
        &self,
        catalog: &EstimationCatalog<'_>,
        request: &CreateQuoteRequest,
    ) -> Result<EstimationOutcome, DomainError> {
        self.estimate(catalog, request, 1)
    }

    /// Produce the next version for a ticket, copying forward unspecified
    /// fields and leaving the draft unbound (`approval_id = None`) until a
    /// fresh approval request is attached. Rates and priority are
    /// re-resolved at `at`, so a revision picks up terms that changed since
    /// the prior version.
    pub fn revise_quote(
        &self,
        catalog: &EstimationCatalog<'_>,
        ticket: &TicketRecord,
        prior: &Quote,
        adjustments: &QuoteAdjustments,
        at: DateTime<Utc>,
    ) -> Result<EstimationOutcome, DomainError> {
        if prior.ticket_id != ticket.id {
            return Err(DomainError::ConstraintViolation {
                entity: "quote",
                detail: format!(
                    "prior quote `{}` belongs to ticket `{}`, not `{}`",
                    prior.id.0, prior.ticket_id.0, ticket.id.0
                ),
            });
        }

        // The prior resolution time survives a revision that touches neither
        // the hours nor the override; any adjustment to the band re-derives
        // the midpoint instead.
        let band_untouched = adjustments.effort_level.is_none()
            && adjustments.estimated_hours_minimum.is_none()
            && adjustments.estimated_hours_maximum.is_none();
        let resolution_time_override = adjustments
            .resolution_time_override
            .or_else(|| band_untouched.then_some(prior.estimated_resolution_time));

        let request = CreateQuoteRequest {
            ticket: ticket.clone(),
            effort_level: adjustments.effort_level.unwrap_or(prior.effort_level),
            estimated_hours_minimum: adjustments
                .estimated_hours_minimum
                .unwrap_or(prior.estimated_hours_minimum),
            estimated_hours_maximum: adjustments
                .estimated_hours_maximum
                .unwrap_or(prior.estimated_hours_maximum),
            fixed_cost: adjustments.fixed_cost.or(prior.fixed_cost),
            confidence_level: adjustments.confidence_level.unwrap_or(prior.confidence_level),
            created_by: prior.created_by,
            resolution_time_override,
            at,
        };

        self.estimate(catalog, &request, prior.version + 1)
    }

    fn estimate(
        &self,
        catalog: &EstimationCatalog<'_>,
        request: &CreateQuoteRequest,
        version: u32,
    ) -> Result<EstimationOutcome, DomainError> {
        if request.estimated_hours_maximum < request.estimated_hours_minimum {
            return Err(DomainError::ConstraintViolation {
                entity: "quote",
                detail: format!(
                    "estimated_hours_maximum {} below estimated_hours_minimum {}",
                    request.estimated_hours_maximum, request.estimated_hours_minimum
                ),
            });
        }

        let ticket = &request.ticket;
        let profile = self.rate_resolver.resolve(
            catalog.rate_profiles,
            &RateQuery {
                ticket_type: ticket.ticket_type,
                severity: ticket.severity,
                impact: ticket.impact,
                at: request.at,
            },
        )?;
        let suggestion = self.priority_advisor.suggest(
            catalog.calculation_rules,
            ticket.severity,
            ticket.impact,
            ticket.users_impacted,
        )?;

        let (effort_level, hours_minimum, hours_maximum) = classify_effort(
            catalog.effort_levels,
            request.effort_level,
            request.estimated_hours_minimum,
            request.estimated_hours_maximum,
        );

        let resolution_time = request
            .resolution_time_override
            .unwrap_or_else(|| (hours_minimum + hours_maximum) / Decimal::TWO);
        let estimated_cost = compute_estimated_cost(
            resolution_time,
            profile.base_hourly_rate,
            profile.multiplier,
            request.fixed_cost,
        );

        tracing::info!(
            ticket = %ticket.id.0,
            version,
            profile = %profile.name,
            rule = %suggestion.rule_name,
            cost = %estimated_cost,
            "quote estimated"
        );

        let quote = Quote {
            id: QuoteId(Uuid::new_v4().to_string()),
            ticket_id: ticket.id.clone(),
            version,
            estimated_hours_minimum: hours_minimum,
            estimated_hours_maximum: hours_maximum,
            estimated_resolution_time: resolution_time,
            hourly_rate: profile.base_hourly_rate,
            estimated_cost,
            fixed_cost: request.fixed_cost,
            final_cost: None,
            confidence_level: request.confidence_level,
            approval_id: None,
            suggested_priority: suggestion.priority,
            effort_level,
            created_by: request.created_by,
            created_at: request.at,
        };

        Ok(EstimationOutcome {
            quote,
            suggestion,
            rate_profile_name: profile.name.clone(),
            rate_multiplier: profile.multiplier,
        })
    }
}

/// `resolution_time * rate * multiplier + fixed_cost`, rounded to 2 decimal
/// places half-up. Fixed cost adds linearly, never multiplies.
pub fn compute_estimated_cost(
    resolution_time: Decimal,
    hourly_rate: Decimal,
    multiplier: Decimal,
    fixed_cost: Option<Decimal>,
) -> Decimal {
    (resolution_time * hourly_rate * multiplier + fixed_cost.unwrap_or(Decimal::ZERO))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Advisory effort banding. Hours inside the selected level's configured
/// range keep both; hours outside it reassign to the nearest configured
/// level (by midpoint distance) and widen the reported band to cover both
/// the supplied hours and that level's range.
pub fn classify_effort(
    levels: &[EffortLevelRange],
    requested: EffortLevel,
    hours_minimum: Decimal,
    hours_maximum: Decimal,
) -> (EffortLevel, Decimal, Decimal) {
    if let Some(range) = levels.iter().find(|range| range.level == requested) {
        if range.contains(hours_minimum, hours_maximum) {
            return (requested, hours_minimum, hours_maximum);
        }
    }

    let supplied_midpoint = (hours_minimum + hours_maximum) / Decimal::TWO;
    let nearest = levels
        .iter()
        .min_by_key(|range| (supplied_midpoint - range.midpoint()).abs());

    match nearest {
        Some(range) => {
            tracing::debug!(
                requested = ?requested,
                reassigned = ?range.level,
                "supplied hours fall outside the requested effort band"
            );
            (
                range.level,
                hours_minimum.min(range.hours_minimum),
                hours_maximum.max(range.hours_maximum),
            )
        }
        // No bands configured at all; keep the caller's classification.
        None => (requested, hours_minimum, hours_maximum),
    }
}
