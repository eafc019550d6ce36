use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use rately_core::domain::approval::{ApprovalId, QuoteApproval};
use rately_core::domain::pricing::{EffortLevelRange, QuoteCalculationRule, RateProfile};
use rately_core::domain::quote::{Quote, QuoteId};
use rately_core::domain::sla::SlaPolicy;
use rately_core::domain::ticket::TicketId;

pub mod approval;
pub mod catalog;
pub mod memory;
pub mod quote;

pub use approval::SqlApprovalRepository;
pub use catalog::{SqlCatalogRepository, SqlSlaPolicyRepository};
pub use memory::{
    InMemoryApprovalRepository, InMemoryCatalogRepository, InMemoryQuoteRepository,
    InMemorySlaPolicyRepository,
};
pub use quote::SqlQuoteRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("version conflict: {0}")]
    Conflict(String),
}

/// Read access to the configured rate profiles.
#[async_trait]
pub trait RateProfileRepository: Send + Sync {
    async fn list_rate_profiles(&self) -> Result<Vec<RateProfile>, RepositoryError>;
    async fn save_rate_profile(&self, profile: RateProfile) -> Result<(), RepositoryError>;
}

/// Read access to the priority/urgency decision table.
#[async_trait]
pub trait CalculationRuleRepository: Send + Sync {
    async fn list_calculation_rules(&self)
        -> Result<Vec<QuoteCalculationRule>, RepositoryError>;
    async fn save_calculation_rule(
        &self,
        rule: QuoteCalculationRule,
    ) -> Result<(), RepositoryError>;
}

/// Read access to the configured effort-level hour bands.
#[async_trait]
pub trait EffortLevelRepository: Send + Sync {
    async fn list_effort_levels(&self) -> Result<Vec<EffortLevelRange>, RepositoryError>;
    async fn save_effort_level(&self, range: EffortLevelRange) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SlaPolicyRepository: Send + Sync {
    async fn list_sla_policies(&self) -> Result<Vec<SlaPolicy>, RepositoryError>;
    async fn save_sla_policy(&self, policy: SlaPolicy) -> Result<(), RepositoryError>;
}

/// Version allocation happens here, not in the engine: the unique
/// (ticket_id, version) constraint is the arbiter under concurrency.
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    /// Persist a quote, allocating the next version for its ticket. The
    /// returned quote carries the version that was actually stored.
    async fn insert_quote(&self, quote: Quote) -> Result<Quote, RepositoryError>;

    /// Re-persist mutable fields (approval binding, final cost) of an
    /// existing version. Identity fields are never rewritten.
    async fn update_quote(&self, quote: &Quote) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError>;

    async fn find_latest(&self, ticket_id: &TicketId) -> Result<Option<Quote>, RepositoryError>;

    async fn list_for_ticket(&self, ticket_id: &TicketId)
        -> Result<Vec<Quote>, RepositoryError>;
}

#[async_trait]
pub trait ApprovalRepository: Send + Sync {
    async fn find_by_id(&self, id: &ApprovalId)
        -> Result<Option<QuoteApproval>, RepositoryError>;
    async fn save(&self, approval: QuoteApproval) -> Result<(), RepositoryError>;
    async fn find_by_quote_id(
        &self,
        quote_id: &QuoteId,
    ) -> Result<Vec<QuoteApproval>, RepositoryError>;
}

pub(crate) fn parse_decimal(raw: &str, column: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw)
        .map_err(|e| RepositoryError::Decode(format!("column `{column}`: {e}")))
}

pub(crate) fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("column `{column}`: {e}")))
}

pub(crate) fn parse_optional_decimal(
    raw: Option<String>,
    column: &str,
) -> Result<Option<Decimal>, RepositoryError> {
    raw.map(|s| parse_decimal(&s, column)).transpose()
}

pub(crate) fn parse_optional_timestamp(
    raw: Option<String>,
    column: &str,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    raw.map(|s| parse_timestamp(&s, column)).transpose()
}
