pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod estimation;
pub mod notify;
pub mod sla;
pub mod workflow;

pub use audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use domain::approval::{ApprovalId, ApprovalStatus, QuoteApproval};
pub use domain::lookup::{
    BusinessImpact, ConfidenceLevel, EffortLevel, LookupCatalog, Priority, QuoteCreator, Severity,
    TicketType,
};
pub use domain::pricing::{
    CalculationRuleId, EffortLevelRange, QuoteCalculationRule, RateProfile, RateProfileId,
};
pub use domain::quote::{Quote, QuoteId};
pub use domain::sla::{SlaContract, SlaPolicy, SlaPolicyId, SlaScope, SlaSeverityTarget};
pub use domain::ticket::{OrganizationId, TicketId, TicketRecord, UserId};
pub use errors::{ApplicationError, DomainError, ErrorKind, InterfaceError};
pub use estimation::{
    CreateQuoteRequest, DeterministicPriorityAdvisor, DeterministicRateResolver,
    EstimationCatalog, EstimationOutcome, PriorityAdvisor, PrioritySuggestion, QuoteAdjustments,
    QuoteEngine, RateQuery, RateResolver,
};
pub use notify::{decide as decide_notification, DomainEvent, NotificationIntent};
pub use sla::{resolve_sla_policy, resolve_sla_policy_with_audit};
pub use workflow::{ApprovalDecision, ApprovalWorkflow, Capability, Principal};
