use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::approval::ApprovalStatus;
use crate::domain::lookup::{BusinessImpact, Severity, TicketType};

/// Coarse failure classes the transport layer maps to status codes. The core
/// expresses only the kind, never a transport code. None of these are
/// transient; none warrant automatic retry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// No matching rate/priority rule/SLA policy for a valid combination.
    /// Surfaced to an administrator, never silently defaulted.
    ConfigurationGap,
    /// Approval not in the required state, or actor lacks the capability.
    /// A user-visible business-rule failure, not a system fault.
    InvalidTransition,
    /// Attempted mutation that would break a data-model invariant.
    ConstraintViolation,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("no active rate profile for ({ticket_type:?}, {severity:?}, {impact:?}) at {at}")]
    RateNotConfigured {
        ticket_type: TicketType,
        severity: Severity,
        impact: BusinessImpact,
        at: DateTime<Utc>,
    },
    #[error(
        "no active calculation rule covers ({severity:?}, {impact:?}) with {users_impacted} users impacted"
    )]
    PriorityRuleNotConfigured { severity: Severity, impact: BusinessImpact, users_impacted: u32 },
    #[error("no SLA policy covers {scope} at {at}")]
    SlaPolicyNotConfigured { scope: String, at: DateTime<Utc> },
    #[error("approval `{approval_id}` is already decided ({status:?})")]
    AlreadyDecided { approval_id: String, status: ApprovalStatus },
    #[error("role `{role}` does not hold the quote approve/reject capability")]
    ApprovalNotPermitted { role: String },
    #[error("{entity} invariant violation: {detail}")]
    ConstraintViolation { entity: &'static str, detail: String },
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateNotConfigured { .. }
            | Self::PriorityRuleNotConfigured { .. }
            | Self::SlaPolicyNotConfigured { .. } => ErrorKind::ConfigurationGap,
            Self::AlreadyDecided { .. } | Self::ApprovalNotPermitted { .. } => {
                ErrorKind::InvalidTransition
            }
            Self::ConstraintViolation { .. } => ErrorKind::ConstraintViolation,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("configuration gap: {message}")]
    ConfigurationGap { message: String, correlation_id: String },
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ConfigurationGap { .. } => {
                "No pricing terms are configured for this ticket. Contact an administrator."
            }
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::ConfigurationGap { correlation_id: id, .. }
            | InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(domain) => match domain.kind() {
                ErrorKind::ConfigurationGap => Self::ConfigurationGap {
                    message: domain.to_string(),
                    correlation_id: "unassigned".to_owned(),
                },
                ErrorKind::InvalidTransition | ErrorKind::ConstraintViolation => Self::BadRequest {
                    message: domain.to_string(),
                    correlation_id: "unassigned".to_owned(),
                },
            },
            ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
