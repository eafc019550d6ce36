use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::approval::ApprovalId;
use crate::domain::lookup::{ConfidenceLevel, EffortLevel, Priority, QuoteCreator};
use crate::domain::ticket::TicketId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

/// One version of the cost estimate for a ticket. Versions for a ticket form
/// a strictly increasing sequence starting at 1 with no gaps; an approved
/// version is immutable and any change produces a new version instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub ticket_id: TicketId,
    pub version: u32,
    pub estimated_hours_minimum: Decimal,
    pub estimated_hours_maximum: Decimal,
    pub estimated_resolution_time: Decimal,
    pub hourly_rate: Decimal,
    pub estimated_cost: Decimal,
    pub fixed_cost: Option<Decimal>,
    /// Null until the underlying ticket is resolved.
    pub final_cost: Option<Decimal>,
    pub confidence_level: ConfidenceLevel,
    /// Null exactly while this version is a draft awaiting a fresh approval
    /// request.
    pub approval_id: Option<ApprovalId>,
    pub suggested_priority: Priority,
    pub effort_level: EffortLevel,
    pub created_by: QuoteCreator,
    pub created_at: DateTime<Utc>,
}

impl Quote {
    pub fn is_draft(&self) -> bool {
        self.approval_id.is_none()
    }

    /// Attach the approval record this version binds to. A version binds to
    /// exactly one approval, so rebinding is a constraint violation.
    pub fn attach_approval(&mut self, approval_id: ApprovalId) -> Result<(), DomainError> {
        if self.approval_id.is_some() {
            return Err(DomainError::ConstraintViolation {
                entity: "quote",
                detail: format!(
                    "quote `{}` v{} already binds an approval",
                    self.id.0, self.version
                ),
            });
        }
        self.approval_id = Some(approval_id);
        Ok(())
    }

    /// Settle the final cost once the ticket resolves. Settling twice would
    /// mutate an audited figure, so it is rejected.
    pub fn settle_final_cost(&mut self, final_cost: Decimal) -> Result<(), DomainError> {
        if self.final_cost.is_some() {
            return Err(DomainError::ConstraintViolation {
                entity: "quote",
                detail: format!("final cost already settled on quote `{}`", self.id.0),
            });
        }
        self.final_cost = Some(final_cost);
        Ok(())
    }
}
