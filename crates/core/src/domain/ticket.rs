use serde::{Deserialize, Serialize};

use crate::domain::lookup::{BusinessImpact, Severity, TicketType};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationId(pub String);

/// Ticket record as consumed from the ticketing collaborator. The core never
/// mutates it; the classification fields key rate and priority lookups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub id: TicketId,
    pub ticket_type: TicketType,
    pub severity: Severity,
    pub impact: BusinessImpact,
    pub users_impacted: u32,
    pub organization_id: Option<OrganizationId>,
    pub creator_user_id: UserId,
}

impl TicketRecord {
    /// The (type, severity, impact) triple keying rate resolution.
    pub fn classification(&self) -> (TicketType, Severity, BusinessImpact) {
        (self.ticket_type, self.severity, self.impact)
    }
}
