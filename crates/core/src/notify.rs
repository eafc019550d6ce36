use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::lookup::Priority;
use crate::domain::quote::QuoteId;
use crate::domain::ticket::{TicketId, UserId};

/// Domain events the trigger observes. Produced by the request layer as
/// state transitions commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    TicketReceived {
        ticket_id: TicketId,
        reporter_user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    QuoteGenerated {
        ticket_id: TicketId,
        quote_id: QuoteId,
        version: u32,
        estimated_cost: Decimal,
        suggested_priority: Priority,
        occurred_at: DateTime<Utc>,
    },
    TicketStatusChanged {
        ticket_id: TicketId,
        from_status: String,
        to_status: String,
        occurred_at: DateTime<Utc>,
    },
    TicketResolved {
        ticket_id: TicketId,
        final_cost: Option<Decimal>,
        occurred_at: DateTime<Utc>,
    },
    TicketAssigned {
        ticket_id: TicketId,
        assignee_user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
}

/// Minimal payload the delivery collaborator needs. The trigger decides
/// *that* and *what* to notify; delivery, retries, and failure handling stay
/// outside the core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub template: &'static str,
    pub ticket_id: TicketId,
    pub recipient_user_id: Option<UserId>,
    pub subject: String,
    pub body: String,
    pub occurred_at: DateTime<Utc>,
}

/// Pure decision function: no I/O, no retries, at most one intent per event.
pub fn decide(event: &DomainEvent) -> Option<NotificationIntent> {
    match event {
        DomainEvent::TicketReceived { ticket_id, reporter_user_id, occurred_at } => {
            Some(NotificationIntent {
                template: "ticket_received",
                ticket_id: ticket_id.clone(),
                recipient_user_id: Some(reporter_user_id.clone()),
                subject: format!("Ticket {} received", ticket_id.0),
                body: "We have received your ticket and will estimate it shortly.".to_owned(),
                occurred_at: *occurred_at,
            })
        }
        DomainEvent::QuoteGenerated {
            ticket_id,
            quote_id,
            version,
            estimated_cost,
            suggested_priority,
            occurred_at,
        } => Some(NotificationIntent {
            template: "quote_generated",
            ticket_id: ticket_id.clone(),
            recipient_user_id: None,
            subject: format!("Quote v{version} ready for ticket {}", ticket_id.0),
            body: format!(
                "Quote {} (version {version}) estimates {} at priority {}.",
                quote_id.0,
                estimated_cost,
                suggested_priority.stable_key()
            ),
            occurred_at: *occurred_at,
        }),
        DomainEvent::TicketStatusChanged { ticket_id, from_status, to_status, occurred_at } => {
            // Unchanged status is a no-op event; nothing to tell anyone.
            if from_status == to_status {
                return None;
            }
            Some(NotificationIntent {
                template: "ticket_status_changed",
                ticket_id: ticket_id.clone(),
                recipient_user_id: None,
                subject: format!("Ticket {} is now {to_status}", ticket_id.0),
                body: format!("Status moved from {from_status} to {to_status}."),
                occurred_at: *occurred_at,
            })
        }
        DomainEvent::TicketResolved { ticket_id, final_cost, occurred_at } => {
            let body = match final_cost {
                Some(cost) => format!("Resolved; final cost {cost}."),
                None => "Resolved; final cost pending settlement.".to_owned(),
            };
            Some(NotificationIntent {
                template: "ticket_resolved",
                ticket_id: ticket_id.clone(),
                recipient_user_id: None,
                subject: format!("Ticket {} resolved", ticket_id.0),
                body,
                occurred_at: *occurred_at,
            })
        }
        DomainEvent::TicketAssigned { ticket_id, assignee_user_id, occurred_at } => {
            Some(NotificationIntent {
                template: "ticket_assigned",
                ticket_id: ticket_id.clone(),
                recipient_user_id: Some(assignee_user_id.clone()),
                subject: format!("Ticket {} assigned to you", ticket_id.0),
                body: "You have been assigned a ticket.".to_owned(),
                occurred_at: *occurred_at,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn quote_generated_carries_version_and_cost() {
        let intent = decide(&DomainEvent::QuoteGenerated {
            ticket_id: TicketId("t-1".to_owned()),
            quote_id: QuoteId("q-1".to_owned()),
            version: 2,
            estimated_cost: Decimal::new(90_000, 2),
            suggested_priority: Priority::P1,
            occurred_at: Utc::now(),
        })
        .expect("quote events always notify");

        assert_eq!(intent.template, "quote_generated");
        assert!(intent.subject.contains("v2"));
        assert!(intent.body.contains("900.00"));
        assert!(intent.body.contains("p1"));
    }

    #[test]
    fn unchanged_status_produces_no_intent() {
        let intent = decide(&DomainEvent::TicketStatusChanged {
            ticket_id: TicketId("t-1".to_owned()),
            from_status: "open".to_owned(),
            to_status: "open".to_owned(),
            occurred_at: Utc::now(),
        });

        assert!(intent.is_none());
    }

    #[test]
    fn assignment_targets_the_assignee() {
        let intent = decide(&DomainEvent::TicketAssigned {
            ticket_id: TicketId("t-7".to_owned()),
            assignee_user_id: UserId("u-9".to_owned()),
            occurred_at: Utc::now(),
        })
        .expect("assignment notifies");

        assert_eq!(intent.recipient_user_id, Some(UserId("u-9".to_owned())));
    }

    #[test]
    fn decision_is_pure_and_repeatable() {
        let event = DomainEvent::TicketResolved {
            ticket_id: TicketId("t-3".to_owned()),
            final_cost: Some(Decimal::new(12_345, 2)),
            occurred_at: Utc::now(),
        };

        assert_eq!(decide(&event), decide(&event));
    }
}
