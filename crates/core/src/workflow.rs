use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::approval::{ApprovalId, ApprovalStatus, QuoteApproval};
use crate::domain::quote::QuoteId;
use crate::domain::ticket::UserId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    DecideQuotes,
}

/// The acting human, as established by the authentication collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub role: String,
    pub capabilities: Vec<Capability>,
}

impl Principal {
    pub fn holds(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

impl ApprovalDecision {
    fn target_status(self) -> ApprovalStatus {
        match self {
            Self::Approve => ApprovalStatus::Approved,
            Self::Reject => ApprovalStatus::Rejected,
        }
    }
}

/// State machine for a quote-approval record: Pending -> Approved | Rejected,
/// both terminal. A rejected version is never resurrected; revising the quote
/// opens a fresh pending approval on the next version instead.
#[derive(Clone, Debug, Default)]
pub struct ApprovalWorkflow;

impl ApprovalWorkflow {
    /// Open a fresh pending approval for a quote version.
    pub fn open(&self, quote_id: QuoteId) -> QuoteApproval {
        QuoteApproval::pending(ApprovalId(Uuid::new_v4().to_string()), quote_id)
    }

    /// Apply a decision. Guarded by the quote decide capability; decided
    /// approvals reject further transitions.
    pub fn transition(
        &self,
        approval: &QuoteApproval,
        decision: ApprovalDecision,
        comment: Option<String>,
        actor: &Principal,
        now: DateTime<Utc>,
    ) -> Result<QuoteApproval, DomainError> {
        if !actor.holds(Capability::DecideQuotes) {
            return Err(DomainError::ApprovalNotPermitted { role: actor.role.clone() });
        }

        if approval.status != ApprovalStatus::Pending {
            return Err(DomainError::AlreadyDecided {
                approval_id: approval.id.0.clone(),
                status: approval.status,
            });
        }

        let mut decided = approval.clone();
        decided.status = decision.target_status();
        decided.approved_by_user_id = Some(actor.user_id.clone());
        decided.user_role = Some(actor.role.clone());
        decided.comment = comment;
        decided.approved_at = Some(now);
        Ok(decided)
    }

    pub fn transition_with_audit<S>(
        &self,
        approval: &QuoteApproval,
        decision: ApprovalDecision,
        comment: Option<String>,
        actor: &Principal,
        now: DateTime<Utc>,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<QuoteApproval, DomainError>
    where
        S: AuditSink,
    {
        let result = self.transition(approval, decision, comment, actor, now);
        match &result {
            Ok(decided) => {
                sink.emit(
                    AuditEvent::new(
                        audit.ticket_id.clone(),
                        audit.correlation_id.clone(),
                        "approval.decided",
                        AuditCategory::Workflow,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("approval_id", decided.id.0.clone())
                    .with_metadata("status", decided.status.stable_key()),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit.ticket_id.clone(),
                        audit.correlation_id.clone(),
                        "approval.transition_rejected",
                        AuditCategory::Workflow,
                        audit.actor.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("approval_id", approval.id.0.clone())
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::audit::InMemoryAuditSink;
    use crate::domain::ticket::TicketId;

    fn approver() -> Principal {
        Principal {
            user_id: UserId("u-mgr".to_owned()),
            role: "support_manager".to_owned(),
            capabilities: vec![Capability::DecideQuotes],
        }
    }

    fn bystander() -> Principal {
        Principal {
            user_id: UserId("u-tech".to_owned()),
            role: "technician".to_owned(),
            capabilities: Vec::new(),
        }
    }

    #[test]
    fn pending_approval_can_be_approved_with_decision_fields_set() {
        let workflow = ApprovalWorkflow;
        let pending = workflow.open(QuoteId("q-1".to_owned()));
        let now = Utc::now();

        let decided = workflow
            .transition(&pending, ApprovalDecision::Approve, Some("ok".to_owned()), &approver(), now)
            .expect("pending -> approved");

        assert_eq!(decided.status, ApprovalStatus::Approved);
        assert_eq!(decided.approved_at, Some(now));
        assert_eq!(decided.approved_by_user_id, Some(UserId("u-mgr".to_owned())));
        assert_eq!(decided.user_role.as_deref(), Some("support_manager"));
        assert_eq!(decided.comment.as_deref(), Some("ok"));
    }

    #[test]
    fn second_rejection_fails_with_already_decided() {
        let workflow = ApprovalWorkflow;
        let pending = workflow.open(QuoteId("q-1".to_owned()));

        let rejected = workflow
            .transition(&pending, ApprovalDecision::Reject, None, &approver(), Utc::now())
            .expect("pending -> rejected");

        let error = workflow
            .transition(&rejected, ApprovalDecision::Reject, None, &approver(), Utc::now())
            .expect_err("already decided");
        assert!(matches!(
            error,
            DomainError::AlreadyDecided { status: ApprovalStatus::Rejected, .. }
        ));
    }

    #[test]
    fn approved_is_terminal_too() {
        let workflow = ApprovalWorkflow;
        let pending = workflow.open(QuoteId("q-2".to_owned()));
        let approved = workflow
            .transition(&pending, ApprovalDecision::Approve, None, &approver(), Utc::now())
            .expect("approve");

        assert!(workflow
            .transition(&approved, ApprovalDecision::Reject, None, &approver(), Utc::now())
            .is_err());
    }

    #[test]
    fn missing_capability_is_rejected_before_state_is_read() {
        let workflow = ApprovalWorkflow;
        let pending = workflow.open(QuoteId("q-3".to_owned()));

        let error = workflow
            .transition(&pending, ApprovalDecision::Approve, None, &bystander(), Utc::now())
            .expect_err("no capability");
        assert!(matches!(error, DomainError::ApprovalNotPermitted { ref role } if role == "technician"));
    }

    #[test]
    fn transitions_emit_audit_events() {
        let workflow = ApprovalWorkflow;
        let sink = InMemoryAuditSink::default();
        let pending = workflow.open(QuoteId("q-4".to_owned()));
        let context =
            AuditContext::new(Some(TicketId("t-4".to_owned())), "req-9", "approval-workflow");

        workflow
            .transition_with_audit(
                &pending,
                ApprovalDecision::Approve,
                None,
                &approver(),
                Utc::now(),
                &sink,
                &context,
            )
            .expect("approve");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "approval.decided");
        assert_eq!(events[0].metadata.get("status").map(String::as_str), Some("approved"));
    }
}
