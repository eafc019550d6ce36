use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::quote::QuoteId;
use crate::domain::ticket::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn stable_key(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_stable_key(key: &str) -> Option<Self> {
        match key {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Approved and Rejected are terminal for an approval record.
    pub fn is_decided(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

/// Record of a human decision gating a quote version. Binds 1:1 to the quote
/// version that references it; `approved_at` is set iff the status is decided.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteApproval {
    pub id: ApprovalId,
    pub quote_id: QuoteId,
    pub approved_by_user_id: Option<UserId>,
    pub user_role: Option<String>,
    pub status: ApprovalStatus,
    pub comment: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl QuoteApproval {
    /// A fresh pending approval awaiting a decision on the given quote version.
    pub fn pending(id: ApprovalId, quote_id: QuoteId) -> Self {
        Self {
            id,
            quote_id,
            approved_by_user_id: None,
            user_role: None,
            status: ApprovalStatus::Pending,
            comment: None,
            approved_at: None,
        }
    }
}
