//! Bounty and submission records owned by the registry

use crate::{AccountId, Amount, BlockHeight, BountyId, SubmissionId};
use serde::{Deserialize, Serialize};

/// A funded task with a deadline and a single eventual winner or refund
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounty {
    pub id: BountyId,
    /// Who funded the bounty
    pub owner: AccountId,
    pub title: String,
    pub description: String,
    /// Reward held in escrow
    pub amount: Amount,
    /// Last height (exclusive) at which work may be submitted
    pub deadline: BlockHeight,
    pub status: BountyStatus,
    pub created_at: BlockHeight,
    /// Set once the bounty completes
    pub winner: Option<AccountId>,
}

impl Bounty {
    pub fn is_active(&self) -> bool {
        matches!(self.status, BountyStatus::Active)
    }

    /// Whether work can still be submitted at `now`
    pub fn accepts_work_at(&self, now: BlockHeight) -> bool {
        self.is_active() && now < self.deadline
    }
}

/// Lifecycle of a bounty.
///
/// `Active` is initial; `Completed`, `Cancelled` and `Refunded` are terminal.
/// `Disputed` resolves to `Completed` or `Refunded`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BountyStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
    Disputed,
    Refunded,
}

impl BountyStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BountyStatus::Completed | BountyStatus::Cancelled | BountyStatus::Refunded
        )
    }
}

/// Work submitted by a contributor against a bounty
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub bounty_id: BountyId,
    pub contributor: AccountId,
    /// Opaque reference to the work, e.g. a content hash
    pub content_ref: String,
    pub submitted_at: BlockHeight,
    pub status: SubmissionStatus,
}

impl Submission {
    pub fn is_pending(&self) -> bool {
        matches!(self.status, SubmissionStatus::Pending)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

/// Parameters for a new bounty
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBounty {
    pub title: String,
    pub description: String,
    pub amount: Amount,
    pub deadline: BlockHeight,
}

impl NewBounty {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        amount: Amount,
        deadline: BlockHeight,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            amount,
            deadline,
        }
    }
}
