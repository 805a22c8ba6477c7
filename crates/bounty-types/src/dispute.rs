//! Dispute records owned by the resolver

use crate::{AccountId, BlockHeight, BountyId, DisputeId};
use serde::{Deserialize, Serialize};

/// An arbitration case opened when a submission outcome is contested
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: DisputeId,
    pub bounty_id: BountyId,
    pub contributor: AccountId,
    pub owner: AccountId,
    pub created_at: BlockHeight,
    pub status: DisputeStatus,
    pub resolution_note: Option<String>,
    pub resolved_at: Option<BlockHeight>,
}

impl Dispute {
    pub fn is_pending(&self) -> bool {
        matches!(self.status, DisputeStatus::Pending)
    }
}

/// `Pending -> ResolvedForContributor | ResolvedForOwner`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DisputeStatus {
    #[default]
    Pending,
    ResolvedForContributor,
    ResolvedForOwner,
}

/// Which party an arbitrator sided with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ruling {
    ForContributor,
    ForOwner,
}

impl Ruling {
    pub fn from_favor_contributor(favor_contributor: bool) -> Self {
        if favor_contributor {
            Ruling::ForContributor
        } else {
            Ruling::ForOwner
        }
    }

    pub fn resolved_status(self) -> DisputeStatus {
        match self {
            Ruling::ForContributor => DisputeStatus::ResolvedForContributor,
            Ruling::ForOwner => DisputeStatus::ResolvedForOwner,
        }
    }
}

impl std::fmt::Display for Ruling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ruling::ForContributor => write!(f, "contributor"),
            Ruling::ForOwner => write!(f, "owner"),
        }
    }
}
