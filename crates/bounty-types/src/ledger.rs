//! Escrow and stake records held by the value and collateral ledgers

use crate::{AccountId, Amount, BlockHeight, BountyId};
use serde::{Deserialize, Serialize};

/// Custody of one bounty's reward
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRecord {
    pub bounty_id: BountyId,
    /// Immutable once set
    pub amount: Amount,
    pub owner: AccountId,
    pub status: EscrowStatus,
    pub escrowed_at: BlockHeight,
}

impl EscrowRecord {
    pub fn is_active(&self) -> bool {
        matches!(self.status, EscrowStatus::Active)
    }
}

/// Escrow status; only `Active -> Released | Refunded`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EscrowStatus {
    #[default]
    Active,
    Released,
    Refunded,
}

/// Outcome of releasing an escrow
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRelease {
    pub recipient: AccountId,
    /// Amount paid to the recipient
    pub paid: Amount,
    /// Amount paid to the fee receiver
    pub fee: Amount,
}

/// Key of a stake: one per (bounty, contributor)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StakeKey {
    pub bounty_id: BountyId,
    pub contributor: AccountId,
}

impl StakeKey {
    pub fn new(bounty_id: BountyId, contributor: AccountId) -> Self {
        Self {
            bounty_id,
            contributor,
        }
    }
}

impl std::fmt::Display for StakeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bounty_id, self.contributor)
    }
}

/// Collateral locked by a contributor to participate in a bounty
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    pub bounty_id: BountyId,
    pub contributor: AccountId,
    pub amount: Amount,
    pub staked_at: BlockHeight,
    pub status: StakeStatus,
}

impl StakeRecord {
    pub fn key(&self) -> StakeKey {
        StakeKey::new(self.bounty_id, self.contributor.clone())
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, StakeStatus::Active)
    }
}

/// Stake status; only `Active -> Released | Slashed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StakeStatus {
    #[default]
    Active,
    Released,
    Slashed,
}
