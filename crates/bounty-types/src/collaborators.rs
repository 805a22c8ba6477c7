//! Seams to the collaborators the core depends on
//!
//! None of these are implemented by the core itself. They are injected at
//! construction; `bounty-host` provides in-memory implementations.

use crate::{AccountId, Amount, BlockHeight, BountyId, MarketParams, MarketResult, Transactional};

/// Source of the monotonically increasing logical clock
pub trait LogicalClock: Send + Sync {
    fn now(&self) -> BlockHeight;
}

/// Read-only view of the global parameters
pub trait ParameterProvider: Send + Sync {
    fn current(&self) -> MarketParams;
}

/// Decides who holds the arbitration role
pub trait AdminAuthority: Send + Sync {
    fn is_admin(&self, who: &AccountId) -> bool;
}

/// External balances of the marketplace's value unit.
///
/// Transfers are staged like every other store so a failed composition
/// can return moved value.
pub trait TokenLedger: Transactional {
    fn balance_of(&self, who: &AccountId) -> Amount;

    /// Move `amount` from `from` to `to`; fails with `TransferFailed`
    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> MarketResult<()>;
}

/// Reputation and achievement notifications.
///
/// Implementations are external and cannot be rolled back, so each
/// composed operation calls the sink at most once and only as its final
/// step.
pub trait ReputationSink: Send + Sync {
    /// A contributor joined a bounty
    fn record_participation(
        &self,
        caller: &AccountId,
        contributor: &AccountId,
        bounty_id: BountyId,
    ) -> MarketResult<()>;

    /// A contributor completed a bounty and earned `earnings`
    fn add_reputation(
        &self,
        caller: &AccountId,
        contributor: &AccountId,
        points: u64,
        earnings: Amount,
    ) -> MarketResult<()>;

    /// A contributor lost a dispute
    fn penalize_contributor(
        &self,
        caller: &AccountId,
        contributor: &AccountId,
        points: u64,
    ) -> MarketResult<()>;
}
