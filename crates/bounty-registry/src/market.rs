//! Market facade
//!
//! Owns every component plus the token ledger and event journal, and
//! exposes the cross-component operation table with explicit callers.

use crate::registry::{BountyRegistry, Ledgers};
use bounty_dispute::{DisputeResolver, Resolution, Settlement};
use bounty_escrow::{EscrowAccess, EscrowLedger};
use bounty_staking::{ReleasedStake, StakeAccess, StakeLedger};
use bounty_types::{
    AccountId, AdminAuthority, Amount, BountyId, DisputeId, EscrowRelease, EventJournal,
    LogicalClock, MarketResult, NewBounty, ParameterProvider, ReputationSink, SubmissionId,
    TokenLedger,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Identities the components present to each other and to the token ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketAccounts {
    pub registry: AccountId,
    pub resolver: AccountId,
    /// Holds escrowed rewards
    pub escrow_custody: AccountId,
    /// Holds staked and slashed collateral
    pub stake_custody: AccountId,
    /// Receives marketplace fees
    pub fee_receiver: AccountId,
}

impl Default for MarketAccounts {
    fn default() -> Self {
        Self {
            registry: AccountId::new("market.registry"),
            resolver: AccountId::new("market.resolver"),
            escrow_custody: AccountId::new("market.escrow"),
            stake_custody: AccountId::new("market.staking"),
            fee_receiver: AccountId::new("market.treasury"),
        }
    }
}

/// The marketplace core, wired together
pub struct Market<T: TokenLedger> {
    accounts: MarketAccounts,
    tokens: T,
    journal: EventJournal,
    escrow: EscrowLedger,
    stakes: StakeLedger,
    resolver: DisputeResolver,
    registry: BountyRegistry,
}

impl<T: TokenLedger> Market<T> {
    pub fn new(
        accounts: MarketAccounts,
        tokens: T,
        params: Arc<dyn ParameterProvider>,
        admin: Arc<dyn AdminAuthority>,
        reputation: Arc<dyn ReputationSink>,
        clock: Arc<dyn LogicalClock>,
    ) -> Self {
        let escrow = EscrowLedger::new(
            accounts.escrow_custody.clone(),
            EscrowAccess {
                registry: accounts.registry.clone(),
                resolver: accounts.resolver.clone(),
            },
            accounts.fee_receiver.clone(),
            params.clone(),
            clock.clone(),
        );
        let stakes = StakeLedger::new(
            accounts.stake_custody.clone(),
            StakeAccess {
                registry: accounts.registry.clone(),
                resolver: accounts.resolver.clone(),
            },
            params.clone(),
            clock.clone(),
        );
        let resolver = DisputeResolver::new(
            accounts.resolver.clone(),
            accounts.registry.clone(),
            admin,
            reputation.clone(),
            params.clone(),
            clock.clone(),
        );
        let registry = BountyRegistry::new(
            accounts.registry.clone(),
            accounts.resolver.clone(),
            reputation,
            params,
            clock,
        );
        info!(registry = %accounts.registry, resolver = %accounts.resolver, "Market assembled");
        Self {
            accounts,
            tokens,
            journal: EventJournal::new(),
            escrow,
            stakes,
            resolver,
            registry,
        }
    }

    fn split(&mut self) -> (&mut BountyRegistry, Ledgers<'_>) {
        (
            &mut self.registry,
            Ledgers {
                escrow: &mut self.escrow,
                stakes: &mut self.stakes,
                tokens: &mut self.tokens,
                journal: &mut self.journal,
            },
        )
    }

    // --- Bounty lifecycle ---

    pub fn create_bounty(&mut self, caller: &AccountId, new: NewBounty) -> MarketResult<BountyId> {
        let (registry, ledgers) = self.split();
        registry.create_bounty(caller, ledgers, new)
    }

    pub fn submit_work(
        &mut self,
        caller: &AccountId,
        bounty_id: BountyId,
        content_ref: impl Into<String>,
    ) -> MarketResult<SubmissionId> {
        let (registry, ledgers) = self.split();
        registry.submit_work(caller, ledgers, bounty_id, content_ref)
    }

    pub fn accept_submission(
        &mut self,
        caller: &AccountId,
        submission_id: SubmissionId,
    ) -> MarketResult<EscrowRelease> {
        let (registry, ledgers) = self.split();
        registry.accept_submission(caller, ledgers, submission_id)
    }

    pub fn reject_submission(
        &mut self,
        caller: &AccountId,
        submission_id: SubmissionId,
    ) -> MarketResult<()> {
        self.registry
            .reject_submission(caller, &mut self.journal, submission_id)
    }

    pub fn cancel_bounty(&mut self, caller: &AccountId, bounty_id: BountyId) -> MarketResult<Amount> {
        let (registry, ledgers) = self.split();
        registry.cancel_bounty(caller, ledgers, bounty_id)
    }

    pub fn reclaim_expired(&mut self, caller: &AccountId, bounty_id: BountyId) -> MarketResult<Amount> {
        let (registry, ledgers) = self.split();
        registry.reclaim_expired(caller, ledgers, bounty_id)
    }

    // --- Disputes ---

    pub fn open_dispute(
        &mut self,
        caller: &AccountId,
        submission_id: SubmissionId,
    ) -> MarketResult<DisputeId> {
        self.registry.open_dispute(
            caller,
            &mut self.resolver,
            &mut self.journal,
            submission_id,
        )
    }

    /// Raw resolver entry. Unlike [`Market::open_dispute`] the bounty is left
    /// in its current state; settling still closes it from Active.
    pub fn create_dispute(
        &mut self,
        caller: &AccountId,
        bounty_id: BountyId,
        contributor: &AccountId,
        owner: &AccountId,
    ) -> MarketResult<DisputeId> {
        self.resolver
            .create_dispute(caller, &mut self.journal, bounty_id, contributor, owner)
    }

    pub fn resolve_dispute(
        &mut self,
        caller: &AccountId,
        dispute_id: DisputeId,
        favor_contributor: bool,
        note: Option<String>,
    ) -> MarketResult<Resolution> {
        self.resolver.resolve_dispute(
            caller,
            Settlement {
                escrow: &mut self.escrow,
                stakes: &mut self.stakes,
                bounties: &mut self.registry,
                tokens: &mut self.tokens,
                journal: &mut self.journal,
            },
            dispute_id,
            favor_contributor,
            note,
        )
    }

    // --- Ledger operations ---

    pub fn escrow_funds(
        &mut self,
        caller: &AccountId,
        bounty_id: BountyId,
        owner: &AccountId,
        amount: Amount,
    ) -> MarketResult<()> {
        self.escrow.escrow_funds(
            caller,
            &mut self.tokens,
            &mut self.journal,
            bounty_id,
            owner,
            amount,
        )
    }

    pub fn release_funds(
        &mut self,
        caller: &AccountId,
        bounty_id: BountyId,
        recipient: &AccountId,
    ) -> MarketResult<EscrowRelease> {
        self.escrow.release_funds(
            caller,
            &mut self.tokens,
            &mut self.journal,
            bounty_id,
            recipient,
        )
    }

    pub fn refund_funds(&mut self, caller: &AccountId, bounty_id: BountyId) -> MarketResult<Amount> {
        self.escrow
            .refund_funds(caller, &mut self.tokens, &mut self.journal, bounty_id)
    }

    pub fn stake_for_bounty(
        &mut self,
        caller: &AccountId,
        bounty_id: BountyId,
        contributor: &AccountId,
    ) -> MarketResult<Amount> {
        self.stakes.stake_for_bounty(
            caller,
            &mut self.tokens,
            &mut self.journal,
            bounty_id,
            contributor,
        )
    }

    pub fn release_stakes(
        &mut self,
        caller: &AccountId,
        bounty_id: BountyId,
    ) -> MarketResult<Vec<ReleasedStake>> {
        self.stakes
            .release_stakes(caller, &mut self.tokens, &mut self.journal, bounty_id)
    }

    pub fn slash_stake(
        &mut self,
        caller: &AccountId,
        bounty_id: BountyId,
        contributor: &AccountId,
    ) -> MarketResult<Amount> {
        self.stakes
            .slash_stake(caller, &mut self.journal, bounty_id, contributor)
    }

    // --- Accessors ---

    pub fn accounts(&self) -> &MarketAccounts {
        &self.accounts
    }

    pub fn registry(&self) -> &BountyRegistry {
        &self.registry
    }

    pub fn escrow(&self) -> &EscrowLedger {
        &self.escrow
    }

    pub fn stakes(&self) -> &StakeLedger {
        &self.stakes
    }

    pub fn resolver(&self) -> &DisputeResolver {
        &self.resolver
    }

    pub fn journal(&self) -> &EventJournal {
        &self.journal
    }

    pub fn tokens(&self) -> &T {
        &self.tokens
    }

    /// Direct access for hosts that fund accounts or model external
    /// transfer rejections
    pub fn tokens_mut(&mut self) -> &mut T {
        &mut self.tokens
    }
}
