//! Dispute Resolver: arbitration of contested submissions
//!
//! The registry opens a dispute when a contributor contests the outcome of
//! their submission; an admin resolves it. Resolution orchestrates the
//! ledgers: the escrow is released to the contributor or refunded to the
//! owner, the bounty is settled through [`DisputedBounties`], stakes are
//! released (the losing contributor's is slashed) and reputation is
//! updated last.

#![deny(unsafe_code)]

use bounty_escrow::EscrowLedger;
use bounty_staking::StakeLedger;
use bounty_types::{
    atomically, AccountId, AdminAuthority, Amount, BountyId, Checkpoint, Dispute, DisputeId,
    DisputeStatus, EventJournal, EventKind, JournaledMap, LogicalClock, MarketError, MarketEvent,
    MarketResult, ParameterProvider, ReputationSink, Ruling, TokenLedger, Transactional,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Bounty-side settlement of a resolved dispute.
///
/// Implemented by the registry, which owns bounty status.
pub trait DisputedBounties: Transactional {
    fn settle_dispute(
        &mut self,
        caller: &AccountId,
        journal: &mut EventJournal,
        bounty_id: BountyId,
        contributor: &AccountId,
        ruling: Ruling,
    ) -> MarketResult<()>;
}

/// Everything a resolution touches besides the resolver itself
pub struct Settlement<'a> {
    pub escrow: &'a mut EscrowLedger,
    pub stakes: &'a mut StakeLedger,
    pub bounties: &'a mut dyn DisputedBounties,
    pub tokens: &'a mut dyn TokenLedger,
    pub journal: &'a mut EventJournal,
}

/// What a resolution did
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub dispute_id: DisputeId,
    pub ruling: Ruling,
    /// Paid to the contributor, or refunded to the owner
    pub amount: Amount,
    /// Collateral forfeited by the contributor
    pub slashed: Amount,
}

/// Dispute store and arbitration logic
pub struct DisputeResolver {
    /// Identity the resolver presents to the ledgers and the registry
    identity: AccountId,
    /// The only identity allowed to open disputes
    registry: AccountId,
    admin: Arc<dyn AdminAuthority>,
    reputation: Arc<dyn ReputationSink>,
    params: Arc<dyn ParameterProvider>,
    clock: Arc<dyn LogicalClock>,
    disputes: JournaledMap<DisputeId, Dispute>,
    /// Latest dispute per bounty
    by_bounty: JournaledMap<BountyId, DisputeId>,
    next_id: Checkpoint<DisputeId>,
}

impl DisputeResolver {
    pub fn new(
        identity: AccountId,
        registry: AccountId,
        admin: Arc<dyn AdminAuthority>,
        reputation: Arc<dyn ReputationSink>,
        params: Arc<dyn ParameterProvider>,
        clock: Arc<dyn LogicalClock>,
    ) -> Self {
        Self {
            identity,
            registry,
            admin,
            reputation,
            params,
            clock,
            disputes: JournaledMap::new(),
            by_bounty: JournaledMap::new(),
            next_id: Checkpoint::new(DisputeId::new(1)),
        }
    }

    pub fn identity(&self) -> &AccountId {
        &self.identity
    }

    /// Open a Pending dispute for `bounty_id`.
    ///
    /// Only the registry may call this; at most one dispute per bounty may
    /// be Pending.
    pub fn create_dispute(
        &mut self,
        caller: &AccountId,
        journal: &mut EventJournal,
        bounty_id: BountyId,
        contributor: &AccountId,
        owner: &AccountId,
    ) -> MarketResult<DisputeId> {
        self.params.current().ensure_running()?;
        if *caller != self.registry {
            warn!(caller = %caller, bounty_id = %bounty_id, "Dispute by non-registry rejected");
            return Err(MarketError::unauthorized(caller, "create dispute"));
        }
        if let Some(existing) = self.dispute_for_bounty(bounty_id) {
            if existing.is_pending() {
                return Err(MarketError::AlreadyExists(format!(
                    "{} already pending for {}",
                    existing.id, bounty_id
                )));
            }
        }

        let now = self.clock.now();
        let id = *self.next_id.get();
        atomically!([&mut *self, &mut *journal], {
            self.disputes.insert(
                id,
                Dispute {
                    id,
                    bounty_id,
                    contributor: contributor.clone(),
                    owner: owner.clone(),
                    created_at: now,
                    status: DisputeStatus::Pending,
                    resolution_note: None,
                    resolved_at: None,
                },
            );
            self.by_bounty.insert(bounty_id, id);
            self.next_id.set(id.next());
            journal.record(
                MarketEvent::new(EventKind::DisputeOpened, bounty_id, contributor.clone(), now)
                    .with_metadata("dispute_id", id)
                    .with_metadata("owner", owner),
            );
            info!(dispute_id = %id, bounty_id = %bounty_id, contributor = %contributor, "Dispute opened");
            Ok::<_, MarketError>(id)
        })
    }

    /// Resolve a Pending dispute; only an admin may call this.
    pub fn resolve_dispute(
        &mut self,
        caller: &AccountId,
        settlement: Settlement<'_>,
        dispute_id: DisputeId,
        favor_contributor: bool,
        note: Option<String>,
    ) -> MarketResult<Resolution> {
        let params = self.params.current();
        params.ensure_running()?;
        if !self.admin.is_admin(caller) {
            warn!(caller = %caller, dispute_id = %dispute_id, "Resolution by non-admin rejected");
            return Err(MarketError::unauthorized(caller, "resolve dispute"));
        }
        let dispute = self
            .disputes
            .get(&dispute_id)
            .ok_or_else(|| MarketError::NotFound(dispute_id.to_string()))?
            .clone();
        if !dispute.is_pending() {
            return Err(MarketError::InvalidState(format!(
                "{} is {:?}",
                dispute_id, dispute.status
            )));
        }
        if let Some(text) = &note {
            if text.chars().count() > params.max_note_len {
                return Err(MarketError::InvalidParams(format!(
                    "resolution note exceeds {} characters",
                    params.max_note_len
                )));
            }
        }

        let ruling = Ruling::from_favor_contributor(favor_contributor);
        let now = self.clock.now();
        let Settlement {
            escrow,
            stakes,
            bounties,
            tokens,
            journal,
        } = settlement;

        atomically!(
            [&mut *self, &mut *escrow, &mut *stakes, &mut *bounties, &mut *tokens, &mut *journal],
            {
                let resolver = self.identity.clone();
                self.disputes.update(&dispute_id, |d| {
                    d.status = ruling.resolved_status();
                    d.resolution_note = note;
                    d.resolved_at = Some(now);
                });
                journal.record(
                    MarketEvent::new(EventKind::DisputeResolved, dispute.bounty_id, caller.clone(), now)
                        .with_metadata("dispute_id", dispute_id)
                        .with_metadata("ruling", ruling),
                );
                match ruling {
                    Ruling::ForContributor => self.settle_for_contributor(
                        &resolver, escrow, stakes, bounties, tokens, journal, &dispute, params.award_points,
                    ),
                    Ruling::ForOwner => self.settle_for_owner(
                        &resolver, escrow, stakes, bounties, tokens, journal, &dispute, params.penalty_points,
                    ),
                }
                .map(|(amount, slashed)| {
                    info!(dispute_id = %dispute_id, ruling = %ruling, amount = amount.0, "Dispute resolved");
                    Resolution {
                        dispute_id,
                        ruling,
                        amount,
                        slashed,
                    }
                })
            }
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn settle_for_contributor(
        &self,
        resolver: &AccountId,
        escrow: &mut EscrowLedger,
        stakes: &mut StakeLedger,
        bounties: &mut dyn DisputedBounties,
        tokens: &mut dyn TokenLedger,
        journal: &mut EventJournal,
        dispute: &Dispute,
        award_points: u64,
    ) -> MarketResult<(Amount, Amount)> {
        let release =
            escrow.release_funds(resolver, tokens, journal, dispute.bounty_id, &dispute.contributor)?;
        bounties.settle_dispute(
            resolver,
            journal,
            dispute.bounty_id,
            &dispute.contributor,
            Ruling::ForContributor,
        )?;
        stakes.release_stakes(resolver, tokens, journal, dispute.bounty_id)?;
        self.reputation
            .add_reputation(resolver, &dispute.contributor, award_points, release.paid)?;
        Ok((release.paid, Amount::zero()))
    }

    #[allow(clippy::too_many_arguments)]
    fn settle_for_owner(
        &self,
        resolver: &AccountId,
        escrow: &mut EscrowLedger,
        stakes: &mut StakeLedger,
        bounties: &mut dyn DisputedBounties,
        tokens: &mut dyn TokenLedger,
        journal: &mut EventJournal,
        dispute: &Dispute,
        penalty_points: u64,
    ) -> MarketResult<(Amount, Amount)> {
        let refunded = escrow.refund_funds(resolver, tokens, journal, dispute.bounty_id)?;
        bounties.settle_dispute(
            resolver,
            journal,
            dispute.bounty_id,
            &dispute.contributor,
            Ruling::ForOwner,
        )?;
        let staked = stakes
            .get_stake(dispute.bounty_id, &dispute.contributor)
            .is_some_and(|s| s.is_active());
        let slashed = if staked {
            stakes.slash_stake(resolver, journal, dispute.bounty_id, &dispute.contributor)?
        } else {
            Amount::zero()
        };
        stakes.release_stakes(resolver, tokens, journal, dispute.bounty_id)?;
        self.reputation
            .penalize_contributor(resolver, &dispute.contributor, penalty_points)?;
        Ok((refunded, slashed))
    }

    // --- Query methods ---

    pub fn get_dispute(&self, dispute_id: DisputeId) -> Option<&Dispute> {
        self.disputes.get(&dispute_id)
    }

    /// Most recent dispute opened for `bounty_id`
    pub fn dispute_for_bounty(&self, bounty_id: BountyId) -> Option<&Dispute> {
        self.by_bounty
            .get(&bounty_id)
            .and_then(|id| self.disputes.get(id))
    }

    pub fn dispute_count(&self) -> u64 {
        self.next_id.get().0 - 1
    }

    pub fn pending_disputes(&self) -> impl Iterator<Item = &Dispute> {
        self.disputes.values().filter(|d| d.is_pending())
    }
}

impl Transactional for DisputeResolver {
    fn begin(&mut self) {
        self.disputes.begin();
        self.by_bounty.begin();
        self.next_id.begin();
    }

    fn commit(&mut self) {
        self.disputes.commit();
        self.by_bounty.commit();
        self.next_id.commit();
    }

    fn rollback(&mut self) {
        self.disputes.rollback();
        self.by_bounty.rollback();
        self.next_id.rollback();
    }
}
