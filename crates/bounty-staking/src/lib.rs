//! Collateral Ledger: contributor stakes per (bounty, contributor)
//!
//! A contributor locks the configured stake before their submission is
//! recorded. When the bounty resolves, every Active stake of that bounty
//! is returned; a contributor who loses a dispute is slashed instead and
//! the collateral stays in custody.

#![deny(unsafe_code)]

use bounty_types::{
    atomically, AccountId, Amount, BountyId, Checkpoint, EventJournal, EventKind, JournaledMap,
    LogicalClock, MarketError, MarketEvent, MarketResult, ParameterProvider, StakeKey,
    StakeRecord, StakeStatus, TokenLedger, Transactional,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Identities allowed to drive the collateral ledger
#[derive(Clone, Debug)]
pub struct StakeAccess {
    pub registry: AccountId,
    pub resolver: AccountId,
}

/// A stake returned by a bulk release
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleasedStake {
    pub contributor: AccountId,
    pub amount: Amount,
}

/// Collateral ledger
pub struct StakeLedger {
    /// Account holding locked and slashed collateral
    custody: AccountId,
    access: StakeAccess,
    params: Arc<dyn ParameterProvider>,
    clock: Arc<dyn LogicalClock>,
    stakes: JournaledMap<StakeKey, StakeRecord>,
    /// Stakers per bounty in staking order
    stakers: JournaledMap<BountyId, Vec<AccountId>>,
    /// Active collateral per contributor across all bounties
    contributor_totals: JournaledMap<AccountId, Amount>,
    total_staked: Checkpoint<Amount>,
    total_slashed: Checkpoint<Amount>,
}

impl StakeLedger {
    pub fn new(
        custody: AccountId,
        access: StakeAccess,
        params: Arc<dyn ParameterProvider>,
        clock: Arc<dyn LogicalClock>,
    ) -> Self {
        Self {
            custody,
            access,
            params,
            clock,
            stakes: JournaledMap::new(),
            stakers: JournaledMap::new(),
            contributor_totals: JournaledMap::new(),
            total_staked: Checkpoint::new(Amount::zero()),
            total_slashed: Checkpoint::new(Amount::zero()),
        }
    }

    /// Lock the configured stake from `contributor` for `bounty_id`.
    ///
    /// Only the registry may call this.
    pub fn stake_for_bounty(
        &mut self,
        caller: &AccountId,
        tokens: &mut dyn TokenLedger,
        journal: &mut EventJournal,
        bounty_id: BountyId,
        contributor: &AccountId,
    ) -> MarketResult<Amount> {
        let params = self.params.current();
        params.ensure_running()?;
        if *caller != self.access.registry {
            warn!(caller = %caller, bounty_id = %bounty_id, "Stake by non-registry rejected");
            return Err(MarketError::unauthorized(caller, "stake for bounty"));
        }
        let key = StakeKey::new(bounty_id, contributor.clone());
        if self.stakes.contains_key(&key) {
            return Err(MarketError::AlreadyExists(format!("stake {}", key)));
        }
        let amount = params.min_stake_amount;
        let total = self
            .total_staked
            .get()
            .checked_add(amount)
            .ok_or_else(|| MarketError::InvalidParams("stake total overflow".into()))?;

        let now = self.clock.now();
        atomically!([&mut *self, &mut *tokens, &mut *journal], {
            self.stakes.insert(
                key.clone(),
                StakeRecord {
                    bounty_id,
                    contributor: contributor.clone(),
                    amount,
                    staked_at: now,
                    status: StakeStatus::Active,
                },
            );
            self.stakers
                .upsert(bounty_id, |list| list.push(contributor.clone()));
            self.contributor_totals
                .upsert(contributor.clone(), |t| *t = t.saturating_add(amount));
            self.total_staked.set(total);
            tokens.transfer(contributor, &self.custody, amount).map(|()| {
                journal.record(
                    MarketEvent::new(EventKind::StakeLocked, bounty_id, contributor.clone(), now)
                        .with_metadata("amount", amount),
                );
                info!(stake = %key, amount = amount.0, "Stake locked");
                amount
            })
        })
    }

    /// Return every Active stake of `bounty_id` to its contributor.
    ///
    /// Each record is addressed by both the bounty and the contributor;
    /// stakes of other bounties are never touched. The registry or the
    /// resolver may call this.
    pub fn release_stakes(
        &mut self,
        caller: &AccountId,
        tokens: &mut dyn TokenLedger,
        journal: &mut EventJournal,
        bounty_id: BountyId,
    ) -> MarketResult<Vec<ReleasedStake>> {
        self.params.current().ensure_running()?;
        if *caller != self.access.registry && *caller != self.access.resolver {
            warn!(caller = %caller, bounty_id = %bounty_id, "Stake release rejected");
            return Err(MarketError::unauthorized(caller, "release stakes"));
        }
        let stakers = self.stakers(bounty_id).to_vec();

        let now = self.clock.now();
        atomically!([&mut *self, &mut *tokens, &mut *journal], {
            stakers
                .into_iter()
                .map(|contributor| StakeKey::new(bounty_id, contributor))
                .try_fold(Vec::new(), |mut released, key| {
                    if let Some(amount) = self.settle(&key, StakeStatus::Released) {
                        tokens.transfer(&self.custody, &key.contributor, amount)?;
                        journal.record(
                            MarketEvent::new(EventKind::StakeReleased, bounty_id, caller.clone(), now)
                                .with_metadata("contributor", &key.contributor)
                                .with_metadata("amount", amount),
                        );
                        released.push(ReleasedStake {
                            contributor: key.contributor,
                            amount,
                        });
                    }
                    Ok::<_, MarketError>(released)
                })
                .map(|released| {
                    info!(bounty_id = %bounty_id, released = released.len(), "Stakes released");
                    released
                })
        })
    }

    /// Forfeit an Active stake; the collateral stays in custody.
    ///
    /// Only the resolver may call this.
    pub fn slash_stake(
        &mut self,
        caller: &AccountId,
        journal: &mut EventJournal,
        bounty_id: BountyId,
        contributor: &AccountId,
    ) -> MarketResult<Amount> {
        self.params.current().ensure_running()?;
        if *caller != self.access.resolver {
            warn!(caller = %caller, bounty_id = %bounty_id, "Slash by non-resolver rejected");
            return Err(MarketError::unauthorized(caller, "slash stake"));
        }
        let key = StakeKey::new(bounty_id, contributor.clone());
        let record = self
            .stakes
            .get(&key)
            .ok_or_else(|| MarketError::NotFound(format!("stake {}", key)))?;
        if !record.is_active() {
            return Err(MarketError::InvalidState(format!(
                "stake {} is {:?}",
                key, record.status
            )));
        }

        let now = self.clock.now();
        atomically!([&mut *self, &mut *journal], {
            let amount = self.settle(&key, StakeStatus::Slashed).unwrap_or_default();
            self.total_slashed.update(|t| *t = t.saturating_add(amount));
            journal.record(
                MarketEvent::new(EventKind::StakeSlashed, bounty_id, caller.clone(), now)
                    .with_metadata("contributor", contributor)
                    .with_metadata("amount", amount),
            );
            warn!(stake = %key, amount = amount.0, "Stake slashed");
            Ok::<_, MarketError>(amount)
        })
    }

    /// Close an Active stake and drop it from the running totals.
    ///
    /// Returns the stake amount, or `None` if the stake is absent or
    /// already closed.
    fn settle(&mut self, key: &StakeKey, status: StakeStatus) -> Option<Amount> {
        let amount = self.stakes.update(key, |r| {
            if r.is_active() {
                r.status = status;
                Some(r.amount)
            } else {
                None
            }
        })??;
        self.contributor_totals
            .update(&key.contributor, |t| *t = t.saturating_sub(amount));
        self.total_staked.update(|t| *t = t.saturating_sub(amount));
        Some(amount)
    }

    // --- Query methods ---

    pub fn get_stake(&self, bounty_id: BountyId, contributor: &AccountId) -> Option<&StakeRecord> {
        self.stakes.get(&StakeKey::new(bounty_id, contributor.clone()))
    }

    /// Stake amount; zero when no record exists
    pub fn stake_amount(&self, bounty_id: BountyId, contributor: &AccountId) -> Amount {
        self.get_stake(bounty_id, contributor)
            .map(|r| r.amount)
            .unwrap_or_default()
    }

    pub fn stakers(&self, bounty_id: BountyId) -> &[AccountId] {
        self.stakers
            .get(&bounty_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Active collateral a contributor has locked across all bounties
    pub fn contributor_total(&self, contributor: &AccountId) -> Amount {
        self.contributor_totals
            .get(contributor)
            .copied()
            .unwrap_or_default()
    }

    pub fn total_staked(&self) -> Amount {
        *self.total_staked.get()
    }

    pub fn total_slashed(&self) -> Amount {
        *self.total_slashed.get()
    }

    pub fn custody_account(&self) -> &AccountId {
        &self.custody
    }

    /// Every stake record, in no particular order
    pub fn records(&self) -> impl Iterator<Item = &StakeRecord> {
        self.stakes.values()
    }
}

impl Transactional for StakeLedger {
    fn begin(&mut self) {
        self.stakes.begin();
        self.stakers.begin();
        self.contributor_totals.begin();
        self.total_staked.begin();
        self.total_slashed.begin();
    }

    fn commit(&mut self) {
        self.stakes.commit();
        self.stakers.commit();
        self.contributor_totals.commit();
        self.total_staked.commit();
        self.total_slashed.commit();
    }

    fn rollback(&mut self) {
        self.stakes.rollback();
        self.stakers.rollback();
        self.contributor_totals.rollback();
        self.total_staked.rollback();
        self.total_slashed.rollback();
    }
}

#[cfg(test)]
mod tests;
