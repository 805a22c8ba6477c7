//! Value Ledger: escrow custody for bounty rewards
//!
//! Holds one [`EscrowRecord`] per bounty. Funds move from the owner into
//! the ledger's custody account on escrow and leave it exactly once,
//! either released to a recipient (minus the marketplace fee) or refunded
//! in full to the owner. Every operation is all-or-nothing: the record,
//! the running total, the token transfers and the journal entry commit
//! together or not at all.

#![deny(unsafe_code)]

use bounty_types::{
    atomically, AccountId, Amount, BountyId, Checkpoint, EscrowRecord, EscrowRelease,
    EscrowStatus, EventJournal, EventKind, JournaledMap, LogicalClock, MarketError, MarketEvent,
    MarketResult, ParameterProvider, TokenLedger, Transactional,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Identities allowed to move escrowed funds
#[derive(Clone, Debug)]
pub struct EscrowAccess {
    pub registry: AccountId,
    pub resolver: AccountId,
}

impl EscrowAccess {
    fn may_settle(&self, caller: &AccountId) -> bool {
        *caller == self.registry || *caller == self.resolver
    }
}

/// Escrow ledger keyed by bounty
pub struct EscrowLedger {
    /// Account holding escrowed funds
    custody: AccountId,
    access: EscrowAccess,
    fee_receiver: AccountId,
    params: Arc<dyn ParameterProvider>,
    clock: Arc<dyn LogicalClock>,
    records: JournaledMap<BountyId, EscrowRecord>,
    /// Sum of all Active record amounts
    total_escrowed: Checkpoint<Amount>,
}

impl EscrowLedger {
    pub fn new(
        custody: AccountId,
        access: EscrowAccess,
        fee_receiver: AccountId,
        params: Arc<dyn ParameterProvider>,
        clock: Arc<dyn LogicalClock>,
    ) -> Self {
        Self {
            custody,
            access,
            fee_receiver,
            params,
            clock,
            records: JournaledMap::new(),
            total_escrowed: Checkpoint::new(Amount::zero()),
        }
    }

    /// Move `amount` from `owner` into custody for `bounty_id`.
    ///
    /// The caller must be the owner or the registry.
    pub fn escrow_funds(
        &mut self,
        caller: &AccountId,
        tokens: &mut dyn TokenLedger,
        journal: &mut EventJournal,
        bounty_id: BountyId,
        owner: &AccountId,
        amount: Amount,
    ) -> MarketResult<()> {
        self.params.current().ensure_running()?;
        if caller != owner && *caller != self.access.registry {
            warn!(caller = %caller, bounty_id = %bounty_id, "Escrow by third party rejected");
            return Err(MarketError::unauthorized(caller, "escrow funds"));
        }
        if amount.is_zero() {
            return Err(MarketError::InvalidParams("escrow amount must be positive".into()));
        }
        if self.records.contains_key(&bounty_id) {
            return Err(MarketError::AlreadyExists(format!("escrow for {}", bounty_id)));
        }
        let total = self
            .total_escrowed
            .get()
            .checked_add(amount)
            .ok_or_else(|| MarketError::InvalidParams("escrow total overflow".into()))?;

        let now = self.clock.now();
        atomically!([&mut *self, &mut *tokens, &mut *journal], {
            self.records.insert(
                bounty_id,
                EscrowRecord {
                    bounty_id,
                    amount,
                    owner: owner.clone(),
                    status: EscrowStatus::Active,
                    escrowed_at: now,
                },
            );
            self.total_escrowed.set(total);
            tokens.transfer(owner, &self.custody, amount).map(|()| {
                journal.record(
                    MarketEvent::new(EventKind::FundsEscrowed, bounty_id, owner.clone(), now)
                        .with_metadata("amount", amount),
                );
                info!(bounty_id = %bounty_id, owner = %owner, amount = amount.0, "Funds escrowed");
            })
        })
    }

    /// Pay the escrow to `recipient`, less the marketplace fee.
    ///
    /// The caller must be the registry or the resolver.
    pub fn release_funds(
        &mut self,
        caller: &AccountId,
        tokens: &mut dyn TokenLedger,
        journal: &mut EventJournal,
        bounty_id: BountyId,
        recipient: &AccountId,
    ) -> MarketResult<EscrowRelease> {
        let params = self.params.current();
        params.ensure_running()?;
        let record = self.settleable(caller, bounty_id, "release escrow")?;
        let amount = record.amount;
        let fee = amount.fee_at(params.fee_rate_bps);
        let paid = amount.saturating_sub(fee);

        let now = self.clock.now();
        atomically!([&mut *self, &mut *tokens, &mut *journal], {
            self.close(bounty_id, EscrowStatus::Released);
            let mut moved = Ok(());
            if !paid.is_zero() {
                moved = tokens.transfer(&self.custody, recipient, paid);
            }
            if moved.is_ok() && !fee.is_zero() {
                moved = tokens.transfer(&self.custody, &self.fee_receiver, fee);
            }
            moved.map(|()| {
                journal.record(
                    MarketEvent::new(EventKind::FundsReleased, bounty_id, caller.clone(), now)
                        .with_metadata("recipient", recipient)
                        .with_metadata("paid", paid)
                        .with_metadata("fee", fee),
                );
                info!(
                    bounty_id = %bounty_id,
                    recipient = %recipient,
                    paid = paid.0,
                    fee = fee.0,
                    "Escrow released"
                );
                EscrowRelease {
                    recipient: recipient.clone(),
                    paid,
                    fee,
                }
            })
        })
    }

    /// Return the whole escrow to the bounty owner.
    ///
    /// The caller must be the registry or the resolver.
    pub fn refund_funds(
        &mut self,
        caller: &AccountId,
        tokens: &mut dyn TokenLedger,
        journal: &mut EventJournal,
        bounty_id: BountyId,
    ) -> MarketResult<Amount> {
        self.params.current().ensure_running()?;
        let record = self.settleable(caller, bounty_id, "refund escrow")?;
        let (amount, owner) = (record.amount, record.owner.clone());

        let now = self.clock.now();
        atomically!([&mut *self, &mut *tokens, &mut *journal], {
            self.close(bounty_id, EscrowStatus::Refunded);
            tokens.transfer(&self.custody, &owner, amount).map(|()| {
                journal.record(
                    MarketEvent::new(EventKind::FundsRefunded, bounty_id, caller.clone(), now)
                        .with_metadata("owner", &owner)
                        .with_metadata("amount", amount),
                );
                info!(bounty_id = %bounty_id, owner = %owner, amount = amount.0, "Escrow refunded");
                amount
            })
        })
    }

    /// Authorization and status guard shared by release and refund
    fn settleable(
        &self,
        caller: &AccountId,
        bounty_id: BountyId,
        action: &'static str,
    ) -> MarketResult<&EscrowRecord> {
        if !self.access.may_settle(caller) {
            warn!(caller = %caller, bounty_id = %bounty_id, action, "Escrow settlement rejected");
            return Err(MarketError::unauthorized(caller, action));
        }
        let record = self
            .records
            .get(&bounty_id)
            .ok_or_else(|| MarketError::NotFound(format!("escrow for {}", bounty_id)))?;
        if !record.is_active() {
            return Err(MarketError::InvalidState(format!(
                "escrow for {} is {:?}",
                bounty_id, record.status
            )));
        }
        Ok(record)
    }

    fn close(&mut self, bounty_id: BountyId, status: EscrowStatus) {
        if let Some(amount) = self.records.update(&bounty_id, |r| {
            r.status = status;
            r.amount
        }) {
            self.total_escrowed.update(|t| *t = t.saturating_sub(amount));
        }
    }

    // --- Query methods ---

    pub fn get_escrow(&self, bounty_id: BountyId) -> Option<&EscrowRecord> {
        self.records.get(&bounty_id)
    }

    /// Escrowed amount; zero when no record exists
    pub fn escrow_amount(&self, bounty_id: BountyId) -> Amount {
        self.records
            .get(&bounty_id)
            .map(|r| r.amount)
            .unwrap_or_default()
    }

    /// Escrow status; `None` when no record exists
    pub fn escrow_status(&self, bounty_id: BountyId) -> Option<EscrowStatus> {
        self.records.get(&bounty_id).map(|r| r.status)
    }

    pub fn escrow_owner(&self, bounty_id: BountyId) -> Option<&AccountId> {
        self.records.get(&bounty_id).map(|r| &r.owner)
    }

    pub fn total_escrowed(&self) -> Amount {
        *self.total_escrowed.get()
    }

    /// Fee the ledger would take releasing `amount` under current parameters
    pub fn quote_fee(&self, amount: Amount) -> Amount {
        let fee = amount.fee_at(self.params.current().fee_rate_bps);
        debug!(amount = amount.0, fee = fee.0, "Fee quoted");
        fee
    }

    /// Recompute the Active total from the records
    pub fn active_sum(&self) -> Amount {
        self.records
            .values()
            .filter(|r| r.is_active())
            .map(|r| r.amount)
            .sum()
    }

    pub fn custody_account(&self) -> &AccountId {
        &self.custody
    }

    pub fn fee_receiver(&self) -> &AccountId {
        &self.fee_receiver
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

impl Transactional for EscrowLedger {
    fn begin(&mut self) {
        self.records.begin();
        self.total_escrowed.begin();
    }

    fn commit(&mut self) {
        self.records.commit();
        self.total_escrowed.commit();
    }

    fn rollback(&mut self) {
        self.records.rollback();
        self.total_escrowed.rollback();
    }
}
