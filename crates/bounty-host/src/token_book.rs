//! In-memory balances of the marketplace's value unit

use bounty_types::{
    AccountId, Amount, Checkpoint, JournaledMap, MarketError, MarketResult, TokenLedger,
    Transactional,
};
use std::collections::HashSet;
use tracing::debug;

/// Token balances with staged transfers.
///
/// Frozen accounts can neither send nor receive, which is how an external
/// transfer rejection is modelled.
#[derive(Debug, Default)]
pub struct TokenBook {
    balances: JournaledMap<AccountId, Amount>,
    total_supply: Checkpoint<Amount>,
    frozen: HashSet<AccountId>,
}

impl TokenBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue new units to `who`
    pub fn credit(&mut self, who: &AccountId, amount: Amount) -> MarketResult<()> {
        let supply = self
            .total_supply
            .get()
            .checked_add(amount)
            .ok_or_else(|| MarketError::InvalidParams("token supply overflow".into()))?;
        self.balances.upsert(who.clone(), |b| *b = b.saturating_add(amount));
        self.total_supply.set(supply);
        debug!(account = %who, amount = amount.0, "Tokens credited");
        Ok(())
    }

    pub fn total_supply(&self) -> Amount {
        *self.total_supply.get()
    }

    pub fn freeze(&mut self, who: &AccountId) {
        self.frozen.insert(who.clone());
    }

    pub fn unfreeze(&mut self, who: &AccountId) {
        self.frozen.remove(who);
    }

    pub fn is_frozen(&self, who: &AccountId) -> bool {
        self.frozen.contains(who)
    }

    /// Sum of every balance; equals `total_supply` at all times
    pub fn circulating(&self) -> Amount {
        self.balances.values().copied().sum()
    }
}

impl TokenLedger for TokenBook {
    fn balance_of(&self, who: &AccountId) -> Amount {
        self.balances.get(who).copied().unwrap_or_default()
    }

    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> MarketResult<()> {
        if amount.is_zero() {
            return Err(MarketError::TransferFailed("zero amount".into()));
        }
        if from == to {
            return Err(MarketError::TransferFailed(format!("{} cannot pay itself", from)));
        }
        if let Some(account) = [from, to].into_iter().find(|a| self.frozen.contains(*a)) {
            return Err(MarketError::TransferFailed(format!("account {} is frozen", account)));
        }
        let available = self.balance_of(from);
        let remaining = available.checked_sub(amount).ok_or_else(|| {
            MarketError::TransferFailed(format!(
                "{} holds {} but {} is required",
                from, available, amount
            ))
        })?;

        self.balances.insert(from.clone(), remaining);
        self.balances.upsert(to.clone(), |b| *b = b.saturating_add(amount));

        debug!(from = %from, to = %to, amount = amount.0, "Tokens transferred");
        Ok(())
    }
}

impl Transactional for TokenBook {
    fn begin(&mut self) {
        self.balances.begin();
        self.total_supply.begin();
    }

    fn commit(&mut self) {
        self.balances.commit();
        self.total_supply.commit();
    }

    fn rollback(&mut self) {
        self.balances.rollback();
        self.total_supply.rollback();
    }
}
