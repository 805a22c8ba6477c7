use bounty_types::{AccountId, Amount, BountyId, MarketError, MarketResult, ReputationSink};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tracing::{info, warn};

/// Reputation standing of one contributor
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationRecord {
    pub score: u64,
    pub completions: u32,
    pub participations: u32,
    pub penalties: u32,
    pub earnings: Amount,
    /// Bounties the contributor joined, in order
    pub bounties: Vec<BountyId>,
}

/// In-memory reputation bookkeeping that only trusted callers may update
pub struct ReputationBook {
    records: Mutex<HashMap<AccountId, ReputationRecord>>,
    authorized: HashSet<AccountId>,
}

impl ReputationBook {
    pub fn new(authorized: impl IntoIterator<Item = AccountId>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            authorized: authorized.into_iter().collect(),
        }
    }

    /// Current record for `who`; absent contributors read as zero
    pub fn record(&self, who: &AccountId) -> ReputationRecord {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(who)
            .cloned()
            .unwrap_or_default()
    }

    pub fn score(&self, who: &AccountId) -> u64 {
        self.record(who).score
    }

    fn authorize(&self, caller: &AccountId, action: &'static str) -> MarketResult<()> {
        if !self.authorized.contains(caller) {
            warn!(caller = %caller, action, "Reputation update rejected");
            return Err(MarketError::unauthorized(caller, action));
        }
        Ok(())
    }

    fn with_record<R>(&self, who: &AccountId, f: impl FnOnce(&mut ReputationRecord) -> R) -> R {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        f(records.entry(who.clone()).or_default())
    }
}

impl ReputationSink for ReputationBook {
    fn record_participation(
        &self,
        caller: &AccountId,
        contributor: &AccountId,
        bounty_id: BountyId,
    ) -> MarketResult<()> {
        self.authorize(caller, "record participation")?;
        self.with_record(contributor, |r| {
            r.participations += 1;
            r.bounties.push(bounty_id);
        });
        Ok(())
    }

    fn add_reputation(
        &self,
        caller: &AccountId,
        contributor: &AccountId,
        points: u64,
        earnings: Amount,
    ) -> MarketResult<()> {
        self.authorize(caller, "add reputation")?;
        let score = self.with_record(contributor, |r| {
            r.score = r.score.saturating_add(points);
            r.completions += 1;
            r.earnings = r.earnings.saturating_add(earnings);
            r.score
        });
        info!(contributor = %contributor, points, score, "Reputation awarded");
        Ok(())
    }

    fn penalize_contributor(
        &self,
        caller: &AccountId,
        contributor: &AccountId,
        points: u64,
    ) -> MarketResult<()> {
        self.authorize(caller, "penalize contributor")?;
        let score = self.with_record(contributor, |r| {
            r.score = r.score.saturating_sub(points);
            r.penalties += 1;
            r.score
        });
        info!(contributor = %contributor, points, score, "Reputation penalized");
        Ok(())
    }
}
