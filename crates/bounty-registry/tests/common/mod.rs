#![allow(dead_code)]

use bounty_host::{
    init_tracing, AdminRoster, ManualClock, MarketConfig, ParameterStore, ReputationBook,
    ReputationRecord, TokenBook,
};
use bounty_registry::{Market, MarketAccounts};
use bounty_types::{
    AccountId, Amount, BlockHeight, BountyId, LogicalClock, MarketError, MarketResult, NewBounty,
    ReputationSink, SubmissionId, TokenLedger,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Logical height the harness starts at
pub const T: u64 = 1_000;
pub const OWNER_FUNDS: u64 = 10_000_000;
pub const CONTRIBUTOR_FUNDS: u64 = 1_000_000;
pub const STAKE: u64 = 10_000;

const CONFIG: &str = r#"
[params]
fee_rate_bps = 250
dispute_window = 144
min_stake_amount = 10000
min_bounty_amount = 100000

[logging]
level = "warn"
"#;

/// Reputation book that can be told to refuse awards and penalties
pub struct GatedReputation {
    pub book: ReputationBook,
    pub refuse: AtomicBool,
    pub awards: AtomicUsize,
}

impl GatedReputation {
    fn gate(&self) -> MarketResult<()> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(MarketError::InvalidState("reputation service unavailable".into()));
        }
        Ok(())
    }
}

impl ReputationSink for GatedReputation {
    fn record_participation(
        &self,
        caller: &AccountId,
        contributor: &AccountId,
        bounty_id: BountyId,
    ) -> MarketResult<()> {
        self.book.record_participation(caller, contributor, bounty_id)
    }

    fn add_reputation(
        &self,
        caller: &AccountId,
        contributor: &AccountId,
        points: u64,
        earnings: Amount,
    ) -> MarketResult<()> {
        self.gate()?;
        self.awards.fetch_add(1, Ordering::SeqCst);
        self.book.add_reputation(caller, contributor, points, earnings)
    }

    fn penalize_contributor(
        &self,
        caller: &AccountId,
        contributor: &AccountId,
        points: u64,
    ) -> MarketResult<()> {
        self.gate()?;
        self.book.penalize_contributor(caller, contributor, points)
    }
}

pub struct Harness {
    pub market: Market<TokenBook>,
    pub clock: Arc<ManualClock>,
    pub params: Arc<ParameterStore>,
    pub reputation: Arc<GatedReputation>,
    pub accounts: MarketAccounts,
    pub admin: AccountId,
    pub owner: AccountId,
}

pub fn account(name: &str) -> AccountId {
    AccountId::new(name)
}

pub fn harness() -> Harness {
    let config = MarketConfig::from_toml_str(CONFIG).unwrap();
    let _ = init_tracing(&config.logging);

    let admin = account("admin");
    let owner = account("owner");
    let accounts = MarketAccounts::default();

    let roster = Arc::new(AdminRoster::new([admin.clone()]));
    let params = Arc::new(ParameterStore::new(config.params, roster.clone()).unwrap());
    let clock = Arc::new(ManualClock::new(BlockHeight::new(T)));
    let reputation = Arc::new(GatedReputation {
        book: ReputationBook::new([accounts.registry.clone(), accounts.resolver.clone()]),
        refuse: AtomicBool::new(false),
        awards: AtomicUsize::new(0),
    });

    let mut tokens = TokenBook::new();
    tokens.credit(&owner, Amount::new(OWNER_FUNDS)).unwrap();
    for name in ["alice", "bob", "carol"] {
        tokens.credit(&account(name), Amount::new(CONTRIBUTOR_FUNDS)).unwrap();
    }

    let market = Market::new(
        accounts.clone(),
        tokens,
        params.clone(),
        roster,
        reputation.clone(),
        clock.clone(),
    );

    Harness {
        market,
        clock,
        params,
        reputation,
        accounts,
        admin,
        owner,
    }
}

impl Harness {
    /// Bounty by the harness owner, `lifetime` blocks from now
    pub fn create(&mut self, amount: u64, lifetime: u64) -> MarketResult<BountyId> {
        let owner = self.owner.clone();
        let deadline = self.clock.now().saturating_add(lifetime);
        self.market.create_bounty(
            &owner,
            NewBounty::new("Fix flaky test", "The parser test fails on CI", Amount::new(amount), deadline),
        )
    }

    pub fn submit(&mut self, who: &str, bounty_id: BountyId) -> MarketResult<SubmissionId> {
        self.market
            .submit_work(&account(who), bounty_id, format!("ipfs://{}-{}", who, bounty_id.0))
    }

    pub fn balance(&self, who: &AccountId) -> Amount {
        self.market.tokens().balance_of(who)
    }

    pub fn balance_of(&self, name: &str) -> Amount {
        self.balance(&account(name))
    }

    pub fn reputation_of(&self, name: &str) -> ReputationRecord {
        self.reputation.book.record(&account(name))
    }

    pub fn advance_to(&self, height: u64) {
        self.clock.set(BlockHeight::new(height)).unwrap();
    }
}
