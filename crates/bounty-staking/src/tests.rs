use super::*;
use bounty_host::{AdminRoster, ManualClock, ParameterStore, TokenBook};
use bounty_types::{BlockHeight, MarketParams};
use proptest::prelude::*;

const STAKE: u64 = 10_000;

struct Fixture {
    ledger: StakeLedger,
    tokens: TokenBook,
    journal: EventJournal,
    params: Arc<ParameterStore>,
    registry: AccountId,
    resolver: AccountId,
}

fn contributor(n: u8) -> AccountId {
    AccountId::new(format!("contributor-{}", n))
}

fn setup() -> Fixture {
    let admin = AccountId::new("admin");
    let registry = AccountId::new("registry");
    let resolver = AccountId::new("resolver");
    let params = Arc::new(
        ParameterStore::new(
            MarketParams::default(),
            Arc::new(AdminRoster::new([admin])),
        )
        .unwrap(),
    );
    let ledger = StakeLedger::new(
        AccountId::new("staking"),
        StakeAccess {
            registry: registry.clone(),
            resolver: resolver.clone(),
        },
        params.clone(),
        Arc::new(ManualClock::new(BlockHeight::new(10))),
    );
    let mut tokens = TokenBook::new();
    for n in 0..8 {
        tokens.credit(&contributor(n), Amount::new(100_000)).unwrap();
    }
    Fixture {
        ledger,
        tokens,
        journal: EventJournal::new(),
        params,
        registry,
        resolver,
    }
}

impl Fixture {
    fn stake(&mut self, bounty: u64, who: &AccountId) -> MarketResult<Amount> {
        let registry = self.registry.clone();
        self.ledger.stake_for_bounty(
            &registry,
            &mut self.tokens,
            &mut self.journal,
            BountyId::new(bounty),
            who,
        )
    }

    fn release(&mut self, caller: &AccountId, bounty: u64) -> MarketResult<Vec<ReleasedStake>> {
        self.ledger
            .release_stakes(caller, &mut self.tokens, &mut self.journal, BountyId::new(bounty))
    }
}

#[test]
fn test_stake_locks_collateral() {
    let mut fx = setup();
    let alice = contributor(1);
    assert_eq!(fx.stake(1, &alice).unwrap(), Amount::new(STAKE));

    let record = fx.ledger.get_stake(BountyId::new(1), &alice).unwrap();
    assert_eq!(record.status, StakeStatus::Active);
    assert_eq!(record.staked_at, BlockHeight::new(10));
    assert_eq!(fx.ledger.stakers(BountyId::new(1)), &[alice.clone()]);
    assert_eq!(fx.ledger.contributor_total(&alice), Amount::new(STAKE));
    assert_eq!(fx.tokens.balance_of(&alice), Amount::new(100_000 - STAKE));
    assert_eq!(fx.tokens.balance_of(fx.ledger.custody_account()), Amount::new(STAKE));
}

#[test]
fn test_duplicate_stake_leaves_ledger_unchanged() {
    let mut fx = setup();
    let alice = contributor(1);
    fx.stake(1, &alice).unwrap();

    let err = fx.stake(1, &alice).unwrap_err();
    assert!(matches!(err, MarketError::AlreadyExists(_)));
    assert_eq!(fx.ledger.stakers(BountyId::new(1)).len(), 1);
    assert_eq!(fx.ledger.contributor_total(&alice), Amount::new(STAKE));
    assert_eq!(fx.ledger.total_staked(), Amount::new(STAKE));
    assert_eq!(fx.tokens.balance_of(&alice), Amount::new(100_000 - STAKE));

    // the same contributor may stake on another bounty
    fx.stake(2, &alice).unwrap();
    assert_eq!(fx.ledger.contributor_total(&alice), Amount::new(2 * STAKE));
}

#[test]
fn test_only_registry_may_stake() {
    let mut fx = setup();
    let alice = contributor(1);
    let resolver = fx.resolver.clone();
    let err = fx
        .ledger
        .stake_for_bounty(&resolver, &mut fx.tokens, &mut fx.journal, BountyId::new(1), &alice)
        .unwrap_err();
    assert!(matches!(err, MarketError::Unauthorized { .. }));
}

#[test]
fn test_unfunded_contributor_is_not_recorded() {
    let mut fx = setup();
    let pauper = AccountId::new("pauper");
    let err = fx.stake(1, &pauper).unwrap_err();
    assert!(matches!(err, MarketError::TransferFailed(_)));
    assert!(fx.ledger.get_stake(BountyId::new(1), &pauper).is_none());
    assert!(fx.ledger.stakers(BountyId::new(1)).is_empty());
    assert_eq!(fx.ledger.total_staked(), Amount::zero());
    assert!(fx.journal.is_empty());
}

#[test]
fn test_release_returns_collateral_for_one_bounty() {
    let mut fx = setup();
    let (alice, bob) = (contributor(1), contributor(2));
    fx.stake(1, &alice).unwrap();
    fx.stake(1, &bob).unwrap();
    fx.stake(2, &alice).unwrap();

    let resolver = fx.resolver.clone();
    let released = fx.release(&resolver, 1).unwrap();
    assert_eq!(released.len(), 2);
    assert_eq!(released[0].contributor, alice);
    assert_eq!(released[1].contributor, bob);

    assert_eq!(
        fx.ledger.get_stake(BountyId::new(1), &alice).unwrap().status,
        StakeStatus::Released
    );
    assert_eq!(
        fx.ledger.get_stake(BountyId::new(2), &alice).unwrap().status,
        StakeStatus::Active
    );
    assert_eq!(fx.ledger.contributor_total(&alice), Amount::new(STAKE));
    assert_eq!(fx.tokens.balance_of(&bob), Amount::new(100_000));
}

#[test]
fn test_release_skips_slashed_and_is_repeatable() {
    let mut fx = setup();
    let (alice, bob) = (contributor(1), contributor(2));
    fx.stake(1, &alice).unwrap();
    fx.stake(1, &bob).unwrap();

    let resolver = fx.resolver.clone();
    fx.ledger
        .slash_stake(&resolver, &mut fx.journal, BountyId::new(1), &alice)
        .unwrap();
    let released = fx.release(&resolver, 1).unwrap();
    assert_eq!(released, vec![ReleasedStake { contributor: bob, amount: Amount::new(STAKE) }]);

    assert!(fx.release(&resolver, 1).unwrap().is_empty());
    assert!(fx.release(&resolver, 99).unwrap().is_empty());
}

#[test]
fn test_release_authorization() {
    let mut fx = setup();
    fx.stake(1, &contributor(1)).unwrap();
    let err = fx.release(&contributor(1), 1).unwrap_err();
    assert!(matches!(err, MarketError::Unauthorized { .. }));
    assert_eq!(fx.ledger.total_staked(), Amount::new(STAKE));
}

#[test]
fn test_slash_keeps_collateral_in_custody() {
    let mut fx = setup();
    let alice = contributor(1);
    fx.stake(1, &alice).unwrap();

    let resolver = fx.resolver.clone();
    let slashed = fx
        .ledger
        .slash_stake(&resolver, &mut fx.journal, BountyId::new(1), &alice)
        .unwrap();
    assert_eq!(slashed, Amount::new(STAKE));
    assert_eq!(fx.ledger.contributor_total(&alice), Amount::zero());
    assert_eq!(fx.ledger.total_staked(), Amount::zero());
    assert_eq!(fx.ledger.total_slashed(), Amount::new(STAKE));
    assert_eq!(fx.tokens.balance_of(fx.ledger.custody_account()), Amount::new(STAKE));

    let err = fx
        .ledger
        .slash_stake(&resolver, &mut fx.journal, BountyId::new(1), &alice)
        .unwrap_err();
    assert!(matches!(err, MarketError::InvalidState(_)));
}

#[test]
fn test_slash_guards() {
    let mut fx = setup();
    let alice = contributor(1);
    fx.stake(1, &alice).unwrap();

    let registry = fx.registry.clone();
    let err = fx
        .ledger
        .slash_stake(&registry, &mut fx.journal, BountyId::new(1), &alice)
        .unwrap_err();
    assert!(matches!(err, MarketError::Unauthorized { .. }));

    let resolver = fx.resolver.clone();
    let err = fx
        .ledger
        .slash_stake(&resolver, &mut fx.journal, BountyId::new(1), &contributor(2))
        .unwrap_err();
    assert!(matches!(err, MarketError::NotFound(_)));
}

#[test]
fn test_paused_rejects_staking() {
    let mut fx = setup();
    fx.params.set_paused(&AccountId::new("admin"), true).unwrap();
    assert_eq!(fx.stake(1, &contributor(1)), Err(MarketError::SystemPaused));
}

proptest! {
    /// Releasing one bounty moves exactly that bounty's Active stakes to
    /// Released and leaves every other record untouched.
    #[test]
    fn property_release_targets_exactly_one_bounty(
        stakes in proptest::collection::vec((1u64..5, 0u8..8), 0..24),
        slashes in proptest::collection::vec((1u64..5, 0u8..8), 0..6),
        target in 1u64..5,
    ) {
        let mut fx = setup();
        for (bounty, who) in &stakes {
            let _ = fx.stake(*bounty, &contributor(*who));
        }
        let resolver = fx.resolver.clone();
        for (bounty, who) in &slashes {
            let _ = fx.ledger.slash_stake(&resolver, &mut fx.journal, BountyId::new(*bounty), &contributor(*who));
        }
        let before: Vec<StakeRecord> = fx.ledger.records().cloned().collect();

        let released = fx.release(&resolver, target).unwrap();

        let mut expected_released = 0;
        for old in &before {
            let now = fx.ledger.get_stake(old.bounty_id, &old.contributor).unwrap();
            if old.bounty_id == BountyId::new(target) && old.status == StakeStatus::Active {
                prop_assert_eq!(now.status, StakeStatus::Released);
                expected_released += 1;
            } else {
                prop_assert_eq!(now.status, old.status);
            }
        }
        prop_assert_eq!(released.len(), expected_released);

        let active: Amount = fx.ledger.records().filter(|r| r.is_active()).map(|r| r.amount).sum();
        prop_assert_eq!(fx.ledger.total_staked(), active);
        prop_assert_eq!(
            fx.tokens.balance_of(fx.ledger.custody_account()),
            fx.ledger.total_staked().saturating_add(fx.ledger.total_slashed())
        );
    }
}
