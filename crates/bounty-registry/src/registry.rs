//! Bounty and submission store with the lifecycle state machine

use bounty_dispute::{DisputeResolver, DisputedBounties};
use bounty_escrow::EscrowLedger;
use bounty_staking::StakeLedger;
use bounty_types::{
    atomically, AccountId, Amount, BlockHeight, Bounty, BountyId, BountyStatus, Checkpoint,
    DisputeId, EscrowRelease, EventJournal, EventKind, JournaledMap, LogicalClock, MarketError,
    MarketEvent, MarketParams, MarketResult, NewBounty, ParameterProvider, ReputationSink, Ruling,
    Submission, SubmissionId, SubmissionStatus, TokenLedger, Transactional,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ledgers a lifecycle operation may move value through
pub struct Ledgers<'a> {
    pub escrow: &'a mut EscrowLedger,
    pub stakes: &'a mut StakeLedger,
    pub tokens: &'a mut dyn TokenLedger,
    pub journal: &'a mut EventJournal,
}

/// Bounty registry
pub struct BountyRegistry {
    /// Identity the registry presents to the ledgers and the resolver
    identity: AccountId,
    /// The only identity allowed to settle disputed bounties
    resolver: AccountId,
    reputation: Arc<dyn ReputationSink>,
    params: Arc<dyn ParameterProvider>,
    clock: Arc<dyn LogicalClock>,
    bounties: JournaledMap<BountyId, Bounty>,
    submissions: JournaledMap<SubmissionId, Submission>,
    /// Submission ids per bounty, in submission order
    by_bounty: JournaledMap<BountyId, Vec<SubmissionId>>,
    next_bounty: Checkpoint<BountyId>,
    next_submission: Checkpoint<SubmissionId>,
}

impl BountyRegistry {
    pub fn new(
        identity: AccountId,
        resolver: AccountId,
        reputation: Arc<dyn ReputationSink>,
        params: Arc<dyn ParameterProvider>,
        clock: Arc<dyn LogicalClock>,
    ) -> Self {
        Self {
            identity,
            resolver,
            reputation,
            params,
            clock,
            bounties: JournaledMap::new(),
            submissions: JournaledMap::new(),
            by_bounty: JournaledMap::new(),
            next_bounty: Checkpoint::new(BountyId::new(1)),
            next_submission: Checkpoint::new(SubmissionId::new(1)),
        }
    }

    pub fn identity(&self) -> &AccountId {
        &self.identity
    }

    /// Create a bounty owned by `caller` and escrow its reward.
    pub fn create_bounty(
        &mut self,
        caller: &AccountId,
        ledgers: Ledgers<'_>,
        new: NewBounty,
    ) -> MarketResult<BountyId> {
        let params = self.params.current();
        params.ensure_running()?;
        let now = self.clock.now();
        validate_bounty(&params, &new, now)?;
        let available = ledgers.tokens.balance_of(caller);
        if available < new.amount {
            return Err(MarketError::InsufficientFunds {
                required: new.amount,
                available,
            });
        }

        // ids already escrowed directly by an owner are never reissued
        let mut id = *self.next_bounty.get();
        while ledgers.escrow.get_escrow(id).is_some() {
            debug!(bounty_id = %id, "Skipping id held by a direct escrow");
            id = id.next();
        }
        let amount = new.amount;
        let Ledgers {
            escrow,
            tokens,
            journal,
            ..
        } = ledgers;
        atomically!([&mut *self, &mut *escrow, &mut *tokens, &mut *journal], {
            self.bounties.insert(
                id,
                Bounty {
                    id,
                    owner: caller.clone(),
                    title: new.title,
                    description: new.description,
                    amount,
                    deadline: new.deadline,
                    status: BountyStatus::Active,
                    created_at: now,
                    winner: None,
                },
            );
            self.next_bounty.set(id.next());
            journal.record(
                MarketEvent::new(EventKind::BountyCreated, id, caller.clone(), now)
                    .with_metadata("amount", amount)
                    .with_metadata("deadline", new.deadline),
            );
            escrow
                .escrow_funds(&self.identity, tokens, journal, id, caller, amount)
                .map(|()| {
                    info!(bounty_id = %id, owner = %caller, amount = amount.0, "Bounty created");
                    id
                })
        })
    }

    /// Record work by `caller` against an Active bounty.
    ///
    /// Locks the contributor's stake and records participation before the
    /// submission is kept.
    pub fn submit_work(
        &mut self,
        caller: &AccountId,
        ledgers: Ledgers<'_>,
        bounty_id: BountyId,
        content_ref: impl Into<String>,
    ) -> MarketResult<SubmissionId> {
        let params = self.params.current();
        params.ensure_running()?;
        let content_ref = content_ref.into();
        let now = self.clock.now();
        let bounty = self.active_bounty(bounty_id)?;
        if bounty.owner == *caller {
            warn!(caller = %caller, bounty_id = %bounty_id, "Owner submission rejected");
            return Err(MarketError::unauthorized(caller, "submit to own bounty"));
        }
        if !bounty.accepts_work_at(now) {
            return Err(MarketError::Expired(format!(
                "{} closed at {}",
                bounty_id, bounty.deadline
            )));
        }
        check_text("content reference", &content_ref, params.max_content_ref_len)?;

        let id = *self.next_submission.get();
        let Ledgers {
            stakes,
            tokens,
            journal,
            ..
        } = ledgers;
        atomically!([&mut *self, &mut *stakes, &mut *tokens, &mut *journal], {
            self.submissions.insert(
                id,
                Submission {
                    id,
                    bounty_id,
                    contributor: caller.clone(),
                    content_ref,
                    submitted_at: now,
                    status: SubmissionStatus::Pending,
                },
            );
            self.by_bounty.upsert(bounty_id, |ids| ids.push(id));
            self.next_submission.set(id.next());
            journal.record(
                MarketEvent::new(EventKind::WorkSubmitted, bounty_id, caller.clone(), now)
                    .with_metadata("submission_id", id),
            );
            stakes
                .stake_for_bounty(&self.identity, tokens, journal, bounty_id, caller)
                .and_then(|_| {
                    self.reputation
                        .record_participation(&self.identity, caller, bounty_id)
                })
                .map(|()| {
                    info!(submission_id = %id, bounty_id = %bounty_id, contributor = %caller, "Work submitted");
                    id
                })
        })
    }

    /// Accept a Pending submission; only the bounty owner may call this.
    ///
    /// The bounty completes with the contributor as winner, the escrow is
    /// paid out, every stake is returned and the winner is awarded
    /// reputation. Remaining Pending submissions are rejected.
    pub fn accept_submission(
        &mut self,
        caller: &AccountId,
        ledgers: Ledgers<'_>,
        submission_id: SubmissionId,
    ) -> MarketResult<EscrowRelease> {
        let params = self.params.current();
        params.ensure_running()?;
        let submission = self.owned_pending_submission(caller, submission_id, "accept submission")?;
        let bounty_id = submission.bounty_id;
        let contributor = submission.contributor.clone();
        let now = self.clock.now();

        let Ledgers {
            escrow,
            stakes,
            tokens,
            journal,
        } = ledgers;
        atomically!(
            [&mut *self, &mut *escrow, &mut *stakes, &mut *tokens, &mut *journal],
            {
                self.close_bounty(journal, bounty_id, Some(&contributor), caller, now);
                self.payout(escrow, stakes, tokens, journal, bounty_id, &contributor, params.award_points)
                    .map(|release| {
                        info!(
                            bounty_id = %bounty_id,
                            submission_id = %submission_id,
                            winner = %contributor,
                            paid = release.paid.0,
                            "Submission accepted"
                        );
                        release
                    })
            }
        )
    }

    /// Reject a Pending submission; only the bounty owner may call this.
    ///
    /// The contributor keeps their stake locked until the bounty settles
    /// and may contest the rejection with a dispute.
    pub fn reject_submission(
        &mut self,
        caller: &AccountId,
        journal: &mut EventJournal,
        submission_id: SubmissionId,
    ) -> MarketResult<()> {
        self.params.current().ensure_running()?;
        let submission = self.owned_pending_submission(caller, submission_id, "reject submission")?;
        let bounty_id = submission.bounty_id;
        let contributor = submission.contributor.clone();
        let now = self.clock.now();

        atomically!([&mut *self, &mut *journal], {
            self.submissions
                .update(&submission_id, |s| s.status = SubmissionStatus::Rejected);
            journal.record(
                MarketEvent::new(EventKind::SubmissionRejected, bounty_id, caller.clone(), now)
                    .with_metadata("submission_id", submission_id)
                    .with_metadata("contributor", &contributor),
            );
            info!(submission_id = %submission_id, bounty_id = %bounty_id, "Submission rejected");
            Ok::<_, MarketError>(())
        })
    }

    /// Withdraw an Active bounty nobody has submitted to; the escrow is
    /// refunded in full.
    pub fn cancel_bounty(
        &mut self,
        caller: &AccountId,
        ledgers: Ledgers<'_>,
        bounty_id: BountyId,
    ) -> MarketResult<Amount> {
        self.params.current().ensure_running()?;
        let bounty = self.active_bounty(bounty_id)?;
        if bounty.owner != *caller {
            warn!(caller = %caller, bounty_id = %bounty_id, "Cancellation by non-owner rejected");
            return Err(MarketError::unauthorized(caller, "cancel bounty"));
        }
        if !self.bounty_submissions(bounty_id).is_empty() {
            return Err(MarketError::InvalidState(format!(
                "{} already has submissions",
                bounty_id
            )));
        }
        let now = self.clock.now();

        let Ledgers {
            escrow,
            tokens,
            journal,
            ..
        } = ledgers;
        atomically!([&mut *self, &mut *escrow, &mut *tokens, &mut *journal], {
            self.bounties
                .update(&bounty_id, |b| b.status = BountyStatus::Cancelled);
            journal.record(MarketEvent::new(
                EventKind::BountyCancelled,
                bounty_id,
                caller.clone(),
                now,
            ));
            escrow
                .refund_funds(&self.identity, tokens, journal, bounty_id)
                .map(|refunded| {
                    info!(bounty_id = %bounty_id, refunded = refunded.0, "Bounty cancelled");
                    refunded
                })
        })
    }

    /// Refund an Active bounty whose time has run out. Anyone may call this.
    ///
    /// A bounty without submissions expires at its deadline; one with
    /// submissions stays open for the dispute window after it. Every stake
    /// is returned.
    pub fn reclaim_expired(
        &mut self,
        caller: &AccountId,
        ledgers: Ledgers<'_>,
        bounty_id: BountyId,
    ) -> MarketResult<Amount> {
        let params = self.params.current();
        params.ensure_running()?;
        let now = self.clock.now();
        let expires_at = self.expires_at(&params, bounty_id)?;
        if now < expires_at {
            return Err(MarketError::TooEarly(format!(
                "{} expires at {}",
                bounty_id, expires_at
            )));
        }

        let Ledgers {
            escrow,
            stakes,
            tokens,
            journal,
        } = ledgers;
        atomically!(
            [&mut *self, &mut *escrow, &mut *stakes, &mut *tokens, &mut *journal],
            {
                self.close_bounty(journal, bounty_id, None, caller, now);
                escrow
                    .refund_funds(&self.identity, tokens, journal, bounty_id)
                    .and_then(|refunded| {
                        stakes
                            .release_stakes(&self.identity, tokens, journal, bounty_id)
                            .map(|_| refunded)
                    })
                    .map(|refunded| {
                        info!(bounty_id = %bounty_id, refunded = refunded.0, "Expired bounty reclaimed");
                        refunded
                    })
            }
        )
    }

    /// Contest the outcome of `caller`'s submission.
    ///
    /// Allowed for a Rejected submission, or a Pending one once the
    /// deadline has passed, until the dispute window closes. The bounty is
    /// frozen as Disputed until the resolver settles it.
    pub fn open_dispute(
        &mut self,
        caller: &AccountId,
        resolver: &mut DisputeResolver,
        journal: &mut EventJournal,
        submission_id: SubmissionId,
    ) -> MarketResult<DisputeId> {
        let params = self.params.current();
        params.ensure_running()?;
        let submission = self
            .submissions
            .get(&submission_id)
            .ok_or_else(|| MarketError::NotFound(submission_id.to_string()))?;
        if submission.contributor != *caller {
            warn!(caller = %caller, submission_id = %submission_id, "Dispute by non-contributor rejected");
            return Err(MarketError::unauthorized(caller, "dispute submission"));
        }
        let bounty_id = submission.bounty_id;
        let bounty = self.active_bounty(bounty_id)?;
        let now = self.clock.now();
        let contestable = match submission.status {
            SubmissionStatus::Rejected => true,
            SubmissionStatus::Pending => !bounty.accepts_work_at(now),
            SubmissionStatus::Accepted => false,
        };
        if !contestable {
            return Err(MarketError::InvalidState(format!(
                "{} is {:?} and cannot be disputed yet",
                submission_id, submission.status
            )));
        }
        let window_end = bounty.deadline.saturating_add(params.dispute_window);
        if now > window_end {
            return Err(MarketError::Expired(format!(
                "dispute window for {} closed at {}",
                bounty_id, window_end
            )));
        }
        let owner = bounty.owner.clone();

        atomically!([&mut *self, &mut *resolver, &mut *journal], {
            self.bounties
                .update(&bounty_id, |b| b.status = BountyStatus::Disputed);
            resolver
                .create_dispute(&self.identity, journal, bounty_id, caller, &owner)
                .map(|dispute_id| {
                    info!(bounty_id = %bounty_id, dispute_id = %dispute_id, contributor = %caller, "Bounty disputed");
                    dispute_id
                })
        })
    }

    /// Mark the bounty closed. A winner completes it, otherwise it is
    /// refunded; the winner's submission is accepted and every other
    /// Pending one is rejected.
    fn close_bounty(
        &mut self,
        journal: &mut EventJournal,
        bounty_id: BountyId,
        winner: Option<&AccountId>,
        actor: &AccountId,
        now: BlockHeight,
    ) {
        let ids = self.by_bounty.get(&bounty_id).cloned().unwrap_or_default();
        for id in ids {
            self.submissions.update(&id, |s| {
                if Some(&s.contributor) == winner {
                    s.status = SubmissionStatus::Accepted;
                } else if s.is_pending() {
                    s.status = SubmissionStatus::Rejected;
                }
            });
        }
        let (status, kind) = match winner {
            Some(_) => (BountyStatus::Completed, EventKind::BountyCompleted),
            None => (BountyStatus::Refunded, EventKind::BountyRefunded),
        };
        self.bounties.update(&bounty_id, |b| {
            b.status = status;
            b.winner = winner.cloned();
        });
        let mut event = MarketEvent::new(kind, bounty_id, actor.clone(), now);
        if let Some(winner) = winner {
            event = event.with_metadata("winner", winner);
        }
        journal.record(event);
    }

    /// Pay the winner, return every stake, award reputation last
    #[allow(clippy::too_many_arguments)]
    fn payout(
        &self,
        escrow: &mut EscrowLedger,
        stakes: &mut StakeLedger,
        tokens: &mut dyn TokenLedger,
        journal: &mut EventJournal,
        bounty_id: BountyId,
        winner: &AccountId,
        award_points: u64,
    ) -> MarketResult<EscrowRelease> {
        let release = escrow.release_funds(&self.identity, tokens, journal, bounty_id, winner)?;
        stakes.release_stakes(&self.identity, tokens, journal, bounty_id)?;
        self.reputation
            .add_reputation(&self.identity, winner, award_points, release.paid)?;
        Ok(release)
    }

    fn active_bounty(&self, bounty_id: BountyId) -> MarketResult<&Bounty> {
        let bounty = self
            .bounties
            .get(&bounty_id)
            .ok_or_else(|| MarketError::NotFound(bounty_id.to_string()))?;
        if !bounty.is_active() {
            return Err(MarketError::InvalidState(format!(
                "{} is {:?}",
                bounty_id, bounty.status
            )));
        }
        Ok(bounty)
    }

    /// Owner, Active bounty and Pending submission guards for accept/reject
    fn owned_pending_submission(
        &self,
        caller: &AccountId,
        submission_id: SubmissionId,
        action: &'static str,
    ) -> MarketResult<&Submission> {
        let submission = self
            .submissions
            .get(&submission_id)
            .ok_or_else(|| MarketError::NotFound(submission_id.to_string()))?;
        let bounty = self
            .bounties
            .get(&submission.bounty_id)
            .ok_or_else(|| MarketError::NotFound(submission.bounty_id.to_string()))?;
        if bounty.owner != *caller {
            warn!(caller = %caller, submission_id = %submission_id, action, "Non-owner rejected");
            return Err(MarketError::unauthorized(caller, action));
        }
        if !bounty.is_active() {
            return Err(MarketError::InvalidState(format!(
                "{} is {:?}",
                bounty.id, bounty.status
            )));
        }
        if !submission.is_pending() {
            return Err(MarketError::InvalidState(format!(
                "{} is {:?}",
                submission_id, submission.status
            )));
        }
        Ok(submission)
    }

    /// Height from which an Active bounty may be reclaimed
    fn expires_at(&self, params: &MarketParams, bounty_id: BountyId) -> MarketResult<BlockHeight> {
        let bounty = self.active_bounty(bounty_id)?;
        if self.bounty_submissions(bounty_id).is_empty() {
            Ok(bounty.deadline)
        } else {
            Ok(bounty.deadline.saturating_add(params.dispute_window))
        }
    }

    // --- Query methods ---

    pub fn get_bounty(&self, bounty_id: BountyId) -> Option<&Bounty> {
        self.bounties.get(&bounty_id)
    }

    pub fn get_submission(&self, submission_id: SubmissionId) -> Option<&Submission> {
        self.submissions.get(&submission_id)
    }

    /// Submissions of `bounty_id` in submission order
    pub fn bounty_submissions(&self, bounty_id: BountyId) -> Vec<&Submission> {
        self.by_bounty
            .get(&bounty_id)
            .map(|ids| ids.iter().filter_map(|id| self.submissions.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn bounty_count(&self) -> u64 {
        self.bounties.len() as u64
    }

    pub fn submission_count(&self) -> u64 {
        self.next_submission.get().0 - 1
    }

    /// Bounties owned by `owner`, ordered by id
    pub fn bounties_of(&self, owner: &AccountId) -> Vec<&Bounty> {
        let mut owned: Vec<&Bounty> = self
            .bounties
            .values()
            .filter(|b| b.owner == *owner)
            .collect();
        owned.sort_by_key(|b| b.id);
        debug!(owner = %owner, count = owned.len(), "Bounties listed");
        owned
    }
}

impl DisputedBounties for BountyRegistry {
    fn settle_dispute(
        &mut self,
        caller: &AccountId,
        journal: &mut EventJournal,
        bounty_id: BountyId,
        contributor: &AccountId,
        ruling: Ruling,
    ) -> MarketResult<()> {
        if *caller != self.resolver {
            warn!(caller = %caller, bounty_id = %bounty_id, "Settlement by non-resolver rejected");
            return Err(MarketError::unauthorized(caller, "settle dispute"));
        }
        let bounty = self
            .bounties
            .get(&bounty_id)
            .ok_or_else(|| MarketError::NotFound(bounty_id.to_string()))?;
        if !matches!(bounty.status, BountyStatus::Disputed | BountyStatus::Active) {
            return Err(MarketError::InvalidState(format!(
                "{} is {:?}",
                bounty_id, bounty.status
            )));
        }
        let winner = match ruling {
            Ruling::ForContributor => Some(contributor),
            Ruling::ForOwner => None,
        };
        let now = self.clock.now();
        self.close_bounty(journal, bounty_id, winner, caller, now);
        info!(bounty_id = %bounty_id, ruling = %ruling, "Disputed bounty settled");
        Ok(())
    }
}

impl Transactional for BountyRegistry {
    fn begin(&mut self) {
        self.bounties.begin();
        self.submissions.begin();
        self.by_bounty.begin();
        self.next_bounty.begin();
        self.next_submission.begin();
    }

    fn commit(&mut self) {
        self.bounties.commit();
        self.submissions.commit();
        self.by_bounty.commit();
        self.next_bounty.commit();
        self.next_submission.commit();
    }

    fn rollback(&mut self) {
        self.bounties.rollback();
        self.submissions.rollback();
        self.by_bounty.rollback();
        self.next_bounty.rollback();
        self.next_submission.rollback();
    }
}

fn validate_bounty(params: &MarketParams, new: &NewBounty, now: BlockHeight) -> MarketResult<()> {
    check_text("title", &new.title, params.max_title_len)?;
    check_text("description", &new.description, params.max_description_len)?;
    if new.amount < params.min_bounty_amount {
        return Err(MarketError::InsufficientFunds {
            required: params.min_bounty_amount,
            available: new.amount,
        });
    }
    if new.deadline <= now {
        return Err(MarketError::InvalidParams(format!(
            "deadline {} is not after {}",
            new.deadline, now
        )));
    }
    let horizon = now.saturating_add(params.max_bounty_duration);
    if new.deadline > horizon {
        return Err(MarketError::InvalidParams(format!(
            "deadline {} is beyond {}",
            new.deadline, horizon
        )));
    }
    Ok(())
}

fn check_text(field: &str, value: &str, max_len: usize) -> MarketResult<()> {
    if value.trim().is_empty() {
        return Err(MarketError::InvalidParams(format!("{} must not be empty", field)));
    }
    if value.chars().count() > max_len {
        return Err(MarketError::InvalidParams(format!(
            "{} exceeds {} characters",
            field, max_len
        )));
    }
    Ok(())
}
