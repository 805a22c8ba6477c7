//! Event journal: the marketplace's accountability record
//!
//! Every committed state transition appends an event. Events appended
//! inside an aborted invocation are discarded with the rest of its work.

use crate::{AccountId, BlockHeight, BountyId, MarketError, MarketResult, Transactional};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kinds of marketplace events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    BountyCreated,
    BountyCancelled,
    BountyRefunded,
    BountyCompleted,
    WorkSubmitted,
    SubmissionRejected,
    FundsEscrowed,
    FundsReleased,
    FundsRefunded,
    StakeLocked,
    StakeReleased,
    StakeSlashed,
    DisputeOpened,
    DisputeResolved,
}

/// A single journal entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketEvent {
    pub event_id: String,
    pub kind: EventKind,
    pub bounty_id: BountyId,
    /// The identity that performed the transition
    pub actor: AccountId,
    /// Logical height at which the transition happened
    pub height: BlockHeight,
    pub recorded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl MarketEvent {
    pub fn new(kind: EventKind, bounty_id: BountyId, actor: AccountId, height: BlockHeight) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            kind,
            bounty_id,
            actor,
            height,
            recorded_at: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }
}

/// Append-only list of events with savepoint truncation
#[derive(Clone, Debug, Default)]
pub struct EventJournal {
    events: Vec<MarketEvent>,
    savepoints: Vec<usize>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: MarketEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[MarketEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn for_bounty(&self, bounty_id: BountyId) -> impl Iterator<Item = &MarketEvent> {
        self.events.iter().filter(move |e| e.bounty_id == bounty_id)
    }

    pub fn count_of(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Export as newline-delimited JSON
    pub fn to_json_lines(&self) -> MarketResult<String> {
        let mut out = String::new();
        for event in &self.events {
            let line = serde_json::to_string(event)
                .map_err(|e| MarketError::InvalidState(format!("event encoding: {}", e)))?;
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }
}

impl Transactional for EventJournal {
    fn begin(&mut self) {
        self.savepoints.push(self.events.len());
    }

    fn commit(&mut self) {
        self.savepoints.pop();
    }

    fn rollback(&mut self) {
        if let Some(mark) = self.savepoints.pop() {
            self.events.truncate(mark);
        }
    }
}
