//! Bounty Orchestrator
//!
//! [`BountyRegistry`] owns bounties and submissions and drives their
//! lifecycle: create, submit, accept, reject, cancel, reclaim and dispute.
//! [`Market`] wires the registry together with the escrow ledger, the
//! stake ledger and the dispute resolver, and is the entry point hosts
//! are expected to use.
//!
//! ```text
//! caller ──► Market ──► BountyRegistry ──► EscrowLedger / StakeLedger
//!                 │                    └─► DisputeResolver
//!                 └───► DisputeResolver ──► EscrowLedger / StakeLedger / BountyRegistry
//! ```
//!
//! Every public operation is all-or-nothing. Component state is journaled
//! and rolled back when any later step fails; the reputation collaborator,
//! which cannot be rolled back, is always called last.

#![deny(unsafe_code)]

mod market;
mod registry;

pub use market::{Market, MarketAccounts};
pub use registry::{BountyRegistry, Ledgers};
