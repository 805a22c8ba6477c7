//! Bounty Marketplace Domain Types
//!
//! Shared vocabulary for the marketplace core: owners fund escrowed
//! rewards, contributors stake collateral and submit work, and a dispute
//! process arbitrates disagreements.
//!
//! # Key Concepts
//!
//! - **Identity**: [`AccountId`] is opaque. Components compare identities,
//!   they never inspect them.
//! - **Records**: [`Bounty`], [`Submission`], [`EscrowRecord`],
//!   [`StakeRecord`] and [`Dispute`] are plain data owned by exactly one
//!   component each.
//! - **Journaling**: stores are built from [`JournaledMap`] and
//!   [`Checkpoint`] so every public operation can be rolled back as a unit
//!   (see [`Transactional`] and [`atomically!`]).
//! - **Collaborators**: the token ledger, logical clock, parameters,
//!   reputation and admin authority are traits injected at construction.

#![deny(unsafe_code)]

mod amount;
mod bounty;
mod collaborators;
mod dispute;
mod errors;
mod events;
mod ids;
mod journal;
mod ledger;
mod params;

pub use amount::*;
pub use bounty::*;
pub use collaborators::*;
pub use dispute::*;
pub use errors::*;
pub use events::*;
pub use ids::*;
pub use journal::*;
pub use ledger::*;
pub use params::*;
