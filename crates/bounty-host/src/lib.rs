//! Host environment for the bounty marketplace core.
//!
//! The core treats token balances, the logical clock, global parameters,
//! reputation and the admin role as external collaborators. This crate
//! provides in-memory implementations of each seam, loads configuration
//! files and installs the tracing subscriber.

#![deny(unsafe_code)]

mod admin;
mod clock;
mod config;
mod parameters;
mod reputation;
mod telemetry;
mod token_book;

pub use admin::AdminRoster;
pub use clock::ManualClock;
pub use config::{LoggingConfig, MarketConfig};
pub use parameters::ParameterStore;
pub use reputation::{ReputationBook, ReputationRecord};
pub use telemetry::init_tracing;
pub use token_book::TokenBook;
