//! Referral Tracker - referral progress and earnings engine
//!
//! Follows a referred user from sign-up through 12 money transfers and
//! derives what the referrer sees: progress, earnings, completion.
//!
//! # Modules
//!
//! - [`core_types`] - Identifier and counter aliases
//! - [`milestone`] - Milestone constants and labels
//! - [`progress`] - Display progress derived from a transfer count
//! - [`referral`] - Lifecycle state machine, store contract, service, ingestion
//! - [`demo`] - Demo roster generator
//! - [`config`] / [`logging`] - Runtime configuration and tracing setup

// Core types - must be first!
pub mod core_types;

pub mod config;
pub mod demo;
pub mod logging;
pub mod milestone;
pub mod progress;
pub mod referral;

// Convenient re-exports at crate root
pub use core_types::{Earnings, ReferralId, TransferCount, TransferId, UserRef};
pub use milestone::{EARNING_PER_TRANSFER, MAX_TRANSFERS, ordinal_label};
pub use progress::{MilestoneState, Progress, milestone_states, progress};
pub use referral::{
    Bucket, CompletionNotifier, InMemoryReferralStore, NewReferral, Referral, ReferralError,
    ReferralEvent, ReferralService, ReferralStatus, ReferralStore, ReferredUser, StoreError,
    TransferEvent, TransferIngestor, TransferOutcome, TransferRecord, classify, record_transfer,
};
