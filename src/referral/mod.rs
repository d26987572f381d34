//! Referral lifecycle
//!
//! Tracks a referred user through the milestone track and derives
//! earnings and completion.
//!
//! # State Machine
//!
//! ```text
//! ACTIVE (0..11 transfers) --(12th transfer)--> COMPLETED --(archive)--> ARCHIVED
//! ```
//!
//! # Invariants
//!
//! 1. `total_earnings == transfer_count * 3`, `transfers.len() == transfer_count`
//! 2. `transfer_count` never decreases and never exceeds 12
//! 3. `completed` iff `transfer_count == 12` (archived keeps its 12)
//! 4. **Idempotency**: a transfer id is counted at most once per referral
//! 5. **Notify-After-Persist**: the completion hook runs once, after the
//!    completing write succeeds

pub mod error;
pub mod ingest;
pub mod machine;
pub mod notifier;
pub mod service;
pub mod state;
pub mod store;
pub mod types;

pub use error::{ReferralError, StoreError};
pub use ingest::TransferIngestor;
pub use machine::{TransferOutcome, archive, classify, record_transfer};
pub use notifier::{CompletionNotifier, LogNotifier, ReferralEvent, ReferralEvents};
pub use service::{ReferralLists, ReferralService, ReferrerSummary};
pub use state::{Bucket, ReferralStatus};
pub use store::{InMemoryReferralStore, ReferralStore};
pub use types::{NewReferral, Referral, ReferredUser, TransferEvent, TransferRecord};
