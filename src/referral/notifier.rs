//! Change notification
//!
//! Two outlets for state changes:
//! - [`CompletionNotifier`]: invoked synchronously, once, when a referral
//!   first becomes `completed`
//! - [`ReferralEvents`]: broadcast channel any listener can subscribe to,
//!   so views refresh on change instead of on a timer

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, trace};

use super::types::Referral;
use crate::core_types::{ReferralId, TransferCount, TransferId, UserRef};

/// Completion hook
///
/// Called after the completing write has been persisted, never before.
pub trait CompletionNotifier: Send + Sync {
    fn on_completed(&self, referral: &Referral);
}

/// Notifier that only logs the completion
pub struct LogNotifier;

impl CompletionNotifier for LogNotifier {
    fn on_completed(&self, referral: &Referral) {
        info!(
            referral_id = %referral.id,
            referrer_id = %referral.referrer_id,
            user = %referral.referred_user.display_name(),
            total_earnings = referral.total_earnings,
            "Referral completed all transfers"
        );
    }
}

/// State change published after a successful write
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReferralEvent {
    Registered {
        referral_id: ReferralId,
        referrer_id: UserRef,
    },
    TransferRecorded {
        referral_id: ReferralId,
        referrer_id: UserRef,
        transfer_id: TransferId,
        transfer_count: TransferCount,
    },
    Completed {
        referral_id: ReferralId,
        referrer_id: UserRef,
    },
    Archived {
        referral_id: ReferralId,
        referrer_id: UserRef,
    },
}

impl ReferralEvent {
    pub fn referral_id(&self) -> ReferralId {
        match self {
            ReferralEvent::Registered { referral_id, .. }
            | ReferralEvent::TransferRecorded { referral_id, .. }
            | ReferralEvent::Completed { referral_id, .. }
            | ReferralEvent::Archived { referral_id, .. } => *referral_id,
        }
    }

    pub fn referrer_id(&self) -> &str {
        match self {
            ReferralEvent::Registered { referrer_id, .. }
            | ReferralEvent::TransferRecorded { referrer_id, .. }
            | ReferralEvent::Completed { referrer_id, .. }
            | ReferralEvent::Archived { referrer_id, .. } => referrer_id,
        }
    }
}

/// Publisher side of the change channel
#[derive(Clone)]
pub struct ReferralEvents {
    tx: broadcast::Sender<ReferralEvent>,
}

impl ReferralEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish without waiting; having no subscribers is not an error
    pub fn publish(&self, event: ReferralEvent) {
        if self.tx.send(event).is_err() {
            trace!("No referral event subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReferralEvent> {
        self.tx.subscribe()
    }
}
