//! Referral State Machine
//!
//! Pure transition functions. Each takes the current record and returns
//! the next one; persistence and notification belong to
//! [`ReferralService`](super::service::ReferralService).

use chrono::{DateTime, Duration, Utc};

use super::error::ReferralError;
use super::state::{Bucket, ReferralStatus};
use super::types::{Referral, TransferRecord};
use crate::milestone::{MAX_TRANSFERS, earnings_for};

/// Result of applying a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Transfer appended, referral still active
    Recorded(Referral),
    /// Transfer appended and it was the 12th: referral is now completed
    Completed(Referral),
    /// Transfer id already present; referral returned unchanged
    Duplicate(Referral),
}

impl TransferOutcome {
    pub fn referral(&self) -> &Referral {
        match self {
            TransferOutcome::Recorded(r)
            | TransferOutcome::Completed(r)
            | TransferOutcome::Duplicate(r) => r,
        }
    }

    pub fn into_referral(self) -> Referral {
        match self {
            TransferOutcome::Recorded(r)
            | TransferOutcome::Completed(r)
            | TransferOutcome::Duplicate(r) => r,
        }
    }

    /// True only for the transition into `completed`
    #[inline]
    pub fn is_completion(&self) -> bool {
        matches!(self, TransferOutcome::Completed(_))
    }

    #[inline]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, TransferOutcome::Duplicate(_))
    }
}

/// Next `updated_at`: the wall clock, but always strictly past the
/// previous value so every mutation moves it forward.
fn advance(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    now.max(previous + Duration::nanoseconds(1))
}

/// Apply one transfer to a referral.
///
/// Check order matters:
/// 1. a transfer id already on the record is absorbed, whatever the status,
///    so redelivery of the 12th transfer after completion is not an error
/// 2. only `active` referrals accept transfers
/// 3. the 12-transfer ceiling is checked on its own
pub fn record_transfer(
    referral: &Referral,
    transfer: TransferRecord,
    now: DateTime<Utc>,
) -> Result<TransferOutcome, ReferralError> {
    if referral.find_transfer(&transfer.id).is_some() {
        return Ok(TransferOutcome::Duplicate(referral.clone()));
    }

    if !referral.status.accepts_transfers() {
        return Err(ReferralError::InvalidState {
            status: referral.status,
            action: "record a transfer on",
        });
    }

    if referral.transfer_count >= MAX_TRANSFERS {
        return Err(ReferralError::CapacityExceeded {
            referral_id: referral.id,
        });
    }

    transfer.validate_for(referral)?;

    let mut next = referral.clone();
    next.transfers.push(transfer);
    next.transfer_count += 1;
    next.total_earnings = earnings_for(next.transfer_count);
    next.updated_at = advance(referral.updated_at, now);
    next.version += 1;

    if next.transfer_count == MAX_TRANSFERS {
        next.status = ReferralStatus::Completed;
        Ok(TransferOutcome::Completed(next))
    } else {
        Ok(TransferOutcome::Recorded(next))
    }
}

/// Retire a completed referral.
pub fn archive(referral: &Referral, now: DateTime<Utc>) -> Result<Referral, ReferralError> {
    if !referral.status.can_transition_to(ReferralStatus::Archived) {
        return Err(ReferralError::InvalidState {
            status: referral.status,
            action: "archive",
        });
    }

    let mut next = referral.clone();
    next.status = ReferralStatus::Archived;
    next.updated_at = advance(referral.updated_at, now);
    next.version += 1;
    Ok(next)
}

/// Listing bucket for a referral.
///
/// Status and count are written by different paths and may disagree for a
/// moment; a full count wins over a lagging `active` status.
pub fn classify(referral: &Referral) -> Bucket {
    if referral.status == ReferralStatus::Active && referral.transfer_count < MAX_TRANSFERS {
        Bucket::Active
    } else {
        Bucket::Completed
    }
}
