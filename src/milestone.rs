//! Milestone Model
//!
//! A referral moves through 13 milestones: milestone 0 is "joined" and
//! milestones 1..=12 are the completed transfers. Everything here is a
//! constant or a pure function of the milestone index.

use crate::core_types::{Earnings, TransferCount};
use crate::referral::error::ReferralError;

/// Number of transfers that completes a referral.
pub const MAX_TRANSFERS: TransferCount = 12;

/// Earning credited to the referrer for every completed transfer.
pub const EARNING_PER_TRANSFER: Earnings = 3;

/// Label of milestone 0.
pub const JOINED_LABEL: &str = "Joined";

/// Label for the n-th transfer milestone (1..=12).
///
/// Only 1, 2 and 3 get their own suffix; every other value uses "th".
/// The domain never goes past 12, so 11th/12th come out right anyway.
pub fn ordinal_label(n: u32) -> Result<String, ReferralError> {
    if n < 1 || n > MAX_TRANSFERS as u32 {
        return Err(ReferralError::MilestoneOutOfRange(n));
    }
    let suffix = match n {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    };
    Ok(format!("{n}{suffix} transfer"))
}

/// Earnings accrued after `transfer_count` transfers.
#[inline]
pub fn earnings_for(transfer_count: TransferCount) -> Earnings {
    transfer_count as Earnings * EARNING_PER_TRANSFER
}
