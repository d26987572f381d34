//! Progress Calculator
//!
//! Derives display progress from a transfer count. Every function here is
//! pure: the same count always yields the same output.

use serde::Serialize;

use crate::core_types::TransferCount;
use crate::milestone::{JOINED_LABEL, MAX_TRANSFERS, ordinal_label};
use crate::referral::error::ReferralError;

/// Display progress for one referral.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub transfer_count: TransferCount,
    /// Milestones lit up, including "joined" (1..=13).
    pub active_milestone_count: u8,
    /// Fill of the continuous progress bar (0.0..=1.0).
    pub fill_ratio: f64,
    /// Next milestone to reach, or the final one once complete.
    pub next_milestone_label: String,
    pub is_joined_active: bool,
    pub is_complete: bool,
}

/// One milestone on the track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneState {
    /// 0 = joined, 1..=12 = transfers
    pub index: u8,
    pub label: String,
    pub reached: bool,
    /// Most recently reached milestone
    pub current: bool,
}

fn check_range(transfer_count: TransferCount) -> Result<(), ReferralError> {
    if transfer_count > MAX_TRANSFERS {
        return Err(ReferralError::MilestoneOutOfRange(transfer_count as u32));
    }
    Ok(())
}

/// Ratio of completed transfers to the milestone total.
pub fn fill_ratio(transfer_count: TransferCount) -> Result<f64, ReferralError> {
    check_range(transfer_count)?;
    Ok(transfer_count as f64 / MAX_TRANSFERS as f64)
}

/// Label of the next milestone. Completion has no next milestone, so a
/// full track reports its last one.
pub fn next_milestone_label(transfer_count: TransferCount) -> Result<String, ReferralError> {
    check_range(transfer_count)?;
    if transfer_count == MAX_TRANSFERS {
        ordinal_label(MAX_TRANSFERS as u32)
    } else {
        ordinal_label(transfer_count as u32 + 1)
    }
}

/// Compute the progress view for a transfer count.
pub fn progress(transfer_count: TransferCount) -> Result<Progress, ReferralError> {
    check_range(transfer_count)?;
    Ok(Progress {
        transfer_count,
        active_milestone_count: transfer_count + 1,
        fill_ratio: fill_ratio(transfer_count)?,
        next_milestone_label: next_milestone_label(transfer_count)?,
        is_joined_active: true,
        is_complete: transfer_count == MAX_TRANSFERS,
    })
}

/// All 13 milestones with their reached/current flags.
pub fn milestone_states(transfer_count: TransferCount) -> Result<Vec<MilestoneState>, ReferralError> {
    check_range(transfer_count)?;
    (0..=MAX_TRANSFERS)
        .map(|index| -> Result<MilestoneState, ReferralError> {
            let label = if index == 0 {
                JOINED_LABEL.to_string()
            } else {
                ordinal_label(index as u32)?
            };
            Ok(MilestoneState {
                index,
                label,
                reached: index <= transfer_count,
                current: index == transfer_count,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_ratio_is_linear_and_monotonic() {
        let mut prev = -1.0;
        for n in 0..=MAX_TRANSFERS {
            let ratio = fill_ratio(n).unwrap();
            assert_eq!(ratio, n as f64 / 12.0);
            assert!(ratio >= prev);
            prev = ratio;
        }
        assert_eq!(fill_ratio(0).unwrap(), 0.0);
        assert_eq!(fill_ratio(12).unwrap(), 1.0);
    }

    #[test]
    fn test_next_milestone_label() {
        assert_eq!(next_milestone_label(0).unwrap(), "1st transfer");
        assert_eq!(next_milestone_label(1).unwrap(), "2nd transfer");
        assert_eq!(next_milestone_label(3).unwrap(), "4th transfer");
        assert_eq!(next_milestone_label(11).unwrap(), "12th transfer");
        // Complete: reports the last milestone, not a 13th
        assert_eq!(next_milestone_label(12).unwrap(), "12th transfer");
    }

    #[test]
    fn test_progress_view() {
        let p = progress(0).unwrap();
        assert_eq!(p.active_milestone_count, 1);
        assert!(p.is_joined_active);
        assert!(!p.is_complete);

        let p = progress(12).unwrap();
        assert_eq!(p.active_milestone_count, 13);
        assert_eq!(p.fill_ratio, 1.0);
        assert!(p.is_complete);
    }

    #[test]
    fn test_progress_is_referentially_transparent() {
        for n in 0..=MAX_TRANSFERS {
            assert_eq!(progress(n).unwrap(), progress(n).unwrap());
        }
    }

    #[test]
    fn test_out_of_range_count() {
        assert!(matches!(
            progress(13),
            Err(ReferralError::MilestoneOutOfRange(13))
        ));
        assert!(matches!(
            progress(u8::MAX),
            Err(ReferralError::MilestoneOutOfRange(255))
        ));
        assert!(milestone_states(13).is_err());
    }

    #[test]
    fn test_milestone_states() {
        let states = milestone_states(3).unwrap();
        assert_eq!(states.len(), 13);
        assert_eq!(states[0].label, "Joined");
        assert!(states[0].reached);
        assert!(states[3].reached);
        assert!(states[3].current);
        assert!(!states[4].reached);
        assert_eq!(states[12].label, "12th transfer");

        let joined_only = milestone_states(0).unwrap();
        assert!(joined_only[0].current);
        assert_eq!(joined_only.iter().filter(|m| m.reached).count(), 1);
    }
}
