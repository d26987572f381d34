//! Referral lifecycle states
//!
//! ```text
//! ACTIVE --(12th transfer)--> COMPLETED --(archive)--> ARCHIVED
//! ```
//!
//! No transition leads back to ACTIVE.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Referral status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    /// Collecting transfers (transfer_count < 12)
    Active,
    /// All 12 transfers recorded
    Completed,
    /// Retired by an administrator; terminal
    Archived,
}

impl ReferralStatus {
    /// Check if transfers may still be recorded
    #[inline]
    pub fn accepts_transfers(&self) -> bool {
        matches!(self, ReferralStatus::Active)
    }

    /// Check whether `self -> next` is an allowed lifecycle transition
    pub fn can_transition_to(&self, next: ReferralStatus) -> bool {
        matches!(
            (self, next),
            (ReferralStatus::Active, ReferralStatus::Completed)
                | (ReferralStatus::Completed, ReferralStatus::Archived)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralStatus::Active => "active",
            ReferralStatus::Completed => "completed",
            ReferralStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ReferralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReferralStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ReferralStatus::Active),
            "completed" => Ok(ReferralStatus::Completed),
            "archived" => Ok(ReferralStatus::Archived),
            other => Err(format!("unknown referral status: {other}")),
        }
    }
}

/// Listing bucket used by referrer dashboards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    /// In-progress list
    Active,
    /// Finished list
    Completed,
}
