//! Referral Error Types
//!
//! Error codes and HTTP suggestions are consumed by the routing layer.

use thiserror::Error;

use super::state::ReferralStatus;
use crate::core_types::ReferralId;

/// Store collaborator errors (opaque passthrough)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Referral not found: {0}")]
    NotFound(String),

    #[error("Referral already exists: {0}")]
    AlreadyExists(String),

    #[error("Write conflict on referral {referral_id}: expected version {expected}, found {actual}")]
    Conflict {
        referral_id: ReferralId,
        expected: u64,
        actual: u64,
    },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Referral engine error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferralError {
    #[error("Cannot {action} a referral in status {status}")]
    InvalidState {
        status: ReferralStatus,
        action: &'static str,
    },

    #[error("Referral {referral_id} already has the maximum number of transfers")]
    CapacityExceeded { referral_id: ReferralId },

    #[error("Milestone out of range: {0}")]
    MilestoneOutOfRange(u32),

    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    #[error("Invalid referral: {0}")]
    InvalidReferral(String),

    #[error("No referral for user: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReferralError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            ReferralError::InvalidState { .. } => "INVALID_STATE",
            ReferralError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            ReferralError::MilestoneOutOfRange(_) => "MILESTONE_OUT_OF_RANGE",
            ReferralError::InvalidTransfer(_) => "INVALID_TRANSFER",
            ReferralError::InvalidReferral(_) => "INVALID_REFERRAL",
            ReferralError::NotFound(_) => "REFERRAL_NOT_FOUND",
            ReferralError::Store(StoreError::NotFound(_)) => "REFERRAL_NOT_FOUND",
            ReferralError::Store(StoreError::AlreadyExists(_)) => "REFERRAL_EXISTS",
            ReferralError::Store(StoreError::Conflict { .. }) => "WRITE_CONFLICT",
            ReferralError::Store(StoreError::Unavailable(_)) => "STORE_UNAVAILABLE",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            ReferralError::MilestoneOutOfRange(_)
            | ReferralError::InvalidTransfer(_)
            | ReferralError::InvalidReferral(_) => 400,
            ReferralError::NotFound(_) | ReferralError::Store(StoreError::NotFound(_)) => 404,
            ReferralError::InvalidState { .. }
            | ReferralError::Store(StoreError::AlreadyExists(_))
            | ReferralError::Store(StoreError::Conflict { .. }) => 409,
            ReferralError::CapacityExceeded { .. } => 422,
            ReferralError::Store(StoreError::Unavailable(_)) => 503,
        }
    }

    /// Write conflicts are the only errors a caller may retry as-is
    pub fn is_conflict(&self) -> bool {
        matches!(self, ReferralError::Store(StoreError::Conflict { .. }))
    }
}
