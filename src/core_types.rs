//! Core types used throughout the crate
//!
//! Type aliases give the identifiers and counters semantic names and keep
//! the door open for newtypes later.

/// Referral ID - primary key of a referral record.
///
/// Generated once at registration and never reused.
pub type ReferralId = uuid::Uuid;

/// Opaque reference to a user (referrer or referred user).
///
/// Issued by the user system; this crate only compares them for equality.
pub type UserRef = String;

/// Transfer ID - unique within its referral.
///
/// Used as the idempotency key when a transfer is redelivered.
pub type TransferId = String;

/// Number of completed transfers on a referral (0..=12).
pub type TransferCount = u8;

/// Earnings in currency-agnostic integer units.
pub type Earnings = u32;
