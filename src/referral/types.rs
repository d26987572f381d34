//! Referral Core Types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::ReferralError;
use super::state::ReferralStatus;
use crate::core_types::{Earnings, ReferralId, TransferCount, TransferId, UserRef};
use crate::milestone::{EARNING_PER_TRANSFER, MAX_TRANSFERS, earnings_for};
use crate::progress::{self, Progress};

const PROMO_CODE_MIN: usize = 6;
const PROMO_CODE_MAX: usize = 20;
const NAME_MAX: usize = 50;

/// Profile of the referred user, captured at registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferredUser {
    pub id: UserRef,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub registration_date: DateTime<Utc>,
}

impl ReferredUser {
    fn validate(&self) -> Result<(), ReferralError> {
        for (field, value) in [("first name", &self.first_name), ("last name", &self.last_name)] {
            let len = value.chars().count();
            if len == 0 || len > NAME_MAX {
                return Err(ReferralError::InvalidReferral(format!(
                    "{field} must be 1..={NAME_MAX} characters"
                )));
            }
        }
        match self.email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
            _ => Err(ReferralError::InvalidReferral(format!(
                "malformed email: {}",
                self.email
            ))),
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// One completed transfer attributed to a referral
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub id: TransferId,
    pub amount: Decimal,
    pub currency: String,
    pub completed_at: DateTime<Utc>,
    /// Earning credited for this transfer when it was recorded
    pub referral_earning: Earnings,
}

impl TransferRecord {
    /// Create a transfer record; currency is normalized to upper case
    pub fn new(
        id: impl Into<TransferId>,
        amount: Decimal,
        currency: &str,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            amount,
            currency: currency.to_ascii_uppercase(),
            completed_at,
            referral_earning: EARNING_PER_TRANSFER,
        }
    }

    /// Validate against the referral it is about to join
    pub fn validate_for(&self, referral: &Referral) -> Result<(), ReferralError> {
        if self.id.is_empty() {
            return Err(ReferralError::InvalidTransfer("empty transfer id".into()));
        }
        if self.amount <= Decimal::ZERO {
            return Err(ReferralError::InvalidTransfer(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ReferralError::InvalidTransfer(format!(
                "currency must be a 3-letter code, got {:?}",
                self.currency
            )));
        }
        if self.completed_at < referral.created_at {
            return Err(ReferralError::InvalidTransfer(format!(
                "transfer {} completed before the referral was created",
                self.id
            )));
        }
        Ok(())
    }
}

/// Registration input for a new referral
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReferral {
    pub referrer_id: UserRef,
    pub referred_user: ReferredUser,
    pub promo_code: String,
}

/// A referrer's relationship to one referred user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub id: ReferralId,
    pub referrer_id: UserRef,
    /// Referred user's id (always equal to `referred_user.id`)
    pub referral_id: UserRef,
    pub referred_user: ReferredUser,
    pub promo_code: String,
    pub transfer_count: TransferCount,
    pub total_earnings: Earnings,
    pub status: ReferralStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub transfers: Vec<TransferRecord>,
    /// Bumped on every mutation; the store compares it on write
    pub version: u64,
}

impl Referral {
    /// Create a fresh referral (no transfers, active)
    pub fn new(id: ReferralId, req: NewReferral, now: DateTime<Utc>) -> Result<Self, ReferralError> {
        if req.referrer_id.is_empty() {
            return Err(ReferralError::InvalidReferral("empty referrer id".into()));
        }
        if req.referred_user.id.is_empty() {
            return Err(ReferralError::InvalidReferral("empty referred user id".into()));
        }
        if req.referred_user.id == req.referrer_id {
            return Err(ReferralError::InvalidReferral(
                "a user cannot refer themselves".into(),
            ));
        }
        let promo_len = req.promo_code.chars().count();
        if !(PROMO_CODE_MIN..=PROMO_CODE_MAX).contains(&promo_len) {
            return Err(ReferralError::InvalidReferral(format!(
                "promo code must be {PROMO_CODE_MIN}..={PROMO_CODE_MAX} characters"
            )));
        }
        req.referred_user.validate()?;

        Ok(Self {
            id,
            referrer_id: req.referrer_id,
            referral_id: req.referred_user.id.clone(),
            referred_user: req.referred_user,
            promo_code: req.promo_code,
            transfer_count: 0,
            total_earnings: 0,
            status: ReferralStatus::Active,
            created_at: now,
            updated_at: now,
            transfers: Vec::new(),
            version: 0,
        })
    }

    /// Look up a recorded transfer by id
    pub fn find_transfer(&self, transfer_id: &str) -> Option<&TransferRecord> {
        self.transfers.iter().find(|t| t.id == transfer_id)
    }

    /// Display progress for this referral
    pub fn progress(&self) -> Result<Progress, ReferralError> {
        progress::progress(self.transfer_count)
    }

    /// Check the record-level invariants.
    ///
    /// Status/count agreement is included; listings tolerate a lagging
    /// status separately (see `machine::classify`).
    pub fn check_invariants(&self) -> Result<(), ReferralError> {
        let broken = |msg: String| Err(ReferralError::InvalidReferral(msg));
        if self.transfer_count > MAX_TRANSFERS {
            return broken(format!("transfer count {} above maximum", self.transfer_count));
        }
        if self.transfers.len() != self.transfer_count as usize {
            return broken(format!(
                "{} transfers recorded but count is {}",
                self.transfers.len(),
                self.transfer_count
            ));
        }
        if self.total_earnings != earnings_for(self.transfer_count) {
            return broken(format!(
                "earnings {} do not match {} transfers",
                self.total_earnings, self.transfer_count
            ));
        }
        let full = self.transfer_count == MAX_TRANSFERS;
        match self.status {
            ReferralStatus::Active if full => broken("active referral has 12 transfers".into()),
            ReferralStatus::Completed | ReferralStatus::Archived if !full => broken(format!(
                "{} referral has only {} transfers",
                self.status, self.transfer_count
            )),
            _ if self.updated_at < self.created_at => broken("updated before created".into()),
            _ => Ok(()),
        }
    }
}

/// Inbound "transfer completed" event from the payments system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferEvent {
    /// Referred user who made the transfer
    #[serde(rename = "userId", alias = "referralUserIdentifier")]
    pub referral_user_id: UserRef,
    pub transfer_id: TransferId,
    pub amount: Decimal,
    pub currency: String,
    pub completed_at: DateTime<Utc>,
}

impl TransferEvent {
    pub fn to_record(&self) -> TransferRecord {
        TransferRecord::new(
            self.transfer_id.clone(),
            self.amount,
            &self.currency,
            self.completed_at,
        )
    }
}
