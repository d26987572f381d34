//! Transfer ingestion
//!
//! Turns inbound "transfer completed" events into `record_transfer` calls.
//! Matching rule: the event's user id is the referred user
//! (`Referral::referral_id`). Delivery is at-least-once, so the same event
//! may arrive many times; the engine absorbs repeats by transfer id.

use std::sync::Arc;

use tracing::{debug, warn};

use super::error::ReferralError;
use super::machine::TransferOutcome;
use super::service::ReferralService;
use super::types::TransferEvent;

pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

pub struct TransferIngestor {
    service: Arc<ReferralService>,
    max_conflict_retries: u32,
}

impl TransferIngestor {
    pub fn new(service: Arc<ReferralService>) -> Self {
        Self::with_retries(service, DEFAULT_MAX_CONFLICT_RETRIES)
    }

    pub fn with_retries(service: Arc<ReferralService>, max_conflict_retries: u32) -> Self {
        Self {
            service,
            max_conflict_retries,
        }
    }

    /// Apply one inbound event.
    ///
    /// Write conflicts are retried from a fresh read up to the configured
    /// limit; every other error is returned as-is so the sender redelivers.
    pub async fn ingest(&self, event: &TransferEvent) -> Result<TransferOutcome, ReferralError> {
        let referral = self
            .service
            .store()
            .find_by_referral_user(&event.referral_user_id)
            .await?
            .ok_or_else(|| ReferralError::NotFound(event.referral_user_id.clone()))?;

        let mut attempt = 0;
        loop {
            match self
                .service
                .record_transfer(referral.id, event.to_record())
                .await
            {
                Err(e) if e.is_conflict() && attempt < self.max_conflict_retries => {
                    attempt += 1;
                    debug!(
                        referral_id = %referral.id,
                        transfer_id = %event.transfer_id,
                        attempt,
                        "Write conflict, retrying"
                    );
                }
                Err(e) => {
                    warn!(
                        referral_user = %event.referral_user_id,
                        transfer_id = %event.transfer_id,
                        code = e.code(),
                        "Transfer event not applied"
                    );
                    return Err(e);
                }
                Ok(outcome) => return Ok(outcome),
            }
        }
    }
}
