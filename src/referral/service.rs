//! Referral Service
//!
//! Drives the state machine against a store: read the record, compute the
//! next state, write it back, then notify. One call is one logical
//! operation; the service never retries internally. A write conflict is
//! returned to the caller, who decides whether to re-run.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::{ReferralError, StoreError};
use super::machine::{self, TransferOutcome};
use super::notifier::{CompletionNotifier, ReferralEvent, ReferralEvents};
use super::state::{Bucket, ReferralStatus};
use super::store::ReferralStore;
use super::types::{NewReferral, Referral, TransferRecord};
use crate::core_types::{Earnings, ReferralId};
use crate::progress::Progress;

/// Referrals of one referrer split by listing bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralLists {
    pub active: Vec<Referral>,
    pub completed: Vec<Referral>,
}

/// Aggregate numbers for a referrer's dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferrerSummary {
    pub active_count: usize,
    pub completed_count: usize,
    pub archived_count: usize,
    pub total_transfers: u32,
    pub total_earnings: Earnings,
}

pub struct ReferralService {
    store: Arc<dyn ReferralStore>,
    notifier: Arc<dyn CompletionNotifier>,
    events: ReferralEvents,
}

impl ReferralService {
    pub fn new(
        store: Arc<dyn ReferralStore>,
        notifier: Arc<dyn CompletionNotifier>,
        event_buffer: usize,
    ) -> Self {
        Self {
            store,
            notifier,
            events: ReferralEvents::new(event_buffer),
        }
    }

    /// Listen for state changes
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ReferralEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &Arc<dyn ReferralStore> {
        &self.store
    }

    /// Register a newly referred user
    pub async fn register(&self, req: NewReferral) -> Result<Referral, ReferralError> {
        let referral = Referral::new(Uuid::new_v4(), req, Utc::now())?;
        let referral = self.store.insert(referral).await?;

        info!(
            referral_id = %referral.id,
            referrer_id = %referral.referrer_id,
            referral_user = %referral.referral_id,
            "Referral registered"
        );
        self.events.publish(ReferralEvent::Registered {
            referral_id: referral.id,
            referrer_id: referral.referrer_id.clone(),
        });
        Ok(referral)
    }

    /// Get a referral, failing if it does not exist
    pub async fn get(&self, id: ReferralId) -> Result<Referral, ReferralError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()).into())
    }

    /// Display progress of one referral
    pub async fn progress(&self, id: ReferralId) -> Result<Progress, ReferralError> {
        self.get(id).await?.progress()
    }

    /// Record a completed transfer against a referral.
    ///
    /// A redelivered transfer id returns the stored referral untouched and
    /// does not notify. The completion notifier runs after the completing
    /// write is persisted.
    pub async fn record_transfer(
        &self,
        referral_id: ReferralId,
        transfer: TransferRecord,
    ) -> Result<TransferOutcome, ReferralError> {
        let current = self.get(referral_id).await?;
        let transfer_id = transfer.id.clone();

        let outcome = match machine::record_transfer(&current, transfer, Utc::now()) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    referral_id = %referral_id,
                    transfer_id = %transfer_id,
                    status = %current.status,
                    transfer_count = current.transfer_count,
                    error = %e,
                    "Transfer rejected"
                );
                return Err(e);
            }
        };

        if outcome.is_duplicate() {
            debug!(
                referral_id = %referral_id,
                transfer_id = %transfer_id,
                "Duplicate transfer absorbed"
            );
            return Ok(outcome);
        }

        let saved = match self.store.save(outcome.referral().clone()).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!(
                    referral_id = %referral_id,
                    transfer_id = %transfer_id,
                    error = %e,
                    "Transfer write failed"
                );
                return Err(e.into());
            }
        };

        debug!(
            referral_id = %saved.id,
            transfer_id = %transfer_id,
            transfer_count = saved.transfer_count,
            total_earnings = saved.total_earnings,
            "Transfer recorded"
        );
        self.events.publish(ReferralEvent::TransferRecorded {
            referral_id: saved.id,
            referrer_id: saved.referrer_id.clone(),
            transfer_id,
            transfer_count: saved.transfer_count,
        });

        if outcome.is_completion() {
            info!(referral_id = %saved.id, "Referral reached final milestone");
            self.notifier.on_completed(&saved);
            self.events.publish(ReferralEvent::Completed {
                referral_id: saved.id,
                referrer_id: saved.referrer_id.clone(),
            });
            return Ok(TransferOutcome::Completed(saved));
        }
        Ok(TransferOutcome::Recorded(saved))
    }

    /// Archive a completed referral
    pub async fn archive(&self, referral_id: ReferralId) -> Result<Referral, ReferralError> {
        let current = self.get(referral_id).await?;
        let next = machine::archive(&current, Utc::now()).inspect_err(|e| {
            warn!(referral_id = %referral_id, error = %e, "Archive rejected");
        })?;
        let saved = self.store.save(next).await?;

        info!(referral_id = %saved.id, "Referral archived");
        self.events.publish(ReferralEvent::Archived {
            referral_id: saved.id,
            referrer_id: saved.referrer_id.clone(),
        });
        Ok(saved)
    }

    /// Active and completed lists for a referrer; archived ones are left out
    pub async fn list_buckets(&self, referrer_id: &str) -> Result<ReferralLists, ReferralError> {
        let mut lists = ReferralLists::default();
        for referral in self.store.find_by_referrer(referrer_id).await? {
            if referral.status == ReferralStatus::Archived {
                continue;
            }
            match machine::classify(&referral) {
                Bucket::Active => lists.active.push(referral),
                Bucket::Completed => lists.completed.push(referral),
            }
        }
        Ok(lists)
    }

    pub async fn summary(&self, referrer_id: &str) -> Result<ReferrerSummary, ReferralError> {
        let mut summary = ReferrerSummary::default();
        for referral in self.store.find_by_referrer(referrer_id).await? {
            summary.total_transfers += referral.transfer_count as u32;
            summary.total_earnings += referral.total_earnings;
            if referral.status == ReferralStatus::Archived {
                summary.archived_count += 1;
                continue;
            }
            match machine::classify(&referral) {
                Bucket::Active => summary.active_count += 1,
                Bucket::Completed => summary.completed_count += 1,
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Notifier that remembers which referrals completed
    #[derive(Default)]
    pub struct RecordingNotifier {
        completed: Mutex<Vec<ReferralId>>,
    }

    impl RecordingNotifier {
        pub fn calls(&self) -> Vec<ReferralId> {
            self.completed.lock().unwrap().clone()
        }
    }

    impl CompletionNotifier for RecordingNotifier {
        fn on_completed(&self, referral: &Referral) {
            self.completed.lock().unwrap().push(referral.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingNotifier;
    use super::*;
    use crate::referral::store::InMemoryReferralStore;
    use crate::referral::types::fixtures::{new_referral, transfer};
    use async_trait::async_trait;

    fn service() -> (ReferralService, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let svc = ReferralService::new(
            Arc::new(InMemoryReferralStore::new()),
            notifier.clone(),
            64,
        );
        (svc, notifier)
    }

    /// Transfer dated after registration (registration uses the wall clock)
    fn fresh_transfer(n: u32) -> TransferRecord {
        let mut t = transfer(n);
        t.completed_at = Utc::now() + chrono::Duration::seconds(n as i64);
        t
    }

    #[tokio::test]
    async fn test_register_and_record() {
        let (svc, notifier) = service();
        let r = svc.register(new_referral("referrer-1", "user-1")).await.unwrap();

        let outcome = svc.record_transfer(r.id, fresh_transfer(1)).await.unwrap();
        assert!(matches!(outcome, TransferOutcome::Recorded(_)));

        let stored = svc.get(r.id).await.unwrap();
        assert_eq!(stored.transfer_count, 1);
        assert_eq!(stored.total_earnings, 3);
        assert!(notifier.calls().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_delivery_does_not_double_count() {
        let (svc, _) = service();
        let r = svc.register(new_referral("referrer-1", "user-1")).await.unwrap();
        let t = fresh_transfer(1);

        svc.record_transfer(r.id, t.clone()).await.unwrap();
        let once = svc.get(r.id).await.unwrap();
        let outcome = svc.record_transfer(r.id, t).await.unwrap();

        assert!(outcome.is_duplicate());
        assert_eq!(svc.get(r.id).await.unwrap(), once);
    }

    #[tokio::test]
    async fn test_completion_notifies_once() {
        let (svc, notifier) = service();
        let mut rx = svc.subscribe();
        let r = svc.register(new_referral("referrer-1", "user-1")).await.unwrap();

        for i in 1..=12 {
            svc.record_transfer(r.id, fresh_transfer(i)).await.unwrap();
        }
        // Redeliver the final transfer
        let again = svc.record_transfer(r.id, fresh_transfer(12)).await.unwrap();
        assert!(again.is_duplicate());

        assert_eq!(notifier.calls(), vec![r.id]);

        let mut completed_events = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ReferralEvent::Completed { .. }) {
                completed_events += 1;
            }
        }
        assert_eq!(completed_events, 1);
    }

    #[tokio::test]
    async fn test_completed_referral_rejects_transfer() {
        let (svc, _) = service();
        let r = svc.register(new_referral("referrer-1", "user-1")).await.unwrap();
        for i in 1..=12 {
            svc.record_transfer(r.id, fresh_transfer(i)).await.unwrap();
        }
        let before = svc.get(r.id).await.unwrap();

        let err = svc.record_transfer(r.id, fresh_transfer(13)).await.unwrap_err();
        assert!(matches!(err, ReferralError::InvalidState { .. }));
        assert_eq!(svc.get(r.id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_unknown_referral() {
        let (svc, _) = service();
        let err = svc
            .record_transfer(ReferralId::new_v4(), fresh_transfer(1))
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[tokio::test]
    async fn test_archive_and_listings() {
        let (svc, _) = service();
        let a = svc.register(new_referral("referrer-1", "user-a")).await.unwrap();
        let b = svc.register(new_referral("referrer-1", "user-b")).await.unwrap();
        let c = svc.register(new_referral("referrer-1", "user-c")).await.unwrap();
        svc.register(new_referral("referrer-2", "user-d")).await.unwrap();

        svc.record_transfer(a.id, fresh_transfer(1)).await.unwrap();
        for i in 1..=12 {
            svc.record_transfer(b.id, fresh_transfer(i)).await.unwrap();
            svc.record_transfer(c.id, fresh_transfer(i)).await.unwrap();
        }

        assert!(svc.archive(a.id).await.is_err());
        let archived = svc.archive(c.id).await.unwrap();
        assert_eq!(archived.status, ReferralStatus::Archived);

        let lists = svc.list_buckets("referrer-1").await.unwrap();
        assert_eq!(lists.active.len(), 1);
        assert_eq!(lists.active[0].id, a.id);
        assert_eq!(lists.completed.len(), 1);
        assert_eq!(lists.completed[0].id, b.id);

        let summary = svc.summary("referrer-1").await.unwrap();
        assert_eq!(
            summary,
            ReferrerSummary {
                active_count: 1,
                completed_count: 1,
                archived_count: 1,
                total_transfers: 25,
                total_earnings: 75,
            }
        );
    }

    struct UnavailableStore;

    #[async_trait]
    impl ReferralStore for UnavailableStore {
        async fn get(&self, _id: ReferralId) -> Result<Option<Referral>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn find_by_referrer(&self, _referrer_id: &str) -> Result<Vec<Referral>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn find_by_referral_user(&self, _user_id: &str) -> Result<Option<Referral>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn insert(&self, _referral: Referral) -> Result<Referral, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn save(&self, _referral: Referral) -> Result<Referral, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let svc = ReferralService::new(
            Arc::new(UnavailableStore),
            Arc::new(RecordingNotifier::default()),
            4,
        );
        let err = svc
            .record_transfer(ReferralId::new_v4(), fresh_transfer(1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "STORE_UNAVAILABLE");
        assert!(svc.list_buckets("r").await.is_err());
    }
}
