//! Referral Store
//!
//! Narrow persistence contract the engine depends on, plus an in-memory
//! implementation for tests and demos.
//!
//! # Write contract
//! `save` is a compare-and-swap on [`Referral::version`]: the write only
//! lands if the stored record is exactly one version behind the new one.
//! Two concurrent writers based on the same read cannot both succeed, so
//! per-record updates are serialized without a lock held across the
//! caller's logic.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use super::error::StoreError;
use super::types::Referral;
use crate::core_types::{ReferralId, UserRef};

/// Referral persistence contract
#[async_trait]
pub trait ReferralStore: Send + Sync {
    /// Get one referral by id
    async fn get(&self, id: ReferralId) -> Result<Option<Referral>, StoreError>;

    /// All referrals belonging to a referrer, in creation order
    async fn find_by_referrer(&self, referrer_id: &str) -> Result<Vec<Referral>, StoreError>;

    /// Referral whose referred user is `user_id`
    async fn find_by_referral_user(&self, user_id: &str) -> Result<Option<Referral>, StoreError>;

    /// Insert a new referral.
    ///
    /// # Idempotency
    /// Re-inserting an identical record succeeds and returns it; a
    /// different record under the same id or referred user fails with
    /// `AlreadyExists`.
    async fn insert(&self, referral: Referral) -> Result<Referral, StoreError>;

    /// Persist a mutated referral (CAS on `version`)
    async fn save(&self, referral: Referral) -> Result<Referral, StoreError>;
}

/// In-memory store backed by DashMap
#[derive(Default)]
pub struct InMemoryReferralStore {
    referrals: DashMap<ReferralId, Referral>,
    /// referred user -> referral id
    by_user: DashMap<UserRef, ReferralId>,
}

impl InMemoryReferralStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.referrals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.referrals.is_empty()
    }
}

#[async_trait]
impl ReferralStore for InMemoryReferralStore {
    async fn get(&self, id: ReferralId) -> Result<Option<Referral>, StoreError> {
        Ok(self.referrals.get(&id).map(|r| r.value().clone()))
    }

    async fn find_by_referrer(&self, referrer_id: &str) -> Result<Vec<Referral>, StoreError> {
        let mut found: Vec<Referral> = self
            .referrals
            .iter()
            .filter(|r| r.referrer_id == referrer_id)
            .map(|r| r.value().clone())
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn find_by_referral_user(&self, user_id: &str) -> Result<Option<Referral>, StoreError> {
        let Some(id) = self.by_user.get(user_id).map(|e| *e.value()) else {
            return Ok(None);
        };
        self.get(id).await
    }

    async fn insert(&self, referral: Referral) -> Result<Referral, StoreError> {
        match self.referrals.entry(referral.id) {
            Entry::Occupied(e) if e.get() == &referral => Ok(referral),
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(referral.id.to_string())),
            Entry::Vacant(slot) => {
                match self.by_user.entry(referral.referral_id.clone()) {
                    Entry::Occupied(_) => {
                        return Err(StoreError::AlreadyExists(format!(
                            "referred user {}",
                            referral.referral_id
                        )));
                    }
                    Entry::Vacant(e) => {
                        e.insert(referral.id);
                    }
                }
                debug!(referral_id = %referral.id, referrer_id = %referral.referrer_id, "Referral inserted");
                slot.insert(referral.clone());
                Ok(referral)
            }
        }
    }

    async fn save(&self, referral: Referral) -> Result<Referral, StoreError> {
        let Some(mut slot) = self.referrals.get_mut(&referral.id) else {
            return Err(StoreError::NotFound(referral.id.to_string()));
        };

        let expected = referral.version.saturating_sub(1);
        if referral.version == 0 || slot.version != expected {
            return Err(StoreError::Conflict {
                referral_id: referral.id,
                expected,
                actual: slot.version,
            });
        }

        *slot = referral.clone();
        Ok(referral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::referral::machine::record_transfer;
    use crate::referral::types::fixtures::{new_referral, referral, t0, transfer};

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = InMemoryReferralStore::new();
        let r = referral();
        store.insert(r.clone()).await.unwrap();

        assert_eq!(store.get(r.id).await.unwrap(), Some(r.clone()));
        assert_eq!(store.find_by_referrer("referrer-1").await.unwrap(), vec![r.clone()]);
        assert!(store.find_by_referrer("someone-else").await.unwrap().is_empty());
        assert_eq!(store.find_by_referral_user("user-1").await.unwrap(), Some(r));
        assert_eq!(store.find_by_referral_user("user-2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let store = InMemoryReferralStore::new();
        let r = referral();
        store.insert(r.clone()).await.unwrap();
        store.insert(r.clone()).await.unwrap();
        assert_eq!(store.len(), 1);

        let mut changed = r.clone();
        changed.promo_code = "OTHER2024".into();
        assert!(matches!(
            store.insert(changed).await,
            Err(StoreError::AlreadyExists(_))
        ));

        let same_user = Referral::new(
            ReferralId::new_v4(),
            new_referral("referrer-2", "user-1"),
            t0(),
        )
        .unwrap();
        assert!(matches!(
            store.insert(same_user).await,
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_rejected_insert_leaves_user_index_untouched() {
        let store = InMemoryReferralStore::new();
        let first = store.insert(referral()).await.unwrap();

        // Same referral id, different referred user
        let mut clash = Referral::new(
            ReferralId::new_v4(),
            new_referral("referrer-1", "user-2"),
            t0(),
        )
        .unwrap();
        clash.id = first.id;
        assert!(matches!(
            store.insert(clash).await,
            Err(StoreError::AlreadyExists(_))
        ));
        assert_eq!(store.find_by_referral_user("user-2").await.unwrap(), None);

        let own = Referral::new(
            ReferralId::new_v4(),
            new_referral("referrer-1", "user-2"),
            t0(),
        )
        .unwrap();
        store.insert(own.clone()).await.unwrap();
        assert_eq!(store.find_by_referral_user("user-2").await.unwrap(), Some(own));
        assert_eq!(store.find_by_referral_user("user-1").await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_save_compare_and_swap() {
        let store = InMemoryReferralStore::new();
        let r = store.insert(referral()).await.unwrap();

        let a = record_transfer(&r, transfer(1), t0()).unwrap().into_referral();
        let b = record_transfer(&r, transfer(2), t0()).unwrap().into_referral();

        store.save(a.clone()).await.unwrap();
        // b was built from the same read as a
        assert!(matches!(
            store.save(b).await,
            Err(StoreError::Conflict {
                expected: 0,
                actual: 1,
                ..
            })
        ));
        assert_eq!(store.get(r.id).await.unwrap(), Some(a));
    }

    #[tokio::test]
    async fn test_save_unknown_referral() {
        let store = InMemoryReferralStore::new();
        let r = record_transfer(&referral(), transfer(1), t0())
            .unwrap()
            .into_referral();
        assert!(matches!(store.save(r).await, Err(StoreError::NotFound(_))));
    }
}
