//! Demo roster for local runs
//!
//! Builds referrals through the state machine itself, so every generated
//! record satisfies the same invariants as live data.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::config::ReferralConfig;
use crate::milestone::MAX_TRANSFERS;
use crate::referral::error::ReferralError;
use crate::referral::machine::record_transfer;
use crate::referral::types::{NewReferral, Referral, ReferredUser, TransferRecord};

const DEMO_USERS: &[(&str, &str)] = &[
    ("Mark", "Anderson"),
    ("Sarah", "Johnson"),
    ("Alex", "Thompson"),
    ("Emma", "Wilson"),
    ("David", "Brown"),
    ("Lisa", "Garcia"),
    ("Michael", "Davis"),
];

/// Generate `cfg.demo_referral_count` referrals for `cfg.demo_referrer_id`.
///
/// The last `cfg.demo_completed_count` are complete; the others have 1..=8
/// transfers. Referrals start a week apart from `base`, transfers every
/// three days.
pub fn generate_demo_referrals<R: Rng>(
    cfg: &ReferralConfig,
    base: DateTime<Utc>,
    rng: &mut R,
) -> Result<Vec<Referral>, ReferralError> {
    let count = cfg.demo_referral_count;
    let completed_from = count.saturating_sub(cfg.demo_completed_count);

    (0..count)
        .map(|index| {
            let (first, last) = DEMO_USERS[index % DEMO_USERS.len()];
            let created_at = base + Duration::weeks(index as i64);
            let user_id = format!("user-{}", index + 1);

            let mut referral = Referral::new(
                Uuid::new_v4(),
                NewReferral {
                    referrer_id: cfg.demo_referrer_id.clone(),
                    referred_user: ReferredUser {
                        id: user_id,
                        first_name: first.to_string(),
                        last_name: last.to_string(),
                        email: format!(
                            "{}.{}@email.com",
                            first.to_lowercase(),
                            last.to_lowercase()
                        ),
                        registration_date: created_at,
                    },
                    promo_code: format!("{}{}", first.to_uppercase(), index + 1000),
                },
                created_at,
            )?;

            let transfers = if index >= completed_from {
                MAX_TRANSFERS
            } else {
                rng.gen_range(1..=8)
            };
            for i in 0..transfers {
                let completed_at = created_at + Duration::days(3 * (i as i64 + 1));
                let transfer = TransferRecord::new(
                    format!("transfer-{index}-{i}"),
                    Decimal::from(rng.gen_range(50i64..550)),
                    "USD",
                    completed_at,
                );
                referral = record_transfer(&referral, transfer, completed_at)?.into_referral();
            }
            Ok(referral)
        })
        .collect()
}
