//! Referral Tracker demo runner
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌──────────┐
//! │  Config  │───▶│   Demo   │───▶│ Ingestor │───▶│  Output  │
//! │  (YAML)  │    │  roster  │    │ (events) │    │  (JSON)  │
//! └──────────┘    └──────────┘    └──────────┘    └──────────┘
//! ```
//!
//! Seeds an in-memory store, replays transfer events until one referral
//! completes, then prints the referrer's listings and summary.

use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use referral_tracker::config::AppConfig;
use referral_tracker::demo::generate_demo_referrals;
use referral_tracker::referral::LogNotifier;
use referral_tracker::{
    InMemoryReferralStore, MAX_TRANSFERS, ReferralService, ReferralStore, TransferEvent,
    TransferIngestor,
};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = referral_tracker::logging::init_logging(&app_config);
    let cfg = &app_config.referrals;

    info!(build = env!("BUILD_ID"), "Starting referral tracker in {} mode", env);

    // === Seed ===
    let store = Arc::new(InMemoryReferralStore::new());
    let base = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .context("invalid demo base date")?;
    let roster = generate_demo_referrals(cfg, base, &mut rand::thread_rng())?;
    for referral in roster {
        store.insert(referral).await?;
    }
    info!(referrals = store.len(), "Demo roster loaded");

    let service = Arc::new(ReferralService::new(
        store.clone(),
        Arc::new(LogNotifier),
        cfg.event_buffer,
    ));

    // === Listen for changes ===
    let mut rx = service.subscribe();
    let listener = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => info!(referral_id = %event.referral_id(), ?event, "Referral changed"),
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "Event listener lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    // === Replay webhook events for the first in-progress referral ===
    let ingestor = TransferIngestor::with_retries(service.clone(), cfg.max_conflict_retries);
    let lists = service.list_buckets(&cfg.demo_referrer_id).await?;
    if let Some(target) = lists.active.first() {
        let remaining = MAX_TRANSFERS - target.transfer_count;
        let start = target.updated_at;
        for i in 0..remaining {
            let event = TransferEvent {
                referral_user_id: target.referral_id.clone(),
                transfer_id: format!("webhook-{}-{}", target.referral_id, i),
                amount: Decimal::new(12500, 2),
                currency: "USD".to_string(),
                completed_at: start + Duration::hours(i as i64 + 1),
            };
            ingestor.ingest(&event).await?;
            // At-least-once delivery: every event arrives twice
            ingestor.ingest(&event).await?;
        }
    }

    let lists = service.list_buckets(&cfg.demo_referrer_id).await?;
    let summary = service.summary(&cfg.demo_referrer_id).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "active": lists.active,
            "completed": lists.completed,
            "summary": summary,
        }))?
    );

    drop(service);
    drop(ingestor);
    listener.await?;
    Ok(())
}
