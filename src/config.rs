use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    #[serde(default)]
    pub referrals: ReferralConfig,
}

/// Referral engine settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ReferralConfig {
    /// Capacity of the change-event broadcast channel
    pub event_buffer: usize,
    /// Write-conflict retries for inbound transfer events
    pub max_conflict_retries: u32,
    pub demo_referrer_id: String,
    pub demo_referral_count: usize,
    pub demo_completed_count: usize,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            event_buffer: 1024,
            max_conflict_retries: 3,
            demo_referrer_id: "550e8400-e29b-41d4-a716-446655440000".to_string(),
            demo_referral_count: 7,
            demo_completed_count: 2,
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path))
    }

    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}
