use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Engine configuration with the key booking knobs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub rollback: RollbackConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
}

/// Revenue split between mentor and platform, as a whole mentor
/// percentage of the gross session price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    #[serde(default = "default_mentor_pct")]
    pub mentor_pct: u8,
}

fn default_mentor_pct() -> u8 {
    70
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            mentor_pct: default_mentor_pct(),
        }
    }
}

impl SplitConfig {
    /// Splits a gross amount into `(mentor_share, admin_share)`. The
    /// mentor share truncates; the admin share takes the remainder, so
    /// the two always sum to the gross.
    pub fn shares(&self, gross: u64) -> (u64, u64) {
        let mentor = (gross as u128 * self.mentor_pct as u128 / 100) as u64;
        (mentor, gross - mentor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PricingConfig {
    /// Flat price for a user's first-ever chat session. Disabled unless
    /// set.
    #[serde(default)]
    pub first_session_flat: Option<u64>,
}

/// Backoff knobs for compensation retries during rollback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackConfig {
    #[serde(default = "default_rollback_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_rollback_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_rollback_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_rollback_jitter_pct")]
    pub jitter_pct: f64,
}

fn default_rollback_attempts() -> usize {
    5
}

fn default_rollback_base_delay_ms() -> u64 {
    50
}

fn default_rollback_max_delay_ms() -> u64 {
    1_000
}

fn default_rollback_jitter_pct() -> f64 {
    0.2
}

impl Default for RollbackConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_rollback_attempts(),
            base_delay_ms: default_rollback_base_delay_ms(),
            max_delay_ms: default_rollback_max_delay_ms(),
            jitter_pct: default_rollback_jitter_pct(),
        }
    }
}

impl RollbackConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            self.base_delay_ms,
            self.max_delay_ms,
            self.jitter_pct,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Interval between package-expiry sweeps.
    #[serde(default = "default_sweep_interval_s")]
    pub sweep_interval_s: u64,
}

fn default_sweep_interval_s() -> u64 {
    3_600
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            sweep_interval_s: default_sweep_interval_s(),
        }
    }
}

impl EngineConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(config::File::with_name("engine.toml").required(false))
            .add_source(config::Environment::with_prefix("ENGINE").separator("__"))
            .build()?;
        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.split.mentor_pct > 100 {
            return Err(ConfigError::Message(format!(
                "split.mentor_pct must be <= 100, got {}",
                self.split.mentor_pct
            )));
        }
        if self.rollback.max_attempts == 0 {
            return Err(ConfigError::Message(
                "rollback.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
