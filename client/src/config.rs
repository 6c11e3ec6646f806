//! Configuration for the sync engine.

use std::env;
use std::time::Duration;

/// Tunables for the orchestrator and connectivity monitor.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Interval between periodic sync cycles
    pub sync_interval: Duration,
    /// Interval between reachability probes
    pub probe_interval: Duration,
    /// Push attempts per queue entry before it is parked
    pub max_retries: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(30),
            probe_interval: Duration::from_secs(5),
            max_retries: 3,
        }
    }
}

impl SyncConfig {
    /// Load overrides from environment variables on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(value) = env::var("COURIER_SYNC_INTERVAL_SECS") {
            let secs = value.parse().map_err(|_| ConfigError::InvalidSyncInterval)?;
            config.sync_interval = Duration::from_secs(secs);
        }

        if let Ok(value) = env::var("COURIER_PROBE_INTERVAL_SECS") {
            let secs = value
                .parse()
                .map_err(|_| ConfigError::InvalidProbeInterval)?;
            config.probe_interval = Duration::from_secs(secs);
        }

        if let Ok(value) = env::var("COURIER_MAX_RETRIES") {
            config.max_retries = value.parse().map_err(|_| ConfigError::InvalidMaxRetries)?;
        }

        Ok(config)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid COURIER_SYNC_INTERVAL_SECS value")]
    InvalidSyncInterval,

    #[error("Invalid COURIER_PROBE_INTERVAL_SECS value")]
    InvalidProbeInterval,

    #[error("Invalid COURIER_MAX_RETRIES value")]
    InvalidMaxRetries,
}
