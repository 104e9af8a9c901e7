//! # Configuration System
//!
//! YAML-based configuration for the batch analyst. One file describes the
//! whole run: batch pacing and retry knobs, the analysis engine endpoint,
//! artifact output, delivery transports, and named job lists.
//!
//! ## Architecture
//!
//! - **Single Source of Truth**: all settings come from one YAML file
//! - **Environment Awareness**: top-level `development`/`test`/`production`
//!   sections override the base values for that environment
//! - **Explicit Validation**: bad values fail at startup, not mid-run
//! - **No Stored Secrets**: configuration carries environment variable
//!   *names* (`api_key_env`, `secret_env`); credentials are resolved from
//!   the process environment at use time
//!
//! ## Usage
//!
//! ```rust,no_run
//! use analyst_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let pacing = manager.config().batch.delay_between_requests();
//! let jobs = manager.job_list("default")?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::delivery::TransportConfig;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring analyst-config.yaml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnalystConfig {
    /// Batch pacing, retry, and quota-stop settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Analysis engine endpoint settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Artifact output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Notification delivery settings
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Named job lists selectable from the CLI
    #[serde(default)]
    pub job_lists: HashMap<String, JobListConfig>,
}

/// Batch scheduling configuration.
///
/// `delay_between_requests` is the base unit for all pacing: inter-job
/// waits use it directly, inter-batch waits multiply it by
/// `batch_delay_multiplier`, and retry backoff doubles it per attempt.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Upper bound on batch size; the effective size is capped by the
    /// job count and never below 1
    pub max_concurrent: usize,
    /// Base delay in seconds between consecutive engine requests
    pub delay_between_requests: f64,
    /// Retries after the first attempt; total attempts = max_retries + 1
    pub max_retries: u32,
    /// Multiplier applied to the base delay between batches
    pub batch_delay_multiplier: f64,
    /// Trip the quota circuit breaker on the first quota-exhaustion failure
    pub stop_on_quota_exceeded: bool,
}

impl BatchConfig {
    /// Base inter-request delay as a Duration
    pub fn delay_between_requests(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_between_requests).unwrap_or(Duration::ZERO)
    }

    /// Inter-batch delay as a Duration
    pub fn batch_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_between_requests * self.batch_delay_multiplier)
            .unwrap_or(Duration::ZERO)
    }

    /// Fast settings for tests: tiny real delays, two retries.
    pub fn for_testing() -> Self {
        Self {
            max_concurrent: 2,
            delay_between_requests: 0.01,
            max_retries: 2,
            batch_delay_multiplier: 1.0,
            stop_on_quota_exceeded: true,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            delay_between_requests: 3.0,
            max_retries: 3,
            batch_delay_multiplier: 2.0,
            stop_on_quota_exceeded: true,
        }
    }
}

/// Analysis engine endpoint configuration.
///
/// `api_key_env` names the environment variable holding the engine
/// credential; the credential itself never appears in configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    pub base_url: String,
    pub model: String,
    pub request_timeout_seconds: u64,
    pub api_key_env: String,
}

impl EngineConfig {
    /// Request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8085".to_string(),
            model: "default".to_string(),
            request_timeout_seconds: 300,
            api_key_env: "ANALYSIS_API_KEY".to_string(),
        }
    }
}

/// Artifact output configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Root directory for per-date run output
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "./reports".to_string(),
        }
    }
}

/// Notification delivery configuration.
///
/// Transports are tried in list order by the failover sender.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub transports: Vec<TransportConfig>,
}

/// One named job list
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct JobListConfig {
    #[serde(default)]
    pub description: String,
    pub symbols: Vec<String>,
}

impl AnalystConfig {
    /// Validate the loaded configuration. Returns the first violation
    /// found; callers treat any error as fatal at startup.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.batch.max_concurrent == 0 {
            return Err(ConfigurationError::invalid_value(
                "batch.max_concurrent",
                "0",
                "must be at least 1",
            ));
        }

        if !self.batch.delay_between_requests.is_finite() || self.batch.delay_between_requests < 0.0
        {
            return Err(ConfigurationError::invalid_value(
                "batch.delay_between_requests",
                self.batch.delay_between_requests.to_string(),
                "must be a non-negative number of seconds",
            ));
        }

        if !self.batch.batch_delay_multiplier.is_finite() || self.batch.batch_delay_multiplier < 1.0
        {
            return Err(ConfigurationError::invalid_value(
                "batch.batch_delay_multiplier",
                self.batch.batch_delay_multiplier.to_string(),
                "must be at least 1",
            ));
        }

        if self.engine.base_url.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "engine.base_url",
                "engine settings",
            ));
        }

        if self.output.directory.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "output.directory",
                "output settings",
            ));
        }

        if self.delivery.enabled {
            if self.delivery.transports.is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    "delivery.transports",
                    "delivery is enabled but no transports are configured",
                ));
            }
            if self.delivery.recipients.is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    "delivery.recipients",
                    "delivery is enabled but no recipients are configured",
                ));
            }
        }

        for (name, list) in &self.job_lists {
            if list.symbols.is_empty() {
                return Err(ConfigurationError::invalid_value(
                    "job_lists",
                    name.clone(),
                    "job list has no symbols",
                ));
            }
        }

        Ok(())
    }

    /// Test configuration: fast pacing, delivery disabled, one job list.
    pub fn for_testing() -> Self {
        let mut job_lists = HashMap::new();
        job_lists.insert(
            "default".to_string(),
            JobListConfig {
                description: "test list".to_string(),
                symbols: vec!["AAPL".to_string(), "0700.HK".to_string()],
            },
        );

        Self {
            batch: BatchConfig::for_testing(),
            engine: EngineConfig::default(),
            output: OutputConfig::default(),
            delivery: DeliveryConfig::default(),
            job_lists,
        }
    }
}
