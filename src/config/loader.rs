//! Configuration Loader
//!
//! Environment-aware configuration loading: YAML file discovery,
//! environment detection, and environment-section merging. A single
//! `analyst-config.yaml` carries the base settings plus optional
//! top-level `development`/`test`/`production` sections whose values
//! override the base for that environment.

use super::error::{ConfigResult, ConfigurationError};
use super::AnalystConfig;
use crate::error::AnalystError;
use crate::orchestration::types::Job;
use serde_yaml::Value as YamlValue;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Environments whose override sections are recognized and stripped
/// before deserialization.
const ENVIRONMENT_SECTIONS: [&str; 3] = ["development", "test", "production"];

/// Loaded configuration together with its provenance.
#[derive(Debug)]
pub struct ConfigManager {
    config: AnalystConfig,
    environment: String,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection.
    ///
    /// `ANALYST_CONFIG_PATH` overrides the file location; otherwise the
    /// default directory is searched.
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        if let Ok(path) = env::var("ANALYST_CONFIG_PATH") {
            return Self::load_from_file(PathBuf::from(path), &environment);
        }
        Self::load_from_directory_with_env(None, &environment)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// This is useful for testing without modifying global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));
        let config_file = Self::find_config_file(&config_directory)?;
        Self::load_from_file(config_file, environment)
    }

    /// Load configuration from an exact file path with explicit environment
    pub fn load_from_file(
        config_path: PathBuf,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        debug!(
            environment = environment,
            path = %config_path.display(),
            "Loading configuration"
        );

        let config = Self::load_and_merge_config(&config_path, environment)?;
        config.validate()?;

        info!(
            environment = environment,
            path = %config_path.display(),
            job_lists = config.job_lists.len(),
            delivery_enabled = config.delivery.enabled,
            "✅ CONFIG: configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_path,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &AnalystConfig {
        &self.config
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the path the configuration was loaded from
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Resolve a named job list into jobs with detected market categories.
    pub fn job_list(&self, name: &str) -> crate::error::Result<Vec<Job>> {
        let list = self
            .config
            .job_lists
            .get(name)
            .ok_or_else(|| AnalystError::unknown_job_list(name))?;

        let jobs: Vec<Job> = list
            .symbols
            .iter()
            .map(|symbol| Job::new(symbol.trim()))
            .collect();

        if jobs.is_empty() {
            return Err(AnalystError::empty_job_list(format!("{name} (0 symbols)")));
        }
        Ok(jobs)
    }

    /// Names of all configured job lists, sorted for stable display.
    pub fn job_list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.config.job_lists.keys().cloned().collect();
        names.sort();
        names
    }

    /// Detect current environment from environment variables:
    /// ANALYST_ENV || RUST_ENV || APP_ENV || 'development'
    pub fn detect_environment() -> String {
        env::var("ANALYST_ENV")
            .or_else(|_| env::var("RUST_ENV"))
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    /// Find the configuration file in a directory
    fn find_config_file(config_directory: &Path) -> ConfigResult<PathBuf> {
        let possible_names = ["analyst-config.yaml", "analyst-config.yml"];
        let mut searched_paths = Vec::new();

        for name in possible_names {
            let config_path = config_directory.join(name);
            searched_paths.push(config_path.clone());

            if config_path.exists() {
                debug!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        Err(ConfigurationError::config_file_not_found(searched_paths))
    }

    /// Load and merge configuration with environment-specific overrides
    fn load_and_merge_config(
        config_file: &Path,
        environment: &str,
    ) -> ConfigResult<AnalystConfig> {
        let yaml_content = std::fs::read_to_string(config_file)
            .map_err(|e| ConfigurationError::file_read_error(config_file.display().to_string(), e))?;

        // Parse as a generic value so environment sections can be merged
        let mut yaml_data: YamlValue = serde_yaml::from_str(&yaml_content)
            .map_err(|e| ConfigurationError::invalid_yaml(config_file.display().to_string(), e))?;

        if let Some(env_overrides) = yaml_data
            .get(YamlValue::String(environment.to_string()))
            .cloned()
        {
            debug!(
                "Applying environment-specific overrides for: {}",
                environment
            );
            Self::merge_yaml_values(&mut yaml_data, env_overrides)
                .map_err(|e| ConfigurationError::merge_error(environment, e))?;
        }

        // Strip environment sections so they do not reach deserialization
        if let YamlValue::Mapping(ref mut map) = yaml_data {
            for section in ENVIRONMENT_SECTIONS {
                map.remove(YamlValue::String(section.to_string()));
            }
        }

        serde_yaml::from_value(yaml_data).map_err(|e| {
            ConfigurationError::invalid_yaml(
                config_file.display().to_string(),
                format!("Failed to deserialize configuration: {e}"),
            )
        })
    }

    /// Recursively merge YAML values (environment overrides into base config)
    fn merge_yaml_values(base: &mut YamlValue, override_value: YamlValue) -> Result<(), String> {
        match (&mut *base, override_value) {
            (YamlValue::Mapping(base_map), YamlValue::Mapping(override_map)) => {
                for (key, value) in override_map {
                    if let Some(existing_value) = base_map.get_mut(&key) {
                        Self::merge_yaml_values(existing_value, value)?;
                    } else {
                        base_map.insert(key, value);
                    }
                }
            }
            (base_ref, override_val) => {
                // Non-mapping values override completely
                *base_ref = override_val;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::types::MarketCategory;
    use std::fs;
    use tempfile::TempDir;

    const TEST_CONFIG_YAML: &str = r#"
batch:
  max_concurrent: 2
  delay_between_requests: 3.0
  max_retries: 3
  batch_delay_multiplier: 2.0
  stop_on_quota_exceeded: true

engine:
  base_url: "http://localhost:8085"
  model: "analyst-v2"
  request_timeout_seconds: 120
  api_key_env: "ANALYSIS_API_KEY"

output:
  directory: "./reports"

delivery:
  enabled: false

job_lists:
  default:
    description: "Large-cap coverage"
    symbols: ["AAPL", "MSFT", "0700.HK"]
  a_share:
    symbols: ["600519"]

test:
  batch:
    delay_between_requests: 0.5
"#;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("analyst-config.yaml");
        fs::write(&path, content).unwrap();
        dir.path().to_path_buf()
    }

    #[test]
    fn test_load_from_directory_reads_base_values() {
        let tmp = TempDir::new().unwrap();
        let dir = write_config(&tmp, TEST_CONFIG_YAML);

        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir), "development").unwrap();

        assert_eq!(manager.environment(), "development");
        assert_eq!(manager.config().batch.max_concurrent, 2);
        assert!((manager.config().batch.delay_between_requests - 3.0).abs() < f64::EPSILON);
        assert_eq!(manager.config().engine.model, "analyst-v2");
    }

    #[test]
    fn test_environment_section_overrides_base() {
        let tmp = TempDir::new().unwrap();
        let dir = write_config(&tmp, TEST_CONFIG_YAML);

        let manager = ConfigManager::load_from_directory_with_env(Some(dir), "test").unwrap();

        // Overridden by the test section
        assert!((manager.config().batch.delay_between_requests - 0.5).abs() < f64::EPSILON);
        // Untouched base values survive the merge
        assert_eq!(manager.config().batch.max_retries, 3);
        assert_eq!(manager.config().engine.model, "analyst-v2");
    }

    #[test]
    fn test_missing_config_file_lists_searched_paths() {
        let tmp = TempDir::new().unwrap();

        let err = ConfigManager::load_from_directory_with_env(
            Some(tmp.path().to_path_buf()),
            "development",
        )
        .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("analyst-config.yaml"));
        assert!(message.contains("analyst-config.yml"));
    }

    #[test]
    fn test_invalid_yaml_is_reported_with_path() {
        let tmp = TempDir::new().unwrap();
        let dir = write_config(&tmp, "batch: [not a mapping");

        let err =
            ConfigManager::load_from_directory_with_env(Some(dir), "development").unwrap_err();

        assert!(matches!(err, ConfigurationError::InvalidYaml { .. }));
    }

    #[test]
    fn test_validation_failure_fails_the_load() {
        let tmp = TempDir::new().unwrap();
        let dir = write_config(
            &tmp,
            r#"
batch:
  max_concurrent: 0
  delay_between_requests: 3.0
  max_retries: 3
  batch_delay_multiplier: 2.0
  stop_on_quota_exceeded: true
"#,
        );

        let err =
            ConfigManager::load_from_directory_with_env(Some(dir), "development").unwrap_err();
        assert!(err.to_string().contains("batch.max_concurrent"));
    }

    #[test]
    fn test_job_list_resolution_detects_markets() {
        let tmp = TempDir::new().unwrap();
        let dir = write_config(&tmp, TEST_CONFIG_YAML);
        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir), "development").unwrap();

        let jobs = manager.job_list("default").unwrap();
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].market, MarketCategory::UsEquity);
        assert_eq!(jobs[2].market, MarketCategory::HkEquity);

        let a_share = manager.job_list("a_share").unwrap();
        assert_eq!(a_share[0].market, MarketCategory::AShare);
    }

    #[test]
    fn test_unknown_job_list_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let dir = write_config(&tmp, TEST_CONFIG_YAML);
        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir), "development").unwrap();

        let err = manager.job_list("nope").unwrap_err();
        assert!(matches!(err, AnalystError::UnknownJobList(_)));
    }

    #[test]
    fn test_job_list_names_are_sorted() {
        let tmp = TempDir::new().unwrap();
        let dir = write_config(&tmp, TEST_CONFIG_YAML);
        let manager =
            ConfigManager::load_from_directory_with_env(Some(dir), "development").unwrap();

        assert_eq!(manager.job_list_names(), vec!["a_share", "default"]);
    }
}
