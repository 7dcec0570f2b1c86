#![allow(clippy::result_large_err)]

use super::PlanweaveConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "planweave.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from workspace root (workspace/planweave.toml)
    /// Environment variables override config file values
    pub fn load_from_workspace(workspace_path: &Path) -> Result<PlanweaveConfig, AppError> {
        let config_path = workspace_path.join(CONFIG_FILE_NAME);
        let config_file = Self::load_from_file(&config_path)?;

        let mut config = config_file.unwrap_or_default();
        Self::apply_env_overrides(&mut config);

        tracing::debug!(
            path = %config_path.display(),
            max_expansion_limit = config.strategy.max_expansion_limit,
            "loaded planweave configuration"
        );
        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<PlanweaveConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: PlanweaveConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
        })?;

        Ok(Some(config))
    }

    /// Apply environment variable overrides to the configuration.
    /// Unparseable values are ignored.
    fn apply_env_overrides(config: &mut PlanweaveConfig) {
        if let Ok(limit) = env::var("PLANWEAVE_MAX_EXPANSION_LIMIT") {
            if let Ok(limit) = limit.trim().parse::<usize>() {
                config.strategy.max_expansion_limit = limit;
            }
        }

        if let Ok(ceiling) = env::var("PLANWEAVE_MAX_CONCURRENCY_CEILING") {
            if let Ok(ceiling) = ceiling.trim().parse::<usize>() {
                config.strategy.max_concurrency_ceiling = Some(ceiling);
            }
        }

        if let Ok(timeout) = env::var("PLANWEAVE_APPROVAL_TIMEOUT_SECONDS") {
            if let Ok(timeout) = timeout.trim().parse::<u64>() {
                config.approval.default_timeout_seconds = timeout;
            }
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "PLANWEAVE_MAX_EXPANSION_LIMIT - Override the strategy expansion limit (default: 10000)",
            "PLANWEAVE_MAX_CONCURRENCY_CEILING - Cap every strategy's max concurrency",
            "PLANWEAVE_APPROVAL_TIMEOUT_SECONDS - Override the default approval deadline (default: 86400)",
        ]
    }
}
