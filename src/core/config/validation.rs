#![allow(clippy::result_large_err)]

use super::PlanweaveConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use planweave_types::FacilitatorType;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &PlanweaveConfig) -> Result<(), AppError> {
        if config.strategy.max_expansion_limit == 0 {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "strategy.max_expansion_limit must be >= 1",
            ));
        }

        if config.strategy.max_concurrency_ceiling == Some(0) {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "strategy.max_concurrency_ceiling must be >= 1 when set",
            ));
        }

        if config.approval.default_timeout_seconds == 0 {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "approval.default_timeout_seconds must be >= 1",
            ));
        }

        for (step_type, facilitator) in &config.plan.facilitators {
            facilitator.parse::<FacilitatorType>().map_err(|err| {
                AppError::new(
                    ErrorCategory::ValidationError,
                    format!("plan.facilitators.{}: {}", step_type, err),
                )
            })?;
        }

        Ok(())
    }
}
