#![allow(clippy::result_large_err)]

use crate::core::config::PlanConfigSection;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use indexmap::IndexMap;
use planweave_types::FacilitatorType;

/// Picks the facilitator for leaf step nodes.
#[derive(Debug, Clone, Default)]
pub struct FacilitatorRegistry {
    overrides: IndexMap<String, FacilitatorType>,
}

impl FacilitatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry with the `[plan.facilitators]` overrides applied.
    pub fn from_config(config: &PlanConfigSection) -> Result<Self, AppError> {
        let mut registry = Self::new();
        for (step_type, facilitator) in &config.facilitators {
            let facilitator = facilitator.parse::<FacilitatorType>().map_err(|err| {
                AppError::new(
                    ErrorCategory::InvalidConfiguration,
                    format!("plan.facilitators.{}: {}", step_type, err),
                )
            })?;
            registry.register(step_type.clone(), facilitator);
        }
        Ok(registry)
    }

    pub fn register(&mut self, step_type: impl Into<String>, facilitator: FacilitatorType) {
        self.overrides.insert(step_type.into(), facilitator);
    }

    pub fn resolve(&self, step_type: &str) -> FacilitatorType {
        if let Some(facilitator) = self.overrides.get(step_type) {
            return *facilitator;
        }
        Self::default_for(step_type)
    }

    /// Approvals and waits block on a callback; scripts and calls run as delegate tasks.
    pub fn default_for(step_type: &str) -> FacilitatorType {
        match step_type {
            "HarnessApproval" | "JiraApproval" | "Wait" => FacilitatorType::Async,
            "ShellScript" | "Http" | "Run" => FacilitatorType::Task,
            _ => FacilitatorType::Sync,
        }
    }
}
