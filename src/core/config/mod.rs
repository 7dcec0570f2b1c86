use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Main planweave configuration loaded from planweave.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlanweaveConfig {
    /// Strategy expansion configuration
    #[serde(default)]
    pub strategy: StrategyConfigSection,

    /// Approval evaluation configuration
    #[serde(default)]
    pub approval: ApprovalConfigSection,

    /// Plan assembly configuration
    #[serde(default)]
    pub plan: PlanConfigSection,
}

/// Strategy expansion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfigSection {
    /// Upper bound on the children a single strategy may expand into
    #[serde(default = "default_max_expansion_limit")]
    pub max_expansion_limit: usize,

    /// Administrative ceiling applied to every strategy's max concurrency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency_ceiling: Option<usize>,
}

/// Approval evaluation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfigSection {
    /// Deadline applied to new approval instances that do not carry one
    #[serde(default = "default_approval_timeout_seconds")]
    pub default_timeout_seconds: u64,
}

/// Plan assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlanConfigSection {
    /// Step type to facilitator overrides, e.g. `CustomDeploy = "task"`
    #[serde(default)]
    pub facilitators: IndexMap<String, String>,
}

fn default_max_expansion_limit() -> usize {
    10_000
}

fn default_approval_timeout_seconds() -> u64 {
    86_400
}

impl Default for StrategyConfigSection {
    fn default() -> Self {
        StrategyConfigSection {
            max_expansion_limit: default_max_expansion_limit(),
            max_concurrency_ceiling: None,
        }
    }
}

impl Default for ApprovalConfigSection {
    fn default() -> Self {
        ApprovalConfigSection {
            default_timeout_seconds: default_approval_timeout_seconds(),
        }
    }
}


pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;
