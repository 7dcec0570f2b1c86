pub mod approval;
pub mod config;
pub mod error;
pub mod expression;
pub mod plan;
pub mod strategy;
pub mod types;

pub use approval::{
    ApprovalDetails, ApprovalInstance, ApprovalStatus, CriteriaEvaluator, CriteriaSpec,
};
pub use config::{ConfigLoader, PlanweaveConfig};
pub use error::{AppError, DefaultErrorReporter, ErrorReporter};
pub use expression::{EvaluationContext, ExpressionEngine};
pub use plan::{create_execution_plan, CreateExecutionPlanResponse, PipelineDocument, PlanNode};
pub use strategy::{StrategyConfig, StrategyEngine};
pub use types::*;
