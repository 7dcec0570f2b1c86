//! Hand-off types shared between planweave and the runtime that executes its output.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Final status reported to the hosting pipeline for a finished node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Succeeded,
    Failed,
    ApprovalRejected,
    Expired,
    Aborted,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Succeeded => "SUCCEEDED",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::ApprovalRejected => "APPROVAL_REJECTED",
            ExecutionStatus::Expired => "EXPIRED",
            ExecutionStatus::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduling hint attached to every plan node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FacilitatorType {
    /// Run to completion inline.
    Sync,
    /// Hand off to a delegate task and wait for its response.
    Task,
    /// Wait for an external callback.
    Async,
    /// Spawn exactly one child.
    Child,
    /// Spawn all children, possibly concurrently.
    Children,
    /// Spawn children one after another.
    ChildChain,
}

impl FacilitatorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacilitatorType::Sync => "SYNC",
            FacilitatorType::Task => "TASK",
            FacilitatorType::Async => "ASYNC",
            FacilitatorType::Child => "CHILD",
            FacilitatorType::Children => "CHILDREN",
            FacilitatorType::ChildChain => "CHILD_CHAIN",
        }
    }
}

impl fmt::Display for FacilitatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FacilitatorType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "SYNC" => Ok(FacilitatorType::Sync),
            "TASK" => Ok(FacilitatorType::Task),
            "ASYNC" => Ok(FacilitatorType::Async),
            "CHILD" => Ok(FacilitatorType::Child),
            "CHILDREN" => Ok(FacilitatorType::Children),
            "CHILD_CHAIN" => Ok(FacilitatorType::ChildChain),
            _ => Err(format!(
                "unknown facilitator '{}'; expected one of sync, task, async, child, children, child_chain",
                value
            )),
        }
    }
}

/// Kind of approval an instance waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalType {
    HarnessApproval,
    JiraApproval,
}

/// Strategy-specific data attached to one expanded child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IterationMetadata {
    #[serde(rename_all = "camelCase")]
    Matrix {
        axis_values: IndexMap<String, Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_name: Option<String>,
    },
    For,
    Repeat {
        item: Value,
    },
}

/// Position of a child within its strategy expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyMetadata {
    pub current_iteration: usize,
    pub total_iterations: usize,
    pub identifier_postfix: String,
    #[serde(flatten)]
    pub iteration: IterationMetadata,
}

impl StrategyMetadata {
    /// Selected axis values when the child came from a matrix.
    pub fn axis_values(&self) -> Option<&IndexMap<String, Value>> {
        match &self.iteration {
            IterationMetadata::Matrix { axis_values, .. } => Some(axis_values),
            _ => None,
        }
    }
}

/// Reference to one child execution of a strategy node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    pub child_node_id: Uuid,
    pub strategy_metadata: StrategyMetadata,
}
