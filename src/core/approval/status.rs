#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use planweave_types::ExecutionStatus;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle state of an approval instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    #[default]
    Waiting,
    Approved,
    Rejected,
    Failed,
    Expired,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Waiting => "WAITING",
            ApprovalStatus::Approved => "APPROVED",
            ApprovalStatus::Rejected => "REJECTED",
            ApprovalStatus::Failed => "FAILED",
            ApprovalStatus::Expired => "EXPIRED",
        }
    }

    /// Every status other than WAITING. EXPIRED is included even though it has
    /// no final execution status.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Waiting)
    }

    /// Status reported to the hosting pipeline once the approval has settled.
    pub fn to_final_execution_status(&self) -> Result<ExecutionStatus, AppError> {
        match self {
            ApprovalStatus::Approved => Ok(ExecutionStatus::Succeeded),
            ApprovalStatus::Rejected => Ok(ExecutionStatus::ApprovalRejected),
            ApprovalStatus::Failed => Ok(ExecutionStatus::Failed),
            ApprovalStatus::Waiting | ApprovalStatus::Expired => Err(AppError::new(
                ErrorCategory::UnsupportedOperation,
                format!(
                    "approval status {} has no final execution status",
                    self.as_str()
                ),
            )
            .with_code("PLW-APPR-004")),
        }
    }

    /// Check a transition from `self` to `next`.
    ///
    /// Returns `Ok(true)` when the status changes and `Ok(false)` when nothing
    /// happens: WAITING to WAITING, or a terminal status re-applied to itself.
    /// Moving a terminal status anywhere else is an `InvalidTransition` error.
    pub fn check_transition(&self, next: ApprovalStatus) -> Result<bool, AppError> {
        if *self == next {
            return Ok(false);
        }
        if self.is_terminal() {
            return Err(AppError::new(
                ErrorCategory::InvalidTransition,
                format!(
                    "approval already settled as {}; cannot move to {}",
                    self.as_str(),
                    next.as_str()
                ),
            )
            .with_code("PLW-APPR-005"));
        }
        Ok(true)
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_uppercase().as_str() {
            "WAITING" => Ok(ApprovalStatus::Waiting),
            "APPROVED" => Ok(ApprovalStatus::Approved),
            "REJECTED" => Ok(ApprovalStatus::Rejected),
            "FAILED" => Ok(ApprovalStatus::Failed),
            "EXPIRED" => Ok(ApprovalStatus::Expired),
            _ => Err("must be one of WAITING, APPROVED, REJECTED, FAILED, EXPIRED"),
        }
    }
}
