//! Approval instances, their criteria and the status state machine.

#![allow(clippy::result_large_err)]

pub mod criteria;
pub mod harness;
pub mod jira;
pub mod status;

pub use criteria::{
    Condition, ConditionOperator, CriteriaEvaluator, CriteriaSpec, JexlCriteria,
    KeyValuesCriteria,
};
pub use harness::{ApprovalAction, ApprovalActivity, Approvers, HarnessApprovalDetails};
pub use jira::JiraApprovalDetails;
pub use status::ApprovalStatus;

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use chrono::{DateTime, Duration, Utc};
use planweave_types::{ApprovalType, ExecutionStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Type-specific part of an approval instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "spec", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalDetails {
    HarnessApproval(HarnessApprovalDetails),
    JiraApproval(JiraApprovalDetails),
}

impl ApprovalDetails {
    pub fn approval_type(&self) -> ApprovalType {
        match self {
            ApprovalDetails::HarnessApproval(_) => ApprovalType::HarnessApproval,
            ApprovalDetails::JiraApproval(_) => ApprovalType::JiraApproval,
        }
    }
}

/// A pending or settled approval attached to one step execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalInstance {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub identifier: String,
    #[serde(default)]
    pub status: ApprovalStatus,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(flatten)]
    pub details: ApprovalDetails,
}

impl ApprovalInstance {
    /// New WAITING instance whose deadline is `timeout` after `created_at`.
    pub fn new(
        identifier: impl Into<String>,
        details: ApprovalDetails,
        created_at: DateTime<Utc>,
        timeout: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            identifier: identifier.into(),
            status: ApprovalStatus::Waiting,
            created_at,
            deadline: Some(created_at + timeout),
            error_message: None,
            details,
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, AppError> {
        let instance: ApprovalInstance = serde_yaml::from_str(text).map_err(|err| {
            AppError::new(
                ErrorCategory::SerializationError,
                format!("invalid approval instance: {}", err),
            )
        })?;
        instance.validate()?;
        Ok(instance)
    }

    pub fn approval_type(&self) -> ApprovalType {
        self.details.approval_type()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.identifier.trim().is_empty() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "approval identifier must not be empty",
            ));
        }
        match &self.details {
            ApprovalDetails::HarnessApproval(harness) => harness.validate(),
            ApprovalDetails::JiraApproval(jira) => jira.validate(),
        }
    }

    /// Fill a missing deadline from the configured default timeout.
    pub fn apply_default_deadline(&mut self, timeout_seconds: u64) {
        if self.deadline.is_none() {
            let seconds = i64::try_from(timeout_seconds).unwrap_or(i64::MAX);
            self.deadline = Some(self.created_at + Duration::seconds(seconds));
        }
    }

    /// Apply a status change. Returns whether the status actually changed.
    pub fn transition_to(&mut self, next: ApprovalStatus) -> Result<bool, AppError> {
        let changed = self.status.check_transition(next)?;
        if changed {
            tracing::info!(
                approval = %self.identifier,
                from = %self.status,
                to = %next,
                "approval status changed"
            );
            self.status = next;
        }
        Ok(changed)
    }

    /// Move a WAITING instance to EXPIRED once `now` reaches its deadline.
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> Result<bool, AppError> {
        match self.deadline {
            Some(deadline) if self.status == ApprovalStatus::Waiting && now >= deadline => {
                self.transition_to(ApprovalStatus::Expired)
            }
            _ => Ok(false),
        }
    }

    /// Record a user decision on a manual approval and recompute its status.
    pub fn record_activity(&mut self, activity: ApprovalActivity) -> Result<ApprovalStatus, AppError> {
        if self.status.is_terminal() {
            return Err(AppError::new(
                ErrorCategory::InvalidTransition,
                format!(
                    "approval '{}' is already {}; no further activity is accepted",
                    self.identifier, self.status
                ),
            )
            .with_code("PLW-APPR-005"));
        }
        let next = match &mut self.details {
            ApprovalDetails::HarnessApproval(harness) => {
                harness.add_activity(activity)?;
                harness.status()
            }
            ApprovalDetails::JiraApproval(_) => {
                return Err(AppError::new(
                    ErrorCategory::UnsupportedOperation,
                    "user activities only apply to HARNESS_APPROVAL instances",
                ))
            }
        };
        self.transition_to(next)?;
        Ok(self.status)
    }

    /// Re-evaluate a WAITING instance. Ticket approvals need the polled `fields`;
    /// an evaluation error fails the instance and keeps the message.
    pub fn refresh(
        &mut self,
        evaluator: &CriteriaEvaluator,
        fields: Option<&Value>,
    ) -> Result<ApprovalStatus, AppError> {
        if self.status.is_terminal() {
            return Ok(self.status);
        }
        let outcome = match &self.details {
            ApprovalDetails::HarnessApproval(harness) => {
                harness.validate()?;
                Ok(harness.status())
            }
            ApprovalDetails::JiraApproval(jira) => match fields {
                Some(fields) => jira.evaluate(evaluator, fields),
                None => Ok(ApprovalStatus::Waiting),
            },
        };
        match outcome {
            Ok(next) => {
                self.transition_to(next)?;
            }
            Err(err) => {
                tracing::warn!(
                    approval = %self.identifier,
                    error = %err.message,
                    "approval criteria evaluation failed"
                );
                self.error_message = Some(err.message.clone());
                self.transition_to(ApprovalStatus::Failed)?;
            }
        }
        Ok(self.status)
    }

    pub fn final_execution_status(&self) -> Result<ExecutionStatus, AppError> {
        self.status.to_final_execution_status()
    }
}
