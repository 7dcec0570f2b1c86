#![allow(clippy::result_large_err)]

use crate::core::approval::status::ApprovalStatus;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn default_minimum_count() -> usize {
    1
}

/// Who may approve and how many distinct approvals are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approvers {
    #[serde(default)]
    pub user_groups: Vec<String>,
    #[serde(default = "default_minimum_count")]
    pub minimum_count: usize,
    #[serde(default)]
    pub disallow_pipeline_executor: bool,
}

impl Default for Approvers {
    fn default() -> Self {
        Self {
            user_groups: Vec::new(),
            minimum_count: default_minimum_count(),
            disallow_pipeline_executor: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalAction {
    Approve,
    Reject,
}

/// One recorded approve/reject decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalActivity {
    pub user: String,
    pub action: ApprovalAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub at: DateTime<Utc>,
}

impl ApprovalActivity {
    pub fn new(user: impl Into<String>, action: ApprovalAction, at: DateTime<Utc>) -> Self {
        Self {
            user: user.into(),
            action,
            comments: None,
            at,
        }
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }
}

/// Manual approval collected from users.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarnessApprovalDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_message: Option<String>,
    #[serde(default)]
    pub approvers: Approvers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_executor: Option<String>,
    #[serde(default)]
    pub activities: Vec<ApprovalActivity>,
}

fn activity_rejected(message: String) -> AppError {
    AppError::new(ErrorCategory::ValidationError, message).with_code("PLW-APPR-006")
}

impl HarnessApprovalDetails {
    pub fn new(approvers: Approvers) -> Self {
        Self {
            approvers,
            ..Default::default()
        }
    }

    pub fn with_pipeline_executor(mut self, user: impl Into<String>) -> Self {
        self.pipeline_executor = Some(user.into());
        self
    }

    fn check_activity(&self, activity: &ApprovalActivity, seen: &HashSet<&str>) -> Result<(), AppError> {
        if activity.user.trim().is_empty() {
            return Err(activity_rejected(
                "approval activity must name a user".to_string(),
            ));
        }
        if seen.contains(activity.user.as_str()) {
            return Err(activity_rejected(format!(
                "user '{}' has already acted on this approval",
                activity.user
            )));
        }
        if self.approvers.disallow_pipeline_executor
            && self.pipeline_executor.as_deref() == Some(activity.user.as_str())
        {
            return Err(activity_rejected(format!(
                "pipeline executor '{}' is not allowed to approve",
                activity.user
            )));
        }
        Ok(())
    }

    /// Check the configuration and every recorded activity.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.approvers.minimum_count == 0 {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "approvers.minimumCount must be >= 1",
            ));
        }
        let mut seen = HashSet::new();
        for activity in &self.activities {
            self.check_activity(activity, &seen)?;
            seen.insert(activity.user.as_str());
        }
        Ok(())
    }

    /// Record a decision after checking it against earlier ones.
    pub fn add_activity(&mut self, activity: ApprovalActivity) -> Result<(), AppError> {
        let seen: HashSet<&str> = self.activities.iter().map(|a| a.user.as_str()).collect();
        self.check_activity(&activity, &seen)?;
        self.activities.push(activity);
        Ok(())
    }

    /// Any rejection wins; otherwise approved once enough distinct users approved.
    pub fn status(&self) -> ApprovalStatus {
        if self
            .activities
            .iter()
            .any(|activity| activity.action == ApprovalAction::Reject)
        {
            return ApprovalStatus::Rejected;
        }
        let approvals: HashSet<&str> = self
            .activities
            .iter()
            .filter(|activity| activity.action == ApprovalAction::Approve)
            .map(|activity| activity.user.as_str())
            .collect();
        if approvals.len() >= self.approvers.minimum_count.max(1) {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Waiting
        }
    }
}
