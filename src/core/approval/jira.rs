#![allow(clippy::result_large_err)]

use crate::core::approval::criteria::{CriteriaEvaluator, CriteriaSpec};
use crate::core::approval::status::ApprovalStatus;
use crate::core::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Approval driven by the fields of an external ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraApprovalDetails {
    pub issue_key: String,
    pub approval_criteria: CriteriaSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_criteria: Option<CriteriaSpec>,
}

impl JiraApprovalDetails {
    pub fn validate(&self) -> Result<(), AppError> {
        self.approval_criteria.validate(false)?;
        if let Some(rejection) = &self.rejection_criteria {
            rejection.validate(false)?;
        }
        Ok(())
    }

    /// Approval criteria are checked first; rejection only when approval does not hold.
    pub fn evaluate(
        &self,
        evaluator: &CriteriaEvaluator,
        fields: &Value,
    ) -> Result<ApprovalStatus, AppError> {
        if evaluator.evaluate(&self.approval_criteria, fields)? {
            return Ok(ApprovalStatus::Approved);
        }
        if let Some(rejection) = &self.rejection_criteria {
            if evaluator.evaluate(rejection, fields)? {
                return Ok(ApprovalStatus::Rejected);
            }
        }
        Ok(ApprovalStatus::Waiting)
    }
}
