use chrono::{DateTime, Duration, Utc};
use planweave::core::approval::{
    ApprovalAction, ApprovalActivity, ApprovalDetails, ApprovalInstance, ApprovalStatus,
    Approvers, CriteriaEvaluator, HarnessApprovalDetails,
};
use planweave::core::types::ErrorCategory;
use planweave_types::{ApprovalType, ExecutionStatus};
use serde_json::json;

fn at(text: &str) -> DateTime<Utc> {
    text.parse().unwrap()
}

fn harness_instance(minimum_count: usize) -> ApprovalInstance {
    let details = HarnessApprovalDetails::new(Approvers {
        user_groups: vec!["release-managers".to_string()],
        minimum_count,
        disallow_pipeline_executor: true,
    })
    .with_pipeline_executor("builder");
    ApprovalInstance::new(
        "prod_gate",
        ApprovalDetails::HarnessApproval(details),
        at("2026-03-01T10:00:00Z"),
        Duration::hours(1),
    )
}

const JIRA_INSTANCE: &str = r#"
identifier: ticket_gate
createdAt: "2026-03-01T10:00:00Z"
type: JIRA_APPROVAL
spec:
  issueKey: OPS-7
  approvalCriteria:
    type: KeyValues
    spec:
      conditions:
        - {key: Status, operator: equals, value: Approved}
  rejectionCriteria:
    type: Jexl
    spec:
      expression: issue.Status == "Rejected"
"#;

#[test]
fn test_harness_approval_needs_minimum_count() {
    let mut instance = harness_instance(2);
    let now = at("2026-03-01T10:05:00Z");

    let status = instance
        .record_activity(ApprovalActivity::new("alice", ApprovalAction::Approve, now))
        .unwrap();
    assert_eq!(status, ApprovalStatus::Waiting);

    let status = instance
        .record_activity(
            ApprovalActivity::new("bob", ApprovalAction::Approve, now).with_comments("lgtm"),
        )
        .unwrap();
    assert_eq!(status, ApprovalStatus::Approved);
    assert_eq!(
        instance.final_execution_status().unwrap(),
        ExecutionStatus::Succeeded
    );
}

#[test]
fn test_single_rejection_settles_the_instance() {
    let mut instance = harness_instance(2);
    let now = at("2026-03-01T10:05:00Z");
    let status = instance
        .record_activity(ApprovalActivity::new("carol", ApprovalAction::Reject, now))
        .unwrap();
    assert_eq!(status, ApprovalStatus::Rejected);
    assert_eq!(
        instance.final_execution_status().unwrap(),
        ExecutionStatus::ApprovalRejected
    );

    let err = instance
        .record_activity(ApprovalActivity::new("dave", ApprovalAction::Approve, now))
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::InvalidTransition);
    assert_eq!(err.code, "PLW-APPR-005");
}

#[test]
fn test_duplicate_and_executor_activities_are_rejected() {
    let mut instance = harness_instance(2);
    let now = at("2026-03-01T10:05:00Z");
    instance
        .record_activity(ApprovalActivity::new("alice", ApprovalAction::Approve, now))
        .unwrap();

    let err = instance
        .record_activity(ApprovalActivity::new("alice", ApprovalAction::Approve, now))
        .unwrap_err();
    assert_eq!(err.code, "PLW-APPR-006");

    let err = instance
        .record_activity(ApprovalActivity::new("builder", ApprovalAction::Approve, now))
        .unwrap_err();
    assert_eq!(err.code, "PLW-APPR-006");
    assert_eq!(instance.status, ApprovalStatus::Waiting);
}

#[test]
fn test_waiting_instance_expires_at_deadline() {
    let mut instance = harness_instance(1);
    assert!(!instance.expire_if_due(at("2026-03-01T10:59:59Z")).unwrap());
    assert!(instance.expire_if_due(at("2026-03-01T11:00:00Z")).unwrap());
    assert_eq!(instance.status, ApprovalStatus::Expired);

    let err = instance.final_execution_status().unwrap_err();
    assert_eq!(err.code, "PLW-APPR-004");
    assert!(!instance.expire_if_due(at("2026-03-02T00:00:00Z")).unwrap());
}

#[test]
fn test_terminal_status_is_sticky() {
    let mut instance = harness_instance(1);
    instance.transition_to(ApprovalStatus::Approved).unwrap();
    assert!(!instance.transition_to(ApprovalStatus::Approved).unwrap());
    let err = instance.transition_to(ApprovalStatus::Waiting).unwrap_err();
    assert_eq!(err.code, "PLW-APPR-005");
}

#[test]
fn test_jira_instance_from_yaml_refreshes_from_fields() {
    let mut instance = ApprovalInstance::from_yaml_str(JIRA_INSTANCE).unwrap();
    assert_eq!(instance.approval_type(), ApprovalType::JiraApproval);
    assert!(instance.deadline.is_none());

    instance.apply_default_deadline(600);
    assert_eq!(instance.deadline, Some(at("2026-03-01T10:10:00Z")));

    let evaluator = CriteriaEvaluator::new();
    assert_eq!(
        instance.refresh(&evaluator, None).unwrap(),
        ApprovalStatus::Waiting
    );
    assert_eq!(
        instance
            .refresh(&evaluator, Some(&json!({"Status": "In Progress"})))
            .unwrap(),
        ApprovalStatus::Waiting
    );
    assert_eq!(
        instance
            .refresh(&evaluator, Some(&json!({"Status": "Rejected"})))
            .unwrap(),
        ApprovalStatus::Rejected
    );
}

#[test]
fn test_evaluation_error_fails_the_instance() {
    let mut instance = ApprovalInstance::from_yaml_str(JIRA_INSTANCE).unwrap();
    let status = instance
        .refresh(&CriteriaEvaluator::new(), Some(&json!({"Resolution": "Done"})))
        .unwrap();
    assert_eq!(status, ApprovalStatus::Failed);
    assert!(instance
        .error_message
        .as_deref()
        .unwrap()
        .contains("Status"));
    assert_eq!(
        instance.final_execution_status().unwrap(),
        ExecutionStatus::Failed
    );
}

#[test]
fn test_activities_do_not_apply_to_ticket_approvals() {
    let mut instance = ApprovalInstance::from_yaml_str(JIRA_INSTANCE).unwrap();
    let err = instance
        .record_activity(ApprovalActivity::new(
            "alice",
            ApprovalAction::Approve,
            Utc::now(),
        ))
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::UnsupportedOperation);
}

#[test]
fn test_instance_round_trips_through_json() {
    let instance = harness_instance(1);
    let value = serde_json::to_value(&instance).unwrap();
    assert_eq!(value["type"], "HARNESS_APPROVAL");
    assert_eq!(value["status"], "WAITING");
    assert_eq!(value["spec"]["approvers"]["minimumCount"], 1);

    let parsed: ApprovalInstance = serde_json::from_value(value).unwrap();
    assert_eq!(parsed, instance);
}

#[test]
fn test_empty_jira_criteria_fail_validation() {
    let text = JIRA_INSTANCE.replace(
        "      conditions:\n        - {key: Status, operator: equals, value: Approved}\n",
        "      conditions: []\n",
    );
    let err = ApprovalInstance::from_yaml_str(&text).unwrap_err();
    assert_eq!(err.code, "PLW-APPR-001");
}
