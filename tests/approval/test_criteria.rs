use planweave::core::approval::{Condition, ConditionOperator, CriteriaEvaluator, CriteriaSpec};
use planweave::core::types::ErrorCategory;
use serde_json::json;

fn fields() -> serde_json::Value {
    json!({
        "Status": "In Review",
        "Priority": "High",
        "StoryPoints": 5,
        "Labels": "backend"
    })
}

#[test]
fn test_key_values_from_yaml_all_conditions() {
    let spec = CriteriaSpec::from_yaml_str(
        r#"
type: KeyValues
spec:
  matchAnyCondition: false
  conditions:
    - key: Status
      operator: equals
      value: In Review
    - key: Priority
      operator: in
      value: "Low, High"
"#,
        false,
    )
    .unwrap();

    assert!(CriteriaEvaluator::new().evaluate(&spec, &fields()).unwrap());
}

#[test]
fn test_key_values_match_any() {
    let spec = CriteriaSpec::key_values(
        vec![
            Condition::new("Status", ConditionOperator::Equals, "Done"),
            Condition::new("Priority", ConditionOperator::NotIn, "Low,Medium"),
        ],
        true,
        false,
    )
    .unwrap();
    assert!(CriteriaEvaluator::new().evaluate(&spec, &fields()).unwrap());

    let strict = CriteriaSpec::key_values(
        vec![
            Condition::new("Status", ConditionOperator::Equals, "Done"),
            Condition::new("Priority", ConditionOperator::NotIn, "Low,Medium"),
        ],
        false,
        false,
    )
    .unwrap();
    assert!(!CriteriaEvaluator::new().evaluate(&strict, &fields()).unwrap());
}

#[test]
fn test_numbers_compare_by_text() {
    let spec = CriteriaSpec::key_values(
        vec![
            Condition::new("StoryPoints", ConditionOperator::Equals, "5"),
            Condition::new("Labels", ConditionOperator::NotEquals, "frontend"),
        ],
        false,
        false,
    )
    .unwrap();
    assert!(CriteriaEvaluator::new().evaluate(&spec, &fields()).unwrap());
}

#[test]
fn test_missing_key_is_an_error() {
    let spec = CriteriaSpec::key_values(
        vec![Condition::new("Assignee", ConditionOperator::Equals, "ops")],
        false,
        false,
    )
    .unwrap();
    let err = CriteriaEvaluator::new().evaluate(&spec, &fields()).unwrap_err();
    assert_eq!(err.code, "PLW-APPR-002");
    assert!(err.message.contains("Assignee"));
}

#[test]
fn test_jexl_binds_issue_and_context() {
    let evaluator = CriteriaEvaluator::new();
    let spec = CriteriaSpec::jexl("issue.Status == \"In Review\" && context.StoryPoints > 3");
    assert!(evaluator.evaluate(&spec, &fields()).unwrap());

    let spec = CriteriaSpec::jexl("issue.Priority == \"Low\"");
    assert!(!evaluator.evaluate(&spec, &fields()).unwrap());
}

#[test]
fn test_jexl_must_yield_boolean() {
    let err = CriteriaEvaluator::new()
        .evaluate(&CriteriaSpec::jexl("issue.StoryPoints + 1"), &fields())
        .unwrap_err();
    assert_eq!(err.code, "PLW-APPR-003");
}

#[test]
fn test_jexl_syntax_error_is_an_expression_error() {
    let err = CriteriaEvaluator::new()
        .evaluate(&CriteriaSpec::jexl("issue.Status =="), &fields())
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::ExpressionError);
}

#[test]
fn test_empty_criteria_rejected_unless_skipped() {
    let err = CriteriaSpec::key_values(Vec::new(), false, false).unwrap_err();
    assert_eq!(err.code, "PLW-APPR-001");

    let err = CriteriaSpec::from_yaml_str("type: Jexl\nspec:\n  expression: \"  \"\n", false)
        .unwrap_err();
    assert_eq!(err.code, "PLW-APPR-001");

    let skipped = CriteriaSpec::key_values(Vec::new(), false, true).unwrap();
    assert!(skipped.is_empty());
    let err = CriteriaEvaluator::new().evaluate(&skipped, &fields()).unwrap_err();
    assert_eq!(err.code, "PLW-APPR-001");
}

#[test]
fn test_unknown_operator_fails_to_parse() {
    let err = CriteriaSpec::from_yaml_str(
        "type: KeyValues\nspec:\n  conditions:\n    - {key: Status, operator: contains, value: x}\n",
        false,
    )
    .unwrap_err();
    assert_eq!(err.category, ErrorCategory::SerializationError);
}

#[test]
fn test_in_accepts_a_yaml_list_value() {
    let spec = CriteriaSpec::from_yaml_str(
        r#"
type: KeyValues
spec:
  conditions:
    - key: Status
      operator: in
      value: [Done, In Review]
    - key: StoryPoints
      operator: not in
      value: [8, 13]
"#,
        false,
    )
    .unwrap();

    assert!(CriteriaEvaluator::new().evaluate(&spec, &fields()).unwrap());
}
