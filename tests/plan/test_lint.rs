use planweave::core::config::PlanweaveConfig;
use planweave::core::plan::{LintRegistry, LintResult, LintSeverity, PipelineDocument};

fn lint_with(config: PlanweaveConfig, text: &str) -> Vec<LintResult> {
    let document = PipelineDocument::parse_yaml(text).unwrap();
    LintRegistry::new(config).run(&document)
}

fn lint(text: &str) -> Vec<LintResult> {
    lint_with(PlanweaveConfig::default(), text)
}

fn codes(results: &[LintResult]) -> Vec<&str> {
    results.iter().map(|result| result.code.as_str()).collect()
}

const CLEAN: &str = r#"
pipeline:
  identifier: clean
  variables:
    regions: [us, eu]
  stages:
    - stage:
        identifier: deploy
        type: Deployment
        strategy:
          matrix:
            region:
              $expr: context.regions
            maxConcurrency: 2
        spec:
          execution:
            steps:
              - step:
                  identifier: rollout
                  type: ShellScript
                  spec: {script: "deploy <+matrix.region>"}
              - step:
                  identifier: ticket
                  type: JiraApproval
                  spec:
                    issueKey: OPS-1
                    approvalCriteria:
                      type: Jexl
                      spec: {expression: "issue.Status == \"Done\""}
"#;

#[test]
fn test_clean_pipeline_has_no_findings() {
    assert!(lint(CLEAN).is_empty());
}

#[test]
fn test_matrix_axis_problems() {
    let results = lint(
        r#"
pipeline:
  identifier: p
  stages:
    - stage:
        identifier: s
        type: CI
        strategy:
          matrix:
            os: [linux]
            exclude:
              - arch: arm64
        spec:
          execution:
            steps:
              - step: {identifier: a, type: Run}
"#,
    );
    assert_eq!(codes(&results), vec!["PLW-LINT-002"]);
    assert_eq!(results[0].location.as_deref(), Some("stage:s"));
    assert!(results[0].message.contains("arch"));
}

#[test]
fn test_expansion_limit_uses_configured_limit() {
    let text = r#"
pipeline:
  identifier: p
  stages:
    - stage:
        identifier: s
        type: CI
        spec:
          execution:
            steps:
              - step:
                  identifier: shard
                  type: Run
                  strategy:
                    for: {iterations: 50}
"#;
    assert!(lint(text).is_empty());

    let mut config = PlanweaveConfig::default();
    config.strategy.max_expansion_limit = 10;
    let results = lint_with(config, text);
    assert_eq!(codes(&results), vec!["PLW-LINT-003"]);
    assert_eq!(results[0].location.as_deref(), Some("stage:s/step:shard"));
}

#[test]
fn test_max_concurrency_zero_and_over_ceiling() {
    let text = r#"
pipeline:
  identifier: p
  stages:
    - stage:
        identifier: s
        type: CI
        strategy:
          repeat: {items: [a, b], maxConcurrency: 0}
        spec:
          execution:
            steps:
              - step:
                  identifier: t
                  type: Run
                  strategy:
                    for: {iterations: 8, maxConcurrency: 8}
"#;
    let mut config = PlanweaveConfig::default();
    config.strategy.max_concurrency_ceiling = Some(4);
    let results = lint_with(config, text);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].severity, LintSeverity::Error);
    assert_eq!(results[0].location.as_deref(), Some("stage:s"));
    assert_eq!(results[1].severity, LintSeverity::Warning);
    assert_eq!(results[1].location.as_deref(), Some("stage:s/step:t"));
}

#[test]
fn test_approval_criteria_findings() {
    let results = lint(
        r#"
pipeline:
  identifier: p
  stages:
    - stage:
        identifier: gate
        type: Approval
        spec:
          execution:
            steps:
              - step:
                  identifier: manual
                  type: HarnessApproval
                  spec:
                    approvers: {minimumCount: 0}
              - step:
                  identifier: ticket
                  type: JiraApproval
                  spec:
                    issueKey: OPS-2
                    approvalCriteria:
                      type: KeyValues
                      spec: {conditions: []}
                    rejectionCriteria:
                      type: Jexl
                      spec: {expression: "issue.Status =="}
"#,
    );

    assert_eq!(
        codes(&results),
        vec!["PLW-LINT-005", "PLW-LINT-005", "PLW-LINT-007"]
    );
    let locations: Vec<&str> = results
        .iter()
        .filter_map(|result| result.location.as_deref())
        .collect();
    assert_eq!(
        locations,
        vec!["stage:gate/step:manual", "stage:gate/step:ticket", "stage:gate/step:ticket"]
    );
}

#[test]
fn test_results_sorted_errors_first() {
    let results = lint(
        r#"
pipeline:
  identifier: p
  stages:
    - stage:
        identifier: s
        type: CI
        spec:
          execution:
            steps:
              - step:
                  identifier: a
                  type: Run
                  spec: {cmd: "echo <+matrix.os>"}
              - step: {identifier: a, type: Run}
"#,
    );
    assert_eq!(codes(&results), vec!["PLW-LINT-001", "PLW-LINT-006"]);
    assert_eq!(results[0].severity, LintSeverity::Error);
    assert_eq!(results[1].severity, LintSeverity::Warning);
}

#[test]
fn test_results_serialize_for_json_output() {
    let results = lint(
        r#"
pipeline:
  identifier: p
  stages:
    - stage:
        identifier: s
        type: CI
        spec:
          execution:
            steps:
              - step: {identifier: a, type: Run}
              - step: {identifier: a, type: Run}
"#,
    );
    let value = serde_json::to_value(&results).unwrap();
    assert_eq!(value[0]["code"], "PLW-LINT-001");
    assert_eq!(value[0]["severity"], "error");
    assert_eq!(value[0]["location"], "stage:s/step:a");
}
