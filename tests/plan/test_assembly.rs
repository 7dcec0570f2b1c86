use planweave::core::config::PlanweaveConfig;
use planweave::core::plan::{
    create_execution_plan, unreachable_nodes, CreateExecutionPlanResponse, NodeGroup,
    NodeParameters, PipelineDocument, NG_FORK, PIPELINE_SECTION, STRATEGY,
};
use planweave::core::types::ErrorCategory;
use planweave_types::FacilitatorType;

const DEPLOY_PIPELINE: &str = r#"
pipeline:
  identifier: release
  name: Release
  stages:
    - stage:
        identifier: build
        name: Build
        type: CI
        spec:
          execution:
            steps:
              - step: {identifier: compile, type: Run, timeout: 10m}
              - parallel:
                  - step: {identifier: unit, type: Run}
                  - step: {identifier: lint, type: ShellScript}
    - parallel:
        - stage:
            identifier: deploy_eu
            type: Deployment
            spec:
              execution:
                steps:
                  - step: {identifier: rollout, type: K8sRollingDeploy}
        - stage:
            identifier: deploy_us
            type: Deployment
            strategy:
              matrix:
                zone: [east, west]
                maxConcurrency: 1
            spec:
              execution:
                steps:
                  - step:
                      identifier: rollout
                      type: K8sRollingDeploy
                      spec: {zone: "<+matrix.zone>"}
    - stage:
        identifier: signoff
        type: Approval
        spec:
          execution:
            steps:
              - step:
                  identifier: gate
                  type: HarnessApproval
                  spec:
                    approvers: {minimumCount: 1}
"#;

fn assemble(text: &str) -> CreateExecutionPlanResponse {
    let document = PipelineDocument::from_yaml_str(text).unwrap();
    create_execution_plan(&document, &PlanweaveConfig::default()).unwrap()
}

#[test]
fn test_pipeline_root_starts_the_stage_chain() {
    let plan = assemble(DEPLOY_PIPELINE);
    let root = plan.starting_node().unwrap();
    assert_eq!(root.identifier, "release");
    assert_eq!(root.step_type, PIPELINE_SECTION);
    assert_eq!(root.facilitator, FacilitatorType::Child);

    let stages = plan.node(&root.parameters.child_ids()[0]).unwrap();
    assert_eq!(stages.facilitator, FacilitatorType::ChildChain);
    match &stages.parameters {
        NodeParameters::SectionChain { child_node_ids } => assert_eq!(child_node_ids.len(), 3),
        other => panic!("expected section chain, got {:?}", other),
    }
    assert!(unreachable_nodes(&plan).is_empty());
}

#[test]
fn test_parallel_stages_fork_to_each_branch_start() {
    let plan = assemble(DEPLOY_PIPELINE);
    let fork = plan
        .nodes
        .values()
        .find(|node| node.step_type == NG_FORK && node.group == NodeGroup::Stages)
        .unwrap();
    assert_eq!(fork.facilitator, FacilitatorType::Children);

    let branches: Vec<&str> = fork
        .parameters
        .child_ids()
        .iter()
        .map(|id| plan.node(id).unwrap().identifier.as_str())
        .collect();
    assert_eq!(branches, vec!["deploy_eu", "deploy_us"]);
}

#[test]
fn test_strategy_wraps_stage_and_marks_identifier() {
    let plan = assemble(DEPLOY_PIPELINE);
    let wrapper = plan.find_by_identifier("deploy_us").unwrap();
    assert_eq!(wrapper.step_type, STRATEGY);
    assert_eq!(wrapper.group, NodeGroup::Stage);
    assert_eq!(wrapper.facilitator, FacilitatorType::Children);

    let NodeParameters::Strategy {
        child_node_id,
        strategy,
        ..
    } = &wrapper.parameters
    else {
        panic!("expected strategy parameters");
    };
    assert_eq!(strategy.max_concurrency(), Some(1));
    let wrapped = plan.node(child_node_id).unwrap();
    assert_eq!(wrapped.identifier, "deploy_us<+strategy.identifierPostFix>");
    assert_eq!(wrapped.step_type, "Deployment");
}

#[test]
fn test_step_facilitators_follow_step_type() {
    let plan = assemble(DEPLOY_PIPELINE);
    let facilitator = |identifier: &str| plan.find_by_identifier(identifier).unwrap().facilitator;
    assert_eq!(facilitator("compile"), FacilitatorType::Task);
    assert_eq!(facilitator("lint"), FacilitatorType::Task);
    assert_eq!(facilitator("gate"), FacilitatorType::Async);

    let compile = plan.find_by_identifier("compile").unwrap();
    match &compile.parameters {
        NodeParameters::Step { timeout, .. } => assert_eq!(timeout.as_deref(), Some("10m")),
        other => panic!("expected step parameters, got {:?}", other),
    }
}

#[test]
fn test_same_document_yields_same_node_ids() {
    let first = assemble(DEPLOY_PIPELINE);
    let second = assemble(DEPLOY_PIPELINE);
    assert_eq!(first.starting_node_id, second.starting_node_id);
    let first_ids: Vec<_> = first.nodes.keys().collect();
    let second_ids: Vec<_> = second.nodes.keys().collect();
    assert_eq!(first_ids, second_ids);
}

#[test]
fn test_same_step_identifier_in_two_stages_gets_distinct_nodes() {
    let plan = assemble(DEPLOY_PIPELINE);
    let rollouts = plan
        .nodes
        .values()
        .filter(|node| node.identifier.starts_with("rollout"))
        .count();
    assert_eq!(rollouts, 2);
}

#[test]
fn test_facilitator_override_from_config() {
    let document = PipelineDocument::from_yaml_str(DEPLOY_PIPELINE).unwrap();
    let mut config = PlanweaveConfig::default();
    config
        .plan
        .facilitators
        .insert("K8sRollingDeploy".to_string(), "async".to_string());
    let plan = create_execution_plan(&document, &config).unwrap();
    assert!(plan
        .nodes
        .values()
        .filter(|node| node.step_type == "K8sRollingDeploy")
        .all(|node| node.facilitator == FacilitatorType::Async));
}

#[test]
fn test_duplicate_stage_identifiers_are_rejected() {
    let err = PipelineDocument::from_yaml_str(
        r#"
pipeline:
  identifier: p
  stages:
    - stage:
        identifier: s
        type: CI
        spec: {execution: {steps: [{step: {identifier: a, type: Run}}]}}
    - parallel:
        - stage:
            identifier: s
            type: CI
            spec: {execution: {steps: [{step: {identifier: b, type: Run}}]}}
"#,
    )
    .unwrap_err();
    assert_eq!(err.code, "PLW-PLAN-001");
}

#[test]
fn test_invalid_documents_fail_before_assembly() {
    let cases = [
        "pipeline:\n  identifier: p\n  stages: []\n",
        "pipeline:\n  identifier: 9p\n  stages: [{stage: {identifier: s, type: CI, spec: {execution: {steps: [{step: {identifier: a, type: Run}}]}}}}]\n",
        "pipeline:\n  identifier: p\n  stages: [{stage: {identifier: s, type: CI, spec: {execution: {steps: []}}}}]\n",
    ];
    for text in cases {
        let err = PipelineDocument::from_yaml_str(text).unwrap_err();
        assert_eq!(err.category, ErrorCategory::ValidationError, "{}", text);
    }
}

#[test]
fn test_element_must_be_stage_or_parallel() {
    let err = PipelineDocument::from_yaml_str(
        "pipeline:\n  identifier: p\n  stages:\n    - step: {identifier: a, type: Run}\n",
    )
    .unwrap_err();
    assert!(err.message.contains("failed to parse pipeline"));
}

#[test]
fn test_empty_parallel_groups_are_rejected() {
    let stage_group = r#"
pipeline:
  identifier: p
  stages:
    - stage: {identifier: s, type: CI, spec: {execution: {steps: [{step: {identifier: a, type: Run}}]}}}
    - parallel: []
"#;
    let step_group = r#"
pipeline:
  identifier: p
  stages:
    - stage: {identifier: s, type: CI, spec: {execution: {steps: [{step: {identifier: a, type: Run}}, {parallel: []}]}}}
"#;
    for text in [stage_group, step_group] {
        let err = PipelineDocument::from_yaml_str(text).unwrap_err();
        assert_eq!(err.category, ErrorCategory::ValidationError);
        assert!(
            err.message.contains("'parallel' must list at least one"),
            "{}",
            err.message
        );
    }
}
