use insta::assert_json_snapshot;
use planweave::core::expression::EvaluationContext;
use planweave::core::strategy::{clamp_max_concurrency, StrategyConfig, StrategyEngine};
use planweave::core::types::ErrorCategory;
use serde_json::json;

fn config(yaml: &str) -> StrategyConfig {
    StrategyConfig::from_yaml_str(yaml).unwrap()
}

#[test]
fn test_for_loop_expansion_snapshot() {
    let expanded = StrategyEngine::new()
        .expand_json_node(
            &config("for:\n  iterations: 2\n"),
            &json!({
                "identifier": "smoke",
                "name": "Smoke",
                "strategy": {"for": {"iterations": 2}},
                "spec": {"shard": "<+strategy.iteration>/<+strategy.iterations>"}
            }),
            10,
            &EvaluationContext::new(),
        )
        .unwrap();

    assert_json_snapshot!(expanded, @r###"
    {
      "expandedNodes": [
        {
          "identifier": "smoke_0",
          "name": "Smoke_0",
          "spec": {
            "shard": "0/2"
          }
        },
        {
          "identifier": "smoke_1",
          "name": "Smoke_1",
          "spec": {
            "shard": "1/2"
          }
        }
      ],
      "maxConcurrency": 2
    }
    "###);
}

#[test]
fn test_matrix_placeholders_keep_value_types() {
    let expanded = StrategyEngine::new()
        .expand_json_node(
            &config("matrix:\n  jdk: [11, 17]\n  maxConcurrency: 1\n"),
            &json!({
                "identifier": "test",
                "spec": {"jdk": "<+matrix.jdk>", "label": "jdk-<+matrix.jdk>"}
            }),
            10,
            &EvaluationContext::new(),
        )
        .unwrap();

    assert_eq!(expanded.max_concurrency, 1);
    assert_eq!(expanded.expanded_nodes.len(), 2);
    assert_eq!(expanded.expanded_nodes[0]["identifier"], "test_11");
    assert_eq!(expanded.expanded_nodes[0]["spec"]["jdk"], json!(11));
    assert_eq!(expanded.expanded_nodes[1]["spec"]["label"], "jdk-17");
    assert!(expanded.expanded_nodes[0].get("name").is_none());
}

#[test]
fn test_node_name_replaces_template_name() {
    let expanded = StrategyEngine::new()
        .expand_json_node(
            &config("matrix:\n  env: [dev]\n  nodeName: \"Deploy <+matrix.env>\"\n"),
            &json!({"identifier": "deploy", "name": "Deploy"}),
            10,
            &EvaluationContext::new(),
        )
        .unwrap();
    assert_eq!(expanded.expanded_nodes[0]["name"], "Deploy dev");
    assert_eq!(expanded.expanded_nodes[0]["identifier"], "deploy_dev");
}

#[test]
fn test_unknown_placeholders_are_left_intact() {
    let expanded = StrategyEngine::new()
        .expand_json_node(
            &config("repeat:\n  items: [eu]\n"),
            &json!({"identifier": "r", "spec": {"a": "<+repeat.item>", "b": "<+matrix.os>"}}),
            10,
            &EvaluationContext::new(),
        )
        .unwrap();
    assert_eq!(expanded.expanded_nodes[0]["spec"]["a"], "eu");
    assert_eq!(expanded.expanded_nodes[0]["spec"]["b"], "<+matrix.os>");
}

#[test]
fn test_limit_is_checked_before_expanding() {
    let err = StrategyEngine::new()
        .expand_json_node(
            &config("matrix:\n  a: [1, 2, 3]\n  b: [1, 2, 3]\n  exclude:\n    - a: 1\n"),
            &json!({"identifier": "x"}),
            8,
            &EvaluationContext::new(),
        )
        .unwrap_err();

    assert_eq!(err.category, ErrorCategory::LimitExceeded);
    assert_eq!(err.code, "PLW-STRAT-002");
    assert!(err.message.contains("9 nodes"));
    assert!(err.message.contains("limit of 8"));
}

#[test]
fn test_expansion_at_the_limit_succeeds() {
    let expanded = StrategyEngine::new()
        .expand_json_node(
            &config("for:\n  iterations: 4\n"),
            &json!({"identifier": "x"}),
            4,
            &EvaluationContext::new(),
        )
        .unwrap();
    assert_eq!(expanded.expanded_nodes.len(), 4);
}

#[test]
fn test_empty_expansion_reports_concurrency_of_one_after_clamp() {
    let expanded = StrategyEngine::new()
        .expand_json_node(
            &config("repeat:\n  items: []\n"),
            &json!({"identifier": "x"}),
            4,
            &EvaluationContext::new(),
        )
        .unwrap();
    assert!(expanded.expanded_nodes.is_empty());
    assert_eq!(expanded.max_concurrency, 0);
    assert_eq!(clamp_max_concurrency(expanded.max_concurrency, None), 1);
}

#[test]
fn test_colliding_matrix_values_still_yield_unique_identifiers() {
    let expanded = StrategyEngine::new()
        .expand_json_node(
            &config("matrix:\n  tag: [\"a-b\", \"a_b\", x, x]\n"),
            &json!({"identifier": "build"}),
            10,
            &EvaluationContext::new(),
        )
        .unwrap();

    let identifiers: Vec<&str> = expanded
        .expanded_nodes
        .iter()
        .map(|node| node["identifier"].as_str().unwrap())
        .collect();
    assert_eq!(identifiers, vec!["build_0", "build_1", "build_2", "build_3"]);
}

#[test]
fn test_explicit_postfix_placeholder_is_not_appended_twice() {
    let expanded = StrategyEngine::new()
        .expand_json_node(
            &config("for:\n  iterations: 2\n"),
            &json!({
                "identifier": "shard<+strategy.identifierPostFix>",
                "name": "Shard <+strategy.iteration>"
            }),
            10,
            &EvaluationContext::new(),
        )
        .unwrap();

    let identifiers: Vec<&str> = expanded
        .expanded_nodes
        .iter()
        .map(|node| node["identifier"].as_str().unwrap())
        .collect();
    assert_eq!(identifiers, vec!["shard_0", "shard_1"]);
    assert_eq!(expanded.expanded_nodes[1]["name"], json!("Shard 1_1"));
}
