use insta::assert_debug_snapshot;
use planweave::core::config::{ConfigLoader, ConfigValidator};
use planweave::core::types::ErrorCategory;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

fn clear_planweave_env() {
    for v in &[
        "PLANWEAVE_MAX_EXPANSION_LIMIT",
        "PLANWEAVE_MAX_CONCURRENCY_CEILING",
        "PLANWEAVE_APPROVAL_TIMEOUT_SECONDS",
    ] {
        env::remove_var(v);
    }
}

/// Test integration of config loading with environment variables
#[test]
#[serial]
fn test_config_loading_integration() {
    clear_planweave_env();
    let temp_dir = TempDir::new().unwrap();
    let workspace_path = temp_dir.path();

    let config_content = r#"
[strategy]
max_expansion_limit = 250
max_concurrency_ceiling = 6

[approval]
default_timeout_seconds = 7200

[plan.facilitators]
CustomDeploy = "task"
"#;

    fs::write(workspace_path.join("planweave.toml"), config_content).unwrap();

    let config = ConfigLoader::load_from_workspace(workspace_path).unwrap();
    ConfigValidator::validate(&config).unwrap();

    assert_debug_snapshot!(
        (
            config.strategy.max_expansion_limit,
            config.strategy.max_concurrency_ceiling,
            config.approval.default_timeout_seconds,
            config.plan.facilitators.get("CustomDeploy"),
        ),
        @r###"
    (
        250,
        Some(
            6,
        ),
        7200,
        Some(
            "task",
        ),
    )
    "###
    );
}

#[test]
#[serial]
fn test_env_overrides_take_precedence_over_file() {
    clear_planweave_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("planweave.toml"),
        "[strategy]\nmax_expansion_limit = 250\n",
    )
    .unwrap();

    env::set_var("PLANWEAVE_MAX_EXPANSION_LIMIT", "40");
    env::set_var("PLANWEAVE_APPROVAL_TIMEOUT_SECONDS", "60");
    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();
    clear_planweave_env();

    assert_eq!(config.strategy.max_expansion_limit, 40);
    assert_eq!(config.approval.default_timeout_seconds, 60);
}

#[test]
#[serial]
fn test_unknown_facilitator_fails_validation() {
    clear_planweave_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("planweave.toml"),
        "[plan.facilitators]\nCustomDeploy = \"eventually\"\n",
    )
    .unwrap();

    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();
    let err = ConfigValidator::validate(&config).unwrap_err();
    assert_eq!(err.category, ErrorCategory::ValidationError);
    assert!(err.message.contains("CustomDeploy"));
}

#[test]
#[serial]
fn test_missing_file_uses_defaults() {
    clear_planweave_env();
    let temp_dir = TempDir::new().unwrap();
    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();
    assert_eq!(config.strategy.max_expansion_limit, 10_000);
    assert_eq!(config.approval.default_timeout_seconds, 86_400);
    assert!(config.strategy.max_concurrency_ceiling.is_none());
}
