use crate::{
    cli::args::{
        ApprovalArgs, CriteriaArgs, ExpandArgs, LintArgs, LintFormat, PlanArgs, PlanFormat,
    },
    core::{
        approval::{ApprovalAction, ApprovalActivity, ApprovalInstance, CriteriaEvaluator, CriteriaSpec},
        config::{ConfigLoader, ConfigValidator, PlanweaveConfig},
        expression::EvaluationContext,
        plan::{create_execution_plan, plan_to_dot, LintRegistry, LintSeverity, PipelineDocument},
        strategy::{clamp_max_concurrency, StrategyConfig, StrategyEngine},
    },
    utils::serialization::{FileSerializer, FileUtils, JsonSerializer, YamlSerializer},
    utils::DocumentFormat,
    Result,
};
use anyhow::{anyhow, Context};
use chrono::Utc;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use uuid::Uuid;

fn load_config(workspace: &Path) -> Result<PlanweaveConfig> {
    let config = ConfigLoader::load_from_workspace(workspace)?;
    ConfigValidator::validate(&config)?;
    Ok(config)
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn expand(workspace: &Path, args: ExpandArgs) -> Result<()> {
    let config = load_config(workspace)?;
    let strategy = StrategyConfig::from_yaml_str(&read_text(&args.strategy)?)?;
    let context = match &args.context {
        Some(path) => EvaluationContext::from_variables(FileUtils.load_document(path)?),
        None => EvaluationContext::new(),
    };
    let ceiling = config.strategy.max_concurrency_ceiling;
    let engine = StrategyEngine::new();

    tracing::info!(strategy = %strategy.kind(), path = %args.strategy.display(), "expanding strategy");

    match &args.template {
        Some(template_path) => {
            let template: Value = FileUtils.load_document(template_path)?;
            let limit = args.limit.unwrap_or(config.strategy.max_expansion_limit);
            let mut expanded = engine.expand_json_node(&strategy, &template, limit, &context)?;
            expanded.max_concurrency = clamp_max_concurrency(expanded.max_concurrency, ceiling);
            print_json(&expanded)
        }
        None => {
            let child_node_id = args.child_node_id.unwrap_or_else(Uuid::new_v4);
            let children = engine.fetch_children(&strategy, child_node_id, &context)?;
            let max_concurrency = clamp_max_concurrency(
                StrategyEngine::max_concurrency(&strategy, children.len()),
                ceiling,
            );
            print_json(&json!({
                "children": children,
                "maxConcurrency": max_concurrency,
            }))
        }
    }
}

pub async fn plan(workspace: &Path, args: PlanArgs) -> Result<()> {
    let config = load_config(workspace)?;
    let document = PipelineDocument::load_from_file(&args.pipeline)?;
    let plan = create_execution_plan(&document, &config)?;

    match args.format {
        PlanFormat::Json => print_json(&plan),
        PlanFormat::Dot => {
            print!("{}", plan_to_dot(&plan));
            Ok(())
        }
    }
}

pub async fn lint(workspace: &Path, args: LintArgs) -> Result<()> {
    let config = load_config(workspace)?;
    let document = PipelineDocument::read_from_file(&args.pipeline)?;
    let results = LintRegistry::new(config).run(&document);

    match args.format {
        LintFormat::Json => print_json(&results)?,
        LintFormat::Text => {
            if results.is_empty() {
                println!("No issues found in {}", args.pipeline.display());
            }
            for result in &results {
                let location = result.location.as_deref().unwrap_or("pipeline");
                println!(
                    "{} [{}] {}: {}",
                    result.severity, result.code, location, result.message
                );
                if let Some(suggestion) = &result.suggestion {
                    println!("  Hint: {}", suggestion);
                }
            }
        }
    }

    let errors = results
        .iter()
        .filter(|result| result.severity == LintSeverity::Error)
        .count();
    if errors > 0 {
        return Err(anyhow!(
            "{} lint error(s) found in {}",
            errors,
            args.pipeline.display()
        ));
    }
    Ok(())
}

pub async fn criteria(args: CriteriaArgs) -> Result<()> {
    let spec = CriteriaSpec::from_yaml_str(&read_text(&args.criteria)?, args.skip_empty)?;
    if args.skip_empty && spec.is_empty() {
        println!("true");
        return Ok(());
    }
    let context: Value = FileUtils.load_document(&args.context)?;
    let satisfied = CriteriaEvaluator::new().evaluate(&spec, &context)?;
    println!("{}", satisfied);
    Ok(())
}

pub async fn approval(workspace: &Path, args: ApprovalArgs) -> Result<()> {
    let config = load_config(workspace)?;
    let mut instance = ApprovalInstance::from_yaml_str(&read_text(&args.instance)?)?;
    let now = args.now.unwrap_or_else(Utc::now);
    let fields: Option<Value> = match &args.fields {
        Some(path) => Some(FileUtils.load_document(path)?),
        None => None,
    };

    instance.apply_default_deadline(config.approval.default_timeout_seconds);
    instance.expire_if_due(now)?;

    let decision = match (&args.approve, &args.reject) {
        (Some(user), _) => Some((user.clone(), ApprovalAction::Approve)),
        (None, Some(user)) => Some((user.clone(), ApprovalAction::Reject)),
        (None, None) => None,
    };
    if let Some((user, action)) = decision {
        let mut activity = ApprovalActivity::new(user, action, now);
        if let Some(comments) = &args.comments {
            activity = activity.with_comments(comments.clone());
        }
        instance.record_activity(activity)?;
    }

    instance.refresh(&CriteriaEvaluator::new(), fields.as_ref())?;

    if let Some(output) = &args.output {
        match DocumentFormat::from_path(output) {
            DocumentFormat::Json => FileUtils.save_to_file(output, &instance, &JsonSerializer)?,
            DocumentFormat::Yaml => FileUtils.save_to_file(output, &instance, &YamlSerializer)?,
        }
    }
    print_json(&instance)
}
