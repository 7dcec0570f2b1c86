use super::{LintContext, LintResult, LintSeverity, PipelineLintRule};
use crate::core::approval::CriteriaSpec;
use crate::core::expression::EvaluationContext;
use crate::core::plan::schema::{PipelineDocument, StageDefinition, StepDefinition};
use crate::core::strategy::{
    collect_placeholders, ExpansionScope, MatrixStrategy, StrategyConfig, StrategyEngine,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

pub fn built_in_rules() -> Vec<Box<dyn PipelineLintRule>> {
    vec![
        Box::new(DuplicateIdentifiersRule),
        Box::new(MatrixAxesRule),
        Box::new(ExpansionLimitRule),
        Box::new(MaxConcurrencyRule),
        Box::new(EmptyApprovalCriteriaRule),
        Box::new(UnknownMatrixPlaceholderRule),
        Box::new(CriteriaExpressionRule),
    ]
}

fn stage_location(stage: &StageDefinition) -> String {
    format!("stage:{}", stage.identifier)
}

fn step_location(stage: &StageDefinition, step: &StepDefinition) -> String {
    format!("stage:{}/step:{}", stage.identifier, step.identifier)
}

/// Every strategy in the document with its location.
fn strategy_sites(pipeline: &PipelineDocument) -> Vec<(String, &StrategyConfig)> {
    let mut out = Vec::new();
    for stage in pipeline.stages() {
        if let Some(strategy) = &stage.strategy {
            out.push((stage_location(stage), strategy));
        }
        for step in stage.steps() {
            if let Some(strategy) = &step.strategy {
                out.push((step_location(stage, step), strategy));
            }
        }
    }
    out
}

fn duplicates<'a>(identifiers: impl Iterator<Item = &'a str>) -> Vec<(&'a str, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order = Vec::new();
    for identifier in identifiers {
        let count = counts.entry(identifier).or_insert(0);
        if *count == 0 {
            order.push(identifier);
        }
        *count += 1;
    }
    order
        .into_iter()
        .filter_map(|identifier| {
            let count = counts[identifier];
            (count > 1).then_some((identifier, count))
        })
        .collect()
}

struct DuplicateIdentifiersRule;

impl PipelineLintRule for DuplicateIdentifiersRule {
    fn validate(&self, pipeline: &PipelineDocument, _ctx: &LintContext<'_>) -> Vec<LintResult> {
        let mut out = Vec::new();
        for (identifier, count) in duplicates(pipeline.stages().map(|s| s.identifier.as_str())) {
            out.push(LintResult::new(
                "PLW-LINT-001",
                LintSeverity::Error,
                format!("duplicate stage identifier '{}' found {} times", identifier, count),
                Some(format!("stage:{}", identifier)),
                Some("rename stages so every stage identifier is unique".to_string()),
            ));
        }
        for stage in pipeline.stages() {
            for (identifier, count) in duplicates(stage.steps().map(|s| s.identifier.as_str())) {
                out.push(LintResult::new(
                    "PLW-LINT-001",
                    LintSeverity::Error,
                    format!(
                        "duplicate step identifier '{}' found {} times in stage '{}'",
                        identifier, count, stage.identifier
                    ),
                    Some(format!("stage:{}/step:{}", stage.identifier, identifier)),
                    Some("rename steps so identifiers are unique within the stage".to_string()),
                ));
            }
        }
        out
    }
}

struct MatrixAxesRule;

impl PipelineLintRule for MatrixAxesRule {
    fn validate(&self, pipeline: &PipelineDocument, ctx: &LintContext<'_>) -> Vec<LintResult> {
        let variables = EvaluationContext::from_variables(pipeline.variables());
        let scope = ExpansionScope::new(ctx.engine, &variables);
        let mut out = Vec::new();
        for (location, strategy) in strategy_sites(pipeline) {
            if let StrategyConfig::Matrix(matrix) = strategy {
                if let Err(err) = MatrixStrategy.resolve_axes(matrix, &scope) {
                    out.push(LintResult::new(
                        "PLW-LINT-002",
                        LintSeverity::Error,
                        err.message,
                        Some(location),
                        Some("declare every axis used by exclusions and give each axis values".to_string()),
                    ));
                }
            }
        }
        out
    }
}

struct ExpansionLimitRule;

impl PipelineLintRule for ExpansionLimitRule {
    fn validate(&self, pipeline: &PipelineDocument, ctx: &LintContext<'_>) -> Vec<LintResult> {
        let limit = ctx.config.strategy.max_expansion_limit;
        let variables = EvaluationContext::from_variables(pipeline.variables());
        let engine = StrategyEngine::new();
        let mut out = Vec::new();
        for (location, strategy) in strategy_sites(pipeline) {
            // axis errors are reported by MatrixAxesRule
            let Ok(cardinality) = engine.cardinality(strategy, &variables) else {
                continue;
            };
            let message = match cardinality {
                Some(count) if count <= limit => continue,
                Some(count) => format!(
                    "{} strategy expands into {} nodes, above the limit of {}",
                    strategy.kind(),
                    count,
                    limit
                ),
                None => format!(
                    "{} strategy size overflows; the limit is {}",
                    strategy.kind(),
                    limit
                ),
            };
            out.push(LintResult::new(
                "PLW-LINT-003",
                LintSeverity::Error,
                message,
                Some(location),
                Some("shrink the strategy or raise strategy.max_expansion_limit".to_string()),
            ));
        }
        out
    }
}

struct MaxConcurrencyRule;

impl PipelineLintRule for MaxConcurrencyRule {
    fn validate(&self, pipeline: &PipelineDocument, ctx: &LintContext<'_>) -> Vec<LintResult> {
        let ceiling = ctx.config.strategy.max_concurrency_ceiling;
        let mut out = Vec::new();
        for (location, strategy) in strategy_sites(pipeline) {
            match (strategy.max_concurrency(), ceiling) {
                (Some(0), _) => out.push(LintResult::new(
                    "PLW-LINT-004",
                    LintSeverity::Error,
                    format!("{} strategy declares maxConcurrency 0", strategy.kind()),
                    Some(location),
                    Some("use a maxConcurrency of at least 1 or omit it".to_string()),
                )),
                (Some(value), Some(ceiling)) if value > ceiling => out.push(LintResult::new(
                    "PLW-LINT-004",
                    LintSeverity::Warning,
                    format!(
                        "maxConcurrency {} exceeds the configured ceiling {} and will be clamped",
                        value, ceiling
                    ),
                    Some(location),
                    None,
                )),
                _ => {}
            }
        }
        out
    }
}

fn approval_steps(pipeline: &PipelineDocument) -> Vec<(String, &StepDefinition)> {
    let mut out = Vec::new();
    for stage in pipeline.stages() {
        for step in stage.steps() {
            if step.step_type == "JiraApproval" || step.step_type == "HarnessApproval" {
                out.push((step_location(stage, step), step));
            }
        }
    }
    out
}

fn parse_criteria(value: &Value) -> Option<CriteriaSpec> {
    serde_json::from_value(value.clone()).ok()
}

struct EmptyApprovalCriteriaRule;

impl PipelineLintRule for EmptyApprovalCriteriaRule {
    fn validate(&self, pipeline: &PipelineDocument, _ctx: &LintContext<'_>) -> Vec<LintResult> {
        let mut out = Vec::new();
        for (location, step) in approval_steps(pipeline) {
            if step.step_type == "HarnessApproval" {
                let minimum = step
                    .spec
                    .pointer("/approvers/minimumCount")
                    .and_then(Value::as_u64);
                if minimum == Some(0) {
                    out.push(LintResult::new(
                        "PLW-LINT-005",
                        LintSeverity::Error,
                        "approvers.minimumCount must be at least 1",
                        Some(location),
                        None,
                    ));
                }
                continue;
            }

            let approval = step.spec.get("approvalCriteria").and_then(parse_criteria);
            if approval.as_ref().map(CriteriaSpec::is_empty).unwrap_or(true) {
                out.push(LintResult::new(
                    "PLW-LINT-005",
                    LintSeverity::Error,
                    "approvalCriteria is missing or has no conditions",
                    Some(location.clone()),
                    Some("add at least one condition or a boolean expression".to_string()),
                ));
            }
            if let Some(rejection) = step.spec.get("rejectionCriteria").and_then(parse_criteria) {
                if rejection.is_empty() {
                    out.push(LintResult::new(
                        "PLW-LINT-005",
                        LintSeverity::Warning,
                        "rejectionCriteria has no conditions and can never reject",
                        Some(location),
                        None,
                    ));
                }
            }
        }
        out
    }
}

fn matrix_axes(strategy: Option<&StrategyConfig>) -> HashSet<String> {
    match strategy {
        Some(StrategyConfig::Matrix(matrix)) => matrix.axes.keys().cloned().collect(),
        _ => HashSet::new(),
    }
}

fn unknown_matrix_keys(value: &Value, axes: &HashSet<String>) -> Vec<String> {
    let mut found = Vec::new();
    collect_placeholders(value, &mut found);
    let mut unknown: Vec<String> = found
        .into_iter()
        .filter(|(namespace, key)| namespace == "matrix" && !axes.contains(key))
        .map(|(_, key)| key)
        .collect();
    unknown.sort();
    unknown.dedup();
    unknown
}

struct UnknownMatrixPlaceholderRule;

impl PipelineLintRule for UnknownMatrixPlaceholderRule {
    fn validate(&self, pipeline: &PipelineDocument, _ctx: &LintContext<'_>) -> Vec<LintResult> {
        let mut out = Vec::new();
        let mut report = |location: String, key: String| {
            out.push(LintResult::new(
                "PLW-LINT-006",
                LintSeverity::Warning,
                format!("placeholder <+matrix.{}> does not name an enclosing matrix axis", key),
                Some(location),
                Some("declare the axis or fix the placeholder name".to_string()),
            ));
        };

        for stage in pipeline.stages() {
            let stage_axes = matrix_axes(stage.strategy.as_ref());
            let stage_fields = Value::Array(
                std::iter::once(Value::String(stage.name.clone()))
                    .chain(stage.spec.extra.values().cloned())
                    .collect(),
            );
            for key in unknown_matrix_keys(&stage_fields, &stage_axes) {
                report(stage_location(stage), key);
            }

            for step in stage.steps() {
                let mut axes = stage_axes.clone();
                axes.extend(matrix_axes(step.strategy.as_ref()));
                let step_fields =
                    Value::Array(vec![Value::String(step.name.clone()), step.spec.clone()]);
                for key in unknown_matrix_keys(&step_fields, &axes) {
                    report(step_location(stage, step), key);
                }
            }
        }
        out
    }
}

struct CriteriaExpressionRule;

impl PipelineLintRule for CriteriaExpressionRule {
    fn validate(&self, pipeline: &PipelineDocument, ctx: &LintContext<'_>) -> Vec<LintResult> {
        let mut out = Vec::new();
        for (location, step) in approval_steps(pipeline) {
            for field in ["approvalCriteria", "rejectionCriteria"] {
                let Some(CriteriaSpec::Jexl(jexl)) = step.spec.get(field).and_then(parse_criteria)
                else {
                    continue;
                };
                if jexl.expression.trim().is_empty() {
                    continue;
                }
                if let Err(err) = ctx.engine.compile(&jexl.expression) {
                    out.push(LintResult::new(
                        "PLW-LINT-007",
                        LintSeverity::Error,
                        format!("{} expression does not compile: {}", field, err.message),
                        Some(location.clone()),
                        None,
                    ));
                }
            }
        }
        out
    }
}
