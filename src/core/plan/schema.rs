#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::strategy::StrategyConfig;
use crate::core::types::ErrorCategory;
use crate::utils::FileUtils;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

fn default_spec_value() -> Value {
    Value::Object(Map::new())
}

fn identifier_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,127}$").expect("valid identifier regex")
    })
}

/// Root of a pipeline definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDocument {
    pub pipeline: PipelineDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    /// Values visible to `$expr` matrix axes as `context`.
    #[serde(default)]
    pub variables: IndexMap<String, Value>,
    pub stages: Vec<StageElement>,
}

/// Item of a pipeline's stage list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawStageElement", into = "RawStageElement")]
pub enum StageElement {
    Stage(StageDefinition),
    Parallel(Vec<StageDefinition>),
}

/// Item of a stage's step list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawStepElement", into = "RawStepElement")]
pub enum StepElement {
    Step(StepDefinition),
    Parallel(Vec<StepDefinition>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDefinition {
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub stage_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyConfig>,
    pub spec: StageSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSpec {
    pub execution: ExecutionSection,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSection {
    pub steps: Vec<StepElement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default = "default_spec_value")]
    pub spec: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyConfig>,
}

/// Wire shape of a stage list item: `{stage: ..}` or `{parallel: [{stage: ..}, ..]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStageElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stage: Option<StageDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parallel: Option<Vec<RawStageElement>>,
}

/// Wire shape of a step list item: `{step: ..}` or `{parallel: [{step: ..}, ..]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStepElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    step: Option<StepDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parallel: Option<Vec<RawStepElement>>,
}

/// Either one item or the branches of a parallel group.
enum Split<T> {
    Single(T),
    Parallel(Vec<T>),
}

fn split_element<T>(
    key: &str,
    single: Option<T>,
    branches: Option<Vec<(Option<T>, bool)>>,
) -> Result<Split<T>, String> {
    match (single, branches) {
        (Some(item), None) => Ok(Split::Single(item)),
        (None, Some(branches)) => {
            if branches.is_empty() {
                return Err(format!(
                    "'parallel' must list at least one '{}' entry",
                    key
                ));
            }
            let mut out = Vec::with_capacity(branches.len());
            for (item, nested) in branches {
                match item {
                    Some(item) if !nested => out.push(item),
                    _ => {
                        return Err(format!(
                            "every parallel branch must be a single '{}' entry",
                            key
                        ))
                    }
                }
            }
            Ok(Split::Parallel(out))
        }
        _ => Err(format!(
            "list items must declare exactly one of '{}' or 'parallel'",
            key
        )),
    }
}

impl TryFrom<RawStageElement> for StageElement {
    type Error = String;

    fn try_from(raw: RawStageElement) -> Result<Self, Self::Error> {
        let branches = raw.parallel.map(|items| {
            items
                .into_iter()
                .map(|item| (item.stage, item.parallel.is_some()))
                .collect()
        });
        Ok(match split_element("stage", raw.stage, branches)? {
            Split::Single(stage) => StageElement::Stage(stage),
            Split::Parallel(stages) => StageElement::Parallel(stages),
        })
    }
}

impl TryFrom<RawStepElement> for StepElement {
    type Error = String;

    fn try_from(raw: RawStepElement) -> Result<Self, Self::Error> {
        let branches = raw.parallel.map(|items| {
            items
                .into_iter()
                .map(|item| (item.step, item.parallel.is_some()))
                .collect()
        });
        Ok(match split_element("step", raw.step, branches)? {
            Split::Single(step) => StepElement::Step(step),
            Split::Parallel(steps) => StepElement::Parallel(steps),
        })
    }
}

impl From<StageElement> for RawStageElement {
    fn from(element: StageElement) -> Self {
        match element {
            StageElement::Stage(stage) => RawStageElement {
                stage: Some(stage),
                parallel: None,
            },
            StageElement::Parallel(stages) => RawStageElement {
                stage: None,
                parallel: Some(
                    stages
                        .into_iter()
                        .map(|stage| RawStageElement {
                            stage: Some(stage),
                            parallel: None,
                        })
                        .collect(),
                ),
            },
        }
    }
}

impl From<StepElement> for RawStepElement {
    fn from(element: StepElement) -> Self {
        match element {
            StepElement::Step(step) => RawStepElement {
                step: Some(step),
                parallel: None,
            },
            StepElement::Parallel(steps) => RawStepElement {
                step: None,
                parallel: Some(
                    steps
                        .into_iter()
                        .map(|step| RawStepElement {
                            step: Some(step),
                            parallel: None,
                        })
                        .collect(),
                ),
            },
        }
    }
}

impl StageElement {
    /// Stages in this item, in declaration order.
    pub fn stages(&self) -> Vec<&StageDefinition> {
        match self {
            StageElement::Stage(stage) => vec![stage],
            StageElement::Parallel(stages) => stages.iter().collect(),
        }
    }
}

impl StepElement {
    pub fn steps(&self) -> Vec<&StepDefinition> {
        match self {
            StepElement::Step(step) => vec![step],
            StepElement::Parallel(steps) => steps.iter().collect(),
        }
    }
}

impl StageDefinition {
    pub fn steps(&self) -> impl Iterator<Item = &StepDefinition> {
        self.spec
            .execution
            .steps
            .iter()
            .flat_map(|element| element.steps())
    }
}

fn schema_error(message: String) -> AppError {
    AppError::new(ErrorCategory::ValidationError, message)
}

/// Reject duplicate identifiers among one list's members, parallel branches included.
pub fn check_unique_identifiers<'a, I>(scope: &str, identifiers: I) -> Result<(), AppError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for identifier in identifiers {
        if !seen.insert(identifier) {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                format!("duplicate identifier '{}' in {}", identifier, scope),
            )
            .with_code("PLW-PLAN-001"));
        }
    }
    Ok(())
}

fn check_identifier(kind: &str, identifier: &str) -> Result<(), AppError> {
    if !identifier_regex().is_match(identifier) {
        return Err(schema_error(format!(
            "{} identifier '{}' must start with a letter or '_' and contain only letters, digits and '_'",
            kind, identifier
        )));
    }
    Ok(())
}

impl PipelineDocument {
    /// Parse without structural validation; lint uses this to report every problem at once.
    pub fn parse_yaml(text: &str) -> Result<Self, AppError> {
        serde_yaml::from_str(text)
            .map_err(|err| schema_error(format!("failed to parse pipeline: {}", err)))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, AppError> {
        let document = Self::parse_yaml(text)?;
        document.validate()?;
        Ok(document)
    }

    /// Read a YAML or JSON pipeline file without structural validation.
    pub fn read_from_file(path: &Path) -> Result<Self, AppError> {
        FileUtils
            .load_document(path)
            .map_err(|err| schema_error(format!("{:#}", err)))
    }

    /// Load and validate a pipeline document from a YAML or JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, AppError> {
        let document = Self::read_from_file(path)?;
        document.validate()?;
        Ok(document)
    }

    /// Structural checks run before any plan is assembled.
    pub fn validate(&self) -> Result<(), AppError> {
        let pipeline = &self.pipeline;
        check_identifier("pipeline", &pipeline.identifier)?;
        if pipeline.stages.is_empty() {
            return Err(schema_error(format!(
                "pipeline '{}' must define at least one stage",
                pipeline.identifier
            )));
        }

        let stages: Vec<&StageDefinition> = self.stages().collect();
        check_unique_identifiers(
            &format!("pipeline '{}' stages", pipeline.identifier),
            stages.iter().map(|stage| stage.identifier.as_str()),
        )?;

        for stage in stages {
            check_identifier("stage", &stage.identifier)?;
            if stage.stage_type.trim().is_empty() {
                return Err(schema_error(format!(
                    "stage '{}' must declare a type",
                    stage.identifier
                )));
            }
            if stage.spec.execution.steps.is_empty() {
                return Err(schema_error(format!(
                    "stage '{}' must define at least one step",
                    stage.identifier
                )));
            }
            check_unique_identifiers(
                &format!("stage '{}' steps", stage.identifier),
                stage.steps().map(|step| step.identifier.as_str()),
            )?;
            for step in stage.steps() {
                check_identifier("step", &step.identifier)?;
                if step.step_type.trim().is_empty() {
                    return Err(schema_error(format!(
                        "step '{}' in stage '{}' must declare a type",
                        step.identifier, stage.identifier
                    )));
                }
            }
        }
        Ok(())
    }

    /// Every stage, parallel groups flattened, in declaration order.
    pub fn stages(&self) -> impl Iterator<Item = &StageDefinition> {
        self.pipeline
            .stages
            .iter()
            .flat_map(|element| element.stages())
    }

    /// Pipeline variables as one JSON object.
    pub fn variables(&self) -> Value {
        Value::Object(
            self.pipeline
                .variables
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }
}
