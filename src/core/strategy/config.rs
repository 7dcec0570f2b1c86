#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Discriminant of a [`StrategyConfig`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Matrix,
    For,
    Repeat,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Matrix => "matrix",
            StrategyKind::For => "for",
            StrategyKind::Repeat => "repeat",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values of one matrix axis: a literal list or an expression resolved at expansion time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisValues {
    Values(Vec<Value>),
    Expression {
        #[serde(rename = "$expr")]
        expr: String,
    },
}

/// Matrix fan-out: the Cartesian product of all axes minus exclusions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<IndexMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(flatten)]
    pub axes: IndexMap<String, AxisValues>,
}

impl MatrixConfig {
    /// Start a matrix with no axes; add them with [`MatrixConfig::axis`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn axis<I>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.axes
            .insert(name.into(), AxisValues::Values(values.into_iter().collect()));
        self
    }

    pub fn expression_axis(mut self, name: impl Into<String>, expr: impl Into<String>) -> Self {
        self.axes
            .insert(name.into(), AxisValues::Expression { expr: expr.into() });
        self
    }

    pub fn exclude(mut self, exclusion: IndexMap<String, Value>) -> Self {
        self.exclude.push(exclusion);
        self
    }

    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = Some(max_concurrency);
        self
    }
}

/// Fixed-count loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForConfig {
    pub iterations: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
}

/// Loop over an explicit item list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatConfig {
    pub items: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
}

/// Declarative fan-out attached to a stage or step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStrategyConfig", into = "RawStrategyConfig")]
pub enum StrategyConfig {
    Matrix(MatrixConfig),
    For(ForConfig),
    Repeat(RepeatConfig),
}

/// Wire shape of a strategy block; exactly one field must be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStrategyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    matrix: Option<MatrixConfig>,
    #[serde(default, rename = "for", skip_serializing_if = "Option::is_none")]
    for_loop: Option<ForConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repeat: Option<RepeatConfig>,
}

impl TryFrom<RawStrategyConfig> for StrategyConfig {
    type Error = String;

    fn try_from(raw: RawStrategyConfig) -> Result<Self, Self::Error> {
        let mut declared = Vec::new();
        if raw.matrix.is_some() {
            declared.push("matrix");
        }
        if raw.for_loop.is_some() {
            declared.push("for");
        }
        if raw.repeat.is_some() {
            declared.push("repeat");
        }
        match (raw.matrix, raw.for_loop, raw.repeat) {
            (Some(matrix), None, None) => Ok(StrategyConfig::Matrix(matrix)),
            (None, Some(for_loop), None) => Ok(StrategyConfig::For(for_loop)),
            (None, None, Some(repeat)) => Ok(StrategyConfig::Repeat(repeat)),
            _ => Err(format!(
                "strategy must declare exactly one of matrix, for, repeat (found: {})",
                if declared.is_empty() {
                    "none".to_string()
                } else {
                    declared.join(", ")
                }
            )),
        }
    }
}

impl From<StrategyConfig> for RawStrategyConfig {
    fn from(config: StrategyConfig) -> Self {
        match config {
            StrategyConfig::Matrix(matrix) => RawStrategyConfig {
                matrix: Some(matrix),
                ..Default::default()
            },
            StrategyConfig::For(for_loop) => RawStrategyConfig {
                for_loop: Some(for_loop),
                ..Default::default()
            },
            StrategyConfig::Repeat(repeat) => RawStrategyConfig {
                repeat: Some(repeat),
                ..Default::default()
            },
        }
    }
}

fn wrong_kind(expected: StrategyKind, actual: StrategyKind) -> AppError {
    AppError::new(
        ErrorCategory::InvalidConfiguration,
        format!(
            "invalid strategy configuration: expected {} strategy, got {}",
            expected, actual
        ),
    )
    .with_code("PLW-STRAT-001")
}

impl StrategyConfig {
    /// Parse a strategy block from YAML (JSON is accepted too).
    pub fn from_yaml_str(text: &str) -> Result<Self, AppError> {
        serde_yaml::from_str(text).map_err(|err| {
            AppError::new(
                ErrorCategory::InvalidConfiguration,
                format!("invalid strategy configuration: {}", err),
            )
            .with_code("PLW-STRAT-001")
        })
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategyConfig::Matrix(_) => StrategyKind::Matrix,
            StrategyConfig::For(_) => StrategyKind::For,
            StrategyConfig::Repeat(_) => StrategyKind::Repeat,
        }
    }

    /// Explicitly declared concurrency, if any.
    pub fn max_concurrency(&self) -> Option<usize> {
        match self {
            StrategyConfig::Matrix(matrix) => matrix.max_concurrency,
            StrategyConfig::For(for_loop) => for_loop.max_concurrency,
            StrategyConfig::Repeat(repeat) => repeat.max_concurrency,
        }
    }

    pub fn as_matrix(&self) -> Result<&MatrixConfig, AppError> {
        match self {
            StrategyConfig::Matrix(matrix) => Ok(matrix),
            other => Err(wrong_kind(StrategyKind::Matrix, other.kind())),
        }
    }

    pub fn as_for(&self) -> Result<&ForConfig, AppError> {
        match self {
            StrategyConfig::For(for_loop) => Ok(for_loop),
            other => Err(wrong_kind(StrategyKind::For, other.kind())),
        }
    }

    pub fn as_repeat(&self) -> Result<&RepeatConfig, AppError> {
        match self {
            StrategyConfig::Repeat(repeat) => Ok(repeat),
            other => Err(wrong_kind(StrategyKind::Repeat, other.kind())),
        }
    }

    /// Shape checks shared by every kind; axis-level checks live with the matrix expander.
    pub fn validate_shape(&self) -> Result<(), AppError> {
        if self.max_concurrency() == Some(0) {
            return Err(AppError::new(
                ErrorCategory::InvalidConfiguration,
                format!(
                    "invalid strategy configuration: {}.maxConcurrency must be >= 1",
                    self.kind()
                ),
            )
            .with_code("PLW-STRAT-001"));
        }
        Ok(())
    }
}
