#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::expression::{EvaluationContext, ExpressionEngine};
use crate::core::strategy::canonical_text;
use crate::core::types::ErrorCategory;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison applied by a single key/value condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    #[serde(rename = "equals")]
    Equals,
    #[serde(rename = "not equals")]
    NotEquals,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    NotIn,
}

impl ConditionOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::NotEquals => "not equals",
            ConditionOperator::In => "in",
            ConditionOperator::NotIn => "not in",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub key: String,
    pub value: Value,
    pub operator: ConditionOperator,
}

impl Condition {
    pub fn new(key: impl Into<String>, operator: ConditionOperator, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            operator,
        }
    }

    fn matches(&self, actual: &Value) -> bool {
        let actual = canonical_text(actual);
        let expected = canonical_text(&self.value);
        let listed = || match &self.value {
            Value::Array(entries) => entries.iter().any(|entry| canonical_text(entry) == actual),
            _ => expected.split(',').map(str::trim).any(|entry| entry == actual),
        };
        match self.operator {
            ConditionOperator::Equals => actual == expected,
            ConditionOperator::NotEquals => actual != expected,
            ConditionOperator::In => listed(),
            ConditionOperator::NotIn => !listed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValuesCriteria {
    #[serde(default)]
    pub match_any_condition: bool,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JexlCriteria {
    pub expression: String,
}

/// Condition gating an approval: a boolean expression or a set of key/value checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "spec")]
pub enum CriteriaSpec {
    Jexl(JexlCriteria),
    KeyValues(KeyValuesCriteria),
}

fn empty_criteria(detail: &str) -> AppError {
    AppError::new(
        ErrorCategory::ValidationError,
        format!("approval criteria is empty: {}", detail),
    )
    .with_code("PLW-APPR-001")
}

impl CriteriaSpec {
    pub fn jexl(expression: impl Into<String>) -> Self {
        CriteriaSpec::Jexl(JexlCriteria {
            expression: expression.into(),
        })
    }

    /// Build key/value criteria. An empty list is only accepted with `skip_empty`,
    /// and such a spec still refuses to evaluate.
    pub fn key_values(
        conditions: Vec<Condition>,
        match_any_condition: bool,
        skip_empty: bool,
    ) -> Result<Self, AppError> {
        let spec = CriteriaSpec::KeyValues(KeyValuesCriteria {
            match_any_condition,
            conditions,
        });
        spec.validate(skip_empty)?;
        Ok(spec)
    }

    /// Parse criteria from YAML or JSON text and validate it.
    pub fn from_yaml_str(text: &str, skip_empty: bool) -> Result<Self, AppError> {
        let spec: CriteriaSpec = serde_yaml::from_str(text).map_err(|err| {
            AppError::new(
                ErrorCategory::SerializationError,
                format!("invalid approval criteria: {}", err),
            )
        })?;
        spec.validate(skip_empty)?;
        Ok(spec)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CriteriaSpec::Jexl(jexl) => jexl.expression.trim().is_empty(),
            CriteriaSpec::KeyValues(kv) => kv.conditions.is_empty(),
        }
    }

    pub fn validate(&self, skip_empty: bool) -> Result<(), AppError> {
        if self.is_empty() && !skip_empty {
            return Err(match self {
                CriteriaSpec::Jexl(_) => empty_criteria("expression must not be blank"),
                CriteriaSpec::KeyValues(_) => {
                    empty_criteria("at least one condition is required")
                }
            });
        }
        Ok(())
    }
}

/// Evaluates [`CriteriaSpec`]s against a JSON object of field values.
#[derive(Default)]
pub struct CriteriaEvaluator {
    engine: ExpressionEngine,
}

impl CriteriaEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engine(engine: ExpressionEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &ExpressionEngine {
        &self.engine
    }

    pub fn evaluate(&self, spec: &CriteriaSpec, context: &Value) -> Result<bool, AppError> {
        spec.validate(false)?;
        let satisfied = match spec {
            CriteriaSpec::Jexl(jexl) => {
                let ctx = EvaluationContext::from_variables(context.clone())
                    .with("issue", context.clone());
                self.engine.evaluate_bool(&jexl.expression, &ctx)?
            }
            CriteriaSpec::KeyValues(kv) => evaluate_key_values(kv, context)?,
        };
        tracing::debug!(satisfied, "evaluated approval criteria");
        Ok(satisfied)
    }
}

fn evaluate_key_values(kv: &KeyValuesCriteria, context: &Value) -> Result<bool, AppError> {
    let mut outcomes = Vec::with_capacity(kv.conditions.len());
    for condition in &kv.conditions {
        let actual = context.get(&condition.key).ok_or_else(|| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!(
                    "criteria key '{}' is not present in the evaluated fields",
                    condition.key
                ),
            )
            .with_code("PLW-APPR-002")
        })?;
        outcomes.push(condition.matches(actual));
    }
    Ok(if kv.match_any_condition {
        outcomes.into_iter().any(|hit| hit)
    } else {
        outcomes.into_iter().all(|hit| hit)
    })
}
