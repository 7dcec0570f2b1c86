#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::strategy::config::{AxisValues, MatrixConfig, StrategyConfig, StrategyKind};
use crate::core::strategy::placeholder::{canonical_text, render_text};
use crate::core::strategy::{ExpansionScope, StrategyExpander};
use crate::core::types::ErrorCategory;
use indexmap::IndexMap;
use planweave_types::{IterationMetadata, StrategyMetadata};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Expands a matrix strategy into one iteration per surviving axis combination.
pub struct MatrixStrategy;

fn invalid(message: String) -> AppError {
    AppError::new(
        ErrorCategory::InvalidConfiguration,
        format!("invalid strategy configuration: {}", message),
    )
    .with_code("PLW-STRAT-001")
}

fn sanitize_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]").expect("valid sanitize regex"))
}

impl MatrixStrategy {
    /// Resolve every axis to its concrete values, preserving declaration order.
    pub fn resolve_axes(
        &self,
        matrix: &MatrixConfig,
        scope: &ExpansionScope<'_>,
    ) -> Result<IndexMap<String, Vec<Value>>, AppError> {
        if matrix.axes.is_empty() {
            return Err(invalid(
                "matrix strategy must declare at least one axis".to_string(),
            ));
        }

        let mut resolved = IndexMap::with_capacity(matrix.axes.len());
        for (name, axis) in &matrix.axes {
            if name.trim().is_empty() {
                return Err(invalid("matrix axis names must not be empty".to_string()));
            }
            let values = match axis {
                AxisValues::Values(values) => values.clone(),
                AxisValues::Expression { expr } => {
                    match scope.engine.evaluate(expr, scope.context)? {
                        Value::Array(items) => items,
                        other => {
                            return Err(AppError::new(
                                ErrorCategory::InvalidConfiguration,
                                format!(
                                    "matrix axis '{}' expression '{}' must resolve to a list, got {}",
                                    name, expr, other
                                ),
                            )
                            .with_code("PLW-STRAT-003"))
                        }
                    }
                }
            };
            if values.is_empty() {
                return Err(invalid(format!("matrix axis '{}' has no values", name)));
            }
            resolved.insert(name.clone(), values);
        }

        for (index, exclusion) in matrix.exclude.iter().enumerate() {
            if let Some(unknown) = exclusion.keys().find(|key| !resolved.contains_key(*key)) {
                return Err(invalid(format!(
                    "exclude[{}] references undeclared axis '{}'",
                    index, unknown
                )));
            }
        }
        Ok(resolved)
    }

    fn combinations(axes: &IndexMap<String, Vec<Value>>) -> Vec<Vec<usize>> {
        let sizes: Vec<usize> = axes.values().map(Vec::len).collect();
        let mut out = Vec::new();
        let mut indices = vec![0_usize; sizes.len()];
        loop {
            out.push(indices.clone());
            // first-declared axis varies slowest
            let mut position = sizes.len();
            loop {
                if position == 0 {
                    return out;
                }
                position -= 1;
                indices[position] += 1;
                if indices[position] < sizes[position] {
                    break;
                }
                indices[position] = 0;
            }
        }
    }

    fn is_excluded(combination: &IndexMap<String, Value>, exclusions: &[IndexMap<String, Value>]) -> bool {
        exclusions.iter().any(|exclusion| {
            exclusion.iter().all(|(key, excluded)| {
                combination
                    .get(key)
                    .map(|value| canonical_text(value) == canonical_text(excluded))
                    .unwrap_or(false)
            })
        })
    }

    fn identifier_postfix(combination: &IndexMap<String, Value>, index: usize) -> String {
        let scalar_only = combination
            .values()
            .all(|value| !(value.is_object() || value.is_array()));
        if !scalar_only {
            return format!("_{}", index);
        }
        let joined = combination
            .values()
            .map(canonical_text)
            .collect::<Vec<_>>()
            .join("_");
        format!("_{}", sanitize_regex().replace_all(&joined, "_"))
    }
}

impl StrategyExpander for MatrixStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Matrix
    }

    fn cardinality(
        &self,
        config: &StrategyConfig,
        scope: &ExpansionScope<'_>,
    ) -> Result<Option<usize>, AppError> {
        let matrix = config.as_matrix()?;
        let axes = self.resolve_axes(matrix, scope)?;
        Ok(axes
            .values()
            .try_fold(1_usize, |acc, values| acc.checked_mul(values.len())))
    }

    fn iterations(
        &self,
        config: &StrategyConfig,
        scope: &ExpansionScope<'_>,
    ) -> Result<Vec<StrategyMetadata>, AppError> {
        let matrix = config.as_matrix()?;
        let axes = self.resolve_axes(matrix, scope)?;

        let surviving: Vec<IndexMap<String, Value>> = Self::combinations(&axes)
            .into_iter()
            .map(|indices| {
                axes.iter()
                    .zip(indices)
                    .map(|((name, values), index)| (name.clone(), values[index].clone()))
                    .collect::<IndexMap<String, Value>>()
            })
            .filter(|combination| !Self::is_excluded(combination, &matrix.exclude))
            .collect();

        let total = surviving.len();
        let mut postfixes: Vec<String> = surviving
            .iter()
            .enumerate()
            .map(|(index, combination)| Self::identifier_postfix(combination, index))
            .collect();
        let collides = {
            let mut seen = HashSet::with_capacity(total);
            !postfixes.iter().all(|postfix| seen.insert(postfix.as_str()))
        };
        if collides {
            // sanitized values collide, fall back to positional postfixes
            postfixes = (0..total).map(|index| format!("_{}", index)).collect();
        }

        let metadata = surviving
            .into_iter()
            .zip(postfixes)
            .enumerate()
            .map(|(index, (axis_values, identifier_postfix))| {
                let mut metadata = StrategyMetadata {
                    current_iteration: index,
                    total_iterations: total,
                    identifier_postfix,
                    iteration: IterationMetadata::Matrix {
                        axis_values,
                        node_name: None,
                    },
                };
                if let Some(template) = &matrix.node_name {
                    let rendered = canonical_text(&render_text(template, &metadata));
                    if let IterationMetadata::Matrix { node_name, .. } = &mut metadata.iteration {
                        *node_name = Some(rendered);
                    }
                }
                metadata
            })
            .collect();
        Ok(metadata)
    }
}
