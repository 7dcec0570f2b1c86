//! Strategy expansion: turns a matrix, `for` or `repeat` block into concrete children.

#![allow(clippy::result_large_err)]

pub mod config;
pub mod for_loop;
pub mod matrix;
pub mod placeholder;
pub mod repeat;

pub use config::{
    AxisValues, ForConfig, MatrixConfig, RawStrategyConfig, RepeatConfig, StrategyConfig,
    StrategyKind,
};
pub use for_loop::ForStrategy;
pub use matrix::MatrixStrategy;
pub use placeholder::{
    canonical_text, collect_placeholders, render_text, render_value,
    IDENTIFIER_POSTFIX_PLACEHOLDER,
};
pub use repeat::RepeatStrategy;

use crate::core::error::AppError;
use crate::core::expression::{EvaluationContext, ExpressionEngine};
use crate::core::types::ErrorCategory;
use planweave_types::{Child, IterationMetadata, StrategyMetadata};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// What an expander may consult while resolving axes.
pub struct ExpansionScope<'a> {
    pub engine: &'a ExpressionEngine,
    pub context: &'a EvaluationContext,
}

impl<'a> ExpansionScope<'a> {
    pub fn new(engine: &'a ExpressionEngine, context: &'a EvaluationContext) -> Self {
        Self { engine, context }
    }
}

/// One strategy kind. Implementations reject configurations of any other kind.
pub trait StrategyExpander {
    fn kind(&self) -> StrategyKind;

    /// Upper bound on the number of children before exclusions; `None` on overflow.
    fn cardinality(
        &self,
        config: &StrategyConfig,
        scope: &ExpansionScope<'_>,
    ) -> Result<Option<usize>, AppError>;

    /// Per-child metadata in expansion order.
    fn iterations(
        &self,
        config: &StrategyConfig,
        scope: &ExpansionScope<'_>,
    ) -> Result<Vec<StrategyMetadata>, AppError>;
}

/// Result of expanding a JSON node template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedJsonNodes {
    pub expanded_nodes: Vec<Value>,
    pub max_concurrency: usize,
}

/// Apply an optional deployment-wide ceiling to a concurrency hint. Never returns 0.
pub fn clamp_max_concurrency(value: usize, ceiling: Option<usize>) -> usize {
    let clamped = match ceiling {
        Some(ceiling) => value.min(ceiling),
        None => value,
    };
    clamped.max(1)
}

fn expander_for(config: &StrategyConfig) -> &'static dyn StrategyExpander {
    match config {
        StrategyConfig::Matrix(_) => &MatrixStrategy,
        StrategyConfig::For(_) => &ForStrategy,
        StrategyConfig::Repeat(_) => &RepeatStrategy,
    }
}

/// Entry point for strategy expansion.
#[derive(Default)]
pub struct StrategyEngine {
    engine: ExpressionEngine,
}

impl StrategyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engine(engine: ExpressionEngine) -> Self {
        Self { engine }
    }

    /// Children before exclusions. `None` means the product overflowed.
    pub fn cardinality(
        &self,
        config: &StrategyConfig,
        ctx: &EvaluationContext,
    ) -> Result<Option<usize>, AppError> {
        let scope = ExpansionScope::new(&self.engine, ctx);
        expander_for(config).cardinality(config, &scope)
    }

    /// Concurrency hint for `child_count` children: the declared value, else all at once.
    pub fn max_concurrency(config: &StrategyConfig, child_count: usize) -> usize {
        config.max_concurrency().unwrap_or(child_count)
    }

    /// Runtime expansion: one [`Child`] per iteration, all pointing at `child_node_id`.
    pub fn fetch_children(
        &self,
        config: &StrategyConfig,
        child_node_id: Uuid,
        ctx: &EvaluationContext,
    ) -> Result<Vec<Child>, AppError> {
        config.validate_shape()?;
        let scope = ExpansionScope::new(&self.engine, ctx);
        let iterations = expander_for(config).iterations(config, &scope)?;
        tracing::debug!(
            strategy = %config.kind(),
            child_node_id = %child_node_id,
            children = iterations.len(),
            "expanded strategy children"
        );
        Ok(iterations
            .into_iter()
            .map(|strategy_metadata| Child {
                child_node_id,
                strategy_metadata,
            })
            .collect())
    }

    /// Plan-time expansion of a JSON node template. Fails before expanding when the
    /// child count could exceed `max_expansion_limit`.
    pub fn expand_json_node(
        &self,
        config: &StrategyConfig,
        template: &Value,
        max_expansion_limit: usize,
        ctx: &EvaluationContext,
    ) -> Result<ExpandedJsonNodes, AppError> {
        config.validate_shape()?;
        let scope = ExpansionScope::new(&self.engine, ctx);
        let expander = expander_for(config);

        let cardinality = expander.cardinality(config, &scope)?;
        let within_limit = matches!(cardinality, Some(count) if count <= max_expansion_limit);
        if !within_limit {
            let requested = cardinality
                .map(|count| count.to_string())
                .unwrap_or_else(|| "more than usize::MAX".to_string());
            tracing::warn!(
                strategy = %config.kind(),
                requested = %requested,
                limit = max_expansion_limit,
                "strategy expansion limit exceeded"
            );
            return Err(AppError::new(
                ErrorCategory::LimitExceeded,
                format!(
                    "{} strategy would expand into {} nodes, exceeding the limit of {}",
                    config.kind(),
                    requested,
                    max_expansion_limit
                ),
            )
            .with_code("PLW-STRAT-002")
            .with_suggestion("Reduce the strategy size or raise strategy.max_expansion_limit"));
        }

        let iterations = expander.iterations(config, &scope)?;
        let expanded_nodes: Vec<Value> = iterations
            .iter()
            .map(|metadata| render_node(template, metadata))
            .collect();
        let max_concurrency = Self::max_concurrency(config, expanded_nodes.len());

        tracing::debug!(
            strategy = %config.kind(),
            nodes = expanded_nodes.len(),
            max_concurrency,
            "expanded json node"
        );
        Ok(ExpandedJsonNodes {
            expanded_nodes,
            max_concurrency,
        })
    }
}

fn render_node(template: &Value, metadata: &StrategyMetadata) -> Value {
    let carries_postfix = |key: &str| {
        template
            .get(key)
            .and_then(Value::as_str)
            .map(|text| text.contains(IDENTIFIER_POSTFIX_PLACEHOLDER))
            .unwrap_or(false)
    };
    let identifier_tagged = carries_postfix("identifier");
    let name_tagged = carries_postfix("name");

    let mut node = template.clone();
    if let Value::Object(map) = &mut node {
        map.shift_remove("strategy");
    }
    render_value(&mut node, metadata);

    if let Value::Object(map) = &mut node {
        let postfix = metadata.identifier_postfix.as_str();
        if !identifier_tagged {
            if let Some(Value::String(identifier)) = map.get_mut("identifier") {
                identifier.push_str(postfix);
            }
        }
        let node_name = match &metadata.iteration {
            IterationMetadata::Matrix { node_name, .. } => node_name.clone(),
            _ => None,
        };
        match node_name {
            Some(name) => {
                map.insert("name".to_string(), Value::String(name));
            }
            None if !name_tagged => {
                if let Some(Value::String(name)) = map.get_mut("name") {
                    name.push_str(postfix);
                }
            }
            None => {}
        }
    }
    node
}
