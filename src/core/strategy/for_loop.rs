#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::strategy::config::{StrategyConfig, StrategyKind};
use crate::core::strategy::{ExpansionScope, StrategyExpander};
use planweave_types::{IterationMetadata, StrategyMetadata};

/// Expands a `for` strategy into `iterations` indexed children.
pub struct ForStrategy;

impl StrategyExpander for ForStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::For
    }

    fn cardinality(
        &self,
        config: &StrategyConfig,
        _scope: &ExpansionScope<'_>,
    ) -> Result<Option<usize>, AppError> {
        Ok(Some(config.as_for()?.iterations))
    }

    fn iterations(
        &self,
        config: &StrategyConfig,
        _scope: &ExpansionScope<'_>,
    ) -> Result<Vec<StrategyMetadata>, AppError> {
        let iterations = config.as_for()?.iterations;
        Ok((0..iterations)
            .map(|index| StrategyMetadata {
                current_iteration: index,
                total_iterations: iterations,
                identifier_postfix: format!("_{}", index),
                iteration: IterationMetadata::For,
            })
            .collect())
    }
}
