#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::strategy::config::{StrategyConfig, StrategyKind};
use crate::core::strategy::{ExpansionScope, StrategyExpander};
use planweave_types::{IterationMetadata, StrategyMetadata};

/// Expands a `repeat` strategy into one child per listed item.
pub struct RepeatStrategy;

impl StrategyExpander for RepeatStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Repeat
    }

    fn cardinality(
        &self,
        config: &StrategyConfig,
        _scope: &ExpansionScope<'_>,
    ) -> Result<Option<usize>, AppError> {
        Ok(Some(config.as_repeat()?.items.len()))
    }

    fn iterations(
        &self,
        config: &StrategyConfig,
        _scope: &ExpansionScope<'_>,
    ) -> Result<Vec<StrategyMetadata>, AppError> {
        let items = &config.as_repeat()?.items;
        let total = items.len();
        Ok(items
            .iter()
            .enumerate()
            .map(|(index, item)| StrategyMetadata {
                current_iteration: index,
                total_iterations: total,
                identifier_postfix: format!("_{}", index),
                iteration: IterationMetadata::Repeat { item: item.clone() },
            })
            .collect())
    }
}
