use crate::core::config::PlanweaveConfig;
use crate::core::expression::ExpressionEngine;
use crate::core::plan::schema::PipelineDocument;
use serde::Serialize;
use std::fmt;

pub mod rules;
pub use rules::*;

/// Diagnostic severity levels emitted by pipeline lint rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LintSeverity {
    Error,
    Warning,
    Info,
}

impl LintSeverity {
    fn rank(&self) -> u8 {
        match self {
            LintSeverity::Error => 3,
            LintSeverity::Warning => 2,
            LintSeverity::Info => 1,
        }
    }
}

impl fmt::Display for LintSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintSeverity::Error => write!(f, "Error"),
            LintSeverity::Warning => write!(f, "Warning"),
            LintSeverity::Info => write!(f, "Info"),
        }
    }
}

/// Individual lint result emitted by a rule.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub code: String,
    pub severity: LintSeverity,
    pub message: String,
    pub location: Option<String>,
    pub suggestion: Option<String>,
}

impl LintResult {
    pub fn new(
        code: impl Into<String>,
        severity: LintSeverity,
        message: impl Into<String>,
        location: Option<String>,
        suggestion: Option<String>,
    ) -> Self {
        Self {
            code: code.into(),
            severity,
            message: message.into(),
            location,
            suggestion,
        }
    }
}

/// What rules may consult besides the document itself.
pub struct LintContext<'a> {
    pub engine: &'a ExpressionEngine,
    pub config: &'a PlanweaveConfig,
}

/// Trait implemented by pipeline lint rules.
pub trait PipelineLintRule {
    fn validate(&self, pipeline: &PipelineDocument, ctx: &LintContext<'_>) -> Vec<LintResult>;
}

/// Registry that runs all built-in pipeline lint rules.
pub struct LintRegistry {
    engine: ExpressionEngine,
    config: PlanweaveConfig,
    rules: Vec<Box<dyn PipelineLintRule>>,
}

impl LintRegistry {
    pub fn new(config: PlanweaveConfig) -> Self {
        Self {
            engine: ExpressionEngine::default(),
            config,
            rules: built_in_rules(),
        }
    }

    /// Run every rule. Results are sorted by `(severity desc, code asc, location asc)`.
    pub fn run(&self, pipeline: &PipelineDocument) -> Vec<LintResult> {
        let ctx = LintContext {
            engine: &self.engine,
            config: &self.config,
        };
        let mut results = Vec::new();
        for rule in &self.rules {
            results.extend(rule.validate(pipeline, &ctx));
        }
        results.sort_by(|a, b| {
            let severity_cmp = b.severity.rank().cmp(&a.severity.rank());
            severity_cmp
                .then(a.code.cmp(&b.code))
                .then(a.location.cmp(&b.location))
        });
        for result in results.iter().filter(|r| r.severity == LintSeverity::Error) {
            tracing::warn!(code = %result.code, location = ?result.location, "{}", result.message);
        }
        results
    }
}

impl Default for LintRegistry {
    fn default() -> Self {
        Self::new(PlanweaveConfig::default())
    }
}
