use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Args)]
pub struct ExpandArgs {
    /// Strategy block to expand (YAML or JSON)
    #[arg(value_name = "STRATEGY")]
    pub strategy: PathBuf,

    /// Node template to clone per child; without it only child metadata is printed
    #[arg(long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Override strategy.max_expansion_limit for this invocation
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Values bound as `context` when resolving `$expr` axes (YAML or JSON)
    #[arg(long, value_name = "FILE")]
    pub context: Option<PathBuf>,

    /// Node every child points at (default: a fresh random id)
    #[arg(long, value_name = "UUID")]
    pub child_node_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlanFormat {
    Json,
    Dot,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Pipeline document (YAML or JSON)
    #[arg(value_name = "PIPELINE")]
    pub pipeline: PathBuf,

    /// Output format for the assembled plan
    #[arg(long, value_enum, default_value = "json")]
    pub format: PlanFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LintFormat {
    Text,
    Json,
}

#[derive(Args)]
pub struct LintArgs {
    /// Pipeline document (YAML or JSON)
    #[arg(value_name = "PIPELINE")]
    pub pipeline: PathBuf,

    /// Output format for diagnostics
    #[arg(long, value_enum, default_value = "text")]
    pub format: LintFormat,
}

#[derive(Args)]
pub struct CriteriaArgs {
    /// Criteria spec (`type: Jexl` or `type: KeyValues`)
    #[arg(value_name = "CRITERIA")]
    pub criteria: PathBuf,

    /// Field values the criteria are checked against (YAML or JSON)
    #[arg(long, value_name = "FILE")]
    pub context: PathBuf,

    /// Treat an empty criteria spec as satisfied instead of rejecting it
    #[arg(long)]
    pub skip_empty: bool,
}

#[derive(Args)]
pub struct ApprovalArgs {
    /// Approval instance document (YAML or JSON)
    #[arg(value_name = "INSTANCE")]
    pub instance: PathBuf,

    /// Polled ticket fields for JIRA_APPROVAL instances
    #[arg(long, value_name = "FILE")]
    pub fields: Option<PathBuf>,

    /// Evaluation time used for deadline checks (RFC 3339, default: now)
    #[arg(long, value_name = "TIMESTAMP")]
    pub now: Option<DateTime<Utc>>,

    /// Record an approval by this user before refreshing
    #[arg(long, value_name = "USER", conflicts_with = "reject")]
    pub approve: Option<String>,

    /// Record a rejection by this user before refreshing
    #[arg(long, value_name = "USER")]
    pub reject: Option<String>,

    /// Comment attached to the recorded activity
    #[arg(long, value_name = "TEXT")]
    pub comments: Option<String>,

    /// Write the updated instance here instead of only printing it
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}
