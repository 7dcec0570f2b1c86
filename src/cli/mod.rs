pub mod args;
pub mod commands;

pub use args::{ApprovalArgs, CriteriaArgs, ExpandArgs, LintArgs, PlanArgs};
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "planweave")]
#[command(version = crate::VERSION)]
#[command(about = "Strategy expansion, approval evaluation and plan assembly for pipelines")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: lint a pipeline, assemble its plan, then expand strategies and evaluate approvals as the runtime reaches them."
)]
pub struct Args {
    /// Workspace holding planweave.toml and .planweave/ (default: current directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn workspace_root(&self) -> PathBuf {
        self.workspace
            .clone()
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Expand a matrix, for or repeat strategy",
        long_about = "Expand prints the children a strategy produces. With --template it clones the template once per child and substitutes strategy placeholders.",
        after_help = "Example:\n    planweave expand strategy.yaml --template step.json --limit 100"
    )]
    Expand(ExpandArgs),
    #[command(
        about = "Assemble the execution plan of a pipeline",
        long_about = "Plan validates a pipeline document and prints its plan-node graph as JSON or Graphviz DOT.",
        after_help = "Example:\n    planweave plan pipeline.yaml --format dot"
    )]
    Plan(PlanArgs),
    #[command(
        about = "Check a pipeline for strategy and approval mistakes",
        long_about = "Lint runs every built-in rule and exits non-zero when any error-level diagnostic is found.",
        after_help = "Example:\n    planweave lint pipeline.yaml --format json"
    )]
    Lint(LintArgs),
    #[command(
        about = "Evaluate approval criteria against field values",
        long_about = "Criteria evaluates a JEXL or key/value criteria spec and prints true or false.",
        after_help = "Example:\n    planweave criteria approve.yaml --context fields.json"
    )]
    Criteria(CriteriaArgs),
    #[command(
        about = "Advance an approval instance",
        long_about = "Approval applies the default deadline, records an optional user activity, expires overdue instances and re-evaluates the rest, then prints the updated instance.",
        after_help = "Example:\n    planweave approval instance.yaml --fields ticket.json"
    )]
    Approval(ApprovalArgs),
}

pub async fn run(args: Args) -> crate::Result<()> {
    let workspace = args.workspace_root();
    match args.command {
        Command::Expand(expand_args) => commands::expand(&workspace, expand_args).await,
        Command::Plan(plan_args) => commands::plan(&workspace, plan_args).await,
        Command::Lint(lint_args) => commands::lint(&workspace, lint_args).await,
        Command::Criteria(criteria_args) => commands::criteria(criteria_args).await,
        Command::Approval(approval_args) => commands::approval(&workspace, approval_args).await,
    }
}
