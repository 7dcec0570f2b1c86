use std::env;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// A person running the CLI in a terminal.
    Interactive,
    /// CI jobs and scripts that consume stdout and want a quiet console.
    Automation,
}

impl ExecutionContext {
    /// Returns `true` when console sinks should be disabled by default.
    pub fn disables_console(self) -> bool {
        matches!(self, ExecutionContext::Automation)
    }
}

/// Derive the active execution context from `PLANWEAVE_AUTOMATION` and `CI`.
pub fn detect_context() -> ExecutionContext {
    if flag_enabled("PLANWEAVE_AUTOMATION") || flag_enabled("CI") {
        ExecutionContext::Automation
    } else {
        ExecutionContext::Interactive
    }
}

fn flag_enabled(name: &str) -> bool {
    env::var(name)
        .map(|value| {
            let value = value.trim().to_ascii_lowercase();
            !value.is_empty() && value != "0" && value != "false"
        })
        .unwrap_or(false)
}
