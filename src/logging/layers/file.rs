use crate::logging::config::LoggingConfig;
use crate::Result;
use anyhow::{anyhow, Context};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self as tracing_fmt, format, writer::BoxMakeWriter};
use tracing_subscriber::layer::Layered;
use tracing_subscriber::registry::LookupSpan;

const LOG_FILE_PREFIX: &str = "planweave";
const LOG_FILE_SUFFIX: &str = "log";

pub type FileFmtLayer<S> =
    tracing_fmt::Layer<S, format::DefaultFields, format::Format<format::Full>, BoxMakeWriter>;

/// `None` when `logging.enable_file` is off.
pub type FileLayerStack<S> = Layered<Option<FileFmtLayer<S>>, S>;

/// `<log dir>/planweave.log` for this workspace.
pub fn log_file_path(config: &LoggingConfig, workspace_root: &Path) -> Result<PathBuf> {
    let directory = log_directory(config, workspace_root)?;
    Ok(directory.join(format!("{}.{}", LOG_FILE_PREFIX, LOG_FILE_SUFFIX)))
}

/// Resolve `logging.log_dir`: unset means `<workspace>/.planweave/logs`, `~/` expands to the
/// home directory and other relative paths hang off the workspace without leaving it.
fn log_directory(config: &LoggingConfig, workspace_root: &Path) -> Result<PathBuf> {
    let Some(custom) = &config.log_dir else {
        return Ok(workspace_root.join(".planweave").join("logs"));
    };

    if let Ok(rest) = custom.strip_prefix("~") {
        let home = dirs_next::home_dir()
            .ok_or_else(|| anyhow!("logging.log_dir uses '~' but no home directory is known"))?;
        return Ok(home.join(rest));
    }
    if custom.is_absolute() {
        return Ok(custom.clone());
    }
    if custom
        .components()
        .any(|component| matches!(component, Component::ParentDir))
    {
        return Err(anyhow!(
            "logging.log_dir '{}' must stay inside workspace {}",
            custom.display(),
            workspace_root.display()
        ));
    }
    Ok(workspace_root.join(custom))
}

/// File sink writing through a non-blocking appender. Returns no layer when disabled.
pub fn file_layer<S>(
    log_file: &Path,
    enabled: bool,
) -> Result<(Option<FileFmtLayer<S>>, Option<WorkerGuard>)>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if !enabled {
        return Ok((None, None));
    }

    let directory = log_file
        .parent()
        .ok_or_else(|| anyhow!("log file {} has no parent directory", log_file.display()))?;
    fs::create_dir_all(directory)
        .with_context(|| format!("failed to create log directory {}", directory.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(directory)
        .with_context(|| format!("failed to open log file {}", log_file.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_fmt::layer()
        .with_writer(BoxMakeWriter::new(non_blocking))
        .with_ansi(false)
        .with_target(true);
    Ok((Some(layer), Some(guard)))
}
