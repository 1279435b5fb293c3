use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Path of the log file. Logging stays off when unset, since the pager owns
/// the terminal.
pub const LOG_ENV: &str = "MDR_LOG";

pub fn init_from_env() -> Result<Option<WorkerGuard>> {
    match env::var_os(LOG_ENV) {
        Some(path) if !path.is_empty() => init_file(&PathBuf::from(path)),
        _ => Ok(None),
    }
}

/// Installs the global subscriber writing to `path`. The returned guard
/// flushes the writer when dropped.
pub fn init_file(path: &Path) -> Result<Option<WorkerGuard>> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("{LOG_ENV} must name a file: {}", path.display()))?;
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)
        .with_context(|| format!("error opening log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
    {
        Ok(()) => Ok(Some(guard)),
        // A subscriber is already installed; dropping the guard stops our writer.
        Err(_) => Ok(None),
    }
}
