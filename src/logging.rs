//! Tracing setup.
//!
//! The terminal UI owns stdout and stderr while it runs, so interactive
//! sessions log to a file. Export mode logs to stderr.

use std::path::Path;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LogSettings;

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    File,
    Stderr,
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be kept alive
/// for the lifetime of the program. A subscriber that is already installed
/// is left in place.
pub fn init(settings: &LogSettings, target: LogTarget) -> Result<Option<WorkerGuard>> {
    let filter = build_filter(&settings.filter);

    let guard = match target {
        LogTarget::File => {
            let (dir, file_name) = split_log_path(&settings.file);
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .ok();
            Some(guard)
        }
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .ok();
            None
        }
    };

    info!(output = ?target, "Logging initialised");
    Ok(guard)
}

/// `RUST_LOG` if set and valid, otherwise the configured directive, otherwise `info`.
fn build_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn split_log_path(path: &Path) -> (&Path, &std::ffi::OsStr) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("afdd-viz.log"));
    (dir, file_name)
}
