//! Tracing subscriber set-up for the binary

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Human-readable output goes to stderr;
/// when `log_file` is given, JSON lines are appended to it as well. The returned
/// guard must be kept alive for the file writer to flush.
///
/// Fails if a global subscriber is already installed.
pub fn init(level: &str, log_file: Option<&Path>) -> std::io::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);
    let registry = tracing_subscriber::registry().with(filter).with(stderr_layer);

    let Some(path) = log_file else {
        registry.try_init().map_err(std::io::Error::other)?;
        return Ok(None);
    };

    let directory = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(directory)?;
    let file_name = path
        .file_name()
        .ok_or_else(|| std::io::Error::other(format!("not a file path: {:?}", path)))?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = fmt::layer().json().with_writer(writer).with_ansi(false);
    registry
        .with(file_layer)
        .try_init()
        .map_err(std::io::Error::other)?;

    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_reports_second_installation() {
        assert!(init("debug", None).unwrap().is_none());

        let result = init("debug", None);

        assert!(result.is_err());
    }
}
