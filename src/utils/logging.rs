//! Tracing setup: compact stderr output plus a daily log file

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::commands::settings::log_dir;

/// Filter directive for a `-v` count
pub fn level_directive(verbose: u8) -> String {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    format!("warn,litfinder={}", level)
}

/// `LITFINDER_LOG_DIR` overrides the data directory
fn resolve_log_dir() -> Option<PathBuf> {
    std::env::var_os("LITFINDER_LOG_DIR")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(log_dir)
}

/// Install the global subscriber. `RUST_LOG` wins over `-v`.
///
/// The file layer is best effort; keep the returned guard alive until exit
/// so buffered lines get flushed.
pub fn init_logging(verbose: u8) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(verbose)));

    let stderr_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file = resolve_log_dir().and_then(|dir| {
        std::fs::create_dir_all(&dir).ok()?;
        Builder::new()
            .rotation(Rotation::DAILY)
            .filename_prefix("litfinder")
            .filename_suffix("log")
            .build(&dir)
            .ok()
    });

    let (file_layer, guard) = match file {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive(0), "warn,litfinder=warn");
        assert_eq!(level_directive(1), "warn,litfinder=info");
        assert_eq!(level_directive(5), "warn,litfinder=debug");
    }
}
