//! Logging setup: stdout plus a daily rolling file under the configured log dir

use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::schema::LoggingConfig;

/// Prefix of the rolling log files (`bridge.log.YYYY-MM-DD`)
const LOG_FILE_PREFIX: &str = "bridge.log";

/// Days a rolled log file is kept before cleanup
const LOG_RETENTION_DAYS: u64 = 7;

/// Where a formatting layer writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sink {
    /// Colored, with source locations
    Terminal,
    /// Plain, without source locations
    File,
}

/// Initialize the logging system.
///
/// `RUST_LOG` wins over `config.level`, `LOG_FORMAT` wins over `config.format`.
/// The returned guard must be held for the lifetime of the process so the
/// file writer flushes.
pub fn init_logging(config: &LoggingConfig) -> WorkerGuard {
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| config.format.clone());
    let json = format.eq_ignore_ascii_case("json");

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&config.dir, LOG_FILE_PREFIX));

    Registry::default()
        .with(build_filter(config))
        .with(format_layer(std::io::stdout, Sink::Terminal, json))
        .with(format_layer(file_writer, Sink::File, json))
        .init();

    if let Err(e) = cleanup_old_logs(&config.dir, LOG_RETENTION_DAYS) {
        eprintln!("Failed to clean up old logs: {}", e);
    }

    guard
}

/// One `fmt` layer for `sink`, text or json. Boxed because the two formats
/// have different layer types.
fn format_layer<S, W>(writer: W, sink: Sink, json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let terminal = sink == Sink::Terminal;
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(terminal)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(terminal)
        .with_line_number(terminal);

    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

/// Build the env filter from `RUST_LOG` (or the configured level) plus
/// per-module overrides.
fn build_filter(config: &LoggingConfig) -> EnvFilter {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    for (module, level) in &config.overrides {
        match format!("{}={}", module, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(_) => eprintln!("Invalid log directive: {}={}", module, level),
        }
    }

    filter
}

/// Remove rolled log files older than `days` days
fn cleanup_old_logs(dir: &str, days: u64) -> std::io::Result<()> {
    let path = Path::new(dir);
    if !path.exists() {
        return Ok(());
    }

    let now = SystemTime::now();
    let threshold = Duration::from_secs(days * 24 * 3600);

    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
        if !is_log {
            continue;
        }

        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());

        if matches!(age, Some(age) if age > threshold) {
            if let Err(e) = std::fs::remove_file(&path) {
                eprintln!("Failed to remove old log file {:?}: {}", path, e);
            }
        }
    }
    Ok(())
}
