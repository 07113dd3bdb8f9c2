// Subscriber setup for binaries and tests that embed the parser. The library
// itself only emits `tracing` events.

use std::path::PathBuf;

use tracing::{Level, Subscriber};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_log::LogTracer;
use tracing_subscriber::{
    fmt::{time::ChronoUtc, MakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Where and how parser events are written
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    /// One JSON object per event instead of plain lines
    pub json_format: bool,
    /// Directory for daily rolling files; stdout only when unset
    pub log_dir: Option<String>,
    pub colorize: bool,
    pub log_file_name: String,
    /// Targets the level applies to. `RUST_LOG` overrides all of this.
    pub log_targets: Option<Vec<String>>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            log_dir: None,
            colorize: true,
            log_file_name: "channel-parser".to_string(),
            log_targets: Some(vec!["channel_parser_rs".to_string()]),
        }
    }
}

/// Keeps the background file writer alive; drop it to flush and stop.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

impl LogGuard {
    pub fn has_file_output(&self) -> bool {
        self._file_guard.is_some()
    }
}

fn filter_directives(config: &LoggingConfig) -> String {
    let level = config.level.as_str().to_ascii_lowercase();
    match &config.log_targets {
        Some(targets) if !targets.is_empty() => targets
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect::<Vec<_>>()
            .join(","),
        _ => format!("channel_parser_rs={}", level),
    }
}

fn fmt_layer<S, W>(writer: W, json: bool, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::new(TIME_FORMAT.to_string()));

    if json {
        layer.json().flatten_event(true).boxed()
    } else {
        layer.boxed()
    }
}

/// Install a global subscriber for parser events.
///
/// Safe to call more than once: later calls leave the installed subscriber
/// in place, though each still opens its own file writer.
pub fn init_logging(config: LoggingConfig) -> LogGuard {
    let _ = LogTracer::init();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&config)));

    let mut layers = vec![fmt_layer(
        std::io::stdout,
        config.json_format,
        config.colorize,
    )];

    let mut file_guard = None;
    if let Some(log_dir) = &config.log_dir {
        let log_dir = PathBuf::from(log_dir);
        match std::fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let appender =
                    RollingFileAppender::new(Rotation::DAILY, log_dir, &config.log_file_name);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                file_guard = Some(guard);
                layers.push(fmt_layer(writer, config.json_format, false));
            }
            Err(e) => eprintln!("Failed to create log directory {}: {}", log_dir.display(), e),
        }
    }

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init();

    LogGuard {
        _file_guard: file_guard,
    }
}
