use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Crates of this workspace, which log at the configured level.
///
/// All other crates log warnings and errors only.
#[cfg(any(feature = "init", test))]
const CRATE_NAMES: &[&str] = &["geia", "geia_config", "geia_log", "geia_text"];

/// Controls the log format.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    #[default]
    Auto,

    /// Pretty printing with colors.
    ///
    /// ```text
    ///  INFO geia::setup: loaded abbreviation catalog rules=512
    /// ```
    Pretty,

    /// Simplified plain text output.
    ///
    /// ```text
    /// 2024-03-04T12:10:32.123Z  INFO geia::setup: loaded abbreviation catalog rules=512
    /// ```
    Simplified,

    /// Dump out JSON lines.
    ///
    /// ```text
    /// {"timestamp":"2024-03-04T12:11:08.729716Z","level":"INFO","fields":{"message":"loaded abbreviation catalog","rules":512},"target":"geia::setup"}
    /// ```
    Json,
}

/// The logging level.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Disables logging.
    Off,
    /// The "error" level.
    Error,
    /// The "warn" level.
    Warn,
    /// The "info" level.
    #[default]
    Info,
    /// The "debug" level.
    Debug,
    /// The "trace" level.
    Trace,
}

impl Level {
    /// Returns the tracing [`LevelFilter`] for this level.
    pub const fn level_filter(&self) -> LevelFilter {
        match self {
            Level::Off => LevelFilter::OFF,
            Level::Error => LevelFilter::ERROR,
            Level::Warn => LevelFilter::WARN,
            Level::Info => LevelFilter::INFO,
            Level::Debug => LevelFilter::DEBUG,
            Level::Trace => LevelFilter::TRACE,
        }
    }
}

/// Controls the logging system.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// The log level for the workspace crates.
    pub level: Level,

    /// Controls the log output format.
    ///
    /// Defaults to [`LogFormat::Auto`], which detects the best format based on the TTY.
    pub format: LogFormat,

    /// When set to `true`, backtraces are forced on.
    ///
    /// Otherwise, backtraces can be enabled by setting the `RUST_BACKTRACE` variable to `full`.
    pub enable_backtraces: bool,
}

/// Returns the filter directives used when `RUST_LOG` is not set.
#[cfg(any(feature = "init", test))]
fn default_directives(level: LevelFilter) -> String {
    let mut directives = String::from("warn");
    for name in CRATE_NAMES {
        directives.push_str(&format!(",{name}={level}"));
    }
    directives
}

/// Initialize the logging system.
///
/// The `RUST_LOG` environment variable overrides the configured level. Calling this function more
/// than once has no effect.
///
/// # Example
///
/// ```
/// let log_config = geia_log::LogConfig {
///     enable_backtraces: true,
///     ..Default::default()
/// };
///
/// geia_log::init(&log_config);
/// ```
#[cfg(feature = "init")]
pub fn init(config: &LogConfig) {
    use tracing_subscriber::EnvFilter;

    if config.enable_backtraces {
        // SAFETY: Logging is initialized at startup before any other threads are spawned.
        unsafe { std::env::set_var("RUST_BACKTRACE", "full") };
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config.level.level_filter())));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match (config.format, console::user_attended_stderr()) {
        (LogFormat::Auto, true) | (LogFormat::Pretty, _) => {
            builder.compact().without_time().with_ansi(true).try_init()
        }
        (LogFormat::Auto, false) | (LogFormat::Simplified, _) => {
            builder.with_ansi(false).try_init()
        }
        (LogFormat::Json, _) => builder.json().flatten_event(true).try_init(),
    };

    if result.is_ok() {
        tracing::debug!(format = ?config.format, level = ?config.level, "logging initialized");
    }
}
