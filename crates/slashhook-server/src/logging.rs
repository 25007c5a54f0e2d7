//! Logging configuration and initialization.
//!
//! Targets live under `slashhook::` (`startup`, `dispatch`, `verify`,
//! `registry`, `api`, `sync`). A preset picks the base levels, `--log`
//! overrides individual targets, and `RUST_LOG` replaces both when set.

use clap::{Args, ValueEnum};
use std::collections::BTreeMap;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const TARGET_PREFIX: &str = "slashhook::";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging preset levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogPreset {
    /// Startup, dispatch and sync progress; API chatter only on problems
    #[default]
    Production,
    Verbose,
    Debug,
    Trace,
    /// Warnings and errors only
    Quiet,
}

/// Logging flags shared by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct LogArgs {
    /// Enable verbose logging (INFO for every target)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Enable trace logging
    #[arg(long, global = true)]
    pub trace: bool,

    /// Quiet mode (WARN and ERROR only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Set the level of one target, e.g. "sync=debug" or "api=trace".
    /// Targets are prefixed with "slashhook::" automatically.
    #[arg(long = "log", value_name = "TARGET=LEVEL", global = true)]
    pub overrides: Vec<String>,

    /// Log output format
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text, global = true)]
    pub format: LogFormat,
}

/// Resolved logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub preset: LogPreset,
    /// Per-target level overrides, keyed by full target
    pub overrides: BTreeMap<String, Level>,
    pub format: LogFormat,
}

impl From<&LogArgs> for LogConfig {
    fn from(args: &LogArgs) -> Self {
        // Quieter flags win over louder ones
        let preset = if args.quiet {
            LogPreset::Quiet
        } else if args.trace {
            LogPreset::Trace
        } else if args.debug {
            LogPreset::Debug
        } else if args.verbose {
            LogPreset::Verbose
        } else {
            LogPreset::Production
        };

        let overrides = args
            .overrides
            .iter()
            .flat_map(|value| value.split(','))
            .filter_map(parse_override)
            .collect();

        Self {
            preset,
            overrides,
            format: args.format,
        }
    }
}

impl LogConfig {
    /// Build an EnvFilter from this configuration.
    pub fn build_filter(&self) -> EnvFilter {
        if let Ok(env_filter) = EnvFilter::try_from_default_env() {
            return env_filter;
        }

        let mut directives: Vec<String> = self
            .preset
            .directives()
            .iter()
            .map(|directive| directive.to_string())
            .collect();

        for (target, level) in &self.overrides {
            directives.push(format!("{}={}", target, level.as_str().to_lowercase()));
        }

        EnvFilter::try_new(directives.join(",")).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

impl LogPreset {
    fn directives(self) -> &'static [&'static str] {
        match self {
            LogPreset::Production => &[
                "slashhook::startup=info",
                "slashhook::dispatch=info",
                "slashhook::sync=info",
                "slashhook::verify=warn",
                "slashhook::registry=warn",
                "slashhook::api=warn",
                "tower_http=warn",
            ],
            LogPreset::Verbose => &["slashhook=info", "tower_http=info"],
            LogPreset::Debug => &["slashhook=debug", "tower_http=debug"],
            LogPreset::Trace => &["slashhook=trace", "tower_http=trace"],
            LogPreset::Quiet => &["slashhook=warn", "tower_http=error"],
        }
    }
}

/// Parse one `target=level` pair, qualifying bare targets.
fn parse_override(part: &str) -> Option<(String, Level)> {
    let (target, level) = part.split_once('=')?;
    let target = target.trim();
    let level: Level = level.trim().parse().ok()?;

    let full_target = if target.starts_with(TARGET_PREFIX) || target == "tower_http" {
        target.to_string()
    } else {
        format!("{}{}", TARGET_PREFIX, target)
    };
    Some((full_target, level))
}

/// Initialize the global tracing subscriber.
pub fn init(config: &LogConfig) {
    let filter = config.build_filter();

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(true))
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .init();
        }
    }
}
