//! Logging setup for the resizer binary.
//!
//! Everything goes to stderr; stdout is reserved for conversion reports and
//! session answers, which peers parse line by line.
//!
//! Level precedence, highest first:
//! 1. `RUST_LOG`, when set, replaces the filter entirely
//! 2. `trace` in `[logging] level` (kept even with `--verbose`)
//! 3. `--verbose`, which raises any other configured level to `debug`
//! 4. `[logging] level` from the config file (default `info`)

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber with `level` as the default directive.
///
/// `json_format` selects one JSON object per event instead of the
/// human-readable layout.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Resolve the level and format from `config` and the CLI flags, then
/// install the subscriber.
pub fn init_from_config(
    config: &resizer_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let level = effective_level(&config.logging.level, verbose_override);
    let json_format = json_logs_override || config.logging.format == "json";
    init(level, json_format);
}

fn effective_level(configured: &str, verbose: bool) -> &str {
    match configured {
        "trace" => "trace",
        _ if verbose => "debug",
        other => other,
    }
}
