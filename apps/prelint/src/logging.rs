//! Tracing subscriber setup. Logs go to stderr so stdout stays parseable.

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Pick the max level from CLI verbosity, falling back to the config value.
///
/// `-q` wins over everything; each `-v` raises the level one step above
/// the default `warn`.
pub fn level_for(verbose: u8, quiet: bool, configured: Option<&str>) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => configured.and_then(parse_level).unwrap_or(Level::WARN),
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn parse_level(s: &str) -> Option<Level> {
    match s.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

pub fn init(level: Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::env::var_os("NO_COLOR").is_none())
        .finish();
    // Already installed (e.g. by an embedding caller): keep theirs.
    let _ = tracing::subscriber::set_global_default(subscriber);
}
