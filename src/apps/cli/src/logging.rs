//! Logging Configuration
//!
//! Logs go to stderr so streamed replies on stdout stay clean. Records emitted
//! through the `log` facade by `finchat-core` are captured as well.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

const LOG_LEVEL_ENV: &str = "FINCHAT_LOG_LEVEL";

pub fn parse_log_level(value: &str) -> Option<LevelFilter> {
    match value.trim().to_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" => Some(LevelFilter::WARN),
        "error" => Some(LevelFilter::ERROR),
        "off" => Some(LevelFilter::OFF),
        _ => None,
    }
}

fn fallback_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    }
}

pub fn resolve_level(env_value: Option<&str>, verbose: bool) -> LevelFilter {
    match env_value {
        Some(val) => parse_log_level(val).unwrap_or_else(|| {
            eprintln!(
                "Warning: Invalid {} '{}', falling back to default",
                LOG_LEVEL_ENV, val
            );
            fallback_level(verbose)
        }),
        None => fallback_level(verbose),
    }
}

pub fn init_logging(verbose: bool) {
    let env_value = std::env::var(LOG_LEVEL_ENV).ok();
    let level = resolve_level(env_value.as_deref(), verbose);

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy("");
    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
    if let Err(e) = result {
        eprintln!("Warning: logging already initialized: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels_case_insensitively() {
        assert_eq!(parse_log_level(" Debug "), Some(LevelFilter::DEBUG));
        assert_eq!(parse_log_level("OFF"), Some(LevelFilter::OFF));
        assert_eq!(parse_log_level("verbose"), None);
    }

    #[test]
    fn env_value_wins_over_verbose_flag() {
        assert_eq!(resolve_level(Some("error"), true), LevelFilter::ERROR);
        assert_eq!(resolve_level(None, true), LevelFilter::DEBUG);
        assert_eq!(resolve_level(None, false), LevelFilter::WARN);
        assert_eq!(resolve_level(Some("bogus"), false), LevelFilter::WARN);
    }
}
