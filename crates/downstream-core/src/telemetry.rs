//! Tracing initialisation for the plugin binary.
//!
//! Call [`init_tracing`] once at program start. Drone captures the step's
//! stderr/stdout as the build log, so output goes to stdout without ANSI
//! colours unless the terminal asks for them.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// * `json` — emit newline-delimited JSON log lines.
/// * `level` — default verbosity when `RUST_LOG` is not set.
///
/// Only the first call takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level));
    let ansi = std::env::var_os("NO_COLOR").is_none() && std::env::var_os("CI").is_none();

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_ansi(ansi))
            .try_init()
            .ok();
    }
}

/// Our crates at `level`, dependencies (reqwest, hyper) at warn.
fn default_filter(level: Level) -> EnvFilter {
    EnvFilter::new(format!(
        "warn,downstream_core={level},wait_downstream={level}",
        level = level.as_str().to_lowercase()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_mentions_crates() {
        let filter = default_filter(Level::DEBUG).to_string();
        assert!(filter.contains("downstream_core=debug"));
        assert!(filter.contains("wait_downstream=debug"));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing(false, Level::INFO);
        init_tracing(true, Level::DEBUG);
    }
}
