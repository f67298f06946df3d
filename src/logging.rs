//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tweetcap_config::LogSettings;

/// Install the global subscriber described by `settings`.
///
/// `RUST_LOG`, when set and valid, takes precedence over `settings.level`.
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes.
pub fn init(settings: &LogSettings) -> bool {
    let filter = filter(&settings.level);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match settings.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .try_init(),
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };
    installed.is_ok()
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
