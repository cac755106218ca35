//!
//! Diagnostics go to stderr through `tracing`. The plugin installs its own
//! fmt subscriber at load time unless the host process already set a global
//! one, in which case events flow to the host's subscriber instead.
//!

use tracing::level_filters::LevelFilter;

use crate::config::LogConfig;

/// Install the stderr subscriber; `false` if another subscriber was already set
pub fn init(config: &LogConfig) -> bool {
    let level = config.level_filter().unwrap_or(LevelFilter::WARN);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_max_level(level)
        .try_init()
        .is_ok()
}
