//! Logger setup shared by the binaries.

use log::LevelFilter;

use crate::Config;

/// Level used until the configuration is loaded
const STARTUP_LEVEL: LevelFilter = LevelFilter::Info;

fn rust_log_set() -> bool {
    std::env::var_os("RUST_LOG").is_some()
}

/// Start the logger. Call before anything else so config loading is logged.
///
/// `RUST_LOG` takes full control when set. Otherwise every record reaches
/// the global level gate, which starts at `info` and is moved to the
/// configured level by [`apply_config`].
pub fn init() {
    if rust_log_set() {
        env_logger::Builder::from_env(env_logger::Env::default()).init();
    } else {
        env_logger::Builder::new()
            .filter_level(LevelFilter::Trace)
            .init();
        log::set_max_level(STARTUP_LEVEL);
    }
}

/// Level named by `mdmviz.log_level`, `info` when it does not parse
pub fn configured_level(config: &Config) -> LevelFilter {
    config.mdmviz.log_level.parse().unwrap_or(STARTUP_LEVEL)
}

/// Switch to the configured level unless `RUST_LOG` is in charge
pub fn apply_config(config: &Config) {
    if rust_log_set() {
        return;
    }
    let level = configured_level(config);
    log::set_max_level(level);
    log::debug!("Log level set to {}", level);
}
