//! Console logging for the paystat binary.
//!
//! Library code only emits records through the `log` macros; the binary
//! installs `env_logger` once at startup. The default level is `info` and
//! `RUST_LOG` overrides it:
//!
//! ```bash
//! RUST_LOG=debug paystat histogram --column total_amount_of_payment_usdollars
//! RUST_LOG=paystat::fetch=debug,warn paystat load
//! ```
//!
//! Records go to stderr so command output on stdout stays machine-readable.

use anyhow::{Context as _, Result};
use env_logger::{Builder, Env, Target};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Environment variable read for the filter directives.
pub const FILTER_ENV: &str = "RUST_LOG";

fn builder(env_var: &str, default_filter: &str) -> Builder {
    let mut builder = Builder::from_env(Env::new().filter_or(env_var, default_filter));
    builder
        .target(Target::Stderr)
        .format_target(true)
        .format_timestamp_secs();
    builder
}

/// Installs the global logger with the default `info` filter.
///
/// # Errors
///
/// Returns error if a global logger has already been installed.
pub fn init() -> Result<()> {
    init_with(DEFAULT_FILTER)
}

/// Installs the global logger, falling back to `default_filter` when
/// `RUST_LOG` is unset.
///
/// # Errors
///
/// Returns error if a global logger has already been installed.
pub fn init_with(default_filter: &str) -> Result<()> {
    builder(FILTER_ENV, default_filter)
        .try_init()
        .context("Failed to initialize logging")?;
    log::debug!("Logging initialized (default filter '{default_filter}')");
    Ok(())
}
