//! Logging utilities

use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

const QUIET_CRATES: [&str; 3] = ["async_std=error", "async_io=error", "polling=error"];

/// Filter directives for the subscriber
///
/// `--debug` wins, then `ALSACONTROL_LOG`, then plain info.  The async
/// runtime crates are always kept at error.
fn directives(debug: bool, env: Option<&str>) -> String {
    let base = match env {
        _ if debug => "debug",
        Some(env) if !env.trim().is_empty() => env.trim(),
        _ => "info",
    };

    let mut all: Vec<&str> = QUIET_CRATES.to_vec();
    all.push(base);
    all.join(",")
}

/// Install the global subscriber, `--debug` raises the level to debug
pub(crate) fn init(debug: bool) {
    let env = std::env::var("ALSACONTROL_LOG").ok();
    let filter = EnvFilter::try_new(directives(debug, env.as_deref())).unwrap_or_else(|e| {
        eprintln!("Ignoring ALSACONTROL_LOG: {}", e);
        EnvFilter::new(directives(debug, None))
    });

    // stdout is reserved for command output
    fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .with_writer(std::io::stderr)
        .init();
}

/// Log version and name to the console
pub(crate) fn log_info() {
    info!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
}

/// Create an oops (a fatal crash) with an associated error message
pub(crate) fn oops<S: Into<String>>(msg: S, code: u16) -> ! {
    error!("{}", msg.into());
    std::process::exit(code.into());
}
