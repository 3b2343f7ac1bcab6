//! Log setup shared by the provider and agent binaries.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber, writing to stderr.
///
/// Stdout carries the JSON-RPC channel and must never receive log lines.
/// `RUST_LOG` overrides `default_directives`; `LOG_FORMAT=json` switches to
/// the JSON formatter.
pub fn init(default_directives: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // Ignore a second init, e.g. from tests running in one process.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.with_target(false).try_init()
    };
}
