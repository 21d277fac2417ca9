pub mod actions;
pub mod assessment;
pub mod clients;
pub mod config;
pub mod error;
pub mod history;
pub mod http;
pub mod parsing;
pub mod schemas;
pub mod server;
pub mod store;
pub mod tools;

use config::RuntimeConfig;

/// Install the global subscriber. Logs go to stderr without ANSI so the
/// stdio MCP stream stays clean; `ABLE_NO_LOG=1` turns logging off.
pub fn init_tracing(runtime: &RuntimeConfig) {
    if runtime.no_log {
        return;
    }
    let filter = tracing_subscriber::EnvFilter::new(&runtime.log_level);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .try_init();
}
