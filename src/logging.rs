//! Logging for the beemind binary: skill loads, reloads and rejected skills at `info`/`warn`,
//! reasoning traces at `debug`.

use tracing_subscriber::{fmt, EnvFilter};
use crate::core::paths::env;

/// Install the stderr subscriber: `RUST_LOG` filter (default `info`), JSON lines when
/// `BEEMIND_LOG_JSON=1` so `beemind ask --json` output on stdout stays machine readable.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let use_json = std::env::var(env::LOG_JSON)
        .map(|value| value == "1")
        .unwrap_or(false);

    if use_json {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json()
            .with_writer(std::io::stderr)
            .try_init();
    } else {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .pretty()
            .with_writer(std::io::stderr)
            .try_init();
    }
}
