use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;

use crate::args::GlobalArgs;

/// Install a stderr subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level follows `--quiet`/`--verbose`,
/// with the `debug` setting raising the default to `debug`.
pub fn init_tracing(global: &GlobalArgs, debug: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(global, debug)));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .with_filter(env_filter);

    Registry::default().with(stderr_layer).init();
}

fn default_level(global: &GlobalArgs, debug: bool) -> &'static str {
    if global.quiet {
        return "error";
    }
    match (global.verbose, debug) {
        (0, false) => "warn",
        (1, false) => "info",
        (0 | 1, true) | (2, _) => "debug",
        _ => "trace",
    }
}
