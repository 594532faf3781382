//! Common logging initializer
//!
//! Everything goes to `stderr` (or a file), `stdout` is reserved for the data we fetch.
//!

use eyre::{eyre, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use tracing_tree::HierarchicalLayer;

/// Default level when `RUST_LOG` is not set.
const DEF_LEVEL: &str = "info";

#[tracing::instrument]
pub fn init_logging(
    name: &'static str,
    use_debug: bool,
    use_tree: bool,
    use_file: Option<String>,
) -> Result<()> {
    // Load filters from environment, `--debug` only changes the default.
    //
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if use_debug { "debug" } else { DEF_LEVEL }));

    // Do we want hierarchical output?
    //
    let (tree, compact) = if use_tree {
        let tree = HierarchicalLayer::new(2)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_span_retrace(true)
            .with_span_modes(true)
            .with_targets(true)
            .with_verbose_entry(true)
            .with_verbose_exit(true)
            .with_bracketed_fields(true);
        (Some(tree), None)
    } else {
        let compact = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact();
        (None, Some(compact))
    };

    // Log to file?
    //
    let file = use_file.map(|dir| {
        // Basic append-only rolling file for all traces.
        //
        let file_appender = tracing_appender::rolling::hourly(dir, name);
        fmt::layer().with_ansi(false).with_writer(file_appender)
    });

    // Combine filters & exporters
    //
    tracing_subscriber::registry()
        .with(filter)
        .with(tree)
        .with(compact)
        .with(file)
        .try_init()
        .map_err(|e| eyre!("can not initialise logging: {e}"))
}
