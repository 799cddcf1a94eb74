use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs a stderr subscriber for the `tracing` spans emitted by the
/// compiler passes. Safe to call more than once; later calls are no-ops.
pub fn tracing_init() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}

pub fn tracing_shutdown() {}
