use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG`, defaulting to `info`.
///
/// Safe to call more than once; later calls leave the existing subscriber in place.
pub fn init() {
    init_with_default("info");
}

pub fn init_with_default(default_filter: &str) {
    let subscriber_result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(true)
        .try_init();
    if subscriber_result.is_err() {
        // tracing was already initialised; continue silently
    }
}
