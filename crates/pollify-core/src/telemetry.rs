use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize tracing output for binaries and examples embedding this crate.
///
/// Respects `RUST_LOG`; defaults to info-level output for the poll client
/// crates when unset. Call once at startup.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pollify_core=info,sol_rpc=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
