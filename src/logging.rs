//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize tracing for the process, writing to stderr.
///
/// `RUST_LOG` wins when set. Otherwise only warnings are shown, or debug
/// output from this crate with `verbose`. Safe to call multiple times
/// (subsequent calls are no-ops).
pub fn init(verbose: bool) {
    let fallback = if verbose { "opsdesk=debug,warn" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_twice_is_harmless() {
        super::init(false);
        super::init(true);
        tracing::info!("still alive");
    }
}
