//! Tracing setup for binaries and test harnesses embedding the engine.

use std::sync::Once;

static INIT: Once = Once::new();

/// Install a formatted stderr subscriber once; later calls are no-ops so
/// tests and embedding hosts can both call it freely.
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(tracing::Level::INFO)
            .init();
    });
}
