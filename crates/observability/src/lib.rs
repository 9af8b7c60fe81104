//! Process-wide logging setup shared by the edugate binaries.

/// Initialize tracing for the process.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber configuration (filters, JSON layer).
pub mod tracing;
