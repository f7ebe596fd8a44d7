//! Logging infrastructure
//!
//! Installs the global `tracing` subscriber for the binaries.

mod logging;

pub use logging::{TelemetryError, init_logging};
