//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields: owner, path, key, error)
//!     → metrics.rs (reload outcomes, migrations, decode fallbacks)
//!
//! Consumers:
//!     → logging.rs subscriber in the binary, or the host's own
//!     → whatever metrics recorder the host installs
//! ```

pub mod logging;
pub mod metrics;
