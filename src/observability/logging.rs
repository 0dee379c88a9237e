//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for the binary
//! - Let `RUST_LOG` override the default directive
//!
//! # Design Decisions
//! - The library only emits events; installing a subscriber is left to
//!   the host application (or the `hotconf` binary)

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global subscriber. `default_directive` applies when
/// `RUST_LOG` is unset or invalid. Returns false if a subscriber was
/// already installed.
pub fn init(default_directive: &str) -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
