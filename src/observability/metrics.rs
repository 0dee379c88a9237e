//! Metrics recording.
//!
//! # Metrics
//! - `hotconf_reloads_total` (counter): reloads by owner and outcome
//! - `hotconf_reload_duration_seconds` (histogram): rebuild latency
//! - `hotconf_migrations_total` (counter): file migrations by owner
//! - `hotconf_registered_owners` (gauge): live registrations
//! - `hotconf_decode_fallbacks_total` (counter): values replaced by defaults
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; no exporter is installed here
//! - Recording is a no-op until the host installs a recorder

use std::time::Duration;

pub fn record_reload(owner: &str, success: bool, elapsed: Duration) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("hotconf_reloads_total", "owner" => owner.to_string(), "outcome" => outcome)
        .increment(1);
    metrics::histogram!("hotconf_reload_duration_seconds", "owner" => owner.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_migration(owner: &str) {
    metrics::counter!("hotconf_migrations_total", "owner" => owner.to_string()).increment(1);
}

pub fn record_registered_owners(count: usize) {
    metrics::gauge!("hotconf_registered_owners").set(count as f64);
}

pub fn record_decode_fallback() {
    metrics::counter!("hotconf_decode_fallbacks_total").increment(1);
}
