//! Worker identity derivation
//!
//! The service records the identity of the poller that picked up each task.
//! When the embedding program does not configure one, it is derived as
//! `"<host-identifier>-<unique-token>"`.

use uuid::Uuid;

/// Best-effort host identifier
///
/// Checks `HOSTNAME` and `COMPUTERNAME`, then `/etc/hostname`.
pub fn host_identifier() -> String {
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .chain(std::fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown-host".to_string())
}

/// Derive a fresh identity for a poller
pub fn generate_identity() -> String {
    format!("{}-{}", host_identifier(), Uuid::now_v7())
}
