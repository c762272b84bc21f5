use thiserror::Error;

use crate::BuildId;

/// Errors raised by registry construction and lookup.
///
/// The `Overlap` and `DuplicateMin` variants surface at freeze time, before
/// any packet is decoded; `Unknown` is the per-packet lookup miss.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no handler for {key} at build {build}")]
    Unknown { key: String, build: BuildId },
    #[error("overlapping registrations for {key}: {first} and {second}")]
    Overlap {
        key: String,
        first: &'static str,
        second: &'static str,
    },
    #[error("duplicate minimum build {build} for {key}: {first} and {second}")]
    DuplicateMin {
        key: String,
        build: BuildId,
        first: &'static str,
        second: &'static str,
    },
}
