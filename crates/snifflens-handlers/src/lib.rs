//! Decode routine catalogue for SniffLens captures.
//!
//! Layouts are grouped by the client build that introduced them: `v19033`
//! carries the base 6.0.2 catalogue, later era modules register only the
//! messages whose wire format drifted. [`build_decoder`] aggregates every
//! era into one frozen decoder; registration conflicts surface there, before
//! any packet is decoded. Embedded row layouts for the hotfix channel live
//! in [`tables`], keyed by table hash instead of opcode.
//!
//! # Examples
//! ```
//! use std::sync::Arc;
//!
//! use snifflens_core::{BuildCatalog, Direction, MemoryStore, ParseStatus, RawPacket};
//! use snifflens_handlers::{KnownBuilds, build_decoder, opcodes};
//!
//! let decoder = build_decoder(Arc::new(MemoryStore::new()))?;
//! let build = KnownBuilds.resolve("6.0.2.19033").unwrap();
//!
//! let decoded = decoder.decode(RawPacket {
//!     opcode: opcodes::SMSG_MINIMAP_PING,
//!     direction: Direction::ServerToClient,
//!     build,
//!     sequence: 0,
//!     timestamp: None,
//!     payload: vec![
//!         0x01, 0x00, 0x2a, // sender id, low byte present
//!         0x00, 0x00, 0xc0, 0x3f, // x = 1.5
//!         0x00, 0x00, 0x10, 0xc0, // y = -2.25
//!     ],
//! });
//! assert_eq!(decoded.status, ParseStatus::Success);
//! assert_eq!(decoded.opcode_name.as_deref(), Some("SMSG_MINIMAP_PING"));
//! # Ok::<(), snifflens_core::RegistryError>(())
//! ```

use std::sync::Arc;

use snifflens_core::{Decoder, RecordStore, RegistryBuilder, RegistryError};

pub mod builds;
pub mod opcodes;
pub mod tables;

mod v19033;
mod v19103;
mod v19700;

pub use builds::KnownBuilds;

/// Build the decoder for the supported client line.
///
/// Registers every era's routes and row layouts, freezes both registries
/// and wires in the record store. Fails only on a defective catalogue
/// (overlapping or duplicate registrations), never on input data.
pub fn build_decoder(store: Arc<dyn RecordStore>) -> Result<Decoder, RegistryError> {
    let mut routes = RegistryBuilder::new();
    v19033::register(&mut routes);
    v19103::register(&mut routes);
    v19700::register(&mut routes);

    let mut rows = RegistryBuilder::new();
    tables::register(&mut rows);

    let routes = routes.freeze()?;
    let rows = rows.freeze()?;
    tracing::info!(
        routes = routes.len(),
        tables = rows.len(),
        "handler catalogue frozen"
    );
    Ok(Decoder::new(routes, rows, store))
}
