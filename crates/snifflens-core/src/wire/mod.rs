//! Wire-level payload access.
//!
//! The reader owns the only cursor over a payload and captures the wire
//! conventions of the protocol:
//! - bit groups fill most-significant-bit first within each byte
//! - byte-level reads are little-endian and demand an aligned cursor
//! - packed identifiers are a presence mask followed by the non-zero bytes
//!
//! Routines never index payload bytes directly; every access goes through
//! the reader so bounds and alignment failures carry the field name and
//! offset.

mod error;
mod reader;

pub use error::WireError;
pub use reader::PacketReader;
