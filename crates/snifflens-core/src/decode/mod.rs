//! Decode-facing surface used by routines.
//!
//! A routine receives one [`DecodeContext`] per packet. The context layers
//! the capture sink over the wire reader:
//! - every `read_*` call reads from the wire and records the value under
//!   the given field name and the current index path
//! - `decode_embedded` frames an inner payload and runs the secondary
//!   registry over it, falling back to a schemaless scan
//! - keyed rows are forwarded to the shared record store explicitly
//!
//! The client build is deliberately not exposed here; version drift is a
//! registry concern.

mod context;
mod framing;
mod sink;

pub use context::DecodeContext;
pub use framing::EmbeddedRow;
pub use sink::FieldSink;
