use serde::Serialize;

use super::context::DecodeContext;
use crate::wire::WireError;
use crate::FieldRecord;

/// Outcome of decoding one embedded blob.
///
/// The captured fields also land in the enclosing packet's field list;
/// they are repeated here so the routine that framed the blob can inspect
/// or forward them as one keyed record.
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddedRow {
    /// Resolved table name, or `None` when the discriminator was
    /// unrecognized and the generic scan ran instead.
    pub table: Option<&'static str>,
    pub fields: Vec<FieldRecord>,
    /// Bytes the embedded decode left unread.
    pub trailing_bytes: usize,
}

impl EmbeddedRow {
    /// Whether the blob decoded against a known row layout.
    pub fn is_known(&self) -> bool {
        self.table.is_some()
    }
}

/// Schemaless scan for blobs with no registered layout.
///
/// Consumes four-byte cells while a whole cell remains, then the tail
/// byte-by-byte. Nothing is dropped; the cells keep their raw bit
/// patterns since their interpretation is unknown.
pub(crate) fn generic_payload(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    let mut index = 0u32;
    while ctx.remaining() >= 4 {
        ctx.set_path(&[index]);
        ctx.read_raw32("BlockValue")?;
        index += 1;
    }
    while ctx.remaining() > 0 {
        ctx.set_path(&[index]);
        ctx.read_u8("ByteValue")?;
        index += 1;
    }
    ctx.clear_path();
    Ok(())
}
