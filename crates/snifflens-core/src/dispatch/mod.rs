//! Per-packet orchestration.
//!
//! [`Decoder`] owns the frozen registries and the shared record store. One
//! call to [`Decoder::decode`] takes one raw packet through resolution, the
//! decode routine and outcome classification; nothing a payload contains can
//! fail more than its own packet. Batch and feed decoding, worker threads
//! and cancellation are layered on top in this module's `batch` half.
//!
//! Version française (résumé):
//! Le module orchestre le décodage paquet par paquet (résolution, routine,
//! classement du résultat). Chaque erreur reste confinée à son paquet; le
//! traitement par lot et l'annulation vivent dans `batch`.

mod batch;

use std::sync::Arc;

pub use batch::{BatchOptions, BatchReport, BatchSummary, CancelToken};

use crate::decode::{DecodeContext, FieldSink};
use crate::registry::{Registry, RouteKey, TableKey};
use crate::store::RecordStore;
use crate::{DecodedPacket, ParseStatus, RawPacket};

/// Bytes of unread tail shown in a diagnostic before it is cut off.
const TAIL_PREVIEW: usize = 32;

/// Decoding engine for one capture session.
///
/// Holds the route registry (opcode + direction), the table registry for
/// embedded payloads and the record store routines forward keyed rows to.
/// Both registries are frozen before the decoder exists, so `decode` may be
/// called from any number of threads at once.
pub struct Decoder {
    routes: Registry<RouteKey>,
    tables: Registry<TableKey>,
    store: Arc<dyn RecordStore>,
}

impl Decoder {
    pub fn new(
        routes: Registry<RouteKey>,
        tables: Registry<TableKey>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            routes,
            tables,
            store,
        }
    }

    /// Decode one packet, downgrading every failure into the result.
    ///
    /// Resolution failures return `NotParsed` with the payload untouched.
    /// A routine error also returns `NotParsed` but keeps the fields read
    /// before the failure. A routine that returns without consuming the
    /// whole payload (outer or embedded) yields `WithErrors` plus a
    /// diagnostic naming the unread span.
    pub fn decode(&self, raw: RawPacket) -> DecodedPacket {
        let key = RouteKey::new(raw.opcode, raw.direction);
        let handler = match self.routes.resolve(key, raw.build) {
            Ok(handler) => handler,
            Err(err) => {
                tracing::debug!(sequence = raw.sequence, %key, build = %raw.build, "unroutable packet");
                return DecodedPacket {
                    opcode_name: None,
                    status: ParseStatus::NotParsed,
                    fields: Vec::new(),
                    trailing_bytes: raw.payload.len(),
                    diagnostic: Some(err.to_string()),
                    source: raw,
                };
            }
        };

        let mut sink = FieldSink::new();
        let mut ctx = DecodeContext::new(
            &raw.payload,
            &mut sink,
            raw.build,
            &self.tables,
            self.store.as_ref(),
        );
        let outcome = (handler.routine)(&mut ctx);
        let trailing_bytes = ctx.remaining();
        let embedded_shortfall = ctx.embedded_shortfall();
        drop(ctx);

        let (status, diagnostic) = match outcome {
            Err(err) => {
                tracing::debug!(
                    sequence = raw.sequence,
                    name = handler.name,
                    error = %err,
                    "decode routine failed"
                );
                (ParseStatus::NotParsed, Some(err.to_string()))
            }
            Ok(()) if trailing_bytes > 0 || embedded_shortfall > 0 => {
                tracing::debug!(
                    sequence = raw.sequence,
                    name = handler.name,
                    trailing_bytes,
                    embedded_shortfall,
                    "payload not fully consumed"
                );
                let note = consumption_note(&raw.payload, trailing_bytes, embedded_shortfall);
                (ParseStatus::WithErrors, Some(note))
            }
            Ok(()) => (ParseStatus::Success, None),
        };

        DecodedPacket {
            opcode_name: Some(handler.name.to_string()),
            status,
            fields: sink.into_records(),
            trailing_bytes,
            diagnostic,
            source: raw,
        }
    }
}

fn consumption_note(payload: &[u8], trailing_bytes: usize, embedded_shortfall: usize) -> String {
    let mut note = String::new();
    if trailing_bytes > 0 {
        let offset = payload.len() - trailing_bytes;
        let tail = &payload[offset..];
        let shown = &tail[..tail.len().min(TAIL_PREVIEW)];
        let hex: Vec<String> = shown.iter().map(|byte| format!("{byte:02x}")).collect();
        note = format!(
            "{trailing_bytes} trailing bytes unread at offset {offset}: {}",
            hex.join(" ")
        );
        if tail.len() > shown.len() {
            note.push_str(" ..");
        }
    }
    if embedded_shortfall > 0 {
        if !note.is_empty() {
            note.push_str("; ");
        }
        note.push_str(&format!(
            "{embedded_shortfall} embedded bytes left unread"
        ));
    }
    note
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryBuilder;
    use crate::store::MemoryStore;
    use crate::wire::WireError;
    use crate::{BuildId, DecodeFn, Direction, FieldValue, VersionRange};

    const OPCODE: u32 = 0x0042;

    fn serial_then_flags(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
        ctx.read_u16("Serial")?;
        ctx.read_u32("Flags")?;
        Ok(())
    }

    fn embedded_row(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
        let len = ctx.read_length_u16("Size")?;
        ctx.decode_embedded("Row", len, TableKey(0x01))?;
        Ok(())
    }

    fn decoder_with(routine: DecodeFn) -> Decoder {
        let mut routes = RegistryBuilder::new();
        routes.register(
            RouteKey::new(OPCODE, Direction::ServerToClient),
            VersionRange::since(BuildId(0)),
            "SMSG_SAMPLE",
            routine,
        );
        Decoder::new(
            routes.freeze().unwrap(),
            RegistryBuilder::new().freeze().unwrap(),
            Arc::new(MemoryStore::new()),
        )
    }

    fn packet(payload: Vec<u8>) -> RawPacket {
        RawPacket {
            opcode: OPCODE,
            direction: Direction::ServerToClient,
            build: BuildId(19033),
            sequence: 0,
            timestamp: None,
            payload,
        }
    }

    #[test]
    fn exact_consumption_is_success() {
        let decoder = decoder_with(serial_then_flags);
        let decoded = decoder.decode(packet(vec![1, 0, 2, 0, 0, 0]));

        assert_eq!(decoded.status, ParseStatus::Success);
        assert_eq!(decoded.opcode_name.as_deref(), Some("SMSG_SAMPLE"));
        assert_eq!(decoded.trailing_bytes, 0);
        assert!(decoded.diagnostic.is_none());
        assert_eq!(decoded.fields.len(), 2);
        assert_eq!(decoded.fields[1].value, FieldValue::Uint(2));
    }

    #[test]
    fn trailing_bytes_downgrade_with_hex_note() {
        let decoder = decoder_with(serial_then_flags);
        let decoded = decoder.decode(packet(vec![1, 0, 2, 0, 0, 0, 0xAA, 0xBB]));

        assert_eq!(decoded.status, ParseStatus::WithErrors);
        assert_eq!(decoded.trailing_bytes, 2);
        assert_eq!(
            decoded.diagnostic.as_deref(),
            Some("2 trailing bytes unread at offset 6: aa bb")
        );
        assert_eq!(decoded.fields.len(), 2);
    }

    #[test]
    fn long_tail_preview_is_cut_off() {
        let decoder = decoder_with(serial_then_flags);
        let mut payload = vec![1, 0, 2, 0, 0, 0];
        payload.extend(std::iter::repeat(0x11).take(40));
        let decoded = decoder.decode(packet(payload));

        assert_eq!(decoded.trailing_bytes, 40);
        let note = decoded.diagnostic.unwrap();
        assert!(note.starts_with("40 trailing bytes unread at offset 6: 11 11"));
        assert!(note.ends_with(".."));
    }

    #[test]
    fn routine_error_keeps_partial_fields() {
        let decoder = decoder_with(serial_then_flags);
        let decoded = decoder.decode(packet(vec![1, 0, 2]));

        assert_eq!(decoded.status, ParseStatus::NotParsed);
        assert_eq!(decoded.fields.len(), 1);
        assert_eq!(decoded.fields[0].name, "Serial");
        let note = decoded.diagnostic.unwrap();
        assert!(note.contains("truncated payload at Flags"), "{note}");
    }

    #[test]
    fn unroutable_packet_is_not_parsed_untouched() {
        let decoder = decoder_with(serial_then_flags);
        let mut raw = packet(vec![1, 2, 3]);
        raw.direction = Direction::ClientToServer;
        let decoded = decoder.decode(raw);

        assert_eq!(decoded.status, ParseStatus::NotParsed);
        assert!(decoded.opcode_name.is_none());
        assert!(decoded.fields.is_empty());
        assert_eq!(decoded.trailing_bytes, 3);
        assert_eq!(
            decoded.diagnostic.as_deref(),
            Some("no handler for 0x0042/client_to_server at build 19033")
        );
    }

    #[test]
    fn embedded_shortfall_downgrades_the_parent() {
        let decoder = decoder_with(embedded_row);
        // 4-byte blob, no table registered: generic scan eats it whole, so
        // force the shortfall with a blob shorter than its declared cell
        let decoded = decoder.decode(packet(vec![0x04, 0x00, 0x2A, 0x00, 0x00, 0x00]));
        assert_eq!(decoded.status, ParseStatus::Success);

        // now a registered routine that leaves 3 of 4 bytes unread
        fn one_byte(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
            ctx.read_u8("Id")?;
            Ok(())
        }
        let mut routes = RegistryBuilder::new();
        routes.register(
            RouteKey::new(OPCODE, Direction::ServerToClient),
            VersionRange::since(BuildId(0)),
            "SMSG_SAMPLE",
            embedded_row as DecodeFn,
        );
        let mut tables = RegistryBuilder::new();
        tables.register(
            TableKey(0x01),
            VersionRange::since(BuildId(0)),
            "row",
            one_byte as DecodeFn,
        );
        let decoder = Decoder::new(
            routes.freeze().unwrap(),
            tables.freeze().unwrap(),
            Arc::new(MemoryStore::new()),
        );

        let decoded = decoder.decode(packet(vec![0x04, 0x00, 0x2A, 0x00, 0x00, 0x00]));
        assert_eq!(decoded.status, ParseStatus::WithErrors);
        assert_eq!(decoded.trailing_bytes, 0);
        assert_eq!(
            decoded.diagnostic.as_deref(),
            Some("3 embedded bytes left unread")
        );
    }
}
