use super::framing::{self, EmbeddedRow};
use super::sink::FieldSink;
use crate::registry::{Registry, TableKey};
use crate::store::RecordStore;
use crate::wire::{PacketReader, WireError};
use crate::{BuildId, FieldValue};

/// Per-packet decode state handed to routines.
///
/// Every `read_*` method reads the wire and records the decoded value under
/// `field` and the current index path in one step. Loop bodies scope their
/// records with [`DecodeContext::set_path`]; the path resets to the scope of
/// the enclosing payload with [`DecodeContext::clear_path`].
///
/// The context carries the client build only to resolve embedded payloads
/// against the secondary registry; routines cannot observe it.
pub struct DecodeContext<'a> {
    reader: PacketReader<'a>,
    sink: &'a mut FieldSink,
    base_path: Vec<u32>,
    indices: Vec<u32>,
    build: BuildId,
    tables: &'a Registry<TableKey>,
    store: &'a dyn RecordStore,
    embedded_shortfall: usize,
}

impl<'a> DecodeContext<'a> {
    pub(crate) fn new(
        payload: &'a [u8],
        sink: &'a mut FieldSink,
        build: BuildId,
        tables: &'a Registry<TableKey>,
        store: &'a dyn RecordStore,
    ) -> Self {
        Self {
            reader: PacketReader::new(payload),
            sink,
            base_path: Vec::new(),
            indices: Vec::new(),
            build,
            tables,
            store,
            embedded_shortfall: 0,
        }
    }

    fn record(&mut self, field: &'static str, value: FieldValue) {
        let mut path = self.base_path.clone();
        path.extend_from_slice(&self.indices);
        self.sink.add(field, &path, value);
    }

    /// Record a value that was not read from the wire, such as a derived
    /// note.
    pub fn add_value(&mut self, field: &'static str, value: FieldValue) {
        self.record(field, value);
    }

    /// Set the loop indices applied to subsequent records, outermost first.
    pub fn set_path(&mut self, indices: &[u32]) {
        self.indices.clear();
        self.indices.extend_from_slice(indices);
    }

    pub fn clear_path(&mut self) {
        self.indices.clear();
    }

    /// Whole bytes left in this payload.
    pub fn remaining(&self) -> usize {
        self.reader.remaining()
    }

    pub(crate) fn embedded_shortfall(&self) -> usize {
        self.embedded_shortfall
    }

    /// Discard unread bits of the current byte, as the layout dictates.
    pub fn reset_bits(&mut self) {
        self.reader.reset_bits();
    }

    pub fn read_bit(&mut self, field: &'static str) -> Result<bool, WireError> {
        let value = self.reader.read_bit(field)?;
        self.record(field, FieldValue::Bool(value));
        Ok(value)
    }

    pub fn read_bits(&mut self, field: &'static str, count: u32) -> Result<u64, WireError> {
        let value = self.reader.read_bits(field, count)?;
        self.record(field, FieldValue::Uint(value));
        Ok(value)
    }

    /// Read a bit-packed length prefix without recording it; lengths are
    /// structural, not fields.
    pub fn read_length(&mut self, field: &'static str, bits: u32) -> Result<usize, WireError> {
        Ok(self.reader.read_bits(field, bits)? as usize)
    }

    /// Read an unrecorded 16-bit length prefix.
    pub fn read_length_u16(&mut self, field: &'static str) -> Result<usize, WireError> {
        Ok(usize::from(self.reader.read_u16(field)?))
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, WireError> {
        let value = self.reader.read_u8(field)?;
        self.record(field, FieldValue::Uint(u64::from(value)));
        Ok(value)
    }

    pub fn read_u16(&mut self, field: &'static str) -> Result<u16, WireError> {
        let value = self.reader.read_u16(field)?;
        self.record(field, FieldValue::Uint(u64::from(value)));
        Ok(value)
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, WireError> {
        let value = self.reader.read_u32(field)?;
        self.record(field, FieldValue::Uint(u64::from(value)));
        Ok(value)
    }

    pub fn read_u64(&mut self, field: &'static str) -> Result<u64, WireError> {
        let value = self.reader.read_u64(field)?;
        self.record(field, FieldValue::Uint(value));
        Ok(value)
    }

    pub fn read_i8(&mut self, field: &'static str) -> Result<i8, WireError> {
        let value = self.reader.read_i8(field)?;
        self.record(field, FieldValue::Int(i64::from(value)));
        Ok(value)
    }

    pub fn read_i16(&mut self, field: &'static str) -> Result<i16, WireError> {
        let value = self.reader.read_i16(field)?;
        self.record(field, FieldValue::Int(i64::from(value)));
        Ok(value)
    }

    pub fn read_i32(&mut self, field: &'static str) -> Result<i32, WireError> {
        let value = self.reader.read_i32(field)?;
        self.record(field, FieldValue::Int(i64::from(value)));
        Ok(value)
    }

    pub fn read_i64(&mut self, field: &'static str) -> Result<i64, WireError> {
        let value = self.reader.read_i64(field)?;
        self.record(field, FieldValue::Int(value));
        Ok(value)
    }

    pub fn read_f32(&mut self, field: &'static str) -> Result<f32, WireError> {
        let value = self.reader.read_f32(field)?;
        self.record(field, FieldValue::Float(value));
        Ok(value)
    }

    /// A four-byte cell with no schema, kept as its raw bit pattern.
    pub fn read_raw32(&mut self, field: &'static str) -> Result<u32, WireError> {
        let value = self.reader.read_u32(field)?;
        self.record(field, FieldValue::Raw32(value));
        Ok(value)
    }

    pub fn read_time(&mut self, field: &'static str) -> Result<i64, WireError> {
        let value = self.reader.read_time(field)?;
        self.record(field, FieldValue::Time(value));
        Ok(value)
    }

    pub fn read_bytes(&mut self, field: &'static str, len: usize) -> Result<Vec<u8>, WireError> {
        let bytes = self.reader.read_bytes(field, len)?.to_vec();
        self.record(field, FieldValue::Bytes(bytes.clone()));
        Ok(bytes)
    }

    pub fn read_text(&mut self, field: &'static str, len: usize) -> Result<String, WireError> {
        let value = self.reader.read_text(field, len)?;
        self.record(field, FieldValue::Text(value.clone()));
        Ok(value)
    }

    /// Text prefixed by a `bits`-wide length in the current bit group.
    ///
    /// The cursor realigns after the prefix; the layouts that use this form
    /// always place the string on the next byte boundary.
    pub fn read_text_bits_len(
        &mut self,
        field: &'static str,
        bits: u32,
    ) -> Result<String, WireError> {
        let len = self.reader.read_bits(field, bits)? as usize;
        self.reader.reset_bits();
        self.read_text(field, len)
    }

    pub fn read_cstring(&mut self, field: &'static str) -> Result<String, WireError> {
        let value = self.reader.read_cstring(field)?;
        self.record(field, FieldValue::Text(value.clone()));
        Ok(value)
    }

    pub fn read_packed_guid(&mut self, field: &'static str) -> Result<u128, WireError> {
        let value = self.reader.read_packed_guid(field)?;
        self.record(field, FieldValue::Guid(value));
        Ok(value)
    }

    pub fn read_vec2(&mut self, field: &'static str) -> Result<(f32, f32), WireError> {
        let x = self.reader.read_f32(field)?;
        let y = self.reader.read_f32(field)?;
        self.record(field, FieldValue::Vec2 { x, y });
        Ok((x, y))
    }

    pub fn read_vec3(&mut self, field: &'static str) -> Result<(f32, f32, f32), WireError> {
        let x = self.reader.read_f32(field)?;
        let y = self.reader.read_f32(field)?;
        let z = self.reader.read_f32(field)?;
        self.record(field, FieldValue::Vec3 { x, y, z });
        Ok((x, y, z))
    }

    pub fn read_enum_u8(
        &mut self,
        field: &'static str,
        label: fn(u64) -> Option<&'static str>,
    ) -> Result<u64, WireError> {
        let raw = u64::from(self.reader.read_u8(field)?);
        self.record_enum(field, raw, label);
        Ok(raw)
    }

    pub fn read_enum_u16(
        &mut self,
        field: &'static str,
        label: fn(u64) -> Option<&'static str>,
    ) -> Result<u64, WireError> {
        let raw = u64::from(self.reader.read_u16(field)?);
        self.record_enum(field, raw, label);
        Ok(raw)
    }

    pub fn read_enum_u32(
        &mut self,
        field: &'static str,
        label: fn(u64) -> Option<&'static str>,
    ) -> Result<u64, WireError> {
        let raw = u64::from(self.reader.read_u32(field)?);
        self.record_enum(field, raw, label);
        Ok(raw)
    }

    fn record_enum(&mut self, field: &'static str, raw: u64, label: fn(u64) -> Option<&'static str>) {
        self.record(
            field,
            FieldValue::Enum {
                raw,
                label: label(raw).map(str::to_string),
            },
        );
    }

    /// Frame `len` bytes as an embedded payload and decode it through the
    /// secondary registry keyed by `table`.
    ///
    /// An unrecognized discriminator falls back to a schemaless scan; it is
    /// never an error. Bytes the embedded decode leaves unread downgrade
    /// the enclosing packet, not the embedded one.
    pub fn decode_embedded(
        &mut self,
        field: &'static str,
        len: usize,
        table: TableKey,
    ) -> Result<EmbeddedRow, WireError> {
        let blob = self.reader.read_bytes(field, len)?;
        let start = self.sink.len();
        let resolved = self.tables.resolve(table, self.build).ok();

        let mut base_path = self.base_path.clone();
        base_path.extend_from_slice(&self.indices);

        let mut child = DecodeContext {
            reader: PacketReader::new(blob),
            sink: &mut *self.sink,
            base_path,
            indices: Vec::new(),
            build: self.build,
            tables: self.tables,
            store: self.store,
            embedded_shortfall: 0,
        };

        let table_name = match resolved {
            Some(handler) => {
                (handler.routine)(&mut child)?;
                Some(handler.name)
            }
            None => {
                framing::generic_payload(&mut child)?;
                None
            }
        };

        let trailing_bytes = child.reader.remaining();
        let nested_shortfall = child.embedded_shortfall;
        self.embedded_shortfall += trailing_bytes + nested_shortfall;

        let fields = self.sink.records()[start..].to_vec();
        Ok(EmbeddedRow {
            table: table_name,
            fields,
            trailing_bytes,
        })
    }

    /// Name of the table a discriminator resolves to at this packet's
    /// build, if any.
    pub fn table_name(&self, table: TableKey) -> Option<&'static str> {
        self.tables
            .resolve(table, self.build)
            .ok()
            .map(|handler| handler.name)
    }

    /// Forward a keyed row to the shared record store. Later writes for the
    /// same `(table, key)` replace earlier ones.
    pub fn store_record(&mut self, table: &'static str, key: i64, fields: Vec<crate::FieldRecord>) {
        self.store.put(table, key, fields);
    }

    /// Drop any stored row for `(table, key)`.
    pub fn remove_record(&mut self, table: &'static str, key: i64) {
        self.store.remove(table, key);
    }
}
