//! Hotfix channel traffic as shipped in 6.0.2.
//!
//! `SMSG_DB_REPLY` is the one opcode that feeds the record store: each
//! reply carries a single row blob which is decoded through the table
//! registry and kept (or dropped, for negative record ids) under the
//! table's registered name.

use snifflens_core::{
    DecodeContext, Direction, FieldValue, RegistryBuilder, RouteKey, TableKey, VersionRange,
    WireError,
};

use crate::builds::{V19033, V19103};
use crate::{opcodes, tables};

pub(crate) fn register(routes: &mut RegistryBuilder<RouteKey>) {
    // 6.0.3 shrank the request count to a 13-bit field; the replacement
    // lives in the 19103 module.
    routes.register(
        RouteKey::new(opcodes::CMSG_DB_QUERY_BULK, Direction::ClientToServer),
        VersionRange::between(V19033, V19103),
        "CMSG_DB_QUERY_BULK",
        db_query_bulk,
    );
    routes.register(
        RouteKey::new(opcodes::SMSG_DB_REPLY, Direction::ServerToClient),
        VersionRange::since(V19033),
        "SMSG_DB_REPLY",
        db_reply,
    );
    routes.register(
        RouteKey::new(opcodes::SMSG_HOTFIX_NOTIFY, Direction::ServerToClient),
        VersionRange::since(V19033),
        "SMSG_HOTFIX_NOTIFY",
        hotfix_notify,
    );
    routes.register(
        RouteKey::new(opcodes::SMSG_HOTFIX_NOTIFY_BLOB, Direction::ServerToClient),
        VersionRange::since(V19033),
        "SMSG_HOTFIX_NOTIFY_BLOB",
        hotfix_notify_blob,
    );
}

fn db_query_bulk(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_enum_u32("TableHash", tables::table_label)?;
    let count = ctx.read_u32("Count")?;
    for i in 0..count {
        ctx.set_path(&[i]);
        ctx.read_packed_guid("RecordGuid")?;
        ctx.read_i32("RecordId")?;
    }
    ctx.clear_path();
    Ok(())
}

fn db_reply(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    let raw_hash = ctx.read_enum_u32("TableHash", tables::table_label)?;
    let table = TableKey(raw_hash as u32);
    let record_id = ctx.read_i32("RecordId")?;
    ctx.read_time("Timestamp")?;
    let size = ctx.read_u32("Size")? as usize;
    if record_id < 0 {
        // A negative id retracts the row; the blob is carried but holds
        // no schema.
        ctx.read_bytes("RowData", size)?;
        ctx.add_value("RowRemoved", FieldValue::Uint(u64::from(record_id.unsigned_abs())));
        if let Some(name) = ctx.table_name(table) {
            ctx.remove_record(name, i64::from(record_id.unsigned_abs()));
        }
        return Ok(());
    }
    let row = ctx.decode_embedded("RowData", size, table)?;
    if let Some(name) = row.table {
        ctx.store_record(name, i64::from(record_id), row.fields);
    }
    Ok(())
}

fn hotfix_notify(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_enum_u32("TableHash", tables::table_label)?;
    ctx.read_i32("RecordId")?;
    ctx.read_time("Timestamp")?;
    Ok(())
}

fn hotfix_notify_blob(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    let count = ctx.read_u32("HotfixCount")?;
    for i in 0..count {
        ctx.set_path(&[i]);
        ctx.read_enum_u32("TableHash", tables::table_label)?;
        ctx.read_i32("RecordId")?;
        ctx.read_time("Timestamp")?;
    }
    ctx.clear_path();
    Ok(())
}
