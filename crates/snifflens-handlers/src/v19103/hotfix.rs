//! 6.0.3 shrank the bulk-query count from a full word to 13 bits.

use snifflens_core::{DecodeContext, Direction, RegistryBuilder, RouteKey, VersionRange, WireError};

use crate::builds::V19103;
use crate::{opcodes, tables};

pub(crate) fn register(routes: &mut RegistryBuilder<RouteKey>) {
    routes.register(
        RouteKey::new(opcodes::CMSG_DB_QUERY_BULK, Direction::ClientToServer),
        VersionRange::since(V19103),
        "CMSG_DB_QUERY_BULK",
        db_query_bulk,
    );
}

fn db_query_bulk(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_enum_u32("TableHash", tables::table_label)?;
    let count = ctx.read_bits("Count", 13)?;
    ctx.reset_bits();
    for i in 0..count as u32 {
        ctx.set_path(&[i]);
        ctx.read_packed_guid("RecordGuid")?;
        ctx.read_i32("RecordId")?;
    }
    ctx.clear_path();
    Ok(())
}
