//! 6.2 appended an all-ready summary bit to the ready-check conclusion.

use snifflens_core::{DecodeContext, Direction, RegistryBuilder, RouteKey, VersionRange, WireError};

use crate::builds::V19700;
use crate::opcodes;

pub(crate) fn register(routes: &mut RegistryBuilder<RouteKey>) {
    routes.register(
        RouteKey::new(opcodes::SMSG_READY_CHECK_COMPLETED, Direction::ServerToClient),
        VersionRange::since(V19700),
        "SMSG_READY_CHECK_COMPLETED",
        ready_check_completed,
    );
}

fn ready_check_completed(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_u8("PartyIndex")?;
    ctx.read_packed_guid("PartyGuid")?;
    ctx.read_bit("AllReady")?;
    Ok(())
}
