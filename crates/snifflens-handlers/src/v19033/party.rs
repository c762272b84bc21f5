//! Party and raid traffic as shipped in 6.0.2.

use snifflens_core::{DecodeContext, Direction, RegistryBuilder, RouteKey, VersionRange, WireError};

use crate::builds::{V19033, V19700};
use crate::opcodes;

pub(crate) fn register(routes: &mut RegistryBuilder<RouteKey>) {
    routes.register(
        RouteKey::new(opcodes::CMSG_MINIMAP_PING, Direction::ClientToServer),
        VersionRange::since(V19033),
        "CMSG_MINIMAP_PING",
        minimap_ping_client,
    );
    routes.register(
        RouteKey::new(
            opcodes::CMSG_REQUEST_PARTY_MEMBER_STATS,
            Direction::ClientToServer,
        ),
        VersionRange::since(V19033),
        "CMSG_REQUEST_PARTY_MEMBER_STATS",
        request_party_member_stats,
    );
    routes.register(
        RouteKey::new(opcodes::CMSG_UPDATE_RAID_TARGET, Direction::ClientToServer),
        VersionRange::since(V19033),
        "CMSG_UPDATE_RAID_TARGET",
        update_raid_target,
    );
    routes.register(
        RouteKey::new(opcodes::SMSG_MINIMAP_PING, Direction::ServerToClient),
        VersionRange::since(V19033),
        "SMSG_MINIMAP_PING",
        minimap_ping,
    );
    routes.register(
        RouteKey::new(opcodes::SMSG_PARTY_UPDATE, Direction::ServerToClient),
        VersionRange::since(V19033),
        "SMSG_PARTY_UPDATE",
        party_update,
    );
    routes.register(
        RouteKey::new(opcodes::SMSG_PARTY_MEMBER_STATS, Direction::ServerToClient),
        VersionRange::since(V19033),
        "SMSG_PARTY_MEMBER_STATS",
        party_member_stats,
    );
    routes.register(
        RouteKey::new(opcodes::SMSG_ROLE_CHANGED_INFORM, Direction::ServerToClient),
        VersionRange::since(V19033),
        "SMSG_ROLE_CHANGED_INFORM",
        role_changed_inform,
    );
    routes.register(
        RouteKey::new(opcodes::SMSG_ROLE_POLL_INFORM, Direction::ServerToClient),
        VersionRange::since(V19033),
        "SMSG_ROLE_POLL_INFORM",
        role_poll_inform,
    );
    routes.register(
        RouteKey::new(opcodes::SMSG_GROUP_NEW_LEADER, Direction::ServerToClient),
        VersionRange::since(V19033),
        "SMSG_GROUP_NEW_LEADER",
        group_new_leader,
    );
    routes.register(
        RouteKey::new(opcodes::SMSG_PARTY_INVITE, Direction::ServerToClient),
        VersionRange::since(V19033),
        "SMSG_PARTY_INVITE",
        party_invite,
    );
    routes.register(
        RouteKey::new(opcodes::SMSG_READY_CHECK_STARTED, Direction::ServerToClient),
        VersionRange::since(V19033),
        "SMSG_READY_CHECK_STARTED",
        ready_check_started,
    );
    routes.register(
        RouteKey::new(opcodes::SMSG_READY_CHECK_RESPONSE, Direction::ServerToClient),
        VersionRange::since(V19033),
        "SMSG_READY_CHECK_RESPONSE",
        ready_check_response,
    );
    // 6.2 appends an all-ready bit; the replacement lives in the 19700
    // module.
    routes.register(
        RouteKey::new(opcodes::SMSG_READY_CHECK_COMPLETED, Direction::ServerToClient),
        VersionRange::between(V19033, V19700),
        "SMSG_READY_CHECK_COMPLETED",
        ready_check_completed,
    );
    routes.register(
        RouteKey::new(opcodes::SMSG_RAID_MARKERS_CHANGED, Direction::ServerToClient),
        VersionRange::since(V19033),
        "SMSG_RAID_MARKERS_CHANGED",
        raid_markers_changed,
    );
}

fn minimap_ping_client(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_vec2("Position")?;
    ctx.read_u8("PartyIndex")?;
    Ok(())
}

fn minimap_ping(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_packed_guid("Sender")?;
    ctx.read_vec2("Position")?;
    Ok(())
}

fn request_party_member_stats(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_u8("PartyIndex")?;
    ctx.read_packed_guid("TargetGuid")?;
    Ok(())
}

fn update_raid_target(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_u8("PartyIndex")?;
    ctx.read_packed_guid("Target")?;
    ctx.read_u8("Symbol")?;
    Ok(())
}

fn party_update(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_u8("PartyFlags")?;
    ctx.read_u8("PartyIndex")?;
    ctx.read_u8("PartyType")?;
    ctx.read_i32("MyIndex")?;
    ctx.read_packed_guid("PartyGuid")?;
    ctx.read_i32("SequenceNum")?;
    ctx.read_packed_guid("LeaderGuid")?;
    let player_count = ctx.read_u32("PlayerCount")?;
    for i in 0..player_count {
        ctx.set_path(&[i]);
        let name_len = ctx.read_length("Name", 6)?;
        ctx.reset_bits();
        ctx.read_packed_guid("MemberGuid")?;
        ctx.read_u8("Connected")?;
        ctx.read_u8("Subgroup")?;
        ctx.read_u8("Flags")?;
        ctx.read_u8("RolesAssigned")?;
        ctx.read_u8("Class")?;
        ctx.read_text("Name", name_len)?;
    }
    ctx.clear_path();
    let has_lfg_info = ctx.read_bit("HasLfgInfo")?;
    let has_loot_settings = ctx.read_bit("HasLootSettings")?;
    let has_difficulty_settings = ctx.read_bit("HasDifficultySettings")?;
    ctx.reset_bits();
    if has_lfg_info {
        ctx.read_u8("MyLfgFlags")?;
        ctx.read_i32("LfgSlot")?;
        ctx.read_u8("BootCount")?;
    }
    if has_loot_settings {
        ctx.read_enum_u8("LootMethod", loot_method_label)?;
        ctx.read_packed_guid("LootMaster")?;
        ctx.read_u8("LootThreshold")?;
    }
    if has_difficulty_settings {
        ctx.read_i32("InstanceDifficultyId")?;
        ctx.read_i32("DungeonDifficultyId")?;
        ctx.read_i32("RaidDifficultyId")?;
    }
    Ok(())
}

// The stats packet is a presence mask followed by one block per set bit,
// in mask order.
fn party_member_stats(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_bit("ForEnemy")?;
    ctx.read_bit("FullUpdate")?;
    let has_party_type = ctx.read_bit("HasPartyType")?;
    let has_status = ctx.read_bit("HasStatus")?;
    let has_power_type = ctx.read_bit("HasPowerType")?;
    let has_override_display_power = ctx.read_bit("HasOverrideDisplayPower")?;
    let has_current_health = ctx.read_bit("HasCurrentHealth")?;
    let has_max_health = ctx.read_bit("HasMaxHealth")?;
    let has_power = ctx.read_bit("HasPower")?;
    let has_max_power = ctx.read_bit("HasMaxPower")?;
    let has_level = ctx.read_bit("HasLevel")?;
    let has_spec = ctx.read_bit("HasSpec")?;
    let has_zone_id = ctx.read_bit("HasZoneId")?;
    let has_wmo_group_id = ctx.read_bit("HasWmoGroupId")?;
    let has_wmo_doodad_placement_id = ctx.read_bit("HasWmoDoodadPlacementId")?;
    let has_position = ctx.read_bit("HasPosition")?;
    let has_vehicle_seat = ctx.read_bit("HasVehicleSeat")?;
    let has_auras = ctx.read_bit("HasAuras")?;
    let has_pet = ctx.read_bit("HasPet")?;
    let has_phases = ctx.read_bit("HasPhases")?;
    ctx.reset_bits();
    ctx.read_packed_guid("MemberGuid")?;
    if has_party_type {
        for i in 0..2u32 {
            ctx.set_path(&[i]);
            ctx.read_u8("PartyType")?;
        }
        ctx.clear_path();
    }
    if has_status {
        ctx.read_enum_u16("Status", member_status_label)?;
    }
    if has_power_type {
        ctx.read_u8("PowerType")?;
    }
    if has_override_display_power {
        ctx.read_u16("OverrideDisplayPower")?;
    }
    if has_current_health {
        ctx.read_i32("CurrentHealth")?;
    }
    if has_max_health {
        ctx.read_i32("MaxHealth")?;
    }
    if has_power {
        ctx.read_u16("Power")?;
    }
    if has_max_power {
        ctx.read_u16("MaxPower")?;
    }
    if has_level {
        ctx.read_u16("Level")?;
    }
    if has_spec {
        ctx.read_u16("SpecId")?;
    }
    if has_zone_id {
        ctx.read_u16("ZoneId")?;
    }
    if has_wmo_group_id {
        ctx.read_u16("WmoGroupId")?;
    }
    if has_wmo_doodad_placement_id {
        ctx.read_u32("WmoDoodadPlacementId")?;
    }
    if has_position {
        ctx.read_i16("PositionX")?;
        ctx.read_i16("PositionY")?;
        ctx.read_i16("PositionZ")?;
    }
    if has_vehicle_seat {
        ctx.read_i32("VehicleSeatRecId")?;
    }
    if has_auras {
        aura_list(ctx)?;
    }
    if has_pet {
        pet_block(ctx)?;
    }
    if has_phases {
        phase_block(ctx)?;
    }
    Ok(())
}

/// Aura entries carry a per-effect scale list; scales nest one level below
/// the aura index.
fn aura_list(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    let aura_count = ctx.read_i32("AuraCount")?;
    for i in 0..aura_count.max(0) as u32 {
        ctx.set_path(&[i]);
        ctx.read_i32("SpellId")?;
        ctx.read_u8("Scalings")?;
        ctx.read_i32("EffectMask")?;
        let effect_count = ctx.read_i32("EffectCount")?;
        for j in 0..effect_count.max(0) as u32 {
            ctx.set_path(&[i, j]);
            ctx.read_f32("Scale")?;
        }
    }
    ctx.clear_path();
    Ok(())
}

fn pet_block(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    let has_pet_guid = ctx.read_bit("HasPetGuid")?;
    let has_pet_name = ctx.read_bit("HasPetName")?;
    let has_pet_model_id = ctx.read_bit("HasPetModelId")?;
    let has_pet_current_health = ctx.read_bit("HasPetCurrentHealth")?;
    let has_pet_max_health = ctx.read_bit("HasPetMaxHealth")?;
    let has_pet_auras = ctx.read_bit("HasPetAuras")?;
    ctx.reset_bits();
    if has_pet_guid {
        ctx.read_packed_guid("PetGuid")?;
    }
    if has_pet_name {
        ctx.read_text_bits_len("PetName", 8)?;
    }
    if has_pet_model_id {
        ctx.read_i16("PetModelId")?;
    }
    if has_pet_current_health {
        ctx.read_i32("PetCurrentHealth")?;
    }
    if has_pet_max_health {
        ctx.read_i32("PetMaxHealth")?;
    }
    if has_pet_auras {
        aura_list(ctx)?;
    }
    Ok(())
}

fn phase_block(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_i32("PhaseShiftFlags")?;
    let phase_count = ctx.read_i32("PhaseCount")?;
    ctx.read_packed_guid("PersonalGuid")?;
    for i in 0..phase_count.max(0) as u32 {
        ctx.set_path(&[i]);
        ctx.read_i16("PhaseFlags")?;
        ctx.read_i16("PhaseId")?;
    }
    ctx.clear_path();
    Ok(())
}

fn party_invite(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_bit("CanAccept")?;
    ctx.read_bit("MightCrossRealm")?;
    ctx.read_bit("IsCrossRealm")?;
    ctx.read_bit("MustBeFriend")?;
    ctx.read_bit("AllowMultipleRoles")?;
    let inviter_len = ctx.read_length("InviterName", 6)?;
    ctx.reset_bits();
    ctx.read_packed_guid("InviterGuid")?;
    ctx.read_packed_guid("InviterAccountId")?;
    ctx.read_u32("InviterRealmId")?;
    ctx.read_u16("RealmFlags")?;
    ctx.read_bit("IsLocalRealm")?;
    ctx.read_bit("IsInternalRealm")?;
    let actual_len = ctx.read_length("RealmNameActual", 8)?;
    let normalized_len = ctx.read_length("RealmNameNormalized", 8)?;
    ctx.reset_bits();
    ctx.read_text("RealmNameActual", actual_len)?;
    ctx.read_text("RealmNameNormalized", normalized_len)?;
    ctx.read_i32("ProposedRoles")?;
    let slot_count = ctx.read_i32("LfgSlotCount")?;
    ctx.read_i32("LfgCompletedMask")?;
    ctx.read_text("InviterName", inviter_len)?;
    for i in 0..slot_count.max(0) as u32 {
        ctx.set_path(&[i]);
        ctx.read_i32("LfgSlot")?;
    }
    ctx.clear_path();
    Ok(())
}

fn role_changed_inform(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_u8("PartyIndex")?;
    ctx.read_packed_guid("From")?;
    ctx.read_packed_guid("ChangedUnit")?;
    ctx.read_enum_u32("OldRole", role_label)?;
    ctx.read_enum_u32("NewRole", role_label)?;
    Ok(())
}

fn role_poll_inform(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_u8("PartyIndex")?;
    ctx.read_packed_guid("From")?;
    Ok(())
}

fn group_new_leader(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_u8("PartyIndex")?;
    ctx.read_text_bits_len("Name", 6)?;
    Ok(())
}

fn ready_check_started(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_u8("PartyIndex")?;
    ctx.read_packed_guid("PartyGuid")?;
    ctx.read_packed_guid("InitiatorGuid")?;
    ctx.read_i32("Duration")?;
    Ok(())
}

fn ready_check_response(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_packed_guid("PartyGuid")?;
    ctx.read_packed_guid("Player")?;
    ctx.read_bit("IsReady")?;
    Ok(())
}

fn ready_check_completed(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_u8("PartyIndex")?;
    ctx.read_packed_guid("PartyGuid")?;
    Ok(())
}

fn raid_markers_changed(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_u8("PartyIndex")?;
    ctx.read_i32("ActiveMarkers")?;
    let marker_count = ctx.read_length("MarkerCount", 5)?;
    ctx.reset_bits();
    for i in 0..marker_count as u32 {
        ctx.set_path(&[i]);
        ctx.read_packed_guid("TransportGuid")?;
        ctx.read_i32("MapId")?;
        ctx.read_vec3("Position")?;
    }
    ctx.clear_path();
    Ok(())
}

fn loot_method_label(raw: u64) -> Option<&'static str> {
    Some(match raw {
        0 => "free_for_all",
        1 => "round_robin",
        2 => "master_loot",
        3 => "group_loot",
        4 => "need_before_greed",
        _ => return None,
    })
}

fn member_status_label(raw: u64) -> Option<&'static str> {
    Some(match raw {
        0 => "offline",
        1 => "online",
        3 => "online_pvp",
        5 => "online_dead",
        7 => "online_pvp_dead",
        9 => "online_ghost",
        _ => return None,
    })
}

fn role_label(raw: u64) -> Option<&'static str> {
    Some(match raw {
        0 => "none",
        2 => "tank",
        4 => "healer",
        8 => "damage",
        _ => return None,
    })
}
