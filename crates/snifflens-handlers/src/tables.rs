//! Row layouts for the hotfix channel.
//!
//! `SMSG_DB_REPLY` carries one client-database row as a length-prefixed
//! blob plus a table hash read from the outer stream. These routines decode
//! the blob against the hash; a hash with no layout here falls back to the
//! engine's schemaless scan. Registered names double as the store table
//! names for cross-packet aggregation.

use snifflens_core::{DecodeContext, RegistryBuilder, TableKey, VersionRange, WireError};

use crate::builds::{V19033, V19678};

pub const BROADCAST_TEXT: TableKey = TableKey(0x15c7_85e9);
pub const CREATURE: TableKey = TableKey(0x3f2a_11d0);
pub const CURVE_POINT: TableKey = TableKey(0x7d5d_6a33);
pub const ITEM: TableKey = TableKey(0x50b3_27f4);
pub const ITEM_APPEARANCE: TableKey = TableKey(0x9e3c_55b8);
pub const ITEM_EXTENDED_COST: TableKey = TableKey(0xaf44_90c1);
pub const MOUNT: TableKey = TableKey(0x62da_0a16);

const LABELS: [(TableKey, &str); 7] = [
    (BROADCAST_TEXT, "broadcast_text"),
    (CREATURE, "creature"),
    (CURVE_POINT, "curve_point"),
    (ITEM, "item"),
    (ITEM_APPEARANCE, "item_appearance"),
    (ITEM_EXTENDED_COST, "item_extended_cost"),
    (MOUNT, "mount"),
];

/// Display label for a table hash read off the wire, known or not.
pub fn table_label(raw: u64) -> Option<&'static str> {
    let key = TableKey(u32::try_from(raw).ok()?);
    LABELS
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|&(_, label)| label)
}

pub(crate) fn register(rows: &mut RegistryBuilder<TableKey>) {
    rows.register(
        BROADCAST_TEXT,
        VersionRange::since(V19033),
        "broadcast_text",
        broadcast_text,
    );
    rows.register(CREATURE, VersionRange::since(V19033), "creature", creature);
    rows.register(
        CURVE_POINT,
        VersionRange::since(V19033),
        "curve_point",
        curve_point,
    );
    rows.register(ITEM, VersionRange::since(V19033), "item", item);
    rows.register(
        ITEM_APPEARANCE,
        VersionRange::since(V19033),
        "item_appearance",
        item_appearance,
    );
    // The cost row lost its honor and arena columns in 6.1 and gained a
    // trailing flags column; same hash, two layouts.
    rows.register(
        ITEM_EXTENDED_COST,
        VersionRange::between(V19033, V19678),
        "item_extended_cost",
        item_extended_cost_wod,
    );
    rows.register(
        ITEM_EXTENDED_COST,
        VersionRange::since(V19678),
        "item_extended_cost",
        item_extended_cost_61,
    );
    rows.register(MOUNT, VersionRange::since(V19033), "mount", mount);
}

fn broadcast_text(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_i32("Id")?;
    ctx.read_i32("Language")?;
    let male_len = ctx.read_length_u16("MaleText")?;
    ctx.read_text("MaleText", male_len)?;
    let female_len = ctx.read_length_u16("FemaleText")?;
    ctx.read_text("FemaleText", female_len)?;
    for i in 0..3u32 {
        ctx.set_path(&[i]);
        ctx.read_i32("EmoteId")?;
    }
    for i in 0..3u32 {
        ctx.set_path(&[i]);
        ctx.read_i32("EmoteDelay")?;
    }
    ctx.clear_path();
    ctx.read_u32("SoundId")?;
    ctx.read_u32("ChatBubbleDuration")?;
    ctx.read_u32("Flags")?;
    Ok(())
}

fn creature(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_u32("CreatureId")?;
    ctx.read_enum_u32("Type", creature_type_label)?;
    for i in 0..3u32 {
        ctx.set_path(&[i]);
        ctx.read_u32("QuestItemId")?;
    }
    ctx.clear_path();
    ctx.read_u32("MountCreatureId")?;
    for i in 0..4u32 {
        ctx.set_path(&[i]);
        ctx.read_i32("DisplayId")?;
    }
    for i in 0..4u32 {
        ctx.set_path(&[i]);
        ctx.read_f32("DisplayProbability")?;
    }
    ctx.clear_path();
    // Names travel as a has-text length word followed by a terminated
    // string; absent names skip the string entirely.
    for field in ["Name", "FemaleName", "SubName", "FemaleSubName"] {
        let len = ctx.read_length_u16(field)?;
        if len > 0 {
            ctx.read_cstring(field)?;
        }
    }
    ctx.read_u32("Rank")?;
    ctx.read_u32("HabitatFlags")?;
    Ok(())
}

fn curve_point(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_u32("Id")?;
    ctx.read_u32("CurveId")?;
    ctx.read_u32("Index")?;
    ctx.read_vec2("Position")?;
    Ok(())
}

fn item(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_u32("ItemId")?;
    ctx.read_enum_u32("Class", item_class_label)?;
    ctx.read_u32("SubclassId")?;
    ctx.read_i32("SoundOverrideSubclassId")?;
    ctx.read_i32("Material")?;
    ctx.read_enum_u32("InventoryType", inventory_type_label)?;
    ctx.read_i32("SheatheType")?;
    ctx.read_i32("IconFileDataId")?;
    ctx.read_i32("ItemGroupSoundsId")?;
    Ok(())
}

fn item_appearance(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_u32("Id")?;
    ctx.read_u32("DisplayId")?;
    ctx.read_u32("IconFileDataId")?;
    Ok(())
}

fn item_extended_cost_wod(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_u32("Id")?;
    ctx.read_u32("RequiredHonorPoints")?;
    ctx.read_u32("RequiredArenaPoints")?;
    item_extended_cost_common(ctx)
}

fn item_extended_cost_61(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_u32("Id")?;
    item_extended_cost_common(ctx)?;
    ctx.read_i32("CostFlags")?;
    Ok(())
}

fn item_extended_cost_common(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_u32("RequiredArenaSlot")?;
    for i in 0..5u32 {
        ctx.set_path(&[i]);
        ctx.read_u32("RequiredItemId")?;
    }
    for i in 0..5u32 {
        ctx.set_path(&[i]);
        ctx.read_u32("RequiredItemCount")?;
    }
    ctx.clear_path();
    ctx.read_u32("RequiredPersonalArenaRating")?;
    ctx.read_u32("ItemPurchaseGroup")?;
    for i in 0..5u32 {
        ctx.set_path(&[i]);
        ctx.read_u32("RequiredCurrencyId")?;
    }
    for i in 0..5u32 {
        ctx.set_path(&[i]);
        ctx.read_u32("RequiredCurrencyCount")?;
    }
    ctx.clear_path();
    ctx.read_u32("RequiredFactionId")?;
    ctx.read_u32("RequiredFactionStanding")?;
    ctx.read_u32("RequirementFlags")?;
    ctx.read_i32("RequiredAchievementId")?;
    Ok(())
}

fn mount(ctx: &mut DecodeContext<'_>) -> Result<(), WireError> {
    ctx.read_u32("Id")?;
    ctx.read_u32("MountTypeId")?;
    ctx.read_u32("DisplayId")?;
    ctx.read_u32("Flags")?;
    for field in ["Name", "Description", "SourceDescription"] {
        let len = ctx.read_length_u16(field)?;
        ctx.read_text(field, len)?;
    }
    ctx.read_u32("SourceTypeId")?;
    ctx.read_u32("SpellId")?;
    ctx.read_u32("PlayerConditionId")?;
    Ok(())
}

fn creature_type_label(raw: u64) -> Option<&'static str> {
    Some(match raw {
        0 => "none",
        1 => "beast",
        2 => "dragonkin",
        3 => "demon",
        4 => "elemental",
        5 => "giant",
        6 => "undead",
        7 => "humanoid",
        8 => "critter",
        9 => "mechanical",
        _ => return None,
    })
}

fn item_class_label(raw: u64) -> Option<&'static str> {
    Some(match raw {
        0 => "consumable",
        1 => "container",
        2 => "weapon",
        3 => "gem",
        4 => "armor",
        5 => "reagent",
        6 => "projectile",
        7 => "trade_goods",
        _ => return None,
    })
}

fn inventory_type_label(raw: u64) -> Option<&'static str> {
    Some(match raw {
        0 => "non_equip",
        1 => "head",
        3 => "shoulders",
        4 => "body",
        5 => "chest",
        6 => "waist",
        7 => "legs",
        8 => "feet",
        10 => "hands",
        13 => "weapon",
        14 => "shield",
        15 => "ranged",
        17 => "two_hand_weapon",
        _ => return None,
    })
}
