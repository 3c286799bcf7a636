use std::fmt::Write as _;

use dw2_core::bodyguard::GuardTier;
use dw2_core::item::ItemEntry;
use dw2_core::names::NameEntry;
use dw2_core::record::FieldValue;
use dw2_core::stage::{self, Coordinate, Stage, StageCoordinates, StageSlot};
use dw2_core::unit::UnitSlot;
use serde_json::{Map as JsonMap, Value as JsonValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    #[default]
    CanonicalV1,
}

/// `key=value` lines in the order given, as printed by the CLI.
pub type Pairs = Vec<(String, String)>;

pub fn render_pairs(pairs: &[(String, String)]) -> String {
    let mut out = String::new();
    for (key, value) in pairs {
        writeln!(&mut out, "{key}={value}").expect("writing to String cannot fail");
    }
    out
}

pub fn render_stage_slot_json(
    stage: Stage,
    slot: usize,
    record: &StageSlot,
    style: JsonStyle,
) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => {
            let (side, side_slot) = stage::side_of(slot);
            let mut m = JsonMap::new();
            m.insert("stage".to_string(), JsonValue::String(stage.id()));
            m.insert("slot".to_string(), JsonValue::from(slot));
            m.insert("side".to_string(), JsonValue::from(side.number()));
            m.insert("side_slot".to_string(), JsonValue::from(side_slot));
            m.insert("occupied".to_string(), JsonValue::Bool(record.is_occupied()));
            m.insert("fields".to_string(), fields_to_json(&record.fields()));
            JsonValue::Object(m)
        }
    }
}

pub fn stage_slot_pairs(stage: Stage, slot: usize, record: &StageSlot) -> Pairs {
    let (side, side_slot) = stage::side_of(slot);
    let mut out = vec![
        ("stage".to_string(), stage.id()),
        ("slot".to_string(), slot.to_string()),
        ("side".to_string(), side.number().to_string()),
        ("side_slot".to_string(), side_slot.to_string()),
    ];
    out.extend(field_pairs(&record.fields()));
    out
}

pub fn render_unit_slot_json(
    slot: usize,
    offset: u64,
    record: &UnitSlot,
    style: JsonStyle,
) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => {
            let mut m = JsonMap::new();
            m.insert("slot".to_string(), JsonValue::from(slot));
            m.insert("slot_hex".to_string(), JsonValue::String(format!("0x{slot:02X}")));
            m.insert("offset".to_string(), JsonValue::String(format_offset(offset)));
            m.insert("fields".to_string(), fields_to_json(&record.fields()));
            JsonValue::Object(m)
        }
    }
}

pub fn unit_slot_pairs(slot: usize, offset: u64, record: &UnitSlot) -> Pairs {
    let mut out = vec![
        ("slot".to_string(), format!("0x{slot:02X}")),
        ("offset".to_string(), format_offset(offset)),
    ];
    out.extend(field_pairs(&record.fields()));
    out
}

pub fn render_items_json(entries: &[ItemEntry], style: JsonStyle) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => JsonValue::Array(
            entries
                .iter()
                .map(|e| {
                    let mut m = JsonMap::new();
                    m.insert("key".to_string(), JsonValue::String(e.key.clone()));
                    m.insert("label".to_string(), JsonValue::String(e.label.clone()));
                    m.insert("id".to_string(), JsonValue::String(format_bytes(&e.id)));
                    m.insert("value".to_string(), JsonValue::from(e.value));
                    m.insert("effect".to_string(), JsonValue::String(format_bytes(&e.effect)));
                    JsonValue::Object(m)
                })
                .collect(),
        ),
    }
}

pub fn item_pairs(entries: &[ItemEntry]) -> Pairs {
    entries
        .iter()
        .map(|e| (e.key.clone(), e.value.to_string()))
        .collect()
}

pub fn render_names_json(entries: &[NameEntry], style: JsonStyle) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => JsonValue::Array(entries.iter().map(name_to_json).collect()),
    }
}

fn name_to_json(entry: &NameEntry) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("slot".to_string(), JsonValue::from(entry.slot));
    m.insert("offset".to_string(), JsonValue::String(format_offset(entry.offset)));
    m.insert("max_len".to_string(), JsonValue::from(entry.max_len));
    m.insert("name".to_string(), JsonValue::String(entry.name.clone()));
    JsonValue::Object(m)
}

pub fn name_pairs(entries: &[NameEntry]) -> Pairs {
    entries
        .iter()
        .map(|e| (format!("name[{}]", e.slot), e.name.clone()))
        .collect()
}

pub fn render_guard_json(tiers: &[GuardTier], follow_enabled: bool, style: JsonStyle) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => {
            let mut m = JsonMap::new();
            m.insert(
                "tiers".to_string(),
                JsonValue::Array(
                    tiers
                        .iter()
                        .map(|t| {
                            let mut tier = JsonMap::new();
                            tier.insert("tier".to_string(), JsonValue::from(t.tier));
                            tier.insert("rank".to_string(), JsonValue::String(format_hex_byte(t.rank)));
                            tier.insert("model".to_string(), JsonValue::String(format_hex_byte(t.model)));
                            tier.insert("motion".to_string(), JsonValue::String(format_hex_byte(t.motion)));
                            JsonValue::Object(tier)
                        })
                        .collect(),
                ),
            );
            m.insert("formation_follow".to_string(), JsonValue::Bool(follow_enabled));
            JsonValue::Object(m)
        }
    }
}

/// Tier bytes are shown as two hex digits, the form they are entered in.
pub fn guard_pairs(tiers: &[GuardTier], follow_enabled: bool) -> Pairs {
    let mut out = Vec::with_capacity(tiers.len() * 3 + 1);
    for t in tiers {
        out.push((format!("tier{}.rank", t.tier), format_hex_byte(t.rank)));
        out.push((format!("tier{}.model", t.tier), format_hex_byte(t.model)));
        out.push((format!("tier{}.motion", t.tier), format_hex_byte(t.motion)));
    }
    out.push(("formation_follow".to_string(), follow_enabled.to_string()));
    out
}

pub fn render_coordinates_json(
    stage: Stage,
    coords: &StageCoordinates,
    style: JsonStyle,
) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => {
            let mut m = JsonMap::new();
            m.insert("stage".to_string(), JsonValue::String(stage.id()));
            m.insert("side_one".to_string(), coordinates_to_json(&coords.side_one));
            m.insert("side_two".to_string(), coordinates_to_json(&coords.side_two));
            JsonValue::Object(m)
        }
    }
}

fn coordinates_to_json(coords: &[Coordinate]) -> JsonValue {
    JsonValue::Array(
        coords
            .iter()
            .map(|c| {
                let mut m = JsonMap::new();
                m.insert("slot".to_string(), JsonValue::from(c.slot));
                m.insert("x".to_string(), JsonValue::from(c.x));
                m.insert("y".to_string(), JsonValue::from(c.y));
                JsonValue::Object(m)
            })
            .collect(),
    )
}

pub fn coordinate_pairs(coords: &StageCoordinates) -> Pairs {
    coords
        .side_one
        .iter()
        .map(|c| ("side1", c))
        .chain(coords.side_two.iter().map(|c| ("side2", c)))
        .map(|(side, c)| (format!("{side}[{}]", c.slot), format!("{},{}", c.x, c.y)))
        .collect()
}

fn fields_to_json(fields: &[FieldValue]) -> JsonValue {
    let mut m = JsonMap::new();
    for f in fields {
        m.insert(f.key.clone(), JsonValue::from(f.value));
    }
    JsonValue::Object(m)
}

fn field_pairs(fields: &[FieldValue]) -> impl Iterator<Item = (String, String)> + '_ {
    fields.iter().map(|f| (f.key.clone(), f.value.to_string()))
}

fn format_offset(offset: u64) -> String {
    format!("0x{offset:08X}")
}

fn format_hex_byte(value: u8) -> String {
    format!("{value:02X}")
}

fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
