use dw2_core::bodyguard::GuardTier;
use dw2_core::item::ItemEntry;
use dw2_core::names::NameEntry;
use dw2_core::stage::{Coordinate, STAGE_FIELDS, Stage, StageCoordinates, StageSlot};
use dw2_core::unit::UnitSlot;
use dw2_render::{
    JsonStyle, coordinate_pairs, guard_pairs, item_pairs, render_coordinates_json,
    render_guard_json, render_items_json, render_names_json, render_pairs,
    render_stage_slot_json, render_unit_slot_json, stage_slot_pairs, unit_slot_pairs,
};

fn stage_slot() -> StageSlot {
    let mut slot = StageSlot::from_bytes(&[0u8; 32]).expect("32 bytes");
    slot.set("x", 1200).unwrap();
    slot.set("y", 340).unwrap();
    slot.set("leader_unit", 12).unwrap();
    slot.set("life", 600).unwrap();
    slot
}

#[test]
fn stage_slot_json_keeps_field_table_order() {
    let value = render_stage_slot_json(Stage::HuLaoGate, 300, &stage_slot(), JsonStyle::CanonicalV1);
    let obj = value.as_object().expect("json should be an object");
    let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["stage", "slot", "side", "side_slot", "occupied", "fields"]);

    assert_eq!(obj["stage"], "HLG_Stage");
    assert_eq!(obj["side"], 2);
    assert_eq!(obj["side_slot"], 44);
    assert_eq!(obj["occupied"], true);

    let fields = obj["fields"].as_object().expect("fields should be an object");
    let field_keys: Vec<&str> = fields.keys().map(String::as_str).collect();
    let expected: Vec<&str> = STAGE_FIELDS.iter().map(|f| f.key).collect();
    assert_eq!(field_keys, expected);
    assert_eq!(fields["x"], 1200);
    assert_eq!(fields["life"], 600);
}

#[test]
fn stage_slot_pairs_render_as_key_value_lines() {
    let pairs = stage_slot_pairs(Stage::YellowTurbans, 5, &stage_slot());
    let text = render_pairs(&pairs);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "stage=YTR_Stage");
    assert_eq!(lines[1], "slot=5");
    assert_eq!(lines[2], "side=1");
    assert_eq!(lines[3], "side_slot=5");
    assert_eq!(lines[4], "x=1200");
    assert_eq!(lines[5], "y=340");
    assert_eq!(lines.len(), 4 + STAGE_FIELDS.len());
}

#[test]
fn unit_slot_output_uses_hex_slot_and_offset() {
    let slot = UnitSlot::from_bytes(&[1, 0, 2, 3, 4, 5, 6]).unwrap();
    let pairs = unit_slot_pairs(0x1A, 0x30B6, &slot);
    assert_eq!(pairs[0], ("slot".to_string(), "0x1A".to_string()));
    assert_eq!(pairs[1], ("offset".to_string(), "0x000030B6".to_string()));
    assert_eq!(pairs[4], ("model".to_string(), "2".to_string()));

    let value = render_unit_slot_json(0x1A, 0x30B6, &slot, JsonStyle::CanonicalV1);
    assert_eq!(value["slot"], 26);
    assert_eq!(value["fields"]["horse"], 5);
}

#[test]
fn items_render_value_with_raw_id_and_effect() {
    let entries = vec![ItemEntry {
        index: 0,
        key: "hp1".to_string(),
        label: "Health Item 1".to_string(),
        id: [0x01, 0x02, 0x00, 0xFF],
        value: 250,
        effect: [0, 0, 0, 0x10],
    }];
    let value = render_items_json(&entries, JsonStyle::CanonicalV1);
    assert_eq!(value[0]["id"], "01 02 00 FF");
    assert_eq!(value[0]["value"], 250);
    assert_eq!(value[0]["effect"], "00 00 00 10");
    assert_eq!(render_pairs(&item_pairs(&entries)), "hp1=250\n");
}

#[test]
fn names_render_slot_and_offset() {
    let entries = vec![NameEntry {
        slot: 3,
        offset: 0x1614_1FA8,
        max_len: 15,
        name: "Lu Bu".to_string(),
    }];
    let value = render_names_json(&entries, JsonStyle::CanonicalV1);
    assert_eq!(value[0]["offset"], "0x16141FA8");
    assert_eq!(value[0]["name"], "Lu Bu");
}

#[test]
fn guard_bytes_render_as_two_hex_digits() {
    let tiers = vec![GuardTier {
        tier: 1,
        rank: 0x0A,
        model: 0xFF,
        motion: 0x03,
    }];
    let pairs = guard_pairs(&tiers, true);
    assert_eq!(
        render_pairs(&pairs),
        "tier1.rank=0A\ntier1.model=FF\ntier1.motion=03\nformation_follow=true\n"
    );
    let value = render_guard_json(&tiers, false, JsonStyle::CanonicalV1);
    assert_eq!(value["tiers"][0]["model"], "FF");
    assert_eq!(value["formation_follow"], false);
}

#[test]
fn coordinates_are_grouped_by_side() {
    let coords = StageCoordinates {
        side_one: vec![Coordinate { slot: 0, x: 10, y: 20 }],
        side_two: vec![Coordinate { slot: 256, x: 30, y: 40 }],
    };
    let value = render_coordinates_json(Stage::ChiBi, &coords, JsonStyle::CanonicalV1);
    assert_eq!(value["stage"], "CBi_Stage");
    assert_eq!(value["side_one"][0]["x"], 10);
    assert_eq!(value["side_two"][0]["slot"], 256);
    assert_eq!(render_pairs(&coordinate_pairs(&coords)), "side1[0]=10,20\nside2[256]=30,40\n");
}
