mod common;

use std::fs;

use common::{Fixture, UNIT_FIRST, UNIT_SECOND};
use dw2_core::CoreErrorCode;
use dw2_core::unit::{self, SLOT_COUNT, SLOT_SIZE, UnitEditor};

fn open(fixture: &Fixture) -> UnitEditor {
    let region = fixture.layout.units().expect("unit offsets configured");
    UnitEditor::open(&fixture.image, region, &fixture.backups).expect("failed to open unit editor")
}

#[test]
fn slots_span_both_unit_blocks() {
    let fixture = Fixture::new();
    let editor = open(&fixture);
    let bytes = fixture.bytes();

    assert_eq!(editor.slot_offset(0).unwrap(), UNIT_FIRST);
    assert_eq!(editor.slot_offset(52).unwrap(), UNIT_FIRST + 52 * 7);
    assert_eq!(editor.slot_offset(53).unwrap(), UNIT_SECOND);
    assert_eq!(editor.slot_offset(253).unwrap(), UNIT_SECOND + 200 * 7);

    let second = UNIT_SECOND as usize;
    let slot = editor.slot(53).unwrap();
    assert_eq!(&slot.as_bytes()[..], &bytes[second..second + SLOT_SIZE]);
}

#[test]
fn edits_round_trip_through_commit() {
    let fixture = Fixture::new();
    let mut editor = open(&fixture);
    editor.set_field(0x1A, "model", 12).unwrap();
    editor.set_field(0x1A, "horse", 3).unwrap();
    editor.set_field(200, "item_count", 9).unwrap();
    assert_eq!(editor.buffer().modified_records(), vec![0x1A, 200]);
    editor.commit().unwrap();

    let reopened = open(&fixture);
    let slot = reopened.slot(0x1A).unwrap();
    assert_eq!(slot.get("model").unwrap(), 12);
    assert_eq!(slot.get("horse").unwrap(), 3);
    assert_eq!(reopened.slot(200).unwrap().get("item_count").unwrap(), 9);
}

#[test]
fn unmodified_commit_is_byte_identical() {
    let fixture = Fixture::new();
    let before = fixture.bytes();
    open(&fixture).commit().unwrap();
    assert_eq!(fixture.bytes(), before);
}

#[test]
fn backup_is_taken_from_the_pristine_binary() {
    let fixture = Fixture::new();
    let pristine = open(&fixture).buffer().to_exported().unwrap();

    let mut editor = open(&fixture);
    editor.set_field(1, "color", 7).unwrap();
    editor.commit().unwrap();
    let _ = open(&fixture);

    let backup = fixture.backups.load(unit::BACKUP_NAME).unwrap();
    assert_eq!(backup, pristine);
    assert_eq!(backup.len(), SLOT_COUNT * SLOT_SIZE + 2 * 4);
}

#[test]
fn out_of_range_slot_is_rejected() {
    let fixture = Fixture::new();
    let mut editor = open(&fixture);
    assert_eq!(
        editor.slot(SLOT_COUNT).unwrap_err().code,
        CoreErrorCode::SlotOutOfRange
    );
    assert_eq!(
        editor.set_field(300, "name", 1).unwrap_err().code,
        CoreErrorCode::SlotOutOfRange
    );
    assert_eq!(
        editor.set_field(1, "name", 300).unwrap_err().code,
        CoreErrorCode::InvalidValue
    );
}

#[test]
fn export_uses_default_name_when_blank() {
    let fixture = Fixture::new();
    let editor = open(&fixture);
    let path = editor.export_mod("", fixture.path()).unwrap();
    assert_eq!(path.file_name().unwrap(), "DW2Unit.DW2UnitMod");
    assert_eq!(fs::read(path).unwrap(), editor.buffer().to_exported().unwrap());
}
