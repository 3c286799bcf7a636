mod common;

use common::{BODYGUARD, FOLLOW, Fixture, ITEMS, NAMES};
use dw2_core::CoreErrorCode;
use dw2_core::bodyguard::{BLOCK_SIZE, BodyguardEditor, FOLLOW_VALUE};
use dw2_core::item::{ENTRY_SIZE, ITEM_COUNT, ItemEditor};
use dw2_core::names::NameTable;

#[test]
fn item_values_are_the_only_bytes_written() {
    let fixture = Fixture::new();
    let before = fixture.bytes();

    let mut items = ItemEditor::open(&fixture.image, ITEMS).unwrap();
    assert_eq!(items.entries().len(), ITEM_COUNT);
    let values: Vec<u32> = (0..ITEM_COUNT as u32).map(|i| 1000 + i).collect();
    items.set_values(&values).unwrap();
    items.set_value("arrow3", 42).unwrap();
    items.commit().unwrap();

    let after = fixture.bytes();
    let base = ITEMS as usize;
    for i in 0..ITEM_COUNT {
        let entry = base + i * ENTRY_SIZE;
        assert_eq!(&after[entry..entry + 4], &before[entry..entry + 4], "id {i}");
        assert_eq!(&after[entry + 8..entry + 12], &before[entry + 8..entry + 12], "effect {i}");
    }
    assert_eq!(&after[..base], &before[..base]);
    assert_eq!(&after[base + ITEM_COUNT * ENTRY_SIZE..], &before[base + ITEM_COUNT * ENTRY_SIZE..]);

    let reread = ItemEditor::open(&fixture.image, ITEMS).unwrap();
    assert_eq!(reread.values()[0], 1000);
    assert_eq!(reread.values()[6], 42);
    assert_eq!(reread.entries()[15].value, 1015);
}

#[test]
fn item_value_count_must_match() {
    let fixture = Fixture::new();
    let mut items = ItemEditor::open(&fixture.image, ITEMS).unwrap();
    let err = items.set_values(&[1, 2, 3]).unwrap_err();
    assert_eq!(err.code, CoreErrorCode::InvalidValue);
}

#[test]
fn item_table_past_end_of_file_is_an_eof_error() {
    let fixture = Fixture::new();
    let len = fixture.image.len().unwrap();
    let err = ItemEditor::open(&fixture.image, len - 20).unwrap_err();
    assert_eq!(err.code, CoreErrorCode::UnexpectedEof);
}

#[test]
fn names_write_padded_ascii_and_keep_stride_byte() {
    let fixture = Fixture::new();
    let table = NameTable::new(&fixture.image, &fixture.layout.names);
    assert_eq!(table.slot_count(), 7);
    let before = fixture.bytes();

    let written = table.write_name(1, "Zhao Yun").unwrap();
    assert_eq!(written.name, "Zhao Yun");
    assert_eq!(table.read_name(1).unwrap().name, "Zhao Yun");

    let short = table.write_name(5, "Xiahou Dun").unwrap();
    assert_eq!(short.name, "Xiahou ");
    assert_eq!(short.max_len, 7);
    assert_eq!(short.offset, NAMES + 0x100 + 8);

    let after = fixture.bytes();
    let slot1 = NAMES as usize + 16;
    assert_eq!(&after[slot1..slot1 + 15], b"Zhao Yun\0\0\0\0\0\0\0");
    assert_eq!(after[slot1 + 15], before[slot1 + 15]);
    let slot5 = NAMES as usize + 0x100 + 8;
    assert_eq!(after[slot5 + 7], before[slot5 + 7]);
}

#[test]
fn name_rewrite_is_idempotent() {
    let fixture = Fixture::new();
    let table = NameTable::new(&fixture.image, &fixture.layout.names);
    table.write_name(0, "Cao Cao").unwrap();
    let once = fixture.bytes();
    let current = table.read_name(0).unwrap();
    table.write_name(0, &current.name).unwrap();
    assert_eq!(fixture.bytes(), once);
}

#[test]
fn name_slot_out_of_range_is_rejected() {
    let fixture = Fixture::new();
    let table = NameTable::new(&fixture.image, &fixture.layout.names);
    let before = fixture.bytes();
    let err = table.write_name(7, "Nobody").unwrap_err();
    assert_eq!(err.code, CoreErrorCode::SlotOutOfRange);
    assert_eq!(fixture.bytes(), before);
}

#[test]
fn bodyguard_tiers_round_trip() {
    let fixture = Fixture::new();
    let mut guards = BodyguardEditor::open(&fixture.image, BODYGUARD, FOLLOW).unwrap();
    let base = BODYGUARD as usize;
    assert_eq!(&guards.bytes()[..], &fixture.bytes()[base..base + BLOCK_SIZE]);

    guards.set_field(5, "rank", 0x2A).unwrap();
    guards.set_field(5, "model", 0x10).unwrap();
    guards.set_field(1, "motion", 0xFF).unwrap();
    guards.commit().unwrap();

    let reread = BodyguardEditor::open(&fixture.image, BODYGUARD, FOLLOW).unwrap();
    let tiers = reread.tiers();
    assert_eq!(tiers.len(), 5);
    assert_eq!((tiers[4].tier, tiers[4].rank, tiers[4].model), (5, 0x2A, 0x10));
    assert_eq!(tiers[0].motion, 0xFF);

    assert_eq!(
        guards.set_field(6, "rank", 1).unwrap_err().code,
        CoreErrorCode::SlotOutOfRange
    );
}

#[test]
fn formation_follow_patch_writes_single_byte() {
    let fixture = Fixture::new();
    let before = fixture.bytes();
    let guards = BodyguardEditor::open(&fixture.image, BODYGUARD, FOLLOW).unwrap();
    assert_eq!(
        guards.formation_follow_enabled().unwrap(),
        before[FOLLOW as usize] == FOLLOW_VALUE
    );

    guards.apply_formation_follow().unwrap();
    assert!(guards.formation_follow_enabled().unwrap());

    let after = fixture.bytes();
    for (i, (a, b)) in before.iter().zip(&after).enumerate() {
        if i != FOLLOW as usize {
            assert_eq!(a, b, "byte {i} changed");
        }
    }
    assert_eq!(after[FOLLOW as usize], FOLLOW_VALUE);
}

#[test]
fn bodyguard_editor_requires_the_binary() {
    let fixture = Fixture::new();
    let missing = dw2_core::image::BinImage::new(fixture.path().join("missing.bin"));
    let err = BodyguardEditor::open(&missing, BODYGUARD, FOLLOW).unwrap_err();
    assert_eq!(err.code, CoreErrorCode::Io);
}
