use std::io::Cursor;

use log::info;

use crate::error::{CoreError, CoreErrorCode, Result};
use crate::image::BinImage;
use crate::reader::LittleEndianReader;

pub const ITEM_COUNT: usize = 16;
pub const ENTRY_SIZE: usize = 12;
pub const VALUE_OFFSET: usize = 4;

/// Display key and label of each item entry, in file order.
pub const ITEM_SLOTS: [(&str, &str); ITEM_COUNT] = [
    ("hp1", "Health Item 1"),
    ("hp2", "Health Item 2"),
    ("hp3", "Health Item 3"),
    ("hp4", "Health Item 4"),
    ("arrow1", "Arrows 1"),
    ("arrow2", "Arrows 2"),
    ("arrow3", "Arrows 3"),
    ("arrow4", "Arrows 4"),
    ("stat1", "Stat increase Item 1"),
    ("stat2", "Stat increase Item 2"),
    ("stat3", "Stat increase Item 3"),
    ("stat4", "Stat increase Item 4"),
    ("stat5", "Stat increase Item 5"),
    ("stat6", "Stat increase Item 6"),
    ("stat7", "Stat increase Item 7"),
    ("stat8", "Stat increase Item 8"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEntry {
    pub index: usize,
    pub key: String,
    pub label: String,
    pub id: [u8; 4],
    pub value: u32,
    pub effect: [u8; 4],
}

pub fn item_index(key: &str) -> Result<usize> {
    ITEM_SLOTS
        .iter()
        .position(|(k, _)| *k == key)
        .ok_or_else(|| {
            let known = ITEM_SLOTS.iter().map(|(k, _)| *k).collect::<Vec<_>>().join(", ");
            CoreError::new(
                CoreErrorCode::InvalidValue,
                format!("unknown item '{key}', expected one of: {known}"),
            )
        })
}

/// Item values read straight from the binary. Only the 4-byte value of each
/// entry is ever written back; ids and effects are read for display.
#[derive(Debug)]
pub struct ItemEditor {
    image: BinImage,
    base: u64,
    entries: Vec<ItemEntry>,
}

impl ItemEditor {
    pub fn open(image: &BinImage, base: u64) -> Result<Self> {
        let bytes = image.read_at(base, ITEM_COUNT * ENTRY_SIZE)?;
        let entries = parse_entries(&bytes)
            .map_err(|e| CoreError::io(format!("reading item table at 0x{base:X}"), e))?;
        Ok(Self {
            image: image.clone(),
            base,
            entries,
        })
    }

    pub fn entries(&self) -> &[ItemEntry] {
        &self.entries
    }

    pub fn values(&self) -> [u32; ITEM_COUNT] {
        let mut out = [0u32; ITEM_COUNT];
        for (slot, entry) in out.iter_mut().zip(&self.entries) {
            *slot = entry.value;
        }
        out
    }

    pub fn set_value(&mut self, key: &str, value: u32) -> Result<()> {
        let index = item_index(key)?;
        self.entries[index].value = value;
        Ok(())
    }

    pub fn set_values(&mut self, values: &[u32]) -> Result<()> {
        if values.len() != ITEM_COUNT {
            return Err(CoreError::new(
                CoreErrorCode::InvalidValue,
                format!("expected {ITEM_COUNT} item values, got {}", values.len()),
            ));
        }
        for (entry, &value) in self.entries.iter_mut().zip(values) {
            entry.value = value;
        }
        Ok(())
    }

    pub fn commit(&self) -> Result<()> {
        let patches: Vec<(u64, Vec<u8>)> = self
            .entries
            .iter()
            .map(|entry| {
                let offset = self.base + (entry.index * ENTRY_SIZE + VALUE_OFFSET) as u64;
                (offset, entry.value.to_le_bytes().to_vec())
            })
            .collect();
        self.image.write_patches(&patches)?;
        info!(
            "wrote {ITEM_COUNT} item values at 0x{:X} to {}",
            self.base,
            self.image.path().display()
        );
        Ok(())
    }
}

fn parse_entries(bytes: &[u8]) -> std::io::Result<Vec<ItemEntry>> {
    let mut r = LittleEndianReader::new(Cursor::new(bytes));
    let mut entries = Vec::with_capacity(ITEM_COUNT);
    for (index, (key, label)) in ITEM_SLOTS.iter().enumerate() {
        let id = r.read_array::<4>()?;
        let value = r.read_u32()?;
        let effect = r.read_array::<4>()?;
        entries.push(ItemEntry {
            index,
            key: (*key).to_string(),
            label: (*label).to_string(),
            id,
            value,
            effect,
        });
    }
    Ok(entries)
}
