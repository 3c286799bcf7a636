use std::path::{Path, PathBuf};

use log::info;

use crate::backup::BackupStore;
use crate::error::{CoreError, CoreErrorCode, Result};
use crate::image::BinImage;
use crate::layout::{RegionLayout, Segment};
use crate::mods::{mod_file_name, write_mod_file};
use crate::record::{FieldDef, FieldValue, FieldWidth, field_values, find_field};
use crate::staging::StagingBuffer;

pub const SLOT_SIZE: usize = 7;
pub const SLOTS_FIRST_BLOCK: usize = 53;
pub const SLOTS_SECOND_BLOCK: usize = 201;
pub const SLOT_COUNT: usize = SLOTS_FIRST_BLOCK + SLOTS_SECOND_BLOCK;

pub const MOD_EXTENSION: &str = ".DW2UnitMod";
pub const DEFAULT_MOD_NAME: &str = "DW2Unit";
pub const BACKUP_NAME: &str = "DW2_Original.unitdata";

pub const UNIT_FIELDS: [FieldDef; 7] = [
    FieldDef::new("name", "Name", 0, FieldWidth::U8),
    FieldDef::new("unknown", "Unknown", 1, FieldWidth::U8),
    FieldDef::new("model", "Model", 2, FieldWidth::U8),
    FieldDef::new("color", "Color", 3, FieldWidth::U8),
    FieldDef::new("motion", "Weapon + Motion", 4, FieldWidth::U8),
    FieldDef::new("horse", "Horse", 5, FieldWidth::U8),
    FieldDef::new("item_count", "Amount of items and heals", 6, FieldWidth::U8),
];

pub fn unit_region(first_base: u64, second_base: u64) -> Result<RegionLayout> {
    let region = RegionLayout::new(
        SLOT_SIZE,
        vec![
            Segment {
                base: first_base,
                records: SLOTS_FIRST_BLOCK,
            },
            Segment {
                base: second_base,
                records: SLOTS_SECOND_BLOCK,
            },
        ],
    );
    region.validate()?;
    Ok(region)
}

/// Accepts `0x1A` style hex as well as plain decimal.
pub fn parse_slot(value: &str) -> Result<usize> {
    let value = value.trim();
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| {
        CoreError::new(
            CoreErrorCode::InvalidValue,
            format!("invalid unit slot '{value}'"),
        )
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSlot {
    bytes: [u8; SLOT_SIZE],
}

impl UnitSlot {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; SLOT_SIZE] = bytes.try_into().map_err(|_| {
            CoreError::new(
                CoreErrorCode::InvalidValue,
                format!("unit slot is {} bytes, expected {SLOT_SIZE}", bytes.len()),
            )
        })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; SLOT_SIZE] {
        &self.bytes
    }

    pub fn fields(&self) -> Vec<FieldValue> {
        field_values(&UNIT_FIELDS, &self.bytes)
    }

    pub fn get(&self, key: &str) -> Result<u32> {
        Ok(find_field(&UNIT_FIELDS, key)?.read(&self.bytes))
    }

    pub fn set(&mut self, key: &str, value: u32) -> Result<()> {
        find_field(&UNIT_FIELDS, key)?.write(&mut self.bytes, value)
    }
}

#[derive(Debug)]
pub struct UnitEditor {
    image: BinImage,
    buffer: StagingBuffer,
}

impl UnitEditor {
    pub fn open(image: &BinImage, region: &RegionLayout, backups: &BackupStore) -> Result<Self> {
        if region.record_size != SLOT_SIZE || region.record_count() != SLOT_COUNT {
            return Err(CoreError::new(
                CoreErrorCode::Config,
                format!("unit region must hold {SLOT_COUNT} slots of {SLOT_SIZE} bytes"),
            ));
        }
        let buffer = StagingBuffer::load(image, region)?;
        backups.ensure(BACKUP_NAME, &buffer.to_exported()?)?;
        Ok(Self {
            image: image.clone(),
            buffer,
        })
    }

    pub fn buffer(&self) -> &StagingBuffer {
        &self.buffer
    }

    /// Absolute offset of a slot in the binary.
    pub fn slot_offset(&self, slot: usize) -> Result<u64> {
        check_slot(slot)?;
        self.buffer.region().locate(slot)
    }

    pub fn slot(&self, slot: usize) -> Result<UnitSlot> {
        check_slot(slot)?;
        UnitSlot::from_bytes(self.buffer.record(slot)?)
    }

    pub fn set_slot(&mut self, slot: usize, value: &UnitSlot) -> Result<()> {
        check_slot(slot)?;
        self.buffer.replace_record(slot, value.as_bytes())
    }

    pub fn set_field(&mut self, slot: usize, key: &str, value: u32) -> Result<()> {
        let mut current = self.slot(slot)?;
        current.set(key, value)?;
        self.set_slot(slot, &current)
    }

    pub fn export_mod(&self, requested_name: &str, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(mod_file_name(requested_name, DEFAULT_MOD_NAME, MOD_EXTENSION));
        write_mod_file(&path, &self.buffer.to_exported()?)?;
        Ok(path)
    }

    pub fn commit(&mut self) -> Result<()> {
        self.buffer.commit(&self.image)?;
        info!("committed unit data to {}", self.image.path().display());
        Ok(())
    }
}

fn check_slot(slot: usize) -> Result<()> {
    if slot >= SLOT_COUNT {
        return Err(CoreError::slot_out_of_range("unit", slot, SLOT_COUNT));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::assert_table_fits;

    #[test]
    fn unit_field_table_covers_record() {
        assert_table_fits(&UNIT_FIELDS, SLOT_SIZE);
        assert_eq!(UNIT_FIELDS.len(), SLOT_SIZE);
    }

    #[test]
    fn parses_hex_and_decimal_slots() {
        assert_eq!(parse_slot("0x1A").unwrap(), 26);
        assert_eq!(parse_slot("0xfd").unwrap(), 253);
        assert_eq!(parse_slot("12").unwrap(), 12);
        assert!(parse_slot("zz").is_err());
    }

    #[test]
    fn unit_values_are_single_bytes() {
        let mut slot = UnitSlot::from_bytes(&[0; SLOT_SIZE]).unwrap();
        slot.set("horse", 255).unwrap();
        let err = slot.set("horse", 256).unwrap_err();
        assert_eq!(err.code, CoreErrorCode::InvalidValue);
        assert_eq!(slot.get("horse").unwrap(), 255);
    }
}
