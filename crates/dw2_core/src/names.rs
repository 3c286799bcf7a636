use std::io::Cursor;

use log::info;

use crate::error::{CoreError, CoreErrorCode, Result};
use crate::image::BinImage;
use crate::layout::NameGroup;
use crate::reader::LittleEndianReader;

/// Where one global name slot lives in the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameSlot {
    pub slot: usize,
    pub group: usize,
    pub offset: u64,
    pub byte_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    pub slot: usize,
    pub offset: u64,
    pub max_len: usize,
    pub name: String,
}

#[derive(Debug)]
pub struct NameTable {
    image: BinImage,
    groups: Vec<NameGroup>,
}

impl NameTable {
    pub fn new(image: &BinImage, groups: &[NameGroup]) -> Self {
        Self {
            image: image.clone(),
            groups: groups.to_vec(),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.groups.iter().map(|g| g.slots).sum()
    }

    pub fn resolve(&self, slot: usize) -> Result<NameSlot> {
        let mut first = 0usize;
        for (group_index, group) in self.groups.iter().enumerate() {
            if slot < first + group.slots {
                let offset = group.slot_offset(slot - first).ok_or_else(|| {
                    CoreError::new(
                        CoreErrorCode::Config,
                        format!("name slot {slot} lies past the end of the address space"),
                    )
                })?;
                return Ok(NameSlot {
                    slot,
                    group: group_index,
                    offset,
                    byte_len: group.byte_len,
                });
            }
            first += group.slots;
        }
        Err(CoreError::slot_out_of_range("name", slot, self.slot_count()))
    }

    pub fn read_name(&self, slot: usize) -> Result<NameEntry> {
        let location = self.resolve(slot)?;
        let bytes = self.image.read_at(location.offset, location.byte_len)?;
        let name = LittleEndianReader::new(Cursor::new(bytes))
            .read_ascii_field(location.byte_len)
            .map_err(|e| CoreError::io(format!("decoding name slot {slot}"), e))?;
        Ok(NameEntry {
            slot,
            offset: location.offset,
            max_len: location.byte_len,
            name,
        })
    }

    /// Overwrite a name. The text is reduced to ASCII, truncated to the
    /// slot's length and NUL-padded; bytes past the slot length are untouched.
    pub fn write_name(&self, slot: usize, text: &str) -> Result<NameEntry> {
        let location = self.resolve(slot)?;
        let encoded = encode_name(text, location.byte_len);
        self.image.write_at(location.offset, &encoded)?;
        info!(
            "updated name slot {slot} at 0x{:X} in {}",
            location.offset,
            self.image.path().display()
        );
        let end = encoded.iter().position(|&b| b == 0).unwrap_or(encoded.len());
        Ok(NameEntry {
            slot,
            offset: location.offset,
            max_len: location.byte_len,
            name: String::from_utf8_lossy(&encoded[..end]).into_owned(),
        })
    }

    pub fn read_all(&self) -> Result<Vec<NameEntry>> {
        (0..self.slot_count()).map(|slot| self.read_name(slot)).collect()
    }
}

pub fn encode_name(text: &str, byte_len: usize) -> Vec<u8> {
    let mut out: Vec<u8> = text
        .chars()
        .filter(char::is_ascii)
        .map(|c| c as u8)
        .take(byte_len)
        .collect();
    out.resize(byte_len, 0);
    out
}
