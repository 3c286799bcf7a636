use log::info;

use crate::error::{CoreError, CoreErrorCode, Result};
use crate::image::BinImage;
use crate::record::{FieldDef, FieldWidth, find_field};

pub const TIER_COUNT: usize = 5;
pub const FIELDS_PER_TIER: usize = 3;
pub const BLOCK_SIZE: usize = TIER_COUNT * FIELDS_PER_TIER;

/// Byte written at the formation offset so player bodyguards follow in
/// formation the way AI bodyguards do.
pub const FOLLOW_VALUE: u8 = 0x11;

pub const TIER_FIELDS: [FieldDef; FIELDS_PER_TIER] = [
    FieldDef::new("rank", "Rank (name ID value)", 0, FieldWidth::U8),
    FieldDef::new("model", "Guard Model", 1, FieldWidth::U8),
    FieldDef::new("motion", "Guard Motion/Moveset", 2, FieldWidth::U8),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardTier {
    pub tier: usize,
    pub rank: u8,
    pub model: u8,
    pub motion: u8,
}

/// Parse one or two hex digits (an optional `0x` prefix is allowed).
pub fn parse_hex_byte(value: &str) -> Result<u8> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() || digits.len() > 2 {
        return Err(CoreError::new(
            CoreErrorCode::InvalidValue,
            format!("'{value}' is not a one or two digit hex byte"),
        ));
    }
    u8::from_str_radix(digits, 16).map_err(|_| {
        CoreError::new(
            CoreErrorCode::InvalidValue,
            format!("'{value}' is not a hex byte"),
        )
    })
}

#[derive(Debug)]
pub struct BodyguardEditor {
    image: BinImage,
    offset: u64,
    follow_offset: u64,
    bytes: [u8; BLOCK_SIZE],
}

impl BodyguardEditor {
    pub fn open(image: &BinImage, offset: u64, follow_offset: u64) -> Result<Self> {
        if !image.exists() {
            return Err(CoreError::new(
                CoreErrorCode::Io,
                format!("DW2.bin not found: {}", image.path().display()),
            ));
        }
        let raw = image.read_at(offset, BLOCK_SIZE)?;
        let mut bytes = [0u8; BLOCK_SIZE];
        bytes.copy_from_slice(&raw);
        Ok(Self {
            image: image.clone(),
            offset,
            follow_offset,
            bytes,
        })
    }

    pub fn bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.bytes
    }

    pub fn tiers(&self) -> Vec<GuardTier> {
        self.bytes
            .chunks_exact(FIELDS_PER_TIER)
            .enumerate()
            .map(|(i, chunk)| GuardTier {
                tier: i + 1,
                rank: chunk[0],
                model: chunk[1],
                motion: chunk[2],
            })
            .collect()
    }

    /// `tier` counts from 1, matching the in-game rank tiers.
    pub fn set_field(&mut self, tier: usize, key: &str, value: u8) -> Result<()> {
        if !(1..=TIER_COUNT).contains(&tier) {
            return Err(CoreError::new(
                CoreErrorCode::SlotOutOfRange,
                format!("bodyguard tier {tier} out of range (1-{TIER_COUNT})"),
            ));
        }
        let start = (tier - 1) * FIELDS_PER_TIER;
        let record = &mut self.bytes[start..start + FIELDS_PER_TIER];
        find_field(&TIER_FIELDS, key)?.write(record, value as u32)
    }

    pub fn commit(&self) -> Result<()> {
        self.image.write_at(self.offset, &self.bytes)?;
        info!(
            "wrote bodyguard progression at 0x{:X} to {}",
            self.offset,
            self.image.path().display()
        );
        Ok(())
    }

    pub fn formation_follow_enabled(&self) -> Result<bool> {
        let current = self.image.read_at(self.follow_offset, 1)?;
        Ok(current[0] == FOLLOW_VALUE)
    }

    pub fn apply_formation_follow(&self) -> Result<()> {
        self.image.write_at(self.follow_offset, &[FOLLOW_VALUE])?;
        info!(
            "patched formation follow at 0x{:X} in {}",
            self.follow_offset,
            self.image.path().display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_bytes_accept_one_or_two_digits() {
        assert_eq!(parse_hex_byte("0A").unwrap(), 10);
        assert_eq!(parse_hex_byte("f").unwrap(), 15);
        assert_eq!(parse_hex_byte("0xFF").unwrap(), 255);
        assert!(parse_hex_byte("").is_err());
        assert!(parse_hex_byte("100").is_err());
        assert!(parse_hex_byte("G1").is_err());
    }
}
