use crate::error::{CoreError, CoreErrorCode, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    U8,
    U16,
    U32,
}

impl FieldWidth {
    pub fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }

    pub fn max_value(self) -> u32 {
        match self {
            Self::U8 => u8::MAX as u32,
            Self::U16 => u16::MAX as u32,
            Self::U32 => u32::MAX,
        }
    }
}

/// A little-endian integer field at a fixed offset inside a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub key: &'static str,
    pub label: &'static str,
    pub offset: usize,
    pub width: FieldWidth,
}

impl FieldDef {
    pub const fn new(key: &'static str, label: &'static str, offset: usize, width: FieldWidth) -> Self {
        Self {
            key,
            label,
            offset,
            width,
        }
    }

    pub fn end(&self) -> usize {
        self.offset + self.width.bytes()
    }

    pub fn read(&self, record: &[u8]) -> u32 {
        let bytes = &record[self.offset..self.end()];
        match self.width {
            FieldWidth::U8 => bytes[0] as u32,
            FieldWidth::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as u32,
            FieldWidth::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }

    pub fn check(&self, value: u32) -> Result<()> {
        if value > self.width.max_value() {
            return Err(CoreError::new(
                CoreErrorCode::InvalidValue,
                format!(
                    "value {value} does not fit field '{}' (max {})",
                    self.key,
                    self.width.max_value()
                ),
            ));
        }
        Ok(())
    }

    /// Overwrite this field's bytes. Every other byte of `record` is left as is.
    pub fn write(&self, record: &mut [u8], value: u32) -> Result<()> {
        self.check(value)?;
        let end = self.end();
        let slot = &mut record[self.offset..end];
        match self.width {
            FieldWidth::U8 => slot[0] = value as u8,
            FieldWidth::U16 => slot.copy_from_slice(&(value as u16).to_le_bytes()),
            FieldWidth::U32 => slot.copy_from_slice(&value.to_le_bytes()),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub key: String,
    pub label: String,
    pub value: u32,
}

/// Check a `key = value` edit against a field table without touching any record.
pub fn check_field(defs: &[FieldDef], key: &str, value: u32) -> Result<()> {
    find_field(defs, key)?.check(value)
}

pub fn find_field<'a>(defs: &'a [FieldDef], key: &str) -> Result<&'a FieldDef> {
    defs.iter().find(|d| d.key == key).ok_or_else(|| {
        let known = defs.iter().map(|d| d.key).collect::<Vec<_>>().join(", ");
        CoreError::new(
            CoreErrorCode::InvalidValue,
            format!("unknown field '{key}', expected one of: {known}"),
        )
    })
}

pub fn field_values(defs: &[FieldDef], record: &[u8]) -> Vec<FieldValue> {
    defs.iter()
        .map(|d| FieldValue {
            key: d.key.to_string(),
            label: d.label.to_string(),
            value: d.read(record),
        })
        .collect()
}

pub fn set_field(defs: &[FieldDef], record: &mut [u8], key: &str, value: u32) -> Result<()> {
    find_field(defs, key)?.write(record, value)
}

/// Panics in tests if any field runs past `record_size` or two fields share a byte.
#[cfg(test)]
pub(crate) fn assert_table_fits(defs: &[FieldDef], record_size: usize) {
    let mut used = vec![false; record_size];
    for def in defs {
        assert!(def.end() <= record_size, "field {} past end", def.key);
        for b in &mut used[def.offset..def.end()] {
            assert!(!*b, "field {} overlaps another field", def.key);
            *b = true;
        }
    }
}
