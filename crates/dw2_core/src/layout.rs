use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreErrorCode, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &ByteRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A contiguous run of fixed-size records starting at `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub base: u64,
    pub records: usize,
}

/// Records of one size spread over one or more segments of the binary.
///
/// Record indices run across segments in order, so index `segments[0].records`
/// is the first record of the second segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionLayout {
    pub record_size: usize,
    pub segments: Vec<Segment>,
}

impl RegionLayout {
    pub fn new(record_size: usize, segments: Vec<Segment>) -> Self {
        Self {
            record_size,
            segments,
        }
    }

    pub fn uniform(record_size: usize, bases: &[u64], records_per_segment: usize) -> Self {
        Self::new(
            record_size,
            bases
                .iter()
                .map(|&base| Segment {
                    base,
                    records: records_per_segment,
                })
                .collect(),
        )
    }

    pub fn record_count(&self) -> usize {
        self.segments.iter().map(|s| s.records).sum()
    }

    pub fn byte_len(&self) -> usize {
        self.record_count() * self.record_size
    }

    pub fn bases(&self) -> Vec<u64> {
        self.segments.iter().map(|s| s.base).collect()
    }

    /// Absolute file offset of record `index`.
    pub fn locate(&self, index: usize) -> Result<u64> {
        let mut first = 0usize;
        for segment in &self.segments {
            if index < first + segment.records {
                let within = (index - first) as u64;
                return Ok(segment.base + within * self.record_size as u64);
            }
            first += segment.records;
        }
        Err(CoreError::slot_out_of_range(
            "record",
            index,
            self.record_count(),
        ))
    }

    pub fn segment_ranges(&self) -> Vec<ByteRange> {
        self.segments
            .iter()
            .map(|s| ByteRange {
                start: s.base,
                end: s.base + (s.records * self.record_size) as u64,
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.record_size == 0 {
            return Err(CoreError::new(
                CoreErrorCode::Config,
                "region record size must be non-zero",
            ));
        }
        if self.segments.is_empty() {
            return Err(CoreError::new(
                CoreErrorCode::Config,
                "region layout must contain at least one segment",
            ));
        }

        for segment in &self.segments {
            if segment.records == 0 {
                return Err(CoreError::new(
                    CoreErrorCode::Config,
                    format!("segment at 0x{:X} holds no records", segment.base),
                ));
            }
            let len = (segment.records * self.record_size) as u64;
            if segment.base.checked_add(len).is_none() {
                return Err(CoreError::new(
                    CoreErrorCode::Config,
                    format!("segment at 0x{:X} overflows the address space", segment.base),
                ));
            }
        }

        let ranges = self.segment_ranges();
        for (i, a) in ranges.iter().enumerate() {
            for b in &ranges[i + 1..] {
                if a.overlaps(b) {
                    return Err(CoreError::new(
                        CoreErrorCode::Config,
                        format!(
                            "segments overlap: 0x{:X}..0x{:X} and 0x{:X}..0x{:X}",
                            a.start, a.end, b.start, b.end
                        ),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// One run of fixed-width name entries. `byte_len` bytes of text are stored
/// at every `stride` bytes; the remaining bytes of the stride are left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NameGroup {
    pub base: u64,
    pub slots: usize,
    pub byte_len: usize,
    pub stride: usize,
}

impl NameGroup {
    /// Offset of slot `index` within this group, or `None` if it does not fit in `u64`.
    pub fn slot_offset(&self, index: usize) -> Option<u64> {
        (index as u64)
            .checked_mul(self.stride as u64)?
            .checked_add(self.base)
    }

    /// One past the last byte the group can touch.
    pub fn end(&self) -> Option<u64> {
        self.slot_offset(self.slots)
    }
}

pub const DEFAULT_NAME_GROUPS: [NameGroup; 4] = [
    NameGroup {
        base: 0x1614_1F78,
        slots: 64,
        byte_len: 15,
        stride: 16,
    },
    NameGroup {
        base: 0x1614_24A8,
        slots: 27,
        byte_len: 15,
        stride: 16,
    },
    NameGroup {
        base: 0x1615_A410,
        slots: 41,
        byte_len: 7,
        stride: 8,
    },
    NameGroup {
        base: 0x1615_A688,
        slots: 14,
        byte_len: 7,
        stride: 8,
    },
];

pub const DEFAULT_BODYGUARD_OFFSET: u64 = 0x160C_F338;
pub const DEFAULT_FORMATION_FOLLOW_OFFSET: u64 = 0x15F7_1028;

/// Offsets of every editable region in the binary.
///
/// Stage, unit and item offsets have no built-in values; they come from
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub stages: Vec<RegionLayout>,
    pub units: Option<RegionLayout>,
    pub items: Option<u64>,
    pub names: Vec<NameGroup>,
    pub bodyguard: u64,
    pub formation_follow: u64,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            stages: Vec::new(),
            units: None,
            items: None,
            names: DEFAULT_NAME_GROUPS.to_vec(),
            bodyguard: DEFAULT_BODYGUARD_OFFSET,
            formation_follow: DEFAULT_FORMATION_FOLLOW_OFFSET,
        }
    }
}

impl Layout {
    pub fn units(&self) -> Result<&RegionLayout> {
        self.units.as_ref().ok_or_else(|| {
            CoreError::new(CoreErrorCode::Config, "unit offsets are not configured")
        })
    }

    pub fn items(&self) -> Result<u64> {
        self.items.ok_or_else(|| {
            CoreError::new(CoreErrorCode::Config, "item offset is not configured")
        })
    }

    pub fn validate(&self) -> Result<()> {
        for region in &self.stages {
            region.validate()?;
        }
        if let Some(units) = &self.units {
            units.validate()?;
        }
        for group in &self.names {
            if group.byte_len == 0 || group.byte_len > group.stride {
                return Err(CoreError::new(
                    CoreErrorCode::Config,
                    format!(
                        "name group at 0x{:X}: byte length {} does not fit stride {}",
                        group.base, group.byte_len, group.stride
                    ),
                ));
            }
            if group.end().is_none() {
                return Err(CoreError::new(
                    CoreErrorCode::Config,
                    format!(
                        "name group at 0x{:X} with {} slots overflows the address space",
                        group.base, group.slots
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_walks_segments_in_order() {
        let region = RegionLayout::new(
            7,
            vec![
                Segment {
                    base: 100,
                    records: 2,
                },
                Segment {
                    base: 1000,
                    records: 3,
                },
            ],
        );
        assert_eq!(region.locate(0).unwrap(), 100);
        assert_eq!(region.locate(1).unwrap(), 107);
        assert_eq!(region.locate(2).unwrap(), 1000);
        assert_eq!(region.locate(4).unwrap(), 1014);
        let err = region.locate(5).unwrap_err();
        assert_eq!(err.code, CoreErrorCode::SlotOutOfRange);
    }

    #[test]
    fn validate_rejects_overlapping_segments() {
        let region = RegionLayout::uniform(32, &[0, 32], 2);
        assert_eq!(region.validate().unwrap_err().code, CoreErrorCode::Config);
        RegionLayout::uniform(32, &[0, 64], 2).validate().unwrap();
    }

    #[test]
    fn validate_rejects_name_group_past_end_of_address_space() {
        let layout = Layout {
            names: vec![NameGroup {
                base: u64::MAX - 15,
                slots: 4,
                byte_len: 15,
                stride: 16,
            }],
            ..Layout::default()
        };
        assert_eq!(layout.validate().unwrap_err().code, CoreErrorCode::Config);
    }

    #[test]
    fn default_name_groups_cover_146_slots() {
        let total: usize = DEFAULT_NAME_GROUPS.iter().map(|g| g.slots).sum();
        assert_eq!(total, 146);
        Layout::default().validate().unwrap();
    }
}
