use std::io::Cursor;

use crate::error::{CoreError, CoreErrorCode, Result};
use crate::image::BinImage;
use crate::layout::RegionLayout;
use crate::reader::LittleEndianReader;

const TRAILER_ENTRY_WIDTH: usize = 4;

/// In-memory copy of a region. Edits land here first; `commit` writes the
/// whole region back to the binary.
///
/// The exported form (mod files and backups) is the record bytes followed by
/// each segment base as a little-endian `u32`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingBuffer {
    region: RegionLayout,
    data: Vec<u8>,
    original: Vec<u8>,
}

impl StagingBuffer {
    pub fn load(image: &BinImage, region: &RegionLayout) -> Result<Self> {
        region.validate()?;
        let data = image.read_region(region)?;
        Ok(Self {
            region: region.clone(),
            original: data.clone(),
            data,
        })
    }

    /// Build a buffer from exported bytes. Anything past the record data,
    /// such as the offsets trailer, is ignored.
    pub fn from_exported(region: &RegionLayout, bytes: &[u8]) -> Result<Self> {
        let needed = region.byte_len();
        if bytes.len() < needed {
            return Err(CoreError::new(
                CoreErrorCode::UnexpectedEof,
                format!(
                    "data ended after {} bytes, {} records of {} bytes need {needed}",
                    bytes.len(),
                    region.record_count(),
                    region.record_size
                ),
            ));
        }
        let data = bytes[..needed].to_vec();
        Ok(Self {
            region: region.clone(),
            original: data.clone(),
            data,
        })
    }

    pub fn region(&self) -> &RegionLayout {
        &self.region
    }

    pub fn record_count(&self) -> usize {
        self.region.record_count()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn record(&self, index: usize) -> Result<&[u8]> {
        let range = self.record_range(index)?;
        Ok(&self.data[range])
    }

    pub fn record_mut(&mut self, index: usize) -> Result<&mut [u8]> {
        let range = self.record_range(index)?;
        Ok(&mut self.data[range])
    }

    pub fn replace_record(&mut self, index: usize, bytes: &[u8]) -> Result<()> {
        if bytes.len() != self.region.record_size {
            return Err(CoreError::new(
                CoreErrorCode::InvalidValue,
                format!(
                    "record is {} bytes, expected {}",
                    bytes.len(),
                    self.region.record_size
                ),
            ));
        }
        self.record_mut(index)?.copy_from_slice(bytes);
        Ok(())
    }

    pub fn is_modified(&self) -> bool {
        self.data != self.original
    }

    pub fn modified_records(&self) -> Vec<usize> {
        let size = self.region.record_size;
        self.data
            .chunks(size)
            .zip(self.original.chunks(size))
            .enumerate()
            .filter(|(_, (now, was))| now != was)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn to_exported(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(
            self.data.len() + self.region.segments.len() * TRAILER_ENTRY_WIDTH,
        );
        out.extend_from_slice(&self.data);
        for base in self.region.bases() {
            let base = u32::try_from(base).map_err(|_| {
                CoreError::new(
                    CoreErrorCode::InvalidValue,
                    format!("segment base 0x{base:X} does not fit the 32-bit offsets trailer"),
                )
            })?;
            out.extend_from_slice(&base.to_le_bytes());
        }
        Ok(out)
    }

    pub fn commit(&mut self, image: &BinImage) -> Result<()> {
        image.write_region(&self.region, &self.data)?;
        self.original.clone_from(&self.data);
        Ok(())
    }

    fn record_range(&self, index: usize) -> Result<std::ops::Range<usize>> {
        let count = self.record_count();
        if index >= count {
            return Err(CoreError::slot_out_of_range("record", index, count));
        }
        let start = index * self.region.record_size;
        Ok(start..start + self.region.record_size)
    }
}

/// Segment bases stored after the record data of an exported buffer, if the
/// trailer is present in full.
pub fn read_trailer(region: &RegionLayout, bytes: &[u8]) -> Option<Vec<u32>> {
    let start = region.byte_len();
    let count = region.segments.len();
    if bytes.len() < start + count * TRAILER_ENTRY_WIDTH {
        return None;
    }
    let mut r = LittleEndianReader::new(Cursor::new(&bytes[start..]));
    r.read_u32_vec(count).ok()
}
