use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{CoreError, CoreErrorCode, Result};
use crate::layout::RegionLayout;

/// The live `DW2.bin`. The file is opened for each operation and closed
/// before the call returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinImage {
    path: PathBuf,
}

impl BinImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn len(&self) -> Result<u64> {
        let meta = std::fs::metadata(&self.path)
            .map_err(|e| CoreError::io(format!("cannot stat {}", self.path.display()), e))?;
        Ok(meta.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut file = self.open_read()?;
        let mut buf = vec![0u8; len];
        read_exact_at(&mut file, offset, &mut buf)?;
        debug!("read {len} bytes at 0x{offset:X} from {}", self.path.display());
        Ok(buf)
    }

    pub fn write_at(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        let mut file = self.open_write()?;
        let file_len = file_len(&file, &self.path)?;
        write_all_at(&mut file, file_len, offset, bytes)?;
        debug!(
            "wrote {} bytes at 0x{offset:X} to {}",
            bytes.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Apply several small writes with one open. Every patch is bounds-checked
    /// before the first byte is written.
    pub fn write_patches(&self, patches: &[(u64, Vec<u8>)]) -> Result<()> {
        let mut file = self.open_write()?;
        let file_len = file_len(&file, &self.path)?;
        for (offset, bytes) in patches {
            check_in_bounds(file_len, *offset, bytes.len())?;
        }
        for (offset, bytes) in patches {
            write_all_at(&mut file, file_len, *offset, bytes)?;
        }
        debug!(
            "wrote {} patches to {}",
            patches.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Read every record of `region`, segment by segment, into one buffer.
    pub fn read_region(&self, region: &RegionLayout) -> Result<Vec<u8>> {
        let mut file = self.open_read()?;
        let mut out = vec![0u8; region.byte_len()];
        let mut cursor = 0usize;
        for segment in &region.segments {
            let len = segment.records * region.record_size;
            read_exact_at(&mut file, segment.base, &mut out[cursor..cursor + len])?;
            debug!(
                "read {} records at 0x{:X} from {}",
                segment.records,
                segment.base,
                self.path.display()
            );
            cursor += len;
        }
        Ok(out)
    }

    /// Write the first `region.byte_len()` bytes of `bytes` back across the
    /// region's segments. Extra trailing bytes are ignored.
    pub fn write_region(&self, region: &RegionLayout, bytes: &[u8]) -> Result<()> {
        let needed = region.byte_len();
        if bytes.len() < needed {
            return Err(CoreError::new(
                CoreErrorCode::UnexpectedEof,
                format!(
                    "region data is {} bytes, expected at least {needed}",
                    bytes.len()
                ),
            ));
        }

        let mut file = self.open_write()?;
        let file_len = file_len(&file, &self.path)?;
        for range in region.segment_ranges() {
            check_in_bounds(file_len, range.start, range.len() as usize)?;
        }
        let mut cursor = 0usize;
        for segment in &region.segments {
            let len = segment.records * region.record_size;
            write_all_at(&mut file, file_len, segment.base, &bytes[cursor..cursor + len])?;
            debug!(
                "wrote {} records at 0x{:X} to {}",
                segment.records,
                segment.base,
                self.path.display()
            );
            cursor += len;
        }
        Ok(())
    }

    fn open_read(&self) -> Result<File> {
        File::open(&self.path)
            .map_err(|e| CoreError::io(format!("cannot open {}", self.path.display()), e))
    }

    fn open_write(&self) -> Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| {
                CoreError::io(
                    format!("cannot open {} for writing", self.path.display()),
                    e,
                )
            })
    }
}

fn file_len(file: &File, path: &Path) -> Result<u64> {
    file.metadata()
        .map(|m| m.len())
        .map_err(|e| CoreError::io(format!("cannot stat {}", path.display()), e))
}

fn read_exact_at(file: &mut File, offset: u64, buf: &mut [u8]) -> Result<()> {
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| CoreError::io(format!("seek to 0x{offset:X} failed"), e))?;
    file.read_exact(buf).map_err(|e| {
        CoreError::io(
            format!("reading {} bytes at 0x{offset:X}", buf.len()),
            e,
        )
    })
}

// Writes never grow the binary: a write that would run past the end is
// rejected before any byte is written.
fn check_in_bounds(file_len: u64, offset: u64, len: usize) -> Result<()> {
    let end = offset.checked_add(len as u64);
    if end.is_none_or(|end| end > file_len) {
        return Err(CoreError::new(
            CoreErrorCode::UnexpectedEof,
            format!(
                "write of {len} bytes at 0x{offset:X} runs past end of file (length 0x{file_len:X})"
            ),
        ));
    }
    Ok(())
}

fn write_all_at(file: &mut File, file_len: u64, offset: u64, bytes: &[u8]) -> Result<()> {
    check_in_bounds(file_len, offset, bytes.len())?;
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| CoreError::io(format!("seek to 0x{offset:X} failed"), e))?;
    file.write_all(bytes).map_err(|e| {
        CoreError::io(
            format!("writing {} bytes at 0x{offset:X}", bytes.len()),
            e,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_near_u64_max_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DW2.bin");
        std::fs::write(&path, [0u8; 16]).unwrap();
        let image = BinImage::new(&path);

        let err = image.write_at(u64::MAX - 1, &[1, 2, 3]).unwrap_err();
        assert_eq!(err.code, CoreErrorCode::UnexpectedEof);
        let err = image.write_patches(&[(0, vec![1]), (u64::MAX, vec![2])]).unwrap_err();
        assert_eq!(err.code, CoreErrorCode::UnexpectedEof);
        assert_eq!(std::fs::read(&path).unwrap(), [0u8; 16]);
    }
}
