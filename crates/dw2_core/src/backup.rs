use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::info;
use tempfile::NamedTempFile;

use crate::error::{CoreError, CoreErrorCode, Result};

pub const DEFAULT_BACKUP_DIR: &str = "Backups_For_Mod_Disabling";

/// Directory holding pristine copies of regions, written the first time a
/// region is opened and never overwritten afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Write `bytes` as backup `name` unless it already exists. Returns
    /// whether a new backup was created.
    ///
    /// The data is written to a temporary file in the backup directory and
    /// only then linked to its final name, so an interrupted write never
    /// leaves a truncated backup behind.
    pub fn ensure(&self, name: &str, bytes: &[u8]) -> Result<bool> {
        self.ensure_with(name, |file| file.write_all(bytes))
    }

    fn ensure_with<F>(&self, name: &str, write: F) -> Result<bool>
    where
        F: FnOnce(&mut NamedTempFile) -> io::Result<()>,
    {
        let path = self.path_for(name);
        if path.is_file() {
            return Ok(false);
        }
        fs::create_dir_all(&self.dir).map_err(|e| {
            CoreError::io(
                format!("cannot create backup directory {}", self.dir.display()),
                e,
            )
        })?;

        let mut file = NamedTempFile::new_in(&self.dir).map_err(|e| {
            CoreError::io(
                format!("cannot create temporary file in {}", self.dir.display()),
                e,
            )
        })?;
        write(&mut file)
            .and_then(|()| file.as_file().sync_all())
            .map_err(|e| CoreError::io(format!("cannot write backup {}", path.display()), e))?;
        let len = file.as_file().metadata().map(|m| m.len()).unwrap_or_default();

        match file.persist_noclobber(&path) {
            Ok(_) => {}
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => {
                return Err(CoreError::io(
                    format!("cannot create backup {}", path.display()),
                    e.error,
                ));
            }
        }

        info!("created backup {} ({len} bytes)", path.display());
        Ok(true)
    }

    pub fn load(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(CoreError::new(
                CoreErrorCode::BackupMissing,
                format!(
                    "backup not found: {}; open the matching editor once to create it",
                    path.display()
                ),
            ));
        }
        fs::read(&path).map_err(|e| CoreError::io(format!("cannot read {}", path.display()), e))
    }
}
