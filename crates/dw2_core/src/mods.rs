use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::backup::BackupStore;
use crate::error::{CoreError, CoreErrorCode, Result};
use crate::image::BinImage;
use crate::layout::{Layout, RegionLayout};
use crate::stage::Stage;
use crate::staging::{StagingBuffer, read_trailer};
use crate::unit;

const BACKUP_SUFFIX: &str = "_Original";

/// File name for an exported mod: the requested name up to its first `.`,
/// or `default_base` when that is empty, followed by `extension`.
pub fn mod_file_name(requested: &str, default_base: &str, extension: &str) -> String {
    let base = requested.split('.').next().unwrap_or_default();
    let base = if base.is_empty() { default_base } else { base };
    format!("{base}{extension}")
}

pub(crate) fn write_mod_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes)
        .map_err(|e| CoreError::io(format!("cannot write mod file {}", path.display()), e))?;
    info!("created mod file {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Stage a mod file belongs to, judged by its extension (case-insensitive).
pub fn detect_stage_from_mod_path(path: &Path) -> Option<Stage> {
    let lower = path.to_string_lossy().to_ascii_lowercase();
    Stage::ALL
        .into_iter()
        .find(|stage| lower.ends_with(&stage.mod_extension().to_ascii_lowercase()))
}

/// Stage a backup belongs to, judged by a file stem like `YTR_Stage_Original`.
pub fn detect_stage_from_backup_path(path: &Path) -> Option<Stage> {
    let stem = path.file_stem()?.to_str()?;
    let id = stem.strip_suffix(BACKUP_SUFFIX).unwrap_or(stem);
    Stage::ALL.into_iter().find(|stage| stage.id() == id)
}

/// Applies exported stage/unit data to the binary and restores it from backups.
#[derive(Debug)]
pub struct ModManager {
    image: BinImage,
    layout: Layout,
    backups: BackupStore,
}

impl ModManager {
    pub fn new(image: &BinImage, layout: &Layout, backups: &BackupStore) -> Self {
        Self {
            image: image.clone(),
            layout: layout.clone(),
            backups: backups.clone(),
        }
    }

    pub fn enable_stage_mod(&self, mod_path: &Path) -> Result<Stage> {
        let stage = detect_stage_from_mod_path(mod_path).ok_or_else(|| {
            CoreError::new(
                CoreErrorCode::UnrecognizedFile,
                format!(
                    "could not detect which stage {} is for",
                    mod_path.display()
                ),
            )
        })?;
        let bytes = read_input(mod_path)?;
        self.write_stage(stage, &bytes, mod_path)?;
        info!("applied stage mod {} to '{stage}'", mod_path.display());
        Ok(stage)
    }

    pub fn disable_stage_mod(&self, backup_path: &Path) -> Result<Stage> {
        let stage = detect_stage_from_backup_path(backup_path).ok_or_else(|| {
            CoreError::new(
                CoreErrorCode::UnrecognizedFile,
                format!(
                    "could not determine which stage {} belongs to",
                    backup_path.display()
                ),
            )
        })?;
        let bytes = read_input(backup_path)?;
        self.write_stage(stage, &bytes, backup_path)?;
        info!("restored '{stage}' from {}", backup_path.display());
        Ok(stage)
    }

    /// Restore a stage from its backup in the backup directory.
    pub fn restore_stage(&self, stage: Stage) -> Result<()> {
        let path = self.backups.path_for(&stage.backup_name());
        let bytes = self.backups.load(&stage.backup_name())?;
        self.write_stage(stage, &bytes, &path)?;
        info!("restored '{stage}' from {}", path.display());
        Ok(())
    }

    pub fn enable_unit_mod(&self, mod_path: &Path) -> Result<()> {
        let region = self.layout.units()?;
        let bytes = read_input(mod_path)?;
        write_exported(&self.image, region, &bytes, mod_path)?;
        info!("applied unit mod {}", mod_path.display());
        Ok(())
    }

    pub fn disable_unit_mods(&self) -> Result<()> {
        let region = self.layout.units()?;
        let bytes = self.backups.load(unit::BACKUP_NAME)?;
        let path = self.backups.path_for(unit::BACKUP_NAME);
        write_exported(&self.image, region, &bytes, &path)?;
        info!("restored unit data from {}", path.display());
        Ok(())
    }

    fn write_stage(&self, stage: Stage, bytes: &[u8], source: &Path) -> Result<()> {
        let region = self.layout.stages.get(stage.index()).ok_or_else(|| {
            CoreError::new(
                CoreErrorCode::Config,
                format!("stage offsets are not configured for '{stage}'"),
            )
        })?;
        write_exported(&self.image, region, bytes, source)
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| CoreError::io(format!("cannot read {}", path.display()), e))
}

fn write_exported(image: &BinImage, region: &RegionLayout, bytes: &[u8], source: &Path) -> Result<()> {
    let buffer = StagingBuffer::from_exported(region, bytes).map_err(|e| {
        CoreError::new(
            e.code,
            format!("{} is too short: {}", source.display(), e.message),
        )
    })?;

    if let Some(trailer) = read_trailer(region, bytes) {
        let expected: Vec<u64> = region.bases();
        let found: Vec<u64> = trailer.iter().map(|&b| b as u64).collect();
        if found != expected {
            warn!(
                "{} was exported with offsets {found:X?}, writing to configured {expected:X?}",
                source.display()
            );
        }
    }

    image.write_region(region, buffer.data())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn mod_names_use_text_before_first_dot() {
        assert_eq!(mod_file_name("MyMod.v2.bin", "YTR_Stage", ".DW2YTR"), "MyMod.DW2YTR");
        assert_eq!(mod_file_name("", "DW2Unit", ".DW2UnitMod"), "DW2Unit.DW2UnitMod");
        assert_eq!(mod_file_name(".hidden", "HF_Stage", ".DW2HF"), "HF_Stage.DW2HF");
    }

    #[test]
    fn detects_stage_from_extension() {
        let path = PathBuf::from("mods/Harder.dw2cban");
        assert_eq!(detect_stage_from_mod_path(&path), Some(Stage::ChangBan));
        assert_eq!(
            detect_stage_from_mod_path(Path::new("a.DW2CBi")),
            Some(Stage::ChiBi)
        );
        assert_eq!(detect_stage_from_mod_path(Path::new("a.txt")), None);
    }

    #[test]
    fn detects_stage_from_backup_name() {
        let path = PathBuf::from("Backups_For_Mod_Disabling/GD_Stage_Original.stage");
        assert_eq!(detect_stage_from_backup_path(&path), Some(Stage::GuanDu));
        assert_eq!(
            detect_stage_from_backup_path(Path::new("YL_Stage.stage")),
            Some(Stage::YiLing)
        );
        assert_eq!(detect_stage_from_backup_path(Path::new("other.stage")), None);
    }
}
