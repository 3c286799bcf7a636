use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::backup::{BackupStore, DEFAULT_BACKUP_DIR};
use crate::error::{CoreError, CoreErrorCode, Result};
use crate::image::BinImage;
use crate::layout::{
    DEFAULT_BODYGUARD_OFFSET, DEFAULT_FORMATION_FOLLOW_OFFSET, DEFAULT_NAME_GROUPS, Layout,
    NameGroup,
};
use crate::stage::{self, Stage};
use crate::unit;

pub const DEFAULT_BIN_PATH: &str = "DW2.bin";

/// A file offset written either as a JSON number or as a `"0x..."` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset(pub u64);

impl<'de> Deserialize<'de> for Offset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(Offset(n)),
            Repr::Text(s) => parse_offset(&s).map(Offset).map_err(serde::de::Error::custom),
        }
    }
}

impl Serialize for Offset {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:X}", self.0))
    }
}

pub fn parse_offset(value: &str) -> std::result::Result<u64, String> {
    let trimmed = value.trim();
    match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse(),
    }
    .map_err(|_| format!("invalid offset '{value}'"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OffsetsConfig {
    /// Eight sector offsets per stage, stages in `Stage::ALL` order.
    pub stages: Option<Vec<Vec<Offset>>>,
    /// Base of the first 53 unit slots, then base of the next 201.
    pub units: Option<[Offset; 2]>,
    pub items: Option<Offset>,
    pub names: Option<Vec<NameGroup>>,
    pub bodyguard: Option<Offset>,
    pub formation_follow: Option<Offset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub bin_path: PathBuf,
    pub backup_dir: PathBuf,
    pub offsets: OffsetsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bin_path: PathBuf::from(DEFAULT_BIN_PATH),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            offsets: OffsetsConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| CoreError::io(format!("cannot read config {}", path.display()), e))?;
        Self::from_json_str(&text).map_err(|e| {
            CoreError::new(e.code, format!("{}: {}", path.display(), e.message))
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| {
            CoreError::new(CoreErrorCode::Config, format!("invalid config: {e}"))
        })
    }

    pub fn image(&self) -> BinImage {
        BinImage::new(&self.bin_path)
    }

    pub fn backups(&self) -> BackupStore {
        BackupStore::new(&self.backup_dir)
    }

    pub fn layout(&self) -> Result<Layout> {
        let offsets = &self.offsets;

        let stages = match &offsets.stages {
            None => Vec::new(),
            Some(stages) => {
                if stages.len() != Stage::ALL.len() {
                    return Err(CoreError::new(
                        CoreErrorCode::Config,
                        format!(
                            "expected sector offsets for {} stages, got {}",
                            Stage::ALL.len(),
                            stages.len()
                        ),
                    ));
                }
                stages
                    .iter()
                    .map(|bases| {
                        let bases: Vec<u64> = bases.iter().map(|o| o.0).collect();
                        stage::stage_region(&bases)
                    })
                    .collect::<Result<Vec<_>>>()?
            }
        };

        let units = offsets
            .units
            .map(|[first, second]| unit::unit_region(first.0, second.0))
            .transpose()?;

        let layout = Layout {
            stages,
            units,
            items: offsets.items.map(|o| o.0),
            names: offsets
                .names
                .clone()
                .unwrap_or_else(|| DEFAULT_NAME_GROUPS.to_vec()),
            bodyguard: offsets.bodyguard.map_or(DEFAULT_BODYGUARD_OFFSET, |o| o.0),
            formation_follow: offsets
                .formation_follow
                .map_or(DEFAULT_FORMATION_FOLLOW_OFFSET, |o| o.0),
        };
        layout.validate()?;
        Ok(layout)
    }
}
