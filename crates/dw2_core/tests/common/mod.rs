#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use dw2_core::backup::BackupStore;
use dw2_core::image::BinImage;
use dw2_core::layout::{Layout, NameGroup};
use dw2_core::stage::{self, SECTORS_PER_STAGE, Stage};
use dw2_core::unit;
use tempfile::TempDir;

pub const IMAGE_LEN: usize = 0x35000;
pub const STAGE_AREA: u64 = 0x1000;
pub const SECTOR_LEN: u64 = 0x800;
pub const UNIT_FIRST: u64 = 0x30000;
pub const UNIT_SECOND: u64 = 0x31000;
pub const ITEMS: u64 = 0x32000;
pub const NAMES: u64 = 0x33000;
pub const BODYGUARD: u64 = 0x34000;
pub const FOLLOW: u64 = 0x34100;

/// Scratch directory with a patterned `DW2.bin` and an empty backup dir.
pub struct Fixture {
    pub dir: TempDir,
    pub image: BinImage,
    pub backups: BackupStore,
    pub layout: Layout,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let bin = dir.path().join("DW2.bin");
        fs::write(&bin, pattern(IMAGE_LEN)).expect("failed to write fixture binary");
        let backups = BackupStore::new(dir.path().join("Backups_For_Mod_Disabling"));
        Self {
            image: BinImage::new(&bin),
            backups,
            layout: layout(),
            dir,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn bin_path(&self) -> PathBuf {
        self.image.path().to_path_buf()
    }

    pub fn bytes(&self) -> Vec<u8> {
        fs::read(self.image.path()).expect("failed to read fixture binary")
    }
}

pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Sectors are laid out in reverse so stage reads must follow the offset table.
pub fn sector_base(stage: Stage, sector: usize) -> u64 {
    let position = stage.index() * SECTORS_PER_STAGE + (SECTORS_PER_STAGE - 1 - sector);
    STAGE_AREA + position as u64 * SECTOR_LEN
}

pub fn layout() -> Layout {
    let stages = Stage::ALL
        .into_iter()
        .map(|s| {
            let bases: Vec<u64> = (0..SECTORS_PER_STAGE).map(|k| sector_base(s, k)).collect();
            stage::stage_region(&bases).expect("valid stage region")
        })
        .collect();

    Layout {
        stages,
        units: Some(unit::unit_region(UNIT_FIRST, UNIT_SECOND).expect("valid unit region")),
        items: Some(ITEMS),
        names: vec![
            NameGroup {
                base: NAMES,
                slots: 4,
                byte_len: 15,
                stride: 16,
            },
            NameGroup {
                base: NAMES + 0x100,
                slots: 3,
                byte_len: 7,
                stride: 8,
            },
        ],
        bodyguard: BODYGUARD,
        formation_follow: FOLLOW,
    }
}
