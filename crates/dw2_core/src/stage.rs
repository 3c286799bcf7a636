use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::info;

use crate::backup::BackupStore;
use crate::error::{CoreError, CoreErrorCode, Result};
use crate::image::BinImage;
use crate::layout::RegionLayout;
use crate::mods::{mod_file_name, write_mod_file};
use crate::record::{FieldDef, FieldValue, FieldWidth, field_values, find_field};
use crate::staging::StagingBuffer;

pub const SLOT_SIZE: usize = 32;
pub const SECTORS_PER_STAGE: usize = 8;
pub const SLOTS_PER_SECTOR: usize = 64;
pub const SLOTS_PER_STAGE: usize = SECTORS_PER_STAGE * SLOTS_PER_SECTOR;
pub const SLOTS_PER_SIDE: usize = 256;
pub const EMPTY_LEADER: u8 = 255;

pub const STAGE_FIELDS: [FieldDef; 21] = [
    FieldDef::new("x", "Spawn Position X", 0, FieldWidth::U16),
    FieldDef::new("y", "Spawn Position Y", 2, FieldWidth::U16),
    FieldDef::new("direction", "Spawn Direction", 4, FieldWidth::U8),
    FieldDef::new("pathing", "Pathing", 5, FieldWidth::U8),
    FieldDef::new("gate_behavior", "Gate Behavior (Respawn/Retreat)", 6, FieldWidth::U8),
    FieldDef::new("life", "Life Stat", 8, FieldWidth::U16),
    FieldDef::new("leader_unit", "Leader Unit", 10, FieldWidth::U8),
    FieldDef::new("guard_unit", "Guard Units", 11, FieldWidth::U8),
    FieldDef::new("attack", "Attack Stat", 12, FieldWidth::U8),
    FieldDef::new("defense", "Defense Stat", 13, FieldWidth::U8),
    FieldDef::new("guard_count", "Amount of guards (9 is max)", 14, FieldWidth::U8),
    FieldDef::new("unit_slot", "Unit slot that unit belongs to", 15, FieldWidth::U8),
    FieldDef::new("unit_type", "Unit Type", 16, FieldWidth::U8),
    FieldDef::new("ai_type", "AI Type/Kind (4=horse, 2=bowman)", 17, FieldWidth::U8),
    FieldDef::new(
        "orders",
        "Orders (1=Attack enemy target, 3=Follow ally target)",
        18,
        FieldWidth::U8,
    ),
    FieldDef::new("hidden", "Hide Unit", 19, FieldWidth::U8),
    FieldDef::new("order_target", "Order Target Slot", 21, FieldWidth::U8),
    FieldDef::new("item_dropped", "Item Dropped", 22, FieldWidth::U8),
    FieldDef::new("ai_level", "AI Level", 23, FieldWidth::U8),
    FieldDef::new("delay_order", "Delay Order", 24, FieldWidth::U16),
    FieldDef::new("ko_points", "Points For K.O.", 26, FieldWidth::U16),
];

const X_FIELD: usize = 0;
const Y_FIELD: usize = 1;
const LEADER_FIELD: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    YellowTurbans,
    HuLaoGate,
    GuanDu,
    ChangBan,
    ChiBi,
    HeFei,
    YiLing,
    WuZhangPlains,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::YellowTurbans,
        Stage::HuLaoGate,
        Stage::GuanDu,
        Stage::ChangBan,
        Stage::ChiBi,
        Stage::HeFei,
        Stage::YiLing,
        Stage::WuZhangPlains,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::YellowTurbans => "YTR",
            Self::HuLaoGate => "HLG",
            Self::GuanDu => "GD",
            Self::ChangBan => "CBan",
            Self::ChiBi => "CBi",
            Self::HeFei => "HF",
            Self::YiLing => "YL",
            Self::WuZhangPlains => "WZP",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::YellowTurbans => "Yellow Turban Rebellion",
            Self::HuLaoGate => "Hu Lao Gate",
            Self::GuanDu => "Guan Du",
            Self::ChangBan => "Chang Ban",
            Self::ChiBi => "Chi Bi",
            Self::HeFei => "He Fei",
            Self::YiLing => "Yi Ling",
            Self::WuZhangPlains => "Wu Zhang Plains",
        }
    }

    /// Identifier used in backup names, e.g. `YTR_Stage`.
    pub fn id(self) -> String {
        format!("{}_Stage", self.code())
    }

    pub fn mod_extension(self) -> String {
        format!(".DW2{}", self.code())
    }

    pub fn backup_name(self) -> String {
        format!("{}_Original.stage", self.id())
    }

    pub fn from_id(value: &str) -> Option<Self> {
        let code = value
            .strip_suffix("_Stage")
            .or_else(|| value.strip_suffix("_stage"))
            .unwrap_or(value);
        Self::ALL
            .into_iter()
            .find(|s| s.code().eq_ignore_ascii_case(code))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

impl FromStr for Stage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_id(s).ok_or_else(|| {
            let known = Self::ALL.iter().map(|s| s.code()).collect::<Vec<_>>().join(", ");
            CoreError::new(
                CoreErrorCode::InvalidValue,
                format!("unknown stage '{s}', expected one of: {known}"),
            )
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub fn from_number(n: u8) -> Result<Self> {
        match n {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(CoreError::new(
                CoreErrorCode::InvalidValue,
                format!("invalid side {other}, expected 1 or 2"),
            )),
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

/// Convert a per-side slot (0-255) to the stage-wide slot index (0-511).
pub fn global_slot(side: Side, slot_in_side: usize) -> Result<usize> {
    if slot_in_side >= SLOTS_PER_SIDE {
        return Err(CoreError::slot_out_of_range(
            "side",
            slot_in_side,
            SLOTS_PER_SIDE,
        ));
    }
    let offset = match side {
        Side::One => 0,
        Side::Two => SLOTS_PER_SIDE,
    };
    Ok(offset + slot_in_side)
}

pub fn side_of(slot: usize) -> (Side, usize) {
    if slot < SLOTS_PER_SIDE {
        (Side::One, slot)
    } else {
        (Side::Two, slot - SLOTS_PER_SIDE)
    }
}

/// Stage region for eight sector bases of 64 slots each.
pub fn stage_region(sector_bases: &[u64]) -> Result<RegionLayout> {
    if sector_bases.len() != SECTORS_PER_STAGE {
        return Err(CoreError::new(
            CoreErrorCode::Config,
            format!(
                "a stage needs {SECTORS_PER_STAGE} sector offsets, got {}",
                sector_bases.len()
            ),
        ));
    }
    let region = RegionLayout::uniform(SLOT_SIZE, sector_bases, SLOTS_PER_SECTOR);
    region.validate()?;
    Ok(region)
}

/// One 32-byte stage slot. Bytes not covered by `STAGE_FIELDS` are carried
/// through edits untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSlot {
    bytes: [u8; SLOT_SIZE],
}

impl StageSlot {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; SLOT_SIZE] = bytes.try_into().map_err(|_| {
            CoreError::new(
                CoreErrorCode::InvalidValue,
                format!("stage slot is {} bytes, expected {SLOT_SIZE}", bytes.len()),
            )
        })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; SLOT_SIZE] {
        &self.bytes
    }

    pub fn fields(&self) -> Vec<FieldValue> {
        field_values(&STAGE_FIELDS, &self.bytes)
    }

    pub fn get(&self, key: &str) -> Result<u32> {
        Ok(find_field(&STAGE_FIELDS, key)?.read(&self.bytes))
    }

    pub fn set(&mut self, key: &str, value: u32) -> Result<()> {
        find_field(&STAGE_FIELDS, key)?.write(&mut self.bytes, value)
    }

    pub fn x(&self) -> u16 {
        STAGE_FIELDS[X_FIELD].read(&self.bytes) as u16
    }

    pub fn y(&self) -> u16 {
        STAGE_FIELDS[Y_FIELD].read(&self.bytes) as u16
    }

    pub fn leader_unit(&self) -> u8 {
        STAGE_FIELDS[LEADER_FIELD].read(&self.bytes) as u8
    }

    pub fn is_occupied(&self) -> bool {
        self.leader_unit() != EMPTY_LEADER
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coordinate {
    pub slot: usize,
    pub x: u16,
    pub y: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageCoordinates {
    pub side_one: Vec<Coordinate>,
    pub side_two: Vec<Coordinate>,
}

impl StageCoordinates {
    pub fn len(&self) -> usize {
        self.side_one.len() + self.side_two.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub struct StageEditor {
    image: BinImage,
    buffers: Vec<StagingBuffer>,
}

impl StageEditor {
    /// Stage all eight stages from the binary and write any missing
    /// `<stage>_Original.stage` backups.
    pub fn open(image: &BinImage, stages: &[RegionLayout], backups: &BackupStore) -> Result<Self> {
        if stages.len() != Stage::ALL.len() {
            return Err(CoreError::new(
                CoreErrorCode::Config,
                format!(
                    "stage offsets are not configured for all {} stages (got {})",
                    Stage::ALL.len(),
                    stages.len()
                ),
            ));
        }

        let mut buffers = Vec::with_capacity(stages.len());
        for (stage, region) in Stage::ALL.into_iter().zip(stages) {
            check_stage_region(stage, region)?;
            let buffer = StagingBuffer::load(image, region).map_err(|e| {
                CoreError::new(e.code, format!("reading stage '{stage}': {}", e.message))
            })?;
            backups.ensure(&stage.backup_name(), &buffer.to_exported()?)?;
            buffers.push(buffer);
        }

        Ok(Self {
            image: image.clone(),
            buffers,
        })
    }

    pub fn buffer(&self, stage: Stage) -> &StagingBuffer {
        &self.buffers[stage.index()]
    }

    pub fn slot(&self, stage: Stage, slot: usize) -> Result<StageSlot> {
        check_slot(slot)?;
        StageSlot::from_bytes(self.buffer(stage).record(slot)?)
    }

    pub fn set_slot(&mut self, stage: Stage, slot: usize, value: &StageSlot) -> Result<()> {
        check_slot(slot)?;
        self.buffers[stage.index()].replace_record(slot, value.as_bytes())
    }

    pub fn set_field(&mut self, stage: Stage, slot: usize, key: &str, value: u32) -> Result<()> {
        let mut current = self.slot(stage, slot)?;
        current.set(key, value)?;
        self.set_slot(stage, slot, &current)
    }

    pub fn export_bytes(&self, stage: Stage) -> Result<Vec<u8>> {
        self.buffer(stage).to_exported()
    }

    /// Write the staged stage as `<name><extension>` in `dir`. An empty name
    /// falls back to the stage id.
    pub fn export_mod(&self, stage: Stage, requested_name: &str, dir: &Path) -> Result<PathBuf> {
        let file_name = mod_file_name(requested_name, &stage.id(), &stage.mod_extension());
        let path = dir.join(file_name);
        write_mod_file(&path, &self.export_bytes(stage)?)?;
        Ok(path)
    }

    pub fn commit(&mut self, stage: Stage) -> Result<()> {
        self.buffers[stage.index()].commit(&self.image)?;
        info!("committed stage '{stage}' to {}", self.image.path().display());
        Ok(())
    }

    /// Spawn positions of every slot whose leader unit is set, split by side.
    pub fn occupied_coordinates(&self, stage: Stage) -> Result<StageCoordinates> {
        let mut out = StageCoordinates::default();
        for slot in 0..SLOTS_PER_STAGE {
            let record = self.slot(stage, slot)?;
            if !record.is_occupied() {
                continue;
            }
            let coordinate = Coordinate {
                slot,
                x: record.x(),
                y: record.y(),
            };
            match side_of(slot).0 {
                Side::One => out.side_one.push(coordinate),
                Side::Two => out.side_two.push(coordinate),
            }
        }
        Ok(out)
    }
}

fn check_slot(slot: usize) -> Result<()> {
    if slot >= SLOTS_PER_STAGE {
        return Err(CoreError::slot_out_of_range("stage", slot, SLOTS_PER_STAGE));
    }
    Ok(())
}

fn check_stage_region(stage: Stage, region: &RegionLayout) -> Result<()> {
    let well_formed = region.record_size == SLOT_SIZE
        && region.segments.len() == SECTORS_PER_STAGE
        && region.segments.iter().all(|s| s.records == SLOTS_PER_SECTOR);
    if !well_formed {
        return Err(CoreError::new(
            CoreErrorCode::Config,
            format!(
                "stage '{stage}' must be {SECTORS_PER_STAGE} sectors of {SLOTS_PER_SECTOR} slots of {SLOT_SIZE} bytes"
            ),
        ));
    }
    Ok(())
}
