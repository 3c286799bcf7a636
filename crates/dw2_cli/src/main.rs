use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgGroup, Args, Parser, Subcommand};
use dw2_core::bodyguard::{self, BodyguardEditor};
use dw2_core::config::{Config, parse_offset};
use dw2_core::image::BinImage;
use dw2_core::item::{self, ItemEditor};
use dw2_core::layout::Layout;
use dw2_core::mods::ModManager;
use dw2_core::names::NameTable;
use dw2_core::record::{FieldDef, check_field};
use dw2_core::stage::{self, Side, Stage, StageEditor};
use dw2_core::unit::{self, UnitEditor};
use dw2_core::{CoreError, CoreErrorCode, Result};
use dw2_render::{JsonStyle, Pairs};
use log::debug;
use serde_json::Value as JsonValue;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// JSON file with the binary path, backup directory and region offsets.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long = "bin", global = true, value_name = "DW2.bin")]
    bin: Option<PathBuf>,
    #[arg(long = "backup-dir", global = true, value_name = "DIR")]
    backup_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Stage unit slots (spawns, stats, orders).
    Stage {
        #[command(subcommand)]
        action: StageCommand,
    },
    /// Unit model, color, motion and horse slots.
    Unit {
        #[command(subcommand)]
        action: UnitCommand,
    },
    /// Item values, written straight to the binary.
    Item {
        #[command(subcommand)]
        action: ItemCommand,
    },
    /// Officer name strings, written straight to the binary.
    Name {
        #[command(subcommand)]
        action: NameCommand,
    },
    /// Bodyguard rank progression and the formation-follow patch.
    Guard {
        #[command(subcommand)]
        action: GuardCommand,
    },
    /// Apply exported mods or restore from backups.
    Mod {
        #[command(subcommand)]
        action: ModCommand,
    },
}

#[derive(Debug, Args)]
struct StageSlotArgs {
    #[arg(long, value_parser = parse_stage)]
    stage: Stage,
    /// 0-511, or 0-255 when --side is given.
    #[arg(long)]
    slot: usize,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
    side: Option<u8>,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("write_target").required(true).multiple(true).args(["export", "commit"])))]
struct WriteTarget {
    /// Write a mod file named after the text before the first '.'.
    #[arg(long, value_name = "NAME")]
    export: Option<String>,
    /// Directory for the exported mod file.
    #[arg(long = "out-dir", value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,
    /// Write the edited region back into the binary.
    #[arg(long)]
    commit: bool,
}

#[derive(Debug, Subcommand)]
enum StageCommand {
    Show {
        #[command(flatten)]
        slot: StageSlotArgs,
    },
    Set {
        #[command(flatten)]
        slot: StageSlotArgs,
        #[arg(long = "field", value_name = "KEY=VALUE", required = true, value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
        #[command(flatten)]
        target: WriteTarget,
    },
    /// Spawn positions of every occupied slot, split by side.
    Coords {
        #[arg(long, value_parser = parse_stage)]
        stage: Stage,
    },
    Export {
        #[arg(long, value_parser = parse_stage)]
        stage: Stage,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long = "out-dir", value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum UnitCommand {
    Show {
        /// Decimal or 0x-prefixed hex.
        #[arg(long, value_parser = parse_unit_slot)]
        slot: usize,
    },
    Set {
        #[arg(long, value_parser = parse_unit_slot)]
        slot: usize,
        #[arg(long = "field", value_name = "KEY=VALUE", required = true, value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
        #[command(flatten)]
        target: WriteTarget,
    },
    Export {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long = "out-dir", value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum ItemCommand {
    Show,
    Set {
        #[arg(long = "field", value_name = "KEY=VALUE", required = true, value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
    },
}

#[derive(Debug, Subcommand)]
enum NameCommand {
    /// Show one slot, or every slot when --slot is omitted.
    Show {
        #[arg(long)]
        slot: Option<usize>,
    },
    Set {
        #[arg(long)]
        slot: usize,
        #[arg(long)]
        name: String,
    },
}

#[derive(Debug, Subcommand)]
enum GuardCommand {
    Show,
    Set {
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        tier: u8,
        #[arg(long = "field", value_name = "KEY=HEX", required = true, value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
    },
    /// Make player bodyguards follow in formation.
    Follow,
}

#[derive(Debug, Subcommand)]
enum ModCommand {
    EnableStage { path: PathBuf },
    /// Restore a stage from a backup file such as `YTR_Stage_Original.stage`.
    DisableStage { path: PathBuf },
    /// Restore a stage from the backup directory.
    RestoreStage {
        #[arg(long, value_parser = parse_stage)]
        stage: Stage,
    },
    EnableUnit { path: PathBuf },
    DisableUnit,
}

/// Resolved configuration for one invocation.
struct Context {
    config: Config,
    layout: Layout,
    json: bool,
}

impl Context {
    fn image(&self) -> BinImage {
        self.config.image()
    }

    fn emit(&self, json: JsonValue, pairs: Pairs) -> Result<()> {
        if self.json {
            let rendered = serde_json::to_string_pretty(&json).map_err(|e| {
                CoreError::new(
                    CoreErrorCode::InvalidValue,
                    format!("rendering JSON output: {e}"),
                )
            })?;
            println!("{rendered}");
        } else {
            print!("{}", dw2_render::render_pairs(&pairs));
        }
        Ok(())
    }

    fn status(&self, message: impl std::fmt::Display) {
        if !self.json {
            println!("{message}");
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(bin) = cli.bin {
        config.bin_path = bin;
    }
    if let Some(dir) = cli.backup_dir {
        config.backup_dir = dir;
    }
    debug!(
        "using binary {} and backups in {}",
        config.bin_path.display(),
        config.backup_dir.display()
    );

    let layout = config.layout()?;
    let ctx = Context {
        config,
        layout,
        json: cli.json,
    };

    match cli.command {
        Command::Stage { action } => run_stage(&ctx, action),
        Command::Unit { action } => run_unit(&ctx, action),
        Command::Item { action } => run_item(&ctx, action),
        Command::Name { action } => run_name(&ctx, action),
        Command::Guard { action } => run_guard(&ctx, action),
        Command::Mod { action } => run_mod(&ctx, action),
    }
}

fn run_stage(ctx: &Context, action: StageCommand) -> Result<()> {
    let open = || StageEditor::open(&ctx.image(), &ctx.layout.stages, &ctx.config.backups());

    match action {
        StageCommand::Show { slot } => {
            let index = resolve_stage_slot(&slot)?;
            show_stage_slot(ctx, &open()?, slot.stage, index)
        }
        StageCommand::Set {
            slot,
            fields,
            target,
        } => {
            let index = resolve_stage_slot(&slot)?;
            let edits = parse_edits(&stage::STAGE_FIELDS, &fields)?;
            let mut editor = open()?;
            for (key, value) in &edits {
                editor.set_field(slot.stage, index, key, *value)?;
            }
            show_stage_slot(ctx, &editor, slot.stage, index)?;
            if let Some(name) = &target.export {
                let path = editor.export_mod(slot.stage, name, &target.out_dir)?;
                ctx.status(format!("Wrote mod file {}", path.display()));
            }
            if target.commit {
                editor.commit(slot.stage)?;
                ctx.status(format!("Committed {} to {}", slot.stage, ctx.config.bin_path.display()));
            }
            Ok(())
        }
        StageCommand::Coords { stage } => {
            let coords = open()?.occupied_coordinates(stage)?;
            ctx.emit(
                dw2_render::render_coordinates_json(stage, &coords, JsonStyle::CanonicalV1),
                dw2_render::coordinate_pairs(&coords),
            )
        }
        StageCommand::Export {
            stage,
            name,
            out_dir,
        } => {
            let path = open()?.export_mod(stage, &name, &out_dir)?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn show_stage_slot(ctx: &Context, editor: &StageEditor, stage: Stage, index: usize) -> Result<()> {
    let record = editor.slot(stage, index)?;
    ctx.emit(
        dw2_render::render_stage_slot_json(stage, index, &record, JsonStyle::CanonicalV1),
        dw2_render::stage_slot_pairs(stage, index, &record),
    )
}

/// Stage-wide slot index, checked before the binary is touched.
fn resolve_stage_slot(args: &StageSlotArgs) -> Result<usize> {
    let index = match args.side {
        Some(side) => stage::global_slot(Side::from_number(side)?, args.slot)?,
        None => args.slot,
    };
    if index >= stage::SLOTS_PER_STAGE {
        return Err(CoreError::slot_out_of_range(
            "stage",
            index,
            stage::SLOTS_PER_STAGE,
        ));
    }
    Ok(index)
}

fn run_unit(ctx: &Context, action: UnitCommand) -> Result<()> {
    let region = ctx.layout.units()?;
    let slot = match &action {
        UnitCommand::Show { slot } | UnitCommand::Set { slot, .. } => Some(*slot),
        UnitCommand::Export { .. } => None,
    };
    if let Some(slot) = slot.filter(|&s| s >= unit::SLOT_COUNT) {
        return Err(CoreError::slot_out_of_range("unit", slot, unit::SLOT_COUNT));
    }
    let edits = match &action {
        UnitCommand::Set { fields, .. } => parse_edits(&unit::UNIT_FIELDS, fields)?,
        _ => Vec::new(),
    };
    let mut editor = UnitEditor::open(&ctx.image(), region, &ctx.config.backups())?;

    match action {
        UnitCommand::Show { slot } => show_unit_slot(ctx, &editor, slot),
        UnitCommand::Set { slot, target, .. } => {
            for (key, value) in &edits {
                editor.set_field(slot, key, *value)?;
            }
            show_unit_slot(ctx, &editor, slot)?;
            if let Some(name) = &target.export {
                let path = editor.export_mod(name, &target.out_dir)?;
                ctx.status(format!("Wrote mod file {}", path.display()));
            }
            if target.commit {
                editor.commit()?;
                ctx.status(format!("Committed unit data to {}", ctx.config.bin_path.display()));
            }
            Ok(())
        }
        UnitCommand::Export { name, out_dir } => {
            let path = editor.export_mod(&name, &out_dir)?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn show_unit_slot(ctx: &Context, editor: &UnitEditor, slot: usize) -> Result<()> {
    let record = editor.slot(slot)?;
    let offset = editor.slot_offset(slot)?;
    ctx.emit(
        dw2_render::render_unit_slot_json(slot, offset, &record, JsonStyle::CanonicalV1),
        dw2_render::unit_slot_pairs(slot, offset, &record),
    )
}

fn run_item(ctx: &Context, action: ItemCommand) -> Result<()> {
    let base = ctx.layout.items()?;
    let edits = match &action {
        ItemCommand::Set { fields } => fields
            .iter()
            .map(|(key, value)| {
                item::item_index(key)?;
                Ok((key.clone(), parse_field_value(key, value)?))
            })
            .collect::<Result<Vec<_>>>()?,
        ItemCommand::Show => Vec::new(),
    };
    let mut editor = ItemEditor::open(&ctx.image(), base)?;

    if !edits.is_empty() {
        for (key, value) in &edits {
            editor.set_value(key, *value)?;
        }
        editor.commit()?;
    }
    ctx.emit(
        dw2_render::render_items_json(editor.entries(), JsonStyle::CanonicalV1),
        dw2_render::item_pairs(editor.entries()),
    )
}

fn run_name(ctx: &Context, action: NameCommand) -> Result<()> {
    let image = ctx.image();
    let table = NameTable::new(&image, &ctx.layout.names);
    if let NameCommand::Show { slot: Some(slot) } | NameCommand::Set { slot, .. } = &action {
        table.resolve(*slot)?;
    }
    if !image.exists() {
        return Err(missing_binary(image.path()));
    }

    let entries = match action {
        NameCommand::Show { slot: Some(slot) } => vec![table.read_name(slot)?],
        NameCommand::Show { slot: None } => table.read_all()?,
        NameCommand::Set { slot, name } => vec![table.write_name(slot, &name)?],
    };
    ctx.emit(
        dw2_render::render_names_json(&entries, JsonStyle::CanonicalV1),
        dw2_render::name_pairs(&entries),
    )
}

fn run_guard(ctx: &Context, action: GuardCommand) -> Result<()> {
    let edits = match &action {
        GuardCommand::Set { fields, .. } => fields
            .iter()
            .map(|(key, value)| {
                let value = bodyguard::parse_hex_byte(value)?;
                check_field(&bodyguard::TIER_FIELDS, key, value as u32)?;
                Ok((key.clone(), value))
            })
            .collect::<Result<Vec<_>>>()?,
        _ => Vec::new(),
    };
    let mut editor = BodyguardEditor::open(
        &ctx.image(),
        ctx.layout.bodyguard,
        ctx.layout.formation_follow,
    )?;

    match action {
        GuardCommand::Show => {}
        GuardCommand::Set { tier, .. } => {
            for (key, value) in &edits {
                editor.set_field(tier as usize, key, *value)?;
            }
            editor.commit()?;
        }
        GuardCommand::Follow => editor.apply_formation_follow()?,
    }

    let tiers = editor.tiers();
    let follow = editor.formation_follow_enabled()?;
    ctx.emit(
        dw2_render::render_guard_json(&tiers, follow, JsonStyle::CanonicalV1),
        dw2_render::guard_pairs(&tiers, follow),
    )
}

fn run_mod(ctx: &Context, action: ModCommand) -> Result<()> {
    let image = ctx.image();
    if !image.exists() {
        return Err(missing_binary(image.path()));
    }
    let manager = ModManager::new(&image, &ctx.layout, &ctx.config.backups());

    match action {
        ModCommand::EnableStage { path } => {
            let stage = manager.enable_stage_mod(&path)?;
            ctx.status(format!("Enabled {} mod {}", stage.title(), path.display()));
        }
        ModCommand::DisableStage { path } => {
            let stage = manager.disable_stage_mod(&path)?;
            ctx.status(format!("Restored {} from {}", stage.title(), path.display()));
        }
        ModCommand::RestoreStage { stage } => {
            manager.restore_stage(stage)?;
            ctx.status(format!("Restored {} from backup", stage.title()));
        }
        ModCommand::EnableUnit { path } => {
            manager.enable_unit_mod(&path)?;
            ctx.status(format!("Enabled unit mod {}", path.display()));
        }
        ModCommand::DisableUnit => {
            manager.disable_unit_mods()?;
            ctx.status(format!(
                "Restored unit data from {}",
                ctx.config.backups().path_for(unit::BACKUP_NAME).display()
            ));
        }
    }
    Ok(())
}

fn missing_binary(path: &Path) -> CoreError {
    CoreError::new(
        CoreErrorCode::Io,
        format!("DW2.bin not found: {}", path.display()),
    )
}

fn parse_stage(value: &str) -> std::result::Result<Stage, String> {
    value.parse::<Stage>().map_err(|e| e.message)
}

fn parse_unit_slot(value: &str) -> std::result::Result<usize, String> {
    unit::parse_slot(value).map_err(|e| e.message)
}

fn parse_assignment(value: &str) -> std::result::Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, v)) if !key.trim().is_empty() && !v.trim().is_empty() => {
            Ok((key.trim().to_string(), v.trim().to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{value}'")),
    }
}

/// Parse `--field` edits and check them against `defs` before the binary is opened.
fn parse_edits(defs: &[FieldDef], fields: &[(String, String)]) -> Result<Vec<(String, u32)>> {
    fields
        .iter()
        .map(|(key, value)| {
            let value = parse_field_value(key, value)?;
            check_field(defs, key, value)?;
            Ok((key.clone(), value))
        })
        .collect()
}

/// Decimal or `0x` hex, limited to 32 bits; the field table enforces its own width.
fn parse_field_value(key: &str, value: &str) -> Result<u32> {
    parse_offset(value)
        .ok()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| {
            CoreError::new(
                CoreErrorCode::InvalidValue,
                format!("invalid value '{value}' for field '{key}'"),
            )
        })
}
