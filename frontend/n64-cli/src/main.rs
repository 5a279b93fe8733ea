mod config;
mod host;
mod storage;

use crate::host::{ConsoleHost, RomSink};
use crate::storage::{FsResources, FsSaveStorage};
use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use n64_config::{AutoDetect, CicType, N64Options, PadType, SaveType, SystemRegion};
use n64_core::{LoadContext, LoadReport, N64CartLoader, RomSource, SaveMemory};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

const OVERRIDE_OPTIONS_HEADING: &str = "Option Overrides";

#[derive(Parser)]
struct Args {
    /// ROM file path
    #[arg(short = 'f', long)]
    file_path: String,

    /// Host file index; an index whose low 6 bits are 2 is streamed as a Game Boy cartridge
    #[arg(long, default_value_t = 1)]
    file_index: u8,

    /// Directory for save files, defaults to the ROM's directory
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Directory containing N64-database.txt and N64-database_user.txt
    #[arg(long, default_value = ".")]
    database_dir: PathBuf,

    /// Options file, created if it does not exist
    #[arg(short = 'c', long, default_value = config::DEFAULT_CONFIG_PATH)]
    config_path: PathBuf,

    /// Do not write options back to the options file after loading
    #[arg(long, default_value_t)]
    no_save_config: bool,

    /// Write the normalized (big-endian) ROM image to this path
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Block size used when printing the save memory layout
    #[arg(long, default_value_t = 512)]
    block_size: u64,

    /// Auto-detect cartridge properties (On / Off)
    #[arg(long, help_heading = OVERRIDE_OPTIONS_HEADING)]
    auto_detect: Option<AutoDetect>,

    /// System region (Ntsc / Pal)
    #[arg(long, help_heading = OVERRIDE_OPTIONS_HEADING)]
    region: Option<SystemRegion>,

    /// Boot chip
    #[arg(long, help_heading = OVERRIDE_OPTIONS_HEADING)]
    cic: Option<CicType>,

    /// Save type
    #[arg(long, help_heading = OVERRIDE_OPTIONS_HEADING)]
    save_type: Option<SaveType>,

    /// Controller 1 mode
    #[arg(long, help_heading = OVERRIDE_OPTIONS_HEADING)]
    controller_1: Option<PadType>,

    /// Enable Controller Paks
    #[arg(long, help_heading = OVERRIDE_OPTIONS_HEADING)]
    controller_pak: Option<bool>,

    /// Enable the Transfer Pak
    #[arg(long, help_heading = OVERRIDE_OPTIONS_HEADING)]
    transfer_pak: Option<bool>,
}

impl Args {
    fn apply_overrides(&self, options: &mut N64Options) {
        if let Some(auto_detect) = self.auto_detect {
            options.auto_detect = auto_detect;
        }
        if let Some(region) = self.region {
            options.system_region = region;
        }
        if let Some(cic) = self.cic {
            options.cic_type = cic;
        }
        if let Some(save_type) = self.save_type {
            options.save_type = save_type;
        }
        if let Some(pad) = self.controller_1 {
            options.controllers[0] = pad;
        }
        if let Some(controller_pak) = self.controller_pak {
            options.controller_pak = controller_pak;
        }
        if let Some(transfer_pak) = self.transfer_pak {
            options.transfer_pak = transfer_pak;
        }
    }

    fn save_dir(&self) -> PathBuf {
        self.save_dir.clone().unwrap_or_else(|| {
            Path::new(&self.file_path)
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        })
    }
}

fn print_report(report: &LoadReport) {
    let identity = &report.identity;
    println!("Byte order: {:?}", report.byte_order);
    println!(
        "Cart ID: {}",
        identity.header.cart_id.as_ref().map_or("(none)", |cart_id| cart_id.as_str())
    );
    println!("Header MD5: {}", n64_common::digest::to_hex(&identity.header_hash));
    println!("File MD5: {}", n64_common::digest::to_hex(&identity.content_hash));
    println!("CRC32: {:08X} ({} bytes)", report.crc32, report.rom_len);
    println!("Detection outcome: {:#04b}", report.detection.outcome.bits());
    if let Some(source) = report.detection.source {
        println!("Metadata from: {source}");
    }
}

fn print_layout<F>(save_memory: &SaveMemory<F>, block_size: u64) {
    if save_memory.regions().is_empty() {
        println!("No save memory mounted");
        return;
    }

    println!("Slot  LBA range          Kind                 File");
    for (slot, (range, region)) in save_memory.layout().enumerate() {
        let lba_range = format!("{}..{}", range.start / block_size, range.end.div_ceil(block_size));
        let file = if region.is_backed() {
            region.file_name().to_string()
        } else {
            format!("{} (unavailable)", region.file_name())
        };
        println!("{slot:<5} {lba_range:<18} {:<20} {file}", region.kind().to_string());
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut options = config::load_options(&args.config_path);
    args.apply_overrides(&mut options);

    let rom_file = File::open(&args.file_path)
        .with_context(|| format!("Unable to open ROM file '{}'", args.file_path))?;

    let mut loader: N64CartLoader<FsSaveStorage> =
        N64CartLoader::new(FsSaveStorage::new(args.save_dir()));
    let mut sink = RomSink::new(args.output.as_deref())?;

    let source = RomSource {
        name: &args.file_path,
        reader: BufReader::new(rom_file),
        index: args.file_index,
    };

    if source.is_passthrough() {
        let len = loader.load_passthrough(source, &mut sink)?;
        println!("Streamed {len} bytes without N64 processing");
    } else {
        let mut resources = FsResources::new(&args.database_dir);
        let report = loader.load_rom(
            source,
            LoadContext {
                options: &mut options,
                resources: &mut resources,
                transport: &mut sink,
                host: &mut ConsoleHost,
            },
        )?;

        print_report(&report);
        print_layout(loader.save_memory(), args.block_size);
    }

    log::info!("Transport received {} bytes", sink.bytes_received());
    sink.finish().context("Error writing normalized ROM")?;

    if !args.no_save_config {
        config::save_options(&args.config_path, &options)?;
    }

    Ok(())
}
