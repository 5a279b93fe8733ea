//! Save memory exposed to the hardware as a single logical block device
//!
//! Every mounted save chip or controller-slot pak is one region backed by its own file. Regions
//! are laid out back to back in mount order, so a block address maps to exactly one region (or
//! past the end of all of them).

pub mod cpak;


use crate::rom::ByteOrder;
use n64_common::frontend::{BlockTransport, SaveFile, SaveStorage};
use n64_config::{OptionKey, OptionStore, SaveType};
use std::fmt::{Debug, Display, Formatter};
use std::ops::Range;
use thiserror::Error;

/// Controller Pak and Transfer Pak regions are both 32KB
pub const PAK_SIZE: usize = 0x8000;

/// Number of controller-slot pak regions mounted when controller paks are enabled
pub const MAX_PAKS: usize = 4;

const LEGACY_EXTENSION: &str = ".sav";

// Paks are stored with every 32-bit word reversed relative to what the hardware sees
const PAK_FILE_ORDER: ByteOrder = ByteOrder::LittleEndian;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    Save(SaveType),
    ControllerPak,
    TransferPak,
}

impl MemoryKind {
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            Self::Save(save_type) => save_type.size(),
            Self::ControllerPak | Self::TransferPak => PAK_SIZE,
        }
    }

    #[must_use]
    pub fn is_pak(self) -> bool {
        matches!(self, Self::ControllerPak | Self::TransferPak)
    }

    /// Suffix appended to the ROM's base name; `pak_number` is the 1-based pak slot.
    fn file_suffix(self, pak_number: usize) -> String {
        match self {
            Self::Save(SaveType::Eeprom512 | SaveType::Eeprom2k) => ".eep".into(),
            Self::Save(SaveType::Sram32k | SaveType::Sram96k) => ".sra".into(),
            Self::Save(SaveType::Flash128k) => ".fla".into(),
            Self::Save(SaveType::None) => String::new(),
            Self::ControllerPak => format!("_{pak_number}.cpk"),
            Self::TransferPak => format!("_{pak_number}.tpk"),
        }
    }
}

impl Display for MemoryKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Save(save_type) => write!(f, "{save_type}"),
            Self::ControllerPak => write!(f, "Controller Pak"),
            Self::TransferPak => write!(f, "Transfer Pak"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MountError<E> {
    #[error("Error creating save file '{file_name}': {err}")]
    Create { file_name: String, err: E },
    #[error("Error opening save file '{file_name}': {err}")]
    Open { file_name: String, created: bool, err: E },
}

impl<E> MountError<E> {
    /// Whether a new backing file was written before the error occurred.
    #[must_use]
    pub fn created(&self) -> bool {
        match self {
            Self::Create { .. } => false,
            Self::Open { created, .. } => *created,
        }
    }
}

/// ROM file name without directories or extension.
fn rom_base_name(rom_name: &str) -> &str {
    let file_name = rom_name.rsplit('/').next().unwrap_or(rom_name);
    file_name.rfind('.').map_or(file_name, |dot| &file_name[..dot])
}

#[must_use]
pub fn save_file_name(rom_name: &str, kind: MemoryKind, pak_number: usize) -> String {
    format!("{}{}", rom_base_name(rom_name), kind.file_suffix(pak_number))
}

#[must_use]
pub fn legacy_save_file_name(rom_name: &str) -> String {
    format!("{}{LEGACY_EXTENSION}", rom_base_name(rom_name))
}

pub struct MemoryRegion<F> {
    kind: MemoryKind,
    file_name: String,
    /// `None` if the backing file could not be created or opened; the region still occupies its
    /// address range, but reads return zeros and writes are dropped
    file: Option<F>,
}

impl<F> MemoryRegion<F> {
    #[must_use]
    pub fn kind(&self) -> MemoryKind {
        self.kind
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.kind.size() as u64
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    #[must_use]
    pub fn is_backed(&self) -> bool {
        self.file.is_some()
    }
}

/// Find the region containing byte `offset`, given region sizes in slot order.
///
/// Returns the region's slot index and the offset within that region.
#[must_use]
pub fn locate_region(sizes: impl IntoIterator<Item = u64>, offset: u64) -> Option<(usize, u64)> {
    let mut start = 0;
    for (slot, size) in sizes.into_iter().enumerate() {
        if offset < start + size {
            return Some((slot, offset - start));
        }
        start += size;
    }

    None
}

/// A block-granular save memory request from the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRequest {
    pub lba: u64,
    pub block_size: u32,
    /// Transfer length in bytes
    pub len: usize,
    pub ack: u32,
}

impl BlockRequest {
    #[must_use]
    pub fn byte_offset(&self) -> u64 {
        self.lba * u64::from(self.block_size)
    }
}

pub struct SaveMemory<F> {
    regions: Vec<MemoryRegion<F>>,
}

impl<F> Default for SaveMemory<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> SaveMemory<F> {
    #[must_use]
    pub fn new() -> Self {
        Self { regions: Vec::with_capacity(1 + MAX_PAKS) }
    }

    /// Mounted regions in slot order
    #[must_use]
    pub fn regions(&self) -> &[MemoryRegion<F>] {
        &self.regions
    }

    /// Byte range of every region within the address space, in slot order
    pub fn layout(&self) -> impl Iterator<Item = (Range<u64>, &MemoryRegion<F>)> {
        self.regions.iter().scan(0, |start, region| {
            let range = *start..*start + region.size();
            *start = range.end;
            Some((range, region))
        })
    }

    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.regions.iter().map(MemoryRegion::size).sum()
    }

    /// Close every backing file and forget all regions.
    pub fn unmount_all(&mut self) {
        if !self.regions.is_empty() {
            log::debug!("Unmounting {} save regions", self.regions.len());
        }
        self.regions.clear();
    }

    fn pak_count(&self) -> usize {
        self.regions.iter().filter(|region| region.kind.is_pak()).count()
    }

    fn locate(&self, offset: u64) -> Option<(usize, u64)> {
        locate_region(self.regions.iter().map(MemoryRegion::size), offset)
    }
}

impl<F: SaveFile> SaveMemory<F> {
    /// Mount the regions the options call for: the save chip, then either a Transfer Pak or a
    /// Controller Pak in the first pak slot, then 3 more Controller Paks.
    ///
    /// Returns true if any backing file was newly created. Failing to mount one region is logged
    /// and does not stop the others from mounting.
    pub fn mount_all<S, O>(&mut self, storage: &mut S, rom_name: &str, options: &O) -> bool
    where
        S: SaveStorage<File = F, Err = F::Err>,
        O: OptionStore + ?Sized,
    {
        self.unmount_all();

        let save_type = options.save_type();
        let transfer_pak = options.flag(OptionKey::TransferPak);
        let controller_pak = options.flag(OptionKey::ControllerPak);

        let mut kinds = Vec::with_capacity(1 + MAX_PAKS);
        if save_type != SaveType::None {
            kinds.push(MemoryKind::Save(save_type));
        }
        if transfer_pak {
            kinds.push(MemoryKind::TransferPak);
        } else if controller_pak {
            kinds.push(MemoryKind::ControllerPak);
        }
        if controller_pak {
            kinds.extend([MemoryKind::ControllerPak; MAX_PAKS - 1]);
        }

        let mut any_created = false;
        for kind in kinds {
            match self.mount(storage, rom_name, kind) {
                Ok(created) => any_created |= created,
                Err(err) => {
                    log::error!("Unable to mount {kind}: {err}");
                    any_created |= err.created();
                }
            }
        }

        any_created
    }

    /// Mount one region after the existing ones, creating its backing file if it does not exist.
    ///
    /// A new file is filled from the matching slot of a legacy combined `.sav` file if one exists,
    /// otherwise zeros (or a formatted image for Controller Paks). Returns true if the file was
    /// created. On error the region is still mounted, unbacked, so later regions keep their
    /// addresses.
    ///
    /// # Errors
    ///
    /// Will return an error if the backing file cannot be created or opened.
    pub fn mount<S>(
        &mut self,
        storage: &mut S,
        rom_name: &str,
        kind: MemoryKind,
    ) -> Result<bool, MountError<F::Err>>
    where
        S: SaveStorage<File = F, Err = F::Err>,
    {
        if kind.size() == 0 {
            return Ok(false);
        }

        let pak_number = if kind.is_pak() { self.pak_count() + 1 } else { 0 };
        let file_name = save_file_name(rom_name, kind, pak_number);
        let legacy_offset = self.total_size();

        let slot = self.regions.len();

        let created = create_if_missing(storage, rom_name, &file_name, kind, slot, legacy_offset);
        let result = created.and_then(|created| {
            let file = storage
                .open(&file_name)
                .map_err(|err| MountError::Open { file_name: file_name.clone(), created, err })?;
            Ok((created, file))
        });

        match result {
            Ok((created, file)) => {
                log::info!("Mounted {kind} at slot {slot} from '{file_name}'");
                self.regions.push(MemoryRegion { kind, file_name, file: Some(file) });
                Ok(created)
            }
            Err(err) => {
                self.regions.push(MemoryRegion { kind, file_name, file: None });
                Err(err)
            }
        }
    }

    /// Answer a read request. Requests outside every region get a zero-filled block.
    pub fn serve_read<T: BlockTransport + ?Sized>(
        &mut self,
        request: BlockRequest,
        transport: &mut T,
    ) {
        let mut buf = vec![0; request.len];

        let offset = request.byte_offset();
        match self.locate(offset) {
            Some((slot, local_offset)) => {
                let region = &mut self.regions[slot];
                let len = clamp_len(region.size(), local_offset, buf.len());

                if let Some(file) = &mut region.file {
                    if let Err(err) = file.read_at(local_offset, &mut buf[..len]) {
                        log::error!("Error reading '{}': {err}", region.file_name);
                        buf.fill(0);
                    }
                }

                if region.kind.is_pak() {
                    PAK_FILE_ORDER.normalize(&mut buf);
                }
            }
            None => {
                log::debug!(
                    "Read of {} bytes at {offset:#X} is past the end of save memory",
                    request.len
                );
            }
        }

        transport.send_block(request.ack, &buf);
    }

    /// Answer a write request. The block is always drained from the transport, even if it falls
    /// outside every region and is dropped.
    pub fn serve_write<T: BlockTransport + ?Sized>(
        &mut self,
        request: BlockRequest,
        transport: &mut T,
    ) {
        let mut buf = vec![0; request.len];
        transport.receive_block(request.ack, &mut buf);

        let offset = request.byte_offset();
        let Some((slot, local_offset)) = self.locate(offset) else {
            log::debug!(
                "Dropping write of {} bytes at {offset:#X}, past the end of save memory",
                request.len
            );
            return;
        };

        let region = &mut self.regions[slot];
        if region.kind.is_pak() {
            PAK_FILE_ORDER.normalize(&mut buf);
        }

        let len = clamp_len(region.size(), local_offset, buf.len());
        let Some(file) = &mut region.file else {
            log::debug!("Dropping write to unbacked region '{}'", region.file_name);
            return;
        };

        if let Err(err) = file.write_at(local_offset, &buf[..len]) {
            log::error!("Error writing '{}': {err}", region.file_name);
        }
    }
}

fn clamp_len(region_size: u64, local_offset: u64, len: usize) -> usize {
    let remaining = region_size - local_offset;
    len.min(usize::try_from(remaining).unwrap_or(usize::MAX))
}

fn create_if_missing<S: SaveStorage>(
    storage: &mut S,
    rom_name: &str,
    file_name: &str,
    kind: MemoryKind,
    slot: usize,
    legacy_offset: u64,
) -> Result<bool, MountError<S::Err>> {
    if storage.exists(file_name) {
        return Ok(false);
    }

    let mut contents = vec![0; kind.size()];

    let legacy_name = legacy_save_file_name(rom_name);
    let mut migrated = false;
    if storage.exists(&legacy_name) {
        match storage.read_at(&legacy_name, legacy_offset, &mut contents) {
            Ok(0) => {}
            Ok(len) => {
                log::info!(
                    "Migrating {len} bytes at {legacy_offset:#X} from '{legacy_name}' to '{file_name}'"
                );
                migrated = true;
            }
            Err(err) => log::warn!("Unable to read legacy save file '{legacy_name}': {err}"),
        }
    }

    if migrated && kind.is_pak() {
        PAK_FILE_ORDER.normalize(&mut contents);
    }

    if !migrated && kind == MemoryKind::ControllerPak {
        contents.copy_from_slice(&cpak::template(slot));
    }

    log::info!("Creating {kind} save file '{file_name}'");
    storage
        .create(file_name, &contents)
        .map_err(|err| MountError::Create { file_name: file_name.into(), err })?;

    Ok(true)
}
