//! N64 cartridge loading: ROM byte order normalization, cartridge property detection, and save
//! memory management for the cartridge's save chip and controller-slot paks

mod api;
pub mod cic;
pub mod database;
pub mod detect;
pub mod header;
pub mod homebrew;
pub mod rom;
pub mod saves;
pub mod settings;
pub mod summary;
pub mod tags;

#[cfg(test)]
mod testutil;

pub use api::{LoadContext, LoadReport, N64CartLoader, RomLoadError, RomSource};
pub use detect::{Detection, DetectionOutcome, MetadataSource};
pub use header::{CartId, CartridgeHeader};
pub use rom::ByteOrder;
pub use saves::{BlockRequest, MemoryKind, MountError, SaveMemory};
pub use summary::LoadSummary;
