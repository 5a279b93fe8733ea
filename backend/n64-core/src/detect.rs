//! Cartridge property detection: database lookups, homebrew header, and boot chip signature
//!
//! Strategies run in a fixed order and the first one that produces anything wins. A database or
//! homebrew match that does not pin down region and CIC is completed by the boot chip signature.

use crate::cic::{self, BootChipDetection};
use crate::database::KnowledgeBase;
use crate::header::CartridgeHeader;
use crate::homebrew::HomebrewHeader;
use crate::settings::{AspectRatioMemory, SettingsApplier};
use crate::tags::TagSettings;
use n64_common::digest;
use n64_common::frontend::ResourceReader;
use n64_config::OptionStore;
use std::fmt::{Display, Formatter};

/// 2-bit detection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DetectionOutcome(u8);

impl DetectionOutcome {
    pub const REGION_AND_CIC_KNOWN: u8 = 1 << 0;
    pub const METADATA_KNOWN: u8 = 1 << 1;

    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & 0x03)
    }

    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn region_and_cic_known(self) -> bool {
        self.0 & Self::REGION_AND_CIC_KNOWN != 0
    }

    #[must_use]
    pub fn metadata_known(self) -> bool {
        self.0 & Self::METADATA_KNOWN != 0
    }

    #[must_use]
    pub fn is_unknown(self) -> bool {
        self.0 == 0
    }

    fn set(&mut self, bit: u8) {
        self.0 |= bit;
    }
}

/// Which strategy supplied the cartridge's save and peripheral metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataSource {
    HeaderHash,
    ContentHash,
    CartId,
    Homebrew,
}

impl Display for MetadataSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HeaderHash => write!(f, "header MD5"),
            Self::ContentHash => write!(f, "file MD5"),
            Self::CartId => write!(f, "cart ID"),
            Self::Homebrew => write!(f, "homebrew header"),
        }
    }
}

/// Everything known about a ROM after it has been fully streamed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeIdentity {
    pub header: CartridgeHeader,
    /// MD5 of the first 4KB only
    pub header_hash: [u8; 16],
    /// MD5 of the full normalized image
    pub content_hash: [u8; 16],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub outcome: DetectionOutcome,
    pub source: Option<MetadataSource>,
    /// Set if the boot chip heuristic ran
    pub boot_chip: Option<BootChipDetection>,
}

pub struct Detector<'a, R, O: ?Sized> {
    resources: &'a mut R,
    options: &'a mut O,
    aspect_memory: &'a mut AspectRatioMemory,
    auto_detect: bool,
}

impl<'a, R: ResourceReader, O: OptionStore + ?Sized> Detector<'a, R, O> {
    pub fn new(
        resources: &'a mut R,
        options: &'a mut O,
        aspect_memory: &'a mut AspectRatioMemory,
    ) -> Self {
        let auto_detect = options.is_auto_detect_enabled();
        Self { resources, options, aspect_memory, auto_detect }
    }

    fn applier(&mut self) -> SettingsApplier<'_, O> {
        SettingsApplier::new(&mut *self.options, &mut *self.aspect_memory)
    }

    fn find_database_entry(
        &mut self,
        identity: &CartridgeIdentity,
    ) -> Option<(MetadataSource, String)> {
        let mut database = KnowledgeBase::new(&mut *self.resources);

        if let Some(entry) = database.find_by_hash(&digest::to_hex(&identity.header_hash)) {
            return Some((MetadataSource::HeaderHash, entry.tags));
        }

        if let Some(entry) = database.find_by_hash(&digest::to_hex(&identity.content_hash)) {
            return Some((MetadataSource::ContentHash, entry.tags));
        }

        let cart_id = identity.header.cart_id.as_ref()?;
        database.find_by_cart_id(cart_id).map(|entry| (MetadataSource::CartId, entry.tags))
    }

    /// Resolve the ROM's properties and, if auto-detection is enabled, write them to the options.
    pub fn detect(&mut self, identity: &CartridgeIdentity) -> Detection {
        let mut outcome = DetectionOutcome::default();
        let mut source = None;

        if let Some((entry_source, tags)) = self.find_database_entry(identity) {
            let settings = TagSettings::parse(&tags);

            outcome.set(DetectionOutcome::METADATA_KNOWN);
            if settings.is_region_and_cic_known() {
                outcome.set(DetectionOutcome::REGION_AND_CIC_KNOWN);
            }
            source = Some(entry_source);

            if self.auto_detect {
                self.applier().apply_tags(&settings);
            }
        } else if let Some(homebrew) = identity.header.cart_id.as_ref().and_then(|cart_id| {
            HomebrewHeader::detect(cart_id, identity.header.controller_settings)
        }) {
            outcome.set(DetectionOutcome::METADATA_KNOWN);
            source = Some(MetadataSource::Homebrew);

            if self.auto_detect {
                self.applier().apply_homebrew(&homebrew);
            }
        } else {
            log::info!("No database entry or homebrew header found for ROM");

            if self.auto_detect {
                self.applier().apply_unrecognized_defaults();
            }
        }

        let mut boot_chip = None;
        if !outcome.region_and_cic_known() {
            let detection = cic::detect_boot_chip(
                identity.header.region_code(),
                identity.header.bootcode_sums,
            );

            if self.auto_detect {
                self.applier().apply_boot_chip(&detection);
            }
            if detection.known {
                outcome.set(DetectionOutcome::REGION_AND_CIC_KNOWN);
            }

            boot_chip = Some(detection);
        }

        log::info!("Detection outcome: {:#04b} (metadata from {source:?})", outcome.bits());

        Detection { outcome, source, boot_chip }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::FIRST_CHUNK_LEN;
    use crate::testutil::{MemResources, header_chunk};
    use n64_config::{
        AutoDetect, CicType, ControllerPort, N64Options, PadType, SaveType, SystemRegion,
    };
    use test_log::test;

    fn identity(chunk: &[u8; FIRST_CHUNK_LEN]) -> CartridgeIdentity {
        CartridgeIdentity {
            header: CartridgeHeader::parse(chunk),
            header_hash: [0x11; 16],
            content_hash: [0x22; 16],
        }
    }

    fn run(
        resources: &mut MemResources,
        options: &mut N64Options,
        identity: &CartridgeIdentity,
    ) -> Detection {
        let mut memory = AspectRatioMemory::new();
        Detector::new(resources, options, &mut memory).detect(identity)
    }

    #[test]
    fn header_hash_wins_over_cart_id() {
        let mut resources = MemResources::default().with(
            "N64-database.txt",
            &format!(
                "ID:NSME00 eeprom512\n{} sram32k|cpak|ntsc|cic6102\n",
                digest::to_hex(&[0x11; 16])
            ),
        );
        let mut options = N64Options::default();

        let detection = run(&mut resources, &mut options, &identity(&header_chunk(b"NSME", 0)));
        assert_eq!(detection.outcome.bits(), 0b11);
        assert_eq!(detection.source, Some(MetadataSource::HeaderHash));
        assert_eq!(detection.boot_chip, None);
        assert_eq!(options.save_type, SaveType::Sram32k);
        assert_eq!(options.controllers[0], PadType::N64PadWithCpak);
    }

    #[test]
    fn content_hash_before_cart_id() {
        let mut resources = MemResources::default().with(
            "N64-database.txt",
            &format!("ID:NSME00 eeprom512\n{} flash128k\n", digest::to_hex(&[0x22; 16])),
        );
        let mut options = N64Options::default();

        let detection = run(&mut resources, &mut options, &identity(&header_chunk(b"NSME", 0)));
        assert_eq!(detection.source, Some(MetadataSource::ContentHash));
        assert_eq!(options.save_type, SaveType::Flash128k);
    }

    #[test]
    fn metadata_only_match_is_completed_by_boot_chip() {
        let mut resources =
            MemResources::default().with("N64-database.txt", "ID:NSM eeprom512|rpak\n");
        let mut options =
            N64Options { system_region: SystemRegion::Pal, ..N64Options::default() };

        let detection = run(&mut resources, &mut options, &identity(&header_chunk(b"NSME", 0)));
        assert_eq!(detection.source, Some(MetadataSource::CartId));
        // Blank boot code matches no signature
        let boot_chip = detection.boot_chip.unwrap();
        assert!(!boot_chip.known);
        assert_eq!(detection.outcome.bits(), DetectionOutcome::METADATA_KNOWN);
        assert_eq!(options.save_type, SaveType::Eeprom512);
        assert_eq!(options.system_region, SystemRegion::Ntsc);
        assert_eq!(options.cic_type, CicType::Cic6102);
    }

    #[test]
    fn unmatched_rom_falls_through_to_boot_chip() {
        let mut resources = MemResources::default();
        let mut options = N64Options {
            save_type: SaveType::Sram96k,
            controller_pak: true,
            ..N64Options::default()
        };

        let detection = run(&mut resources, &mut options, &identity(&header_chunk(b"NSME", 0)));
        assert!(detection.outcome.is_unknown());
        assert_eq!(detection.source, None);
        assert_eq!(detection.boot_chip.map(|chip| chip.region), Some(SystemRegion::Ntsc));
        assert_eq!(options.save_type, SaveType::None);
        assert!(!options.controller_pak);
    }

    #[test]
    fn homebrew_header_when_database_misses() {
        let mut resources = MemResources::default();
        let mut options = N64Options::default();
        let mut chunk = header_chunk(b"NEDA", 0x51);
        chunk[0x34..0x38].copy_from_slice(&[0x02, 0x00, 0x00, 0x00]);

        let detection = run(&mut resources, &mut options, &identity(&chunk));
        assert_eq!(detection.source, Some(MetadataSource::Homebrew));
        assert!(detection.outcome.metadata_known());
        assert_eq!(options.save_type, SaveType::Flash128k);
        assert!(options.rtc);
        assert!(options.controller_pak);
        assert_eq!(options.pad_type(ControllerPort::One), Some(PadType::N64PadWithCpak));
    }

    #[test]
    fn options_untouched_when_auto_detect_is_off() {
        let mut resources = MemResources::default().with("N64-database.txt", "ID:NSME00 sram32k\n");
        let mut options = N64Options { auto_detect: AutoDetect::Off, ..N64Options::default() };
        let before = options.clone();

        let detection = run(&mut resources, &mut options, &identity(&header_chunk(b"NSME", 0)));
        assert!(detection.outcome.metadata_known());
        assert_eq!(options, before);
    }
}
