//! Writing detected cartridge properties into the host's options

use crate::cic::BootChipDetection;
use crate::homebrew::HomebrewHeader;
use crate::tags::TagSettings;
use n64_config::{AspectRatio, ControllerPort, OptionKey, OptionStore, PadType};

/// One-level memory of the aspect ratio that was active before a widescreen game forced
/// [`AspectRatio::Full`], so it can be restored when a non-widescreen game loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AspectRatioMemory {
    saved: Option<AspectRatio>,
}

impl AspectRatioMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Aspect ratio that will be restored by the next non-wide update, if any.
    #[must_use]
    pub fn saved(&self) -> Option<AspectRatio> {
        self.saved
    }

    pub fn update<O: OptionStore + ?Sized>(&mut self, options: &mut O, wide: bool) {
        let current = options.aspect_ratio();

        if wide {
            if current != Some(AspectRatio::Full) {
                if let Some(current) = current {
                    log::debug!("Saving aspect ratio {current} for widescreen game");
                    self.saved = Some(current);
                }
                options.set_aspect_ratio(AspectRatio::Full);
            }
        } else if current == Some(AspectRatio::Full) {
            if let Some(saved) = self.saved.take() {
                log::debug!("Restoring aspect ratio {saved}");
                options.set_aspect_ratio(saved);
            }
        }
    }
}

/// Applies detection results to an option store. Callers are responsible for checking whether
/// auto-detection is enabled.
pub struct SettingsApplier<'a, O: ?Sized> {
    options: &'a mut O,
    aspect_memory: &'a mut AspectRatioMemory,
}

impl<'a, O: OptionStore + ?Sized> SettingsApplier<'a, O> {
    pub fn new(options: &'a mut O, aspect_memory: &'a mut AspectRatioMemory) -> Self {
        Self { options, aspect_memory }
    }

    fn set_primary_pad(&mut self, pad: PadType) {
        if self.options.pad_type(ControllerPort::One) != Some(PadType::Snac) {
            self.options.set_pad_type(ControllerPort::One, pad);
        }
    }

    /// Region and CIC are only written if the tags named them. Paks, RTC, expansion memory, and
    /// save type are always written, so a game tagged with none of them turns them all off.
    pub fn apply_tags(&mut self, tags: &TagSettings) {
        if let Some(region) = tags.region {
            self.options.set_system_region(region);
        }
        if let Some(cic) = tags.cic {
            self.options.set_cic_type(cic);
        }

        self.options.set_flag(OptionKey::NoExpansionPak, tags.no_expansion_pak);
        self.options.set_flag(OptionKey::ControllerPak, tags.controller_pak);
        self.options.set_flag(OptionKey::RumblePak, tags.rumble_pak);
        self.options.set_flag(OptionKey::TransferPak, tags.transfer_pak);
        self.options.set_flag(OptionKey::Rtc, tags.rtc);
        self.options.set_save_type(tags.save_type);

        self.set_primary_pad(tags.preferred_pad);

        self.aspect_memory.update(&mut *self.options, tags.wide);
    }

    pub fn apply_homebrew(&mut self, header: &HomebrewHeader) {
        self.options.set_save_type(header.save_type);
        self.options.set_flag(OptionKey::Rtc, header.rtc);
        self.options.set_flag(OptionKey::ControllerPak, header.controller_pak);
        self.options.set_flag(OptionKey::RumblePak, header.rumble_pak);
        self.options.set_flag(OptionKey::TransferPak, header.transfer_pak);

        for (&port, &pad) in ControllerPort::ALL.iter().zip(&header.controllers) {
            let Some(pad) = pad else { continue };

            if self.options.pad_type(port) == Some(PadType::Snac) {
                log::debug!("Not changing {port}, it is driven by SNAC");
                continue;
            }

            self.options.set_pad_type(port, pad);
        }
    }

    /// Written even when the chip is a guess, so region and CIC always agree with each other.
    pub fn apply_boot_chip(&mut self, detection: &BootChipDetection) {
        self.options.set_system_region(detection.region);
        self.options.set_cic_type(detection.cic);
    }

    /// Fallback for ROMs that matched nothing: no save, no paks, no RTC, expansion memory on.
    pub fn apply_unrecognized_defaults(&mut self) {
        self.aspect_memory.update(&mut *self.options, false);

        self.options.set_flag(OptionKey::NoExpansionPak, false);
        self.options.set_flag(OptionKey::ControllerPak, false);
        self.options.set_flag(OptionKey::RumblePak, false);
        self.options.set_flag(OptionKey::TransferPak, false);
        self.options.set_flag(OptionKey::Rtc, false);
        self.options.set_save_type(n64_config::SaveType::None);
    }
}
