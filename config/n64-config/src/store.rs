use crate::{AspectRatio, AutoDetect, CicType, ControllerPort, PadType, SaveType, SystemRegion};
use bincode::{Decode, Encode};
use std::ops::RangeInclusive;

/// Stable identifier for every host option the loader reads or writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKey {
    AutoDetect,
    SystemRegion,
    CicType,
    AspectRatio,
    Controller(ControllerPort),
    SaveType,
    Rtc,
    NoExpansionPak,
    ControllerPak,
    RumblePak,
    TransferPak,
}

impl OptionKey {
    /// Bit range that the option occupies in the host's packed status register.
    #[must_use]
    pub const fn status_bits(self) -> RangeInclusive<u8> {
        match self {
            Self::AspectRatio => 47..=48,
            Self::Controller(ControllerPort::One) => 49..=51,
            Self::Controller(ControllerPort::Two) => 52..=54,
            Self::Controller(ControllerPort::Three) => 55..=57,
            Self::Controller(ControllerPort::Four) => 58..=60,
            Self::AutoDetect => 64..=64,
            Self::CicType => 65..=68,
            Self::NoExpansionPak => 70..=70,
            Self::ControllerPak => 71..=71,
            Self::RumblePak => 72..=72,
            Self::TransferPak => 73..=73,
            Self::Rtc => 74..=74,
            Self::SaveType => 75..=77,
            Self::SystemRegion => 79..=80,
        }
    }
}

/// Read/write access to the host's option store.
///
/// Implementors only provide raw `get`/`set`; the typed accessors decode option values and fall
/// back to "unknown" (`None`) or the option's neutral value when the stored value is out of range.
pub trait OptionStore {
    fn get(&self, key: OptionKey) -> u32;

    fn set(&mut self, key: OptionKey, value: u32);

    fn is_auto_detect_enabled(&self) -> bool {
        AutoDetect::from_option_value(self.get(OptionKey::AutoDetect)) == Some(AutoDetect::On)
    }

    fn save_type(&self) -> SaveType {
        SaveType::from_option_value(self.get(OptionKey::SaveType)).unwrap_or_default()
    }

    fn set_save_type(&mut self, save_type: SaveType) {
        self.set(OptionKey::SaveType, save_type.to_option_value());
    }

    fn system_region(&self) -> Option<SystemRegion> {
        SystemRegion::from_option_value(self.get(OptionKey::SystemRegion))
    }

    fn set_system_region(&mut self, region: SystemRegion) {
        self.set(OptionKey::SystemRegion, region.to_option_value());
    }

    fn cic_type(&self) -> Option<CicType> {
        CicType::from_option_value(self.get(OptionKey::CicType))
    }

    fn set_cic_type(&mut self, cic: CicType) {
        self.set(OptionKey::CicType, cic.to_option_value());
    }

    fn aspect_ratio(&self) -> Option<AspectRatio> {
        AspectRatio::from_option_value(self.get(OptionKey::AspectRatio))
    }

    fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        self.set(OptionKey::AspectRatio, aspect_ratio.to_option_value());
    }

    fn pad_type(&self, port: ControllerPort) -> Option<PadType> {
        PadType::from_option_value(self.get(OptionKey::Controller(port)))
    }

    fn set_pad_type(&mut self, port: ControllerPort, pad: PadType) {
        self.set(OptionKey::Controller(port), pad.to_option_value());
    }

    fn flag(&self, key: OptionKey) -> bool {
        self.get(key) != 0
    }

    fn set_flag(&mut self, key: OptionKey, value: bool) {
        self.set(key, value.into());
    }
}

/// Option store backed by a packed status register, the way the host exposes options to the
/// hardware core. Values wider than their bit range are truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct StatusBits(pub u128);

impl StatusBits {
    fn mask(range: &RangeInclusive<u8>) -> u128 {
        let width = range.end() - range.start() + 1;
        ((1_u128 << width) - 1) << range.start()
    }
}

impl OptionStore for StatusBits {
    fn get(&self, key: OptionKey) -> u32 {
        let range = key.status_bits();
        ((self.0 & Self::mask(&range)) >> range.start()) as u32
    }

    fn set(&mut self, key: OptionKey, value: u32) {
        let range = key.status_bits();
        let mask = Self::mask(&range);
        self.0 = (self.0 & !mask) | ((u128::from(value) << range.start()) & mask);
    }
}

/// Typed option store, suitable for persisting to a config file
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct N64Options {
    pub auto_detect: AutoDetect,
    pub system_region: SystemRegion,
    pub cic_type: CicType,
    pub aspect_ratio: AspectRatio,
    pub controllers: [PadType; 4],
    pub save_type: SaveType,
    pub rtc: bool,
    pub no_expansion_pak: bool,
    pub controller_pak: bool,
    pub rumble_pak: bool,
    pub transfer_pak: bool,
}

impl Default for N64Options {
    fn default() -> Self {
        Self {
            auto_detect: AutoDetect::On,
            system_region: SystemRegion::Ntsc,
            cic_type: CicType::Cic6102,
            aspect_ratio: AspectRatio::Original,
            controllers: [PadType::N64Pad; 4],
            save_type: SaveType::None,
            rtc: false,
            no_expansion_pak: false,
            controller_pak: false,
            rumble_pak: false,
            transfer_pak: false,
        }
    }
}

fn decode_or_keep<T: Copy>(field: &mut T, key: OptionKey, decoded: Option<T>, raw: u32) {
    match decoded {
        Some(value) => *field = value,
        None => log::warn!("Ignoring out-of-range value {raw} for option {key:?}"),
    }
}

impl OptionStore for N64Options {
    fn get(&self, key: OptionKey) -> u32 {
        match key {
            OptionKey::AutoDetect => self.auto_detect.to_option_value(),
            OptionKey::SystemRegion => self.system_region.to_option_value(),
            OptionKey::CicType => self.cic_type.to_option_value(),
            OptionKey::AspectRatio => self.aspect_ratio.to_option_value(),
            OptionKey::Controller(port) => self.controllers[port.index()].to_option_value(),
            OptionKey::SaveType => self.save_type.to_option_value(),
            OptionKey::Rtc => self.rtc.into(),
            OptionKey::NoExpansionPak => self.no_expansion_pak.into(),
            OptionKey::ControllerPak => self.controller_pak.into(),
            OptionKey::RumblePak => self.rumble_pak.into(),
            OptionKey::TransferPak => self.transfer_pak.into(),
        }
    }

    fn set(&mut self, key: OptionKey, value: u32) {
        match key {
            OptionKey::AutoDetect => decode_or_keep(
                &mut self.auto_detect,
                key,
                AutoDetect::from_option_value(value),
                value,
            ),
            OptionKey::SystemRegion => decode_or_keep(
                &mut self.system_region,
                key,
                SystemRegion::from_option_value(value),
                value,
            ),
            OptionKey::CicType => {
                decode_or_keep(&mut self.cic_type, key, CicType::from_option_value(value), value);
            }
            OptionKey::AspectRatio => decode_or_keep(
                &mut self.aspect_ratio,
                key,
                AspectRatio::from_option_value(value),
                value,
            ),
            OptionKey::Controller(port) => decode_or_keep(
                &mut self.controllers[port.index()],
                key,
                PadType::from_option_value(value),
                value,
            ),
            OptionKey::SaveType => {
                decode_or_keep(&mut self.save_type, key, SaveType::from_option_value(value), value);
            }
            OptionKey::Rtc => self.rtc = value != 0,
            OptionKey::NoExpansionPak => self.no_expansion_pak = value != 0,
            OptionKey::ControllerPak => self.controller_pak = value != 0,
            OptionKey::RumblePak => self.rumble_pak = value != 0,
            OptionKey::TransferPak => self.transfer_pak = value != 0,
        }
    }
}
