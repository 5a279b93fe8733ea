//! Host option vocabulary for the N64 cartridge loader
//!
//! Every option is stored by the host as a small unsigned integer; the enums here define the
//! mapping between those integers and their meaning.

mod store;

pub use store::{N64Options, OptionKey, OptionStore, StatusBits};

use bincode::{Decode, Encode};
use std::fmt::{Display, Formatter};

macro_rules! define_option_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $value:literal => $display:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            #[inline]
            #[must_use]
            pub const fn to_option_value(self) -> u32 {
                match self {
                    $(Self::$variant => $value,)+
                }
            }

            #[inline]
            #[must_use]
            pub const fn from_option_value(value: u32) -> Option<Self> {
                match value {
                    $($value => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                let s = match self {
                    $(Self::$variant => $display,)+
                };
                f.write_str(s)
            }
        }
    };
}

define_option_enum! {
    /// Cartridge save memory technology. At most one is present per cartridge.
    #[derive(Default)]
    pub enum SaveType {
        #[default]
        None = 0 => "(none)",
        Eeprom512 = 1 => "4K EEPROM",
        Eeprom2k = 2 => "16K EEPROM",
        Sram32k = 3 => "256K SRAM",
        Sram96k = 4 => "768K SRAM",
        Flash128k = 5 => "Flash RAM",
    }
}

impl SaveType {
    /// Size of the save memory in bytes; 0 for `None`.
    #[inline]
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::None => 0,
            Self::Eeprom512 => 0x200,
            Self::Eeprom2k => 0x800,
            Self::Sram32k => 0x8000,
            Self::Sram96k => 0x18000,
            Self::Flash128k => 0x20000,
        }
    }
}

define_option_enum! {
    #[derive(Default)]
    pub enum SystemRegion {
        #[default]
        Ntsc = 0 => "NTSC",
        Pal = 1 => "PAL",
    }
}

define_option_enum! {
    /// Boot chip (CIC-NUS) variants, in host option order
    #[derive(Default)]
    pub enum CicType {
        Cic6101 = 0 => "6101",
        #[default]
        Cic6102 = 1 => "6102",
        Cic7101 = 2 => "7101",
        Cic7102 = 3 => "7102",
        Cic6103 = 4 => "6103",
        Cic7103 = 5 => "7103",
        Cic6105 = 6 => "6105",
        Cic7105 = 7 => "7105",
        Cic6106 = 8 => "6106",
        Cic7106 = 9 => "7106",
        Cic8303 = 10 => "8303",
        Cic8401 = 11 => "8401",
        Cic5167 = 12 => "5167",
        CicDdus = 13 => "DDUS",
        Cic5101 = 14 => "5101",
    }
}

define_option_enum! {
    /// What is plugged into a controller port
    #[derive(Default)]
    pub enum PadType {
        #[default]
        N64Pad = 0 => "N64 Pad",
        Unplugged = 1 => "Unplugged",
        N64PadWithCpak = 2 => "N64 Pad + Controller Pak",
        N64PadWithRpak = 3 => "N64 Pad + Rumble Pak",
        /// Port is driven by an external controller adapter; never overwritten by auto-detection
        Snac = 4 => "SNAC",
        N64PadWithTpak = 5 => "N64 Pad + Transfer Pak",
    }
}

define_option_enum! {
    #[derive(Default)]
    pub enum AspectRatio {
        #[default]
        Original = 0 => "Original",
        Full = 1 => "Full",
        Custom1 = 2 => "Custom 1",
        Custom2 = 3 => "Custom 2",
    }
}

define_option_enum! {
    #[derive(Default)]
    pub enum AutoDetect {
        #[default]
        On = 0 => "On",
        Off = 1 => "Off",
    }
}

define_option_enum! {
    pub enum ControllerPort {
        One = 0 => "Controller 1",
        Two = 1 => "Controller 2",
        Three = 2 => "Controller 3",
        Four = 3 => "Controller 4",
    }
}

impl ControllerPort {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.to_option_value() as usize
    }
}
