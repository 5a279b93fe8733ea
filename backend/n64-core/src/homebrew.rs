//! Homebrew "advanced" ROM header
//!
//! Homebrew that opts in writes 'E' 'D' in the middle of the game code, then encodes its save
//! type and RTC use in the revision byte and its controller requirements in the 4 bytes before
//! the game code.
//!
//! Reference: <https://n64brew.dev/wiki/ROM_Header#Advanced_Homebrew_ROM_Header>

use crate::header::CartId;
use n64_config::{ControllerPort, PadType, SaveType};

const RUMBLE_PAK: u8 = 0x01;
const CONTROLLER_PAK: u8 = 0x02;
const TRANSFER_PAK: u8 = 0x03;
const UNPLUGGED: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HomebrewHeader {
    pub save_type: SaveType,
    pub rtc: bool,
    pub controller_pak: bool,
    pub rumble_pak: bool,
    pub transfer_pak: bool,
    /// Requested mode per port; `None` leaves the port alone
    pub controllers: [Option<PadType>; 4],
}

fn save_type_from_nibble(nibble: u8) -> SaveType {
    match nibble {
        1 => SaveType::Eeprom512,
        2 => SaveType::Eeprom2k,
        3 => SaveType::Sram32k,
        4 => SaveType::Sram96k,
        5 => SaveType::Flash128k,
        _ => SaveType::None,
    }
}

fn pad_from_setting(port: ControllerPort, setting: u8) -> Option<PadType> {
    match setting {
        0 => None,
        RUMBLE_PAK => Some(PadType::N64PadWithRpak),
        CONTROLLER_PAK => Some(PadType::N64PadWithCpak),
        TRANSFER_PAK if port == ControllerPort::One => Some(PadType::N64PadWithTpak),
        0x01..0x80 => Some(PadType::N64Pad),
        UNPLUGGED => Some(PadType::Unplugged),
        _ => None,
    }
}

impl HomebrewHeader {
    /// Returns `None` unless the cart ID carries the homebrew marker.
    #[must_use]
    pub fn detect(cart_id: &CartId, controller_settings: [u8; 4]) -> Option<Self> {
        if !cart_id.has_homebrew_marker() {
            return None;
        }

        let (save_nibble, flags_nibble) = cart_id.revision_nibbles();
        let save_type = save_type_from_nibble(save_nibble);
        let rtc = flags_nibble & 1 != 0;

        let controllers = std::array::from_fn(|i| {
            pad_from_setting(ControllerPort::ALL[i], controller_settings[i])
        });

        let header = Self {
            save_type,
            rtc,
            controller_pak: controller_settings.contains(&CONTROLLER_PAK),
            rumble_pak: controller_settings.contains(&RUMBLE_PAK),
            transfer_pak: controller_settings.contains(&TRANSFER_PAK),
            controllers,
        };

        log::info!(
            "Homebrew header: Save Type: {}, RTC: {}, controllers: {controller_settings:02X?}",
            header.save_type,
            header.rtc
        );

        Some(header)
    }
}
