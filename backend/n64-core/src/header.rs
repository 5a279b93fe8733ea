//! Identity fields extracted from the first 4KB of a (normalized) ROM image
//!
//! Header layout reference: <https://n64brew.dev/wiki/ROM_Header>

use std::array;
use std::fmt::{Display, Formatter};
use std::ops::Range;

/// Length of the first transfer chunk, which covers the header and the IPL3 boot code
pub const FIRST_CHUNK_LEN: usize = 0x1000;

const INTERNAL_NAME: Range<usize> = 0x20..0x34;
const CONTROLLER_SETTINGS: Range<usize> = 0x34..0x38;
const GAME_CODE: Range<usize> = 0x3B..0x3F;
const REVISION: usize = 0x3F;

// Aleck64 boot code ends at $C00, regular IPL3 at $1000
const SHORT_BOOTCODE: Range<usize> = 0x40..0xC00;
const LONG_BOOTCODE: Range<usize> = 0xC00..0x1000;

const HOMEBREW_MARKER: &[u8; 2] = b"ED";

/// Checksums over the boot code, used to identify the CIC chip that the boot code pairs with.
///
/// Words are summed as little-endian integers over the big-endian ROM data, which is what the
/// signature table expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BootcodeSums {
    /// Sum over $40-$C00
    pub short: u64,
    /// Sum over $40-$1000
    pub long: u64,
}

impl BootcodeSums {
    #[must_use]
    pub fn compute(first_chunk: &[u8; FIRST_CHUNK_LEN]) -> Self {
        let sum_words = |range: Range<usize>| -> u64 {
            first_chunk[range]
                .chunks_exact(4)
                .map(|word| u64::from(u32::from_le_bytes([word[0], word[1], word[2], word[3]])))
                .sum()
        };

        let short = sum_words(SHORT_BOOTCODE);
        let long = short + sum_words(LONG_BOOTCODE);

        Self { short, long }
    }
}

/// 6-character cartridge ID: 4-character game code followed by the revision as 2 hex digits.
///
/// The first character of the game code is the media type ('N' = cartridge, 'D' = 64DD disk,
/// 'C' = expandable cartridge, 'E' = 64DD expansion, 'Z' = Aleck64), the next two identify the
/// game, and the fourth is the region/language code. Non-alphanumeric game code characters are
/// replaced with '?'.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartId(String);

impl CartId {
    pub const LEN: usize = 6;

    /// Returns `None` if none of the game code characters are alphanumeric.
    #[must_use]
    pub fn from_header(first_chunk: &[u8]) -> Option<Self> {
        let game_code: String = first_chunk[GAME_CODE]
            .iter()
            .map(|&b| if b.is_ascii_alphanumeric() { char::from(b) } else { '?' })
            .collect();

        if game_code == "????" {
            return None;
        }

        Some(Self(format!("{game_code}{:02X}", first_chunk[REVISION])))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    #[must_use]
    pub fn game_code(&self) -> &str {
        &self.0[..4]
    }

    #[must_use]
    pub fn region_code(&self) -> u8 {
        self.as_bytes()[3]
    }

    /// Only fully alphanumeric IDs can be looked up in the database.
    #[must_use]
    pub fn is_lookup_eligible(&self) -> bool {
        self.as_bytes().iter().all(u8::is_ascii_alphanumeric)
    }

    /// Homebrew using the "advanced" header format puts "ED" in the game ID position.
    #[must_use]
    pub fn has_homebrew_marker(&self) -> bool {
        &self.as_bytes()[1..3] == HOMEBREW_MARKER
    }

    /// The two revision nibbles, high first.
    #[must_use]
    pub fn revision_nibbles(&self) -> (u8, u8) {
        (hex_digit(self.as_bytes()[4]), hex_digit(self.as_bytes()[5]))
    }
}

impl Display for CartId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub(crate) fn hex_digit(c: u8) -> u8 {
    char::from(c).to_digit(16).map_or(0, |d| d as u8)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeHeader {
    pub internal_name: String,
    pub cart_id: Option<CartId>,
    pub revision: u8,
    pub controller_settings: [u8; 4],
    pub bootcode_sums: BootcodeSums,
}

impl CartridgeHeader {
    #[must_use]
    pub fn parse(first_chunk: &[u8; FIRST_CHUNK_LEN]) -> Self {
        let internal_name = sanitize_name(&first_chunk[INTERNAL_NAME]);
        let cart_id = CartId::from_header(first_chunk);
        let controller_settings: [u8; 4] =
            array::from_fn(|i| first_chunk[CONTROLLER_SETTINGS.start + i]);
        let bootcode_sums = BootcodeSums::compute(first_chunk);

        Self {
            internal_name,
            cart_id,
            revision: first_chunk[REVISION],
            controller_settings,
            bootcode_sums,
        }
    }

    /// Region/language character from the game code, or NUL if the cart ID is unrecoverable.
    #[must_use]
    pub fn region_code(&self) -> u8 {
        self.cart_id.as_ref().map_or(0, CartId::region_code)
    }
}

fn is_c_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | 0x0B | 0x0C | b'\r')
}

fn sanitize_name(raw: &[u8]) -> String {
    let len = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let raw = &raw[..len];

    let Some(start) = raw.iter().position(|&b| !is_c_space(b)) else {
        return String::new();
    };
    let end = raw.iter().rposition(|&b| !is_c_space(b)).map_or(start, |i| i + 1);

    raw[start..end]
        .iter()
        .map(|&b| if (0x20..0xA0).contains(&b) { char::from(b) } else { '?' })
        .collect()
}
