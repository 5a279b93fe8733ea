//! ROM image byte order detection and normalization

/// Byte order of a ROM image, relative to the console's native big-endian order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// .z64
    BigEndian,
    /// .v64, every 16-bit halfword has its bytes swapped
    ByteSwapped,
    /// .n64, every 32-bit word is reversed
    LittleEndian,
    Unknown,
}

impl ByteOrder {
    /// Classify a ROM from its first 4 bytes.
    ///
    /// The constants are the first word read as a little-endian integer. For each byte order
    /// there is one value for regular cartridges, one for 64DD images, and one for a malformed
    /// boot word that shows up in some homebrew.
    #[must_use]
    pub fn detect(first_word: [u8; 4]) -> Self {
        match u32::from_le_bytes(first_word) {
            0x40123780 | 0x40072780 | 0x41123780 => Self::BigEndian,
            0x12408037 | 0x07408027 | 0x12418037 => Self::ByteSwapped,
            0x80371240 | 0x80270740 | 0x80371241 => Self::LittleEndian,
            word => {
                // Not an exact match; guess from the first byte alone
                match word & 0xFF {
                    0x80 => Self::BigEndian,
                    0x37 | 0x27 => Self::ByteSwapped,
                    0x40 | 0x41 => Self::LittleEndian,
                    _ => Self::Unknown,
                }
            }
        }
    }

    /// Rewrite `data` in place into big-endian order. Trailing bytes that do not fill a whole
    /// halfword/word are left untouched.
    pub fn normalize(self, data: &mut [u8]) {
        match self {
            Self::ByteSwapped => {
                for halfword in data.chunks_exact_mut(2) {
                    halfword.swap(0, 1);
                }
            }
            Self::LittleEndian => {
                for word in data.chunks_exact_mut(4) {
                    word.reverse();
                }
            }
            Self::BigEndian | Self::Unknown => {}
        }
    }
}
