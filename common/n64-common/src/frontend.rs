//! Interfaces to the host system that embeds the cartridge loader

use std::fmt::{Debug, Display};
use std::time::Duration;

/// Named files in the host's save directory.
///
/// Names are plain file names; the implementation decides which directory they live in.
pub trait SaveStorage {
    type Err: Debug + Display;
    type File: SaveFile<Err = Self::Err>;

    fn exists(&mut self, name: &str) -> bool;

    /// Create (or truncate) a file and fill it with the given contents.
    ///
    /// # Errors
    ///
    /// Will propagate any errors encountered while creating or writing the file.
    fn create(&mut self, name: &str, contents: &[u8]) -> Result<(), Self::Err>;

    /// Read up to `buf.len()` bytes starting at `offset` from a file that is not mounted.
    ///
    /// Returns the number of bytes read, which is 0 if `offset` is at or past the end of the file.
    ///
    /// # Errors
    ///
    /// Will propagate any errors encountered while opening or reading the file.
    fn read_at(&mut self, name: &str, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Err>;

    /// Open an existing file for random-access reads and writes. The file is closed on drop.
    ///
    /// # Errors
    ///
    /// Will propagate any errors encountered while opening the file.
    fn open(&mut self, name: &str) -> Result<Self::File, Self::Err>;
}

/// An open save file
pub trait SaveFile {
    type Err: Debug + Display;

    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of bytes read.
    ///
    /// # Errors
    ///
    /// Will propagate any errors encountered while seeking or reading.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Err>;

    /// # Errors
    ///
    /// Will propagate any errors encountered while seeking or writing.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<(), Self::Err>;
}

/// Read-only text resources, e.g. the ROM databases
pub trait ResourceReader {
    type Err: Debug + Display;

    /// # Errors
    ///
    /// Will return an error if the resource does not exist or cannot be read.
    fn read_text(&mut self, name: &str) -> Result<String, Self::Err>;
}

/// Streams ROM bytes to the attached hardware
pub trait RomTransport {
    fn begin_transfer(&mut self, index: u8);

    fn push_chunk(&mut self, chunk: &[u8]);

    fn end_transfer(&mut self);
}

/// Sector-level handshake with the attached hardware for save memory access
pub trait BlockTransport {
    /// Respond to a read request with a block of data.
    fn send_block(&mut self, ack: u32, data: &[u8]);

    /// Fetch the payload of a write request. Every write request must be drained, even if the
    /// data is going to be discarded.
    fn receive_block(&mut self, ack: u32, buf: &mut [u8]);
}

pub trait HostControl {
    /// Assert the core's reset line, hold it for `hold`, then release it.
    fn pulse_reset(&mut self, hold: Duration);

    /// Show a message to the user for the given duration.
    fn show_info(&mut self, message: &str, duration: Duration);
}
