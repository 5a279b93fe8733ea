//! Console host: notifications go to stdout, the ROM stream optionally goes to a file

use n64_common::frontend::{HostControl, RomTransport};
use std::fs::File;
use std::io;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

pub struct ConsoleHost;

impl HostControl for ConsoleHost {
    fn pulse_reset(&mut self, hold: Duration) {
        log::info!("Reset held for {}ms", hold.as_millis());
    }

    fn show_info(&mut self, message: &str, duration: Duration) {
        log::debug!("Showing info for {}ms", duration.as_millis());
        println!("{message}");
    }
}

/// Receives the normalized ROM stream, writing it out if an output file was requested
pub struct RomSink {
    output: Option<BufWriter<File>>,
    len: u64,
    error: Option<io::Error>,
}

impl RomSink {
    pub fn new(output_path: Option<&Path>) -> io::Result<Self> {
        let output = output_path.map(File::create).transpose()?.map(BufWriter::new);
        Ok(Self { output, len: 0, error: None })
    }

    /// Total bytes received across all transfers
    pub fn bytes_received(&self) -> u64 {
        self.len
    }

    /// Report the first write error, if any.
    pub fn finish(mut self) -> io::Result<()> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }

        if let Some(output) = &mut self.output {
            output.flush()?;
        }

        Ok(())
    }
}

impl RomTransport for RomSink {
    fn begin_transfer(&mut self, index: u8) {
        log::debug!("Beginning transfer for file index {index:#04X}");
    }

    fn push_chunk(&mut self, chunk: &[u8]) {
        self.len += chunk.len() as u64;

        if self.error.is_some() {
            return;
        }

        if let Some(output) = &mut self.output
            && let Err(err) = output.write_all(chunk)
        {
            log::error!("Error writing ROM output: {err}");
            self.error = Some(err);
        }
    }

    fn end_transfer(&mut self) {
        log::debug!("Transfer finished, {} bytes total", self.len);
    }
}
