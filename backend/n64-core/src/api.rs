//! N64 cartridge loader public interface

use crate::detect::{CartridgeIdentity, Detection, Detector};
use crate::header::{CartridgeHeader, FIRST_CHUNK_LEN};
use crate::rom::ByteOrder;
use crate::saves::{BlockRequest, SaveMemory};
use crate::settings::AspectRatioMemory;
use crate::summary::LoadSummary;
use crc::Crc;
use n64_common::digest::{self, ContentDigest, Md5Digest};
use n64_common::frontend::{BlockTransport, HostControl, ResourceReader, RomTransport, SaveStorage};
use n64_config::OptionStore;
use std::io;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;

const CRC: Crc<u32> = Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

const CHUNK_LEN: usize = FIRST_CHUNK_LEN;

const RESET_HOLD: Duration = Duration::from_millis(100);

/// Low 6 bits of the host's file index select the cartridge type
const FILE_INDEX_TYPE_MASK: u8 = 0x3F;
const GAME_BOY_FILE_TYPE: u8 = 2;

#[derive(Debug, Error)]
pub enum RomLoadError {
    #[error("ROM is too small: read {len} bytes, need at least {FIRST_CHUNK_LEN}")]
    TooSmall { len: usize },
    #[error("Error reading ROM: {0}")]
    Io(#[from] io::Error),
}

/// A ROM image to stream to the hardware
pub struct RomSource<'a, R> {
    /// File name or path; save files are named after its base name
    pub name: &'a str,
    pub reader: R,
    /// Host file index, passed through to the transport
    pub index: u8,
}

impl<R> RomSource<'_, R> {
    /// Whether the host flagged this file as a Game Boy cartridge rather than an N64 ROM.
    #[must_use]
    pub fn is_passthrough(&self) -> bool {
        self.index & FILE_INDEX_TYPE_MASK == GAME_BOY_FILE_TYPE
    }
}

/// Host collaborators used during a ROM load
pub struct LoadContext<'a, O: ?Sized, R, T: ?Sized, H: ?Sized> {
    pub options: &'a mut O,
    pub resources: &'a mut R,
    pub transport: &'a mut T,
    pub host: &'a mut H,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub byte_order: ByteOrder,
    pub identity: CartridgeIdentity,
    pub crc32: u32,
    pub rom_len: u64,
    pub detection: Detection,
    /// `None` if auto-detection is disabled
    pub summary: Option<LoadSummary>,
    pub saves_created: bool,
}

struct StreamedRom {
    byte_order: ByteOrder,
    header: CartridgeHeader,
    header_hash: [u8; 16],
    content_hash: [u8; 16],
    crc32: u32,
    len: u64,
}

/// Fill `buf` from `reader` unless EOF comes first. Returns the number of bytes read.
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }

    Ok(filled)
}

fn stream_rom<R, D, T>(reader: &mut R, transport: &mut T) -> Result<StreamedRom, RomLoadError>
where
    R: Read,
    D: ContentDigest + Default,
    T: RomTransport + ?Sized,
{
    let mut chunk = Box::new([0; CHUNK_LEN]);

    let first_len = read_chunk(reader, chunk.as_mut_slice())?;
    if first_len < FIRST_CHUNK_LEN {
        log::error!("ROM is too small ({first_len} bytes), not loading");
        return Err(RomLoadError::TooSmall { len: first_len });
    }

    let byte_order = ByteOrder::detect([chunk[0], chunk[1], chunk[2], chunk[3]]);
    log::info!("Detected ROM byte order: {byte_order:?}");
    byte_order.normalize(chunk.as_mut_slice());

    let header = CartridgeHeader::parse(&chunk);

    let mut digest = D::default();
    digest.update(chunk.as_slice());
    let header_hash = digest.clone().finalize();
    log::info!("Header MD5: {}", digest::to_hex(&header_hash));

    let mut crc = CRC.digest();
    crc.update(chunk.as_slice());

    transport.push_chunk(chunk.as_slice());
    let mut len = FIRST_CHUNK_LEN as u64;

    loop {
        let chunk_len = read_chunk(reader, chunk.as_mut_slice())?;
        if chunk_len == 0 {
            break;
        }

        let data = &mut chunk[..chunk_len];
        byte_order.normalize(data);
        digest.update(data);
        crc.update(data);
        transport.push_chunk(data);
        len += chunk_len as u64;

        if chunk_len < CHUNK_LEN {
            break;
        }
    }

    let content_hash = digest.finalize();
    let crc32 = crc.finalize();
    log::info!("File MD5: {}", digest::to_hex(&content_hash));
    log::info!("ROM CRC32: {crc32:08X}, {len} bytes");

    Ok(StreamedRom { byte_order, header, header_hash, content_hash, crc32, len })
}

/// Streams N64 ROMs to the hardware, works out what the cartridge needs, and serves the
/// cartridge's save memory afterwards.
pub struct N64CartLoader<S: SaveStorage, D = Md5Digest> {
    storage: S,
    save_memory: SaveMemory<S::File>,
    aspect_memory: AspectRatioMemory,
    _digest: std::marker::PhantomData<D>,
}

impl<S: SaveStorage, D: ContentDigest + Default> N64CartLoader<S, D> {
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            save_memory: SaveMemory::new(),
            aspect_memory: AspectRatioMemory::new(),
            _digest: std::marker::PhantomData,
        }
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub fn save_memory(&self) -> &SaveMemory<S::File> {
        &self.save_memory
    }

    /// Stream an N64 ROM to the hardware, detect its properties, and mount its save memory.
    ///
    /// Save memory from the previous ROM is unmounted before anything else happens, including
    /// when the load fails. The transfer is only reported complete once save memory for the new
    /// ROM is mounted.
    ///
    /// # Errors
    ///
    /// Will return an error if the ROM is smaller than its 4KB header or cannot be read. Nothing
    /// is mounted in that case.
    pub fn load_rom<Rd, O, R, T, H>(
        &mut self,
        rom: RomSource<'_, Rd>,
        ctx: LoadContext<'_, O, R, T, H>,
    ) -> Result<LoadReport, RomLoadError>
    where
        Rd: Read,
        O: OptionStore + ?Sized,
        R: ResourceReader,
        T: RomTransport + ?Sized,
        H: HostControl + ?Sized,
    {
        let LoadContext { options, resources, transport, host } = ctx;
        let RomSource { name, mut reader, index } = rom;

        self.save_memory.unmount_all();

        log::info!("Loading N64 ROM '{name}'");
        transport.begin_transfer(index);
        let streamed = match stream_rom::<_, D, _>(&mut reader, transport) {
            Ok(streamed) => streamed,
            Err(err) => {
                transport.end_transfer();
                return Err(err);
            }
        };

        let identity = CartridgeIdentity {
            header: streamed.header,
            header_hash: streamed.header_hash,
            content_hash: streamed.content_hash,
        };

        let header = &identity.header;
        log::info!(
            "Cart ID: {}, internal name: \"{}\"",
            header.cart_id.as_ref().map_or("(none)", |cart_id| cart_id.as_str()),
            header.internal_name
        );

        let auto_detect = options.is_auto_detect_enabled();
        let detection =
            Detector::new(resources, &mut *options, &mut self.aspect_memory).detect(&identity);

        let summary = auto_detect.then(|| {
            let summary = LoadSummary::build(&identity.header, detection.outcome, &*options);
            host.show_info(&summary.to_string(), summary.duration());
            summary
        });

        let saves_created = self.save_memory.mount_all(&mut self.storage, name, &*options);
        transport.end_transfer();

        if saves_created {
            log::info!("New save files created, resetting");
            host.pulse_reset(RESET_HOLD);
        }

        Ok(LoadReport {
            byte_order: streamed.byte_order,
            identity,
            crc32: streamed.crc32,
            rom_len: streamed.len,
            detection,
            summary,
            saves_created,
        })
    }

    /// Stream a non-N64 image (a Game Boy cartridge for the Transfer Pak) without any byte order
    /// normalization or detection. Mounted save memory is left alone.
    ///
    /// Returns the number of bytes streamed.
    ///
    /// # Errors
    ///
    /// Will return an error if the image cannot be read.
    pub fn load_passthrough<Rd, T>(
        &mut self,
        rom: RomSource<'_, Rd>,
        transport: &mut T,
    ) -> Result<u64, RomLoadError>
    where
        Rd: Read,
        T: RomTransport + ?Sized,
    {
        let RomSource { name, mut reader, index } = rom;
        log::info!(
            "Streaming '{name}' without N64 processing, {} save regions stay mounted",
            self.save_memory.regions().len()
        );

        transport.begin_transfer(index);

        let mut chunk = vec![0; CHUNK_LEN];
        let mut len = 0_u64;
        let result = loop {
            match read_chunk(&mut reader, &mut chunk) {
                Ok(0) => break Ok(len),
                Ok(chunk_len) => {
                    transport.push_chunk(&chunk[..chunk_len]);
                    len += chunk_len as u64;
                }
                Err(err) => break Err(RomLoadError::Io(err)),
            }
        };

        transport.end_transfer();
        result
    }

    pub fn serve_read<T: BlockTransport + ?Sized>(
        &mut self,
        request: BlockRequest,
        transport: &mut T,
    ) {
        self.save_memory.serve_read(request, transport);
    }

    pub fn serve_write<T: BlockTransport + ?Sized>(
        &mut self,
        request: BlockRequest,
        transport: &mut T,
    ) {
        self.save_memory.serve_write(request, transport);
    }
}
