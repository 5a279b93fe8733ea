//! In-memory host collaborators for tests

use crate::header::FIRST_CHUNK_LEN;
use n64_common::frontend::{
    BlockTransport, HostControl, ResourceReader, RomTransport, SaveFile, SaveStorage,
};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::time::Duration;

/// First 4KB of a big-endian ROM with the given game code and revision and blank boot code
pub fn header_chunk(game_code: &[u8; 4], revision: u8) -> Box<[u8; FIRST_CHUNK_LEN]> {
    let mut chunk = Box::new([0; FIRST_CHUNK_LEN]);
    chunk[..4].copy_from_slice(&[0x80, 0x37, 0x12, 0x40]);
    chunk[0x3B..0x3F].copy_from_slice(game_code);
    chunk[0x3F] = revision;
    chunk
}

/// Event log shared between collaborators, for checking the order of host interactions
pub type EventLog = Rc<RefCell<Vec<String>>>;

fn record(events: Option<&EventLog>, event: impl Into<String>) {
    if let Some(events) = events {
        events.borrow_mut().push(event.into());
    }
}

#[derive(Debug, Default)]
pub struct MemResources {
    files: HashMap<String, String>,
}

impl MemResources {
    pub fn with(mut self, name: &str, contents: &str) -> Self {
        self.files.insert(name.into(), contents.into());
        self
    }
}

impl ResourceReader for MemResources {
    type Err = String;

    fn read_text(&mut self, name: &str) -> Result<String, Self::Err> {
        self.files.get(name).cloned().ok_or_else(|| format!("no such resource: {name}"))
    }
}

type SharedBytes = Rc<RefCell<Vec<u8>>>;

#[derive(Debug)]
pub struct MemFile(SharedBytes);

impl SaveFile for MemFile {
    type Err = String;

    fn len(&self) -> u64 {
        self.0.borrow().len() as u64
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Err> {
        let data = self.0.borrow();
        let start = (offset as usize).min(data.len());
        let len = buf.len().min(data.len() - start);
        buf[..len].copy_from_slice(&data[start..start + len]);
        Ok(len)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<(), Self::Err> {
        let mut file = self.0.borrow_mut();
        let end = offset as usize + data.len();
        if file.len() < end {
            file.resize(end, 0);
        }
        file[offset as usize..end].copy_from_slice(data);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemStorage {
    files: HashMap<String, SharedBytes>,
    fail_create: HashSet<String>,
    fail_open: HashSet<String>,
    events: Option<EventLog>,
    pub created: Vec<String>,
}

impl MemStorage {
    pub fn with_file(mut self, name: &str, contents: Vec<u8>) -> Self {
        self.files.insert(name.into(), Rc::new(RefCell::new(contents)));
        self
    }

    pub fn failing_create(mut self, name: &str) -> Self {
        self.fail_create.insert(name.into());
        self
    }

    pub fn failing_open(mut self, name: &str) -> Self {
        self.fail_open.insert(name.into());
        self
    }

    pub fn logging_to(mut self, events: &EventLog) -> Self {
        self.events = Some(Rc::clone(events));
        self
    }

    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.files.get(name).map(|file| file.borrow().clone())
    }
}

impl SaveStorage for MemStorage {
    type Err = String;
    type File = MemFile;

    fn exists(&mut self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    fn create(&mut self, name: &str, contents: &[u8]) -> Result<(), Self::Err> {
        if self.fail_create.contains(name) {
            return Err(format!("permission denied: {name}"));
        }

        self.files.insert(name.into(), Rc::new(RefCell::new(contents.to_vec())));
        self.created.push(name.into());
        record(self.events.as_ref(), format!("create {name}"));
        Ok(())
    }

    fn read_at(&mut self, name: &str, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Err> {
        let file = self.files.get(name).ok_or_else(|| format!("no such file: {name}"))?;
        MemFile(Rc::clone(file)).read_at(offset, buf)
    }

    fn open(&mut self, name: &str) -> Result<Self::File, Self::Err> {
        if self.fail_open.contains(name) {
            return Err(format!("file is locked: {name}"));
        }

        record(self.events.as_ref(), format!("open {name}"));
        self.files
            .get(name)
            .map(|file| MemFile(Rc::clone(file)))
            .ok_or_else(|| format!("no such file: {name}"))
    }
}

#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub transfer_index: Option<u8>,
    pub rom: Vec<u8>,
    pub chunk_lens: Vec<usize>,
    pub ended: bool,
    pub sent: Vec<(u32, Vec<u8>)>,
    pub inbound: VecDeque<Vec<u8>>,
    pub drained: Vec<u32>,
    events: Option<EventLog>,
}

impl RecordingTransport {
    pub fn logging_to(events: &EventLog) -> Self {
        Self { events: Some(Rc::clone(events)), ..Self::default() }
    }
}

impl RomTransport for RecordingTransport {
    fn begin_transfer(&mut self, index: u8) {
        self.transfer_index = Some(index);
        record(self.events.as_ref(), "begin transfer");
    }

    fn push_chunk(&mut self, chunk: &[u8]) {
        self.rom.extend_from_slice(chunk);
        self.chunk_lens.push(chunk.len());
    }

    fn end_transfer(&mut self) {
        self.ended = true;
        record(self.events.as_ref(), "end transfer");
    }
}

impl BlockTransport for RecordingTransport {
    fn send_block(&mut self, ack: u32, data: &[u8]) {
        self.sent.push((ack, data.to_vec()));
    }

    fn receive_block(&mut self, ack: u32, buf: &mut [u8]) {
        let data = self.inbound.pop_front().unwrap_or_default();
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        self.drained.push(ack);
    }
}

#[derive(Debug, Default)]
pub struct RecordingHost {
    pub resets: Vec<Duration>,
    pub messages: Vec<(String, Duration)>,
    events: Option<EventLog>,
}

impl RecordingHost {
    pub fn logging_to(events: &EventLog) -> Self {
        Self { events: Some(Rc::clone(events)), ..Self::default() }
    }
}

impl HostControl for RecordingHost {
    fn pulse_reset(&mut self, hold: Duration) {
        self.resets.push(hold);
        record(self.events.as_ref(), "reset");
    }

    fn show_info(&mut self, message: &str, duration: Duration) {
        self.messages.push((message.into(), duration));
    }
}
