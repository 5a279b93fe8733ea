//! File system backed save storage and database resources

use n64_common::frontend::{ResourceReader, SaveFile, SaveStorage};
use std::fs::{self, File};
use std::io;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsStorageError {
    #[error("Error opening '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Error creating '{path}': {source}")]
    Create {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Error reading '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Error writing '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
}

fn read_at(file: &mut File, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
    file.seek(SeekFrom::Start(offset))?;

    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }

    Ok(filled)
}

/// Save files stored flat in one directory
pub struct FsSaveStorage {
    dir: PathBuf,
}

impl FsSaveStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

pub struct FsSaveFile {
    file: File,
    path: PathBuf,
    len: u64,
}

impl SaveFile for FsSaveFile {
    type Err = FsStorageError;

    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Err> {
        read_at(&mut self.file, offset, buf).map_err(|source| FsStorageError::Read {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<(), Self::Err> {
        self.file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.write_all(data))
            .map_err(|source| FsStorageError::Write {
                path: self.path.display().to_string(),
                source,
            })?;

        self.len = self.len.max(offset + data.len() as u64);
        Ok(())
    }
}

impl SaveStorage for FsSaveStorage {
    type Err = FsStorageError;
    type File = FsSaveFile;

    fn exists(&mut self, name: &str) -> bool {
        self.path(name).is_file()
    }

    fn create(&mut self, name: &str, contents: &[u8]) -> Result<(), Self::Err> {
        let path = self.path(name);
        fs::write(&path, contents)
            .map_err(|source| FsStorageError::Create { path: path.display().to_string(), source })
    }

    fn read_at(&mut self, name: &str, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Err> {
        let path = self.path(name);
        let mut file = File::open(&path)
            .map_err(|source| FsStorageError::Open { path: path.display().to_string(), source })?;

        read_at(&mut file, offset, buf)
            .map_err(|source| FsStorageError::Read { path: path.display().to_string(), source })
    }

    fn open(&mut self, name: &str) -> Result<Self::File, Self::Err> {
        let path = self.path(name);
        let open_err =
            |source| FsStorageError::Open { path: path.display().to_string(), source };

        let file = File::options().read(true).write(true).open(&path).map_err(open_err)?;
        let len = file.metadata().map_err(open_err)?.len();

        Ok(FsSaveFile { file, path, len })
    }
}

/// Text resources (ROM databases) read from a directory
pub struct FsResources {
    dir: PathBuf,
}

impl FsResources {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }
}

impl ResourceReader for FsResources {
    type Err = FsStorageError;

    fn read_text(&mut self, name: &str) -> Result<String, Self::Err> {
        let path = self.dir.join(name);
        let bytes = fs::read(&path)
            .map_err(|source| FsStorageError::Read { path: path.display().to_string(), source })?;

        // Comments are free text and are not always UTF-8
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
