//! The two open-file backends (§4.8, §4.9), joined into one closed sum type
//! per §9 "Polymorphism": `File = HostFile | ArchiveFile`, a tagged variant
//! with a common capability set, rather than a trait object — there will
//! never be a third backend kind, so an enum is the honest representation.

pub mod archive_file;
pub mod host;

use std::io::SeekFrom;

use archive_file::ArchiveFileBackend;
use host::HostFileBackend;

use crate::error::Result;

pub enum Backend {
    Host(HostFileBackend),
    Archive(ArchiveFileBackend),
}

impl Backend {
    pub fn is_archived(&self) -> bool {
        matches!(self, Backend::Archive(_))
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self {
            Backend::Host(b) => b.read(buf),
            Backend::Archive(b) => b.read(buf),
        }
    }

    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        match self {
            Backend::Host(b) => b.write(buf),
            Backend::Archive(b) => b.write(buf),
        }
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        match self {
            Backend::Host(b) => b.seek(pos),
            Backend::Archive(b) => b.seek(pos),
        }
    }

    pub fn tell(&mut self) -> Result<u64> {
        match self {
            Backend::Host(b) => b.seek(SeekFrom::Current(0)),
            Backend::Archive(b) => Ok(b.tell()),
        }
    }

    pub fn resize(&mut self, new_size: u64) -> Result<()> {
        match self {
            Backend::Host(b) => b.resize(new_size),
            Backend::Archive(b) => b.resize(new_size),
        }
    }

    pub fn size(&self) -> Result<u64> {
        match self {
            Backend::Host(b) => b.size(),
            Backend::Archive(b) => Ok(b.size()),
        }
    }
}
