//! Host-file backend (§4.8, C8): a thin adapter over an OS file stream.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};

pub struct HostFileBackend {
    file: File,
    read_only: bool,
}

impl HostFileBackend {
    /// Always tries read-write first, falling back to read-only (§4.8);
    /// `write` then consults `read_only` to decide whether to fail with
    /// `PermissionDenied`. `create` forces truncating read-write creation.
    pub fn open(path: &Path, create: bool) -> Result<Self> {
        if create {
            let file = OpenOptions::new().create(true).truncate(true).read(true).write(true).open(path)?;
            return Ok(Self { file, read_only: false });
        }
        match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => Ok(Self { file, read_only: false }),
            Err(_) => {
                let file = OpenOptions::new().read(true).open(path)?;
                Ok(Self { file, read_only: true })
            }
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Reading zero bytes, including at EOF, is never an error (§8).
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.file.read(buf)?)
    }

    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.read_only {
            return Err(Error::PermissionDenied("file was opened read-only".to_owned()));
        }
        Ok(self.file.write(buf)?)
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.file.seek(pos)?)
    }

    pub fn size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    pub fn resize(&mut self, new_size: u64) -> Result<()> {
        if self.read_only {
            return Err(Error::PermissionDenied("file was opened read-only".to_owned()));
        }
        Ok(self.file.set_len(new_size)?)
    }
}
