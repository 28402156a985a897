//! Archive-file backend (§4.9, C9): a read-only in-memory buffer decoded
//! once at construction time.

use std::io::SeekFrom;
use std::rc::Rc;

use crate::archive::Archive;
use crate::error::{Error, Result};
use crate::filter::FilterRegistry;
use crate::model::EntityInfo;

pub struct ArchiveFileBackend {
    /// Non-owning in the sense of §4.9: this `Rc` is what keeps the archive
    /// alive, but ownership of *when the archive goes away* is the cache's
    /// decision (§9), made via `Rc::strong_count`, not this backend's.
    archive: Rc<Archive>,
    data: Vec<u8>,
    cursor: usize,
}

impl ArchiveFileBackend {
    pub fn open(archive: Rc<Archive>, file_name: &str, registry: &FilterRegistry, info: &EntityInfo) -> Result<Self> {
        let (_, entry) = archive
            .find_file(file_name)
            .ok_or_else(|| Error::NotFound(file_name.to_owned()))?;
        let data = archive.decode_file(entry, registry, info)?;
        Ok(Self { archive, data, cursor: 0 })
    }

    pub fn archive(&self) -> &Rc<Archive> {
        &self.archive
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let available = &self.data[self.cursor..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.cursor += n;
        Ok(n)
    }

    pub fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(Error::CantManipulateArchives("archive-backed files are read-only".to_owned()))
    }

    pub fn resize(&mut self, _new_size: u64) -> Result<()> {
        Err(Error::CantManipulateArchives("archive-backed files are read-only".to_owned()))
    }

    /// Positions outside `[0, size]` are rejected (§4.9), unlike the host
    /// backend's OS-seek semantics.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let size = self.data.len() as i64;
        let target = match pos {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::End(n) => size + n,
            SeekFrom::Current(n) => self.cursor as i64 + n,
        };
        if target < 0 || target > size {
            return Err(Error::InvalidParameter(format!("seek position {target} out of range [0, {size}]")));
        }
        self.cursor = target as usize;
        Ok(self.cursor as u64)
    }

    pub fn tell(&self) -> u64 {
        self.cursor as u64
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::test_support::build_archive_bytes;
    use crate::filter::NullPass;
    use crate::model::EntityType;
    use std::io::Write as _;

    fn open_backend() -> ArchiveFileBackend {
        let bytes = build_archive_bytes(&[("a", &[("b.txt", b"hello")])]);
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&bytes).unwrap();
        let mut registry = FilterRegistry::new();
        registry.register(Box::new(NullPass)).unwrap();
        let archive = Rc::new(Archive::open(tmp.path(), &registry).unwrap());
        let info = EntityInfo {
            kind: EntityType::File,
            archived: true,
            full_path: "a/b.txt".to_owned(),
            leaf_name: "b.txt".to_owned(),
            size: 5,
        };
        ArchiveFileBackend::open(archive, "a/b.txt", &registry, &info).unwrap()
    }

    #[test]
    fn reads_decoded_bytes() {
        let mut backend = open_backend();
        let mut buf = [0u8; 5];
        assert_eq!(backend.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn write_and_resize_reject() {
        let mut backend = open_backend();
        assert!(matches!(backend.write(b"x"), Err(Error::CantManipulateArchives(_))));
        assert!(matches!(backend.resize(0), Err(Error::CantManipulateArchives(_))));
    }

    #[test]
    fn seek_past_end_is_invalid_parameter() {
        let mut backend = open_backend();
        assert!(matches!(backend.seek(SeekFrom::Start(6)), Err(Error::InvalidParameter(_))));
        assert!(backend.seek(SeekFrom::Start(5)).is_ok());
    }
}
