//! Open-file handle table (§4.7, C7).
//!
//! §9 calls the reference's "cast a pointer to an integer" handle scheme a
//! hack to replace with "an index into a stable table (slot-generation
//! pair) so that stale handles are detected rather than producing undefined
//! behavior." [`FileHandle`] is exactly that pair; [`FileTable`] is the
//! slot table plus the path-keyed index §4.7 also asks for, so that a
//! second `open` of an already-open path can find and share the existing
//! entry in O(1).

use std::collections::HashMap;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::path::to_lower;

/// Opaque handle to an open file. Equality is by `(index, generation)`, so
/// a handle outlived by a `close` is rejected rather than aliasing whatever
/// later reused the same slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileHandle {
    index: usize,
    generation: u32,
}

pub struct OpenFile {
    pub path: String,
    pub backend: Backend,
    refcount: u32,
}

impl OpenFile {
    pub fn refcount(&self) -> u32 {
        self.refcount
    }
}

enum Slot {
    Empty { generation: u32 },
    Occupied { generation: u32, entry: OpenFile },
}

#[derive(Default)]
pub struct FileTable {
    slots: Vec<Slot>,
    free: Vec<usize>,
    by_path: HashMap<String, usize>,
}

impl FileTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute lower-cased key already has an open entry.
    pub fn find_open(&self, path: &str) -> Option<FileHandle> {
        let key = to_lower(path);
        self.by_path.get(&key).map(|&index| {
            let generation = match &self.slots[index] {
                Slot::Occupied { generation, .. } => *generation,
                Slot::Empty { .. } => unreachable!("by_path points at an occupied slot"),
            };
            FileHandle { index, generation }
        })
    }

    /// Bump the refcount of an already-open entry and return its handle.
    pub fn share(&mut self, path: &str) -> Option<FileHandle> {
        let key = to_lower(path);
        let &index = self.by_path.get(&key)?;
        match &mut self.slots[index] {
            Slot::Occupied { generation, entry } => {
                entry.refcount += 1;
                Some(FileHandle { index, generation: *generation })
            }
            Slot::Empty { .. } => None,
        }
    }

    /// Insert a brand new entry (refcount starts at 1, §3 "Open file").
    pub fn insert(&mut self, path: String, backend: Backend) -> FileHandle {
        let key = to_lower(&path);
        let entry = OpenFile { path, backend, refcount: 1 };
        let index = match self.free.pop() {
            Some(index) => {
                let generation = match &self.slots[index] {
                    Slot::Empty { generation } => *generation,
                    Slot::Occupied { .. } => unreachable!("free list points at an occupied slot"),
                };
                self.slots[index] = Slot::Occupied { generation, entry };
                index
            }
            None => {
                self.slots.push(Slot::Occupied { generation: 0, entry });
                self.slots.len() - 1
            }
        };
        let generation = match &self.slots[index] {
            Slot::Occupied { generation, .. } => *generation,
            Slot::Empty { .. } => unreachable!(),
        };
        self.by_path.insert(key, index);
        FileHandle { index, generation }
    }

    fn validate(&self, handle: FileHandle) -> Result<&OpenFile> {
        match self.slots.get(handle.index) {
            Some(Slot::Occupied { generation, entry }) if *generation == handle.generation => Ok(entry),
            _ => Err(Error::InvalidParameter("stale or unknown file handle".to_owned())),
        }
    }

    fn validate_mut(&mut self, handle: FileHandle) -> Result<&mut OpenFile> {
        match self.slots.get_mut(handle.index) {
            Some(Slot::Occupied { generation, entry }) if *generation == handle.generation => Ok(entry),
            _ => Err(Error::InvalidParameter("stale or unknown file handle".to_owned())),
        }
    }

    pub fn get(&self, handle: FileHandle) -> Result<&OpenFile> {
        self.validate(handle)
    }

    pub fn get_mut(&mut self, handle: FileHandle) -> Result<&mut OpenFile> {
        self.validate_mut(handle)
    }

    /// Decrement the refcount; remove the entry when it reaches zero
    /// (§4.7 "close"). Returns whether the entry was actually removed.
    pub fn close(&mut self, handle: FileHandle) -> Result<bool> {
        let remove = {
            let entry = self.validate_mut(handle)?;
            entry.refcount -= 1;
            entry.refcount == 0
        };
        if remove {
            let path = match &self.slots[handle.index] {
                Slot::Occupied { entry, .. } => entry.path.clone(),
                Slot::Empty { .. } => unreachable!(),
            };
            self.by_path.remove(&to_lower(&path));
            let next_generation = handle.generation.wrapping_add(1);
            self.slots[handle.index] = Slot::Empty { generation: next_generation };
            self.free.push(handle.index);
        }
        Ok(remove)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// Entries with refcount 0 shouldn't normally exist (`close` removes
    /// them immediately), but `flush` (§5) is specified to sweep them
    /// defensively in case a future backend separates the pool from the
    /// handle space.
    pub fn flush(&mut self) {
        let stale: Vec<FileHandle> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied { generation, entry } if entry.refcount == 0 => {
                    Some(FileHandle { index, generation: *generation })
                }
                _ => None,
            })
            .collect();
        for handle in stale {
            let _ = self.close(handle);
        }
    }

    pub fn iter_open(&self) -> impl Iterator<Item = &OpenFile> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Occupied { entry, .. } => Some(entry),
            Slot::Empty { .. } => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::host::HostFileBackend;

    fn host_backend() -> Backend {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        Backend::Host(HostFileBackend::open(tmp.path(), true).unwrap())
    }

    #[test]
    fn open_share_close_round_trips() {
        let mut table = FileTable::new();
        let h1 = table.insert("/x.bin".to_owned(), host_backend());
        assert_eq!(table.get(h1).unwrap().refcount(), 1);

        let h2 = table.share("/x.bin").unwrap();
        assert_eq!(table.get(h1).unwrap().refcount(), 2);
        assert_eq!(h1, h2);

        assert!(!table.close(h1).unwrap());
        assert_eq!(table.get(h2).unwrap().refcount(), 1);
        assert!(table.close(h2).unwrap());
        assert!(table.is_empty());
    }

    #[test]
    fn stale_handle_rejected_after_close() {
        let mut table = FileTable::new();
        let h1 = table.insert("/x.bin".to_owned(), host_backend());
        table.close(h1).unwrap();
        assert!(matches!(table.get(h1), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut table = FileTable::new();
        let h1 = table.insert("/X.bin".to_owned(), host_backend());
        let h2 = table.find_open("/x.bin").unwrap();
        assert_eq!(h1, h2);
    }

}
