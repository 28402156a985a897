//! Open-archive cache (§4.5 step 7 "activate", §3 "Open archive", C5).
//!
//! The reference keeps a stored reference count per archive, bumped and
//! decremented by hand as archive-file handles come and go. Per §9's note
//! ("derived refcount is computed, not stored"), this cache instead relies
//! on `Rc::strong_count`: every archive-file backend holds a clone of the
//! `Rc<Archive>`, the cache holds one more `Rc` to keep the archive alive
//! while it's merely cached, and `flush` evicts entries whose strong count
//! has fallen back to 1 (only the cache's own `Rc` remains).

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use crate::archive::Archive;
use crate::error::Result;
use crate::filter::FilterRegistry;
use crate::path::to_lower;

#[derive(Default)]
pub struct ArchiveCache {
    open: HashMap<String, Rc<Archive>>,
}

impl ArchiveCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the archive already open at `path`, or parse and cache it.
    pub fn get_or_open(&mut self, path: &Path, registry: &FilterRegistry) -> Result<Rc<Archive>> {
        let key = to_lower(&path.to_string_lossy());
        if let Some(archive) = self.open.get(&key) {
            return Ok(Rc::clone(archive));
        }
        tracing::debug!(path = %path.display(), "parsing archive");
        let archive = Rc::new(Archive::open(path, registry)?);
        self.open.insert(key, Rc::clone(&archive));
        Ok(archive)
    }

    /// Number of archive-file handles currently referencing `archive`,
    /// i.e. `Rc::strong_count - 1` (the `-1` excludes the cache's own hold).
    pub fn live_references(archive: &Rc<Archive>) -> usize {
        Rc::strong_count(archive) - 1
    }

    /// Evict every cached archive with zero live references (§5 "flush").
    pub fn flush(&mut self) {
        self.open.retain(|path, archive| {
            let live = Self::live_references(archive);
            if live == 0 {
                tracing::trace!(path, "evicting archive from cache");
            }
            live > 0
        });
    }

    /// Force-release everything, warning about anything still referenced
    /// (§5 "shutdown ... warns about leaked files/archives and force-releases them").
    pub fn shutdown(&mut self) {
        for (path, archive) in self.open.iter() {
            let live = Self::live_references(archive);
            if live > 0 {
                tracing::warn!(path, live, "archive still referenced at shutdown");
            }
        }
        self.open.clear();
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::test_support::build_archive_bytes;
    use std::io::Write;

    #[test]
    fn flush_evicts_only_unreferenced() {
        let mut registry = FilterRegistry::new();
        registry.register(Box::new(crate::filter::NullPass)).unwrap();

        let bytes = build_archive_bytes(&[("a", &[("b.txt", b"hi")])]);
        let mut tmp_a = tempfile::NamedTempFile::new().unwrap();
        tmp_a.write_all(&bytes).unwrap();
        let mut tmp_b = tempfile::NamedTempFile::new().unwrap();
        tmp_b.write_all(&bytes).unwrap();

        let mut cache = ArchiveCache::new();
        let archive_a = cache.get_or_open(tmp_a.path(), &registry).unwrap();
        let archive_b_held = cache.get_or_open(tmp_b.path(), &registry).unwrap();

        drop(archive_a);
        assert_eq!(cache.len(), 2);
        cache.flush();
        assert_eq!(cache.len(), 1);
        drop(archive_b_held);
    }
}
