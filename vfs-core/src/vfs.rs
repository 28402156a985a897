//! The top-level `Vfs` struct (§4.6, C6) — "the hard part": ties the filter
//! registry, root-path list, archive cache and file handle table together
//! behind one owned struct, resolving logical paths per §4.6 and routing
//! open files to a host-file or archive-file backend.
//!
//! §9 calls out the reference's process-wide mutable state (filter
//! registry, roots, archive cache, handle table, all unguarded globals) as
//! something to redesign. Here that state is just fields of `Vfs`; there is
//! no subsystem lifecycle to mismanage because construction *is*
//! initialization and `Drop` (via `shutdown`) *is* teardown — `NotInitializedYet`
//! and `AlreadyInitialized` are consequently unreachable through this API,
//! kept in the error enum only for interface fidelity with §7.

use std::fs;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::archive::Archive;
use crate::backend::archive_file::ArchiveFileBackend;
use crate::backend::host::HostFileBackend;
use crate::backend::Backend;
use crate::cache::ArchiveCache;
use crate::error::{Error, Result};
use crate::filter::{Filter, FilterRegistry};
use crate::format::{canonicalize_archive_path, DEFAULT_ARCHIVE_EXTENSION};
use crate::handle::{FileHandle, FileTable};
use crate::iter;
use crate::model::{EntityInfo, EntityType, OpenMode};
use crate::path::{get_base_name, get_name, has_drive_letter_root, is_absolute, join, to_lower, SEPARATOR};
use crate::roots::RootPaths;

/// What an absolute path resolved to, before it's turned into either an
/// open handle (`open`) or an `EntityInfo` (`locate`/`iterate`).
enum Resolved {
    HostFile(PathBuf),
    HostDir(PathBuf),
    /// A host file whose path, once the archive extension is appended,
    /// exists — the archive addressed by its own root, not by prefix.
    HostArchiveRoot(PathBuf),
    ArchiveFile {
        archive: Rc<Archive>,
        info: EntityInfo,
        name: String,
    },
    ArchiveDir {
        archive: Rc<Archive>,
        dir_index: Option<usize>,
        info: EntityInfo,
    },
}

/// Owns every piece of process-wide state the reference implementation kept
/// as globals. A `Vfs` is ready to use the moment it's constructed and
/// releases everything when dropped or explicitly `shutdown`.
pub struct Vfs {
    filters: FilterRegistry,
    roots: RootPaths,
    archives: ArchiveCache,
    files: FileTable,
    archive_extension: String,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs {
    pub fn new() -> Self {
        Self {
            filters: FilterRegistry::new(),
            roots: RootPaths::new(),
            archives: ArchiveCache::new(),
            files: FileTable::new(),
            archive_extension: DEFAULT_ARCHIVE_EXTENSION.to_owned(),
        }
    }

    /// Override the default `.DAGN` archive extension (§4.4 "configurable
    /// constant").
    pub fn with_archive_extension(mut self, extension: impl Into<String>) -> Self {
        self.archive_extension = extension.into();
        self
    }

    pub fn register_filter(&mut self, filter: Box<dyn Filter>) -> Result<()> {
        self.filters.register(filter)
    }

    pub fn unregister_filter(&mut self, name: &str) -> Result<()> {
        self.filters.unregister_by_name(name)
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn add_root(&mut self, path: &str) -> Result<()> {
        self.roots.add(path)
    }

    pub fn remove_root(&mut self, path: &str) -> Result<()> {
        self.roots.remove_by_value(path)
    }

    pub fn roots(&self) -> &RootPaths {
        &self.roots
    }

    /// Every separator position in `abs` that may split it into an
    /// archive-file prefix and an in-archive remainder (§4.6): every
    /// position except 0, and except 2 when `abs` starts with a drive
    /// letter (so `X:/…` isn't misread as a split at the colon).
    fn separator_positions(abs: &str) -> Vec<usize> {
        let drive = has_drive_letter_root(abs);
        abs.char_indices()
            .filter(|&(i, c)| c == SEPARATOR && i != 0 && !(i == 2 && drive))
            .map(|(i, _)| i)
            .collect()
    }

    /// The absolute candidates for a logical path (§4.6 steps 2-3): the
    /// path itself if absolute, or its join against every root in order.
    fn candidate_absolute_paths(&self, path: &str) -> Result<Vec<String>> {
        if is_absolute(path) {
            return Ok(vec![path.to_owned()]);
        }
        if self.roots.is_empty() {
            return Err(Error::NoRootPathsDefined);
        }
        Ok(self.roots.iter().map(|root| join(root, path)).collect())
    }

    /// Open (from cache or disk) the archive named by `prefix` once the
    /// archive extension is appended, or `None` if no such host file exists.
    fn open_archive_for_prefix(&mut self, prefix: &str) -> Result<Option<Rc<Archive>>> {
        let canonical = canonicalize_archive_path(prefix, &self.archive_extension);
        let host_path = Path::new(&canonical);
        if !host_path.is_file() {
            return Ok(None);
        }
        Ok(Some(self.archives.get_or_open(host_path, &self.filters)?))
    }

    /// Resolve one absolute path to whatever it names on disk or inside an
    /// archive (§4.6 archive-prefix resolution). `None` means nothing at
    /// this absolute path matched at all.
    fn resolve_absolute(&mut self, abs: &str) -> Result<Option<Resolved>> {
        let host_path = Path::new(abs);
        if host_path.is_file() {
            return Ok(Some(Resolved::HostFile(host_path.to_path_buf())));
        }
        if host_path.is_dir() {
            return Ok(Some(Resolved::HostDir(host_path.to_path_buf())));
        }

        let as_archive_root = canonicalize_archive_path(abs, &self.archive_extension);
        if Path::new(&as_archive_root).is_file() {
            return Ok(Some(Resolved::HostArchiveRoot(PathBuf::from(as_archive_root))));
        }

        for i in Self::separator_positions(abs) {
            let prefix = &abs[..i];
            let remainder = to_lower(&abs[i + 1..]);
            let Some(archive) = self.open_archive_for_prefix(prefix)? else {
                continue;
            };
            if let Some((_, entry)) = archive.find_file(&remainder) {
                let info = archive.info_for_file(entry);
                return Ok(Some(Resolved::ArchiveFile { archive, info, name: remainder }));
            }
            if let Some(dir_idx) = archive.find_dir_index(&remainder) {
                let info = archive.info_for_dir(Some(dir_idx), "");
                return Ok(Some(Resolved::ArchiveDir { archive, dir_index: Some(dir_idx), info }));
            }
        }
        Ok(None)
    }

    /// Open `path` for reading (§4.6 steps 1-4). An already-open entry is
    /// shared (refcount bumped) rather than reopened.
    pub fn open(&mut self, path: &str, mode: OpenMode) -> Result<FileHandle> {
        let candidates = self.candidate_absolute_paths(path)?;
        for abs in &candidates {
            if let Some(handle) = self.files.share(abs) {
                return Ok(handle);
            }
        }
        for abs in &candidates {
            match self.resolve_absolute(abs)? {
                Some(Resolved::HostFile(p)) => {
                    let backend = Backend::Host(HostFileBackend::open(&p, false)?);
                    return Ok(self.files.insert(to_lower(abs), backend));
                }
                Some(Resolved::ArchiveFile { archive, info, name }) => {
                    if mode == OpenMode::ReadWrite {
                        return Err(Error::CantManipulateArchives(abs.clone()));
                    }
                    let backend = Backend::Archive(ArchiveFileBackend::open(archive, &name, &self.filters, &info)?);
                    return Ok(self.files.insert(to_lower(abs), backend));
                }
                _ => continue,
            }
        }
        Err(Error::NotFound(path.to_owned()))
    }

    /// Create (or truncate) a host file (§4.6 "Creation"). Targets the
    /// write root for relative paths, or `path` itself if absolute. The
    /// backing path is resolved with its original case (host filesystems
    /// are case-sensitive); the handle table key and reported path are
    /// lower-cased, per §3/§8.
    pub fn create(&mut self, path: &str) -> Result<FileHandle> {
        let abs = if is_absolute(path) {
            path.to_owned()
        } else {
            let root = self.roots.write_root().ok_or(Error::NoRootPathsDefined)?;
            join(root, path)
        };
        if let Some(handle) = self.files.share(&abs) {
            if self.files.get(handle)?.backend.is_archived() {
                self.files.close(handle)?;
                return Err(Error::CantManipulateArchives(abs));
            }
            let open_file = self.files.get_mut(handle)?;
            open_file.backend.resize(0)?;
            open_file.backend.seek(SeekFrom::Start(0))?;
            return Ok(handle);
        }
        let backend = Backend::Host(HostFileBackend::open(Path::new(&abs), true)?);
        Ok(self.files.insert(to_lower(&abs), backend))
    }

    pub fn close(&mut self, handle: FileHandle) -> Result<()> {
        self.files.close(handle)?;
        Ok(())
    }

    pub fn read(&mut self, handle: FileHandle, buf: &mut [u8]) -> Result<usize> {
        self.files.get_mut(handle)?.backend.read(buf)
    }

    pub fn write(&mut self, handle: FileHandle, buf: &[u8]) -> Result<usize> {
        self.files.get_mut(handle)?.backend.write(buf)
    }

    pub fn seek(&mut self, handle: FileHandle, pos: SeekFrom) -> Result<u64> {
        self.files.get_mut(handle)?.backend.seek(pos)
    }

    pub fn tell(&mut self, handle: FileHandle) -> Result<u64> {
        self.files.get_mut(handle)?.backend.tell()
    }

    pub fn resize(&mut self, handle: FileHandle, new_size: u64) -> Result<()> {
        self.files.get_mut(handle)?.backend.resize(new_size)
    }

    pub fn size(&self, handle: FileHandle) -> Result<u64> {
        self.files.get(handle)?.backend.size()
    }

    pub fn info(&self, handle: FileHandle) -> Result<EntityInfo> {
        let entry = self.files.get(handle)?;
        Ok(EntityInfo {
            kind: EntityType::File,
            archived: entry.backend.is_archived(),
            full_path: entry.path.clone(),
            leaf_name: get_name(&entry.path).to_owned(),
            size: entry.backend.size()?,
        })
    }

    /// Resolve `path` to an `EntityInfo` without opening a handle — used by
    /// `exists` and `iterate`, and exposed directly for queries that don't
    /// need a persistent handle.
    pub fn locate(&mut self, path: &str) -> Result<EntityInfo> {
        let candidates = self.candidate_absolute_paths(path)?;
        for abs in &candidates {
            if let Some(resolved) = self.resolve_absolute(abs)? {
                return self.entity_info_for(abs, resolved);
            }
        }
        Err(Error::NotFound(path.to_owned()))
    }

    /// Builds the `EntityInfo` reported for a resolved path. `abs` keeps its
    /// original case for any filesystem call still needed (`fs::metadata`);
    /// `full_path` is always the lower-cased resolution, per §3/§8.
    fn entity_info_for(&self, abs: &str, resolved: Resolved) -> Result<EntityInfo> {
        let full_path = to_lower(abs);
        match resolved {
            Resolved::HostFile(p) => {
                let meta = fs::metadata(&p)?;
                Ok(EntityInfo {
                    kind: EntityType::File,
                    archived: false,
                    leaf_name: get_name(&full_path).to_owned(),
                    full_path,
                    size: meta.len(),
                })
            }
            Resolved::HostDir(_) => Ok(EntityInfo {
                kind: EntityType::Directory,
                archived: false,
                leaf_name: get_name(&full_path).to_owned(),
                full_path,
                size: 0,
            }),
            Resolved::HostArchiveRoot(_) => Ok(EntityInfo {
                kind: EntityType::Archive,
                archived: false,
                leaf_name: get_base_name(&full_path).to_owned(),
                full_path,
                size: 0,
            }),
            Resolved::ArchiveDir { info, .. } => Ok(EntityInfo { full_path, ..info }),
            Resolved::ArchiveFile { info, .. } => Ok(EntityInfo { full_path, ..info }),
        }
    }

    pub fn exists(&mut self, path: &str) -> bool {
        self.locate(path).is_ok()
    }

    /// Enumerate the children of `path` (§4.11). `cb` returning `false`
    /// halts iteration immediately; that is not an error.
    pub fn iterate(&mut self, path: &str, recursive: bool, mut cb: impl FnMut(&EntityInfo) -> bool) -> Result<()> {
        let candidates = self.candidate_absolute_paths(path)?;
        for abs in &candidates {
            let Some(resolved) = self.resolve_absolute(abs)? else {
                continue;
            };
            return match resolved {
                Resolved::HostDir(p) => {
                    iter::iterate_host_dir(&p, &self.archive_extension, recursive, &mut cb)?;
                    Ok(())
                }
                Resolved::HostArchiveRoot(p) => {
                    let archive = self.archives.get_or_open(&p, &self.filters)?;
                    iter::iterate_archive_dir(&archive, None, recursive, &mut cb);
                    Ok(())
                }
                Resolved::ArchiveDir { archive, dir_index, .. } => {
                    iter::iterate_archive_dir(&archive, dir_index, recursive, &mut cb);
                    Ok(())
                }
                Resolved::HostFile(_) | Resolved::ArchiveFile { .. } => {
                    Err(Error::InvalidParameter(format!("{path} is not a directory")))
                }
            };
        }
        Err(Error::NotFound(path.to_owned()))
    }

    /// Opportunistic collector (§5): evict stale zero-refcount file
    /// entries, then evict archives with zero live references.
    pub fn flush(&mut self) {
        self.files.flush();
        self.archives.flush();
    }

    /// Flush, then force-release anything left and warn about the leak
    /// (§5 "shutdown ... warns about leaked files/archives").
    pub fn shutdown(mut self) {
        self.flush();
        for open_file in self.files.iter_open() {
            tracing::warn!(path = %open_file.path, "file handle still open at shutdown");
        }
        self.archives.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::test_support::build_archive_bytes;
    use crate::filter::NullPass;

    fn vfs_with_root() -> (Vfs, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut vfs = Vfs::new();
        vfs.register_filter(Box::new(NullPass)).unwrap();
        vfs.add_root(dir.path().to_str().unwrap()).unwrap();
        (vfs, dir)
    }

    #[test]
    fn opens_plain_host_file_by_relative_path() {
        let (mut vfs, dir) = vfs_with_root();
        fs::write(dir.path().join("foo.bin"), b"hello").unwrap();

        let handle = vfs.open("foo.bin", OpenMode::Read).unwrap();
        let mut buf = [0u8; 5];
        vfs.read(handle, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
        let info = vfs.info(handle).unwrap();
        assert!(!info.archived);
    }

    #[test]
    fn second_root_is_searched_when_first_misses() {
        let dir1 = tempfile::tempdir().unwrap();
        let dir2 = tempfile::tempdir().unwrap();
        let mut vfs = Vfs::new();
        vfs.add_root(dir1.path().to_str().unwrap()).unwrap();
        vfs.add_root(dir2.path().to_str().unwrap()).unwrap();
        fs::write(dir2.path().join("foo.bin"), [0xDE, 0xAD, 0xBE, 0xEF]).unwrap();

        let handle = vfs.open("foo.bin", OpenMode::Read).unwrap();
        let info = vfs.info(handle).unwrap();
        let expected = join(&to_lower(dir2.path().to_str().unwrap()), "foo.bin");
        assert_eq!(info.full_path, expected);
    }

    #[test]
    fn full_path_is_lower_cased_even_for_mixed_case_input() {
        let (mut vfs, dir) = vfs_with_root();
        fs::write(dir.path().join("Foo.BIN"), b"hi").unwrap();

        let handle = vfs.open("Foo.BIN", OpenMode::Read).unwrap();
        let info = vfs.info(handle).unwrap();
        assert_eq!(info.full_path, to_lower(&info.full_path));

        let located = vfs.locate("Foo.BIN").unwrap();
        assert_eq!(located.full_path, to_lower(&located.full_path));
    }

    #[test]
    fn archive_prefix_resolution_opens_nested_file() {
        let (mut vfs, dir) = vfs_with_root();
        let bytes = build_archive_bytes(&[("ui", &[("button.png", b"pixels")])]);
        fs::write(dir.path().join("pack.DAGN"), &bytes).unwrap();

        let handle = vfs.open("pack/ui/button.png", OpenMode::Read).unwrap();
        let mut buf = Vec::new();
        loop {
            let mut chunk = [0u8; 8];
            let n = vfs.read(handle, &mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        assert_eq!(buf, b"pixels");

        assert!(vfs.exists("pack/ui"));
        assert!(!vfs.exists("pack/ui/nonexistent"));
    }

    #[test]
    fn double_open_shares_and_close_releases() {
        let (mut vfs, dir) = vfs_with_root();
        fs::write(dir.path().join("x.bin"), b"abc").unwrap();

        let h1 = vfs.open("x.bin", OpenMode::Read).unwrap();
        let h2 = vfs.open("x.bin", OpenMode::Read).unwrap();
        assert_eq!(h1, h2);

        vfs.close(h1).unwrap();
        // still valid: h2 still holds a reference.
        assert!(vfs.tell(h2).is_ok());
        vfs.close(h2).unwrap();
        assert!(vfs.tell(h2).is_err());
    }

    #[test]
    fn write_on_archive_backed_handle_is_rejected() {
        let (mut vfs, dir) = vfs_with_root();
        let bytes = build_archive_bytes(&[("a", &[("b.txt", b"hello")])]);
        fs::write(dir.path().join("pack.DAGN"), &bytes).unwrap();

        let handle = vfs.open("pack/a/b.txt", OpenMode::Read).unwrap();
        assert!(matches!(vfs.write(handle, b"x"), Err(Error::CantManipulateArchives(_))));
    }

    #[test]
    fn flush_evicts_only_archives_with_no_live_handles() {
        let (mut vfs, dir) = vfs_with_root();
        let bytes = build_archive_bytes(&[("a", &[("b.txt", b"one")]), ("c", &[("d.txt", b"two")])]);
        fs::write(dir.path().join("left.DAGN"), &bytes).unwrap();
        fs::write(dir.path().join("right.DAGN"), &bytes).unwrap();

        let handle = vfs.open("right/a/b.txt", OpenMode::Read).unwrap();
        assert!(vfs.exists("left/a/b.txt"));

        vfs.flush();
        // `left` had no handle kept open past the `exists` check, so it's evicted;
        // `right` is still referenced by `handle`.
        assert_eq!(vfs.archives.len(), 1);

        vfs.close(handle).unwrap();
        vfs.flush();
        assert_eq!(vfs.archives.len(), 0);
    }

    #[test]
    fn create_on_open_archive_backed_path_rejects_without_leaking_refcount() {
        let (mut vfs, dir) = vfs_with_root();
        let bytes = build_archive_bytes(&[("a", &[("b.txt", b"hello")])]);
        fs::write(dir.path().join("pack.DAGN"), &bytes).unwrap();

        let handle = vfs.open("pack/a/b.txt", OpenMode::Read).unwrap();
        assert!(matches!(vfs.create("pack/a/b.txt"), Err(Error::CantManipulateArchives(_))));
        // the rejected `create`'s share must have been undone: a single `close`
        // of the original handle fully releases the entry.
        vfs.close(handle).unwrap();
        assert!(vfs.tell(handle).is_err());
    }

    #[test]
    fn create_then_write_then_reopen_reads_back() {
        let (mut vfs, _dir) = vfs_with_root();
        let handle = vfs.create("new.bin").unwrap();
        vfs.write(handle, b"written").unwrap();
        vfs.close(handle).unwrap();

        let handle2 = vfs.open("new.bin", OpenMode::Read).unwrap();
        vfs.seek(handle2, SeekFrom::Start(0)).unwrap();
        let mut buf = [0u8; 7];
        vfs.read(handle2, &mut buf).unwrap();
        assert_eq!(&buf, b"written");
    }

    #[test]
    fn iterate_host_dir_and_archive_dir() {
        let (mut vfs, dir) = vfs_with_root();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        let bytes = build_archive_bytes(&[("inner", &[("f.txt", b"x")])]);
        fs::write(dir.path().join("pack.DAGN"), &bytes).unwrap();

        let mut names = Vec::new();
        let root = dir.path().to_str().unwrap().to_owned();
        vfs.iterate(&root, false, |info| {
            names.push(info.leaf_name.clone());
            true
        })
        .unwrap();
        assert!(names.contains(&"a.txt".to_owned()));
        assert!(names.contains(&"pack".to_owned()));

        let mut inner_names = Vec::new();
        vfs.iterate("pack/inner", false, |info| {
            inner_names.push(info.leaf_name.clone());
            true
        })
        .unwrap();
        assert_eq!(inner_names, vec!["f.txt"]);
    }
}
