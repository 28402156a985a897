//! Directory iteration (§4.11).
//!
//! The callback returns a `bool`: `false` halts iteration immediately and
//! is *not* an error (§5, §8) — kept as a plain `bool` here too, rather
//! than introducing a `Stop`/`Err` enum, since Rust already gives iteration
//! errors their own channel (`Result`) distinct from the callback's return
//! value; §9's complaint was about a C API overloading one signal for both.

use std::fs;
use std::path::Path;

use crate::archive::Archive;
use crate::error::Result;
use crate::model::{EntityInfo, EntityType};
use crate::path::get_base_name;

/// Host-side directory listing. A host *file* whose name ends in
/// `.{archive_extension}` classifies as `EntityType::Archive` (§4.11's
/// corrected rule — the reference mistakenly checks directory names).
/// Returns `Ok(false)` if the callback stopped iteration early.
pub fn iterate_host_dir(
    dir: &Path,
    archive_extension: &str,
    recursive: bool,
    cb: &mut dyn FnMut(&EntityInfo) -> bool,
) -> Result<bool> {
    let ext_suffix = format!(".{}", archive_extension.to_lowercase());
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();
        let is_dir = entry.file_type()?.is_dir();

        let is_archive = !is_dir && name.to_lowercase().ends_with(&ext_suffix);
        let kind = if is_archive {
            EntityType::Archive
        } else if is_dir {
            EntityType::Directory
        } else {
            EntityType::File
        };
        let size = if is_dir { 0 } else { entry.metadata()?.len() };
        let leaf_name = if is_archive { get_base_name(&name).to_owned() } else { name };

        let info = EntityInfo {
            kind,
            archived: false,
            full_path: path.to_string_lossy().into_owned(),
            leaf_name,
            size,
        };
        if !cb(&info) {
            return Ok(false);
        }
        if recursive && is_dir && !iterate_host_dir(&path, archive_extension, recursive, cb)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Archive-side directory listing: linear scan of the dir/file tables for
/// children of `dir_index` (`None` = archive root), in stored-table order
/// (§5 "Ordering guarantees"). Returns `false` if the callback stopped
/// iteration early.
pub fn iterate_archive_dir(
    archive: &Archive,
    dir_index: Option<usize>,
    recursive: bool,
    cb: &mut dyn FnMut(&EntityInfo) -> bool,
) -> bool {
    let (dirs, files) = archive.children(dir_index);
    for d in dirs {
        let info = archive.info_for_dir(Some(d), "");
        if !cb(&info) {
            return false;
        }
        if recursive && !iterate_archive_dir(archive, Some(d), recursive, cb) {
            return false;
        }
    }
    for f in files {
        let entry = archive.file(f);
        let info = archive.info_for_file(entry);
        if !cb(&info) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::test_support::build_archive_bytes;
    use crate::filter::FilterRegistry;

    #[test]
    fn host_dir_classifies_archive_file_not_directory() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("pack.DAGN"), b"anything").unwrap();
        std::fs::create_dir(tmp.path().join("pack_dir.DAGN")).unwrap();

        let mut kinds = Vec::new();
        iterate_host_dir(tmp.path(), "DAGN", false, &mut |info| {
            kinds.push((info.leaf_name.clone(), info.kind));
            true
        })
        .unwrap();

        assert!(kinds.contains(&("pack".to_owned(), EntityType::Archive)));
        assert!(kinds.contains(&("pack_dir.DAGN".to_owned(), EntityType::Directory)));
    }

    #[test]
    fn callback_false_halts_immediately() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.txt"), b"a").unwrap();
        std::fs::write(tmp.path().join("b.txt"), b"b").unwrap();

        let mut seen = 0;
        let completed = iterate_host_dir(tmp.path(), "DAGN", false, &mut |_info| {
            seen += 1;
            false
        })
        .unwrap();

        assert_eq!(seen, 1);
        assert!(!completed);
    }

    #[test]
    fn archive_dir_iterates_in_table_order() {
        let bytes = build_archive_bytes(&[("a", &[("b.txt", b"hi"), ("c.txt", b"yo")])]);
        let tmp_path = {
            use std::io::Write;
            let mut tmp = tempfile::NamedTempFile::new().unwrap();
            tmp.write_all(&bytes).unwrap();
            tmp.into_temp_path()
        };
        let registry = FilterRegistry::new();
        let archive = Archive::open(&tmp_path, &registry).unwrap();

        let mut names = Vec::new();
        iterate_archive_dir(&archive, None, true, &mut |info| {
            names.push(info.full_path.clone());
            true
        });
        assert_eq!(names, vec!["a", "a/b.txt", "a/c.txt"]);
    }
}
