//! Archive container: in-memory tables (§3 "Archive (in memory)") and the
//! parser that builds them (§4.5, C4).

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::decode::{self, FilterLink};
use crate::error::{Error, Result};
use crate::filter::FilterRegistry;
use crate::format::{self, RawDirRecord, RawFileRecord, RawFilterRecord, RawHeader, ROOT_MARKER};
use crate::model::{EntityInfo, EntityType};
use crate::path::to_lower;

#[derive(Clone, Debug)]
pub struct ArchiveDir {
    pub full_name_lower: String,
    pub parent_index: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct ArchiveFileEntry {
    pub full_name_lower: String,
    pub parent_dir_index: Option<usize>,
    pub data_offset: u64,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
}

/// A parsed `.DAGN` archive. Holds its own backing-file handle so decoding
/// a file later doesn't need to reopen the path.
pub struct Archive {
    pub path: PathBuf,
    pub(crate) filters: Vec<FilterLink>,
    pub(crate) dirs: Vec<ArchiveDir>,
    dir_index: HashMap<String, usize>,
    pub(crate) files: Vec<ArchiveFileEntry>,
    file_index: HashMap<String, usize>,
    backing: std::cell::RefCell<BufReader<File>>,
}

impl Archive {
    /// Parse the archive at `path` (§4.5). `registry` resolves filter
    /// names; a name the registry doesn't know fails the whole open with
    /// `MissingFilters`.
    pub fn open(path: &Path, registry: &FilterRegistry) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let header = RawHeader::read(&mut reader)?;

        let filter_records: Vec<RawFilterRecord> =
            crate::bin::read_many(&mut reader, header.num_filters as usize)?;
        let dir_records: Vec<RawDirRecord> = crate::bin::read_many(&mut reader, header.num_dirs as usize)?;
        let file_records: Vec<RawFileRecord> = crate::bin::read_many(&mut reader, header.num_files as usize)?;

        let filter_names: Vec<String> = filter_records.iter().map(RawFilterRecord::name).collect::<Result<_>>()?;
        let missing: Vec<String> = filter_names.iter().filter(|n| !registry.exists(n)).cloned().collect();
        if !missing.is_empty() {
            return Err(Error::MissingFilters(missing));
        }

        let mut file_data_offset = format::header_size()
            + filter_records.len() * format::filter_record_size()
            + dir_records.len() * format::dir_record_size()
            + file_records.len() * format::file_record_size();

        let mut chain = Vec::with_capacity(filter_names.len());
        for name in &filter_names {
            let filter = registry.get(name).expect("checked above");
            let config_size = filter.config_size() as usize;
            let mut config = vec![0u8; config_size];
            reader.read_exact(&mut config)?;
            chain.push(FilterLink { name: name.clone(), config });
            file_data_offset += config_size;
        }

        let dirs = Self::build_dir_table(&dir_records)?;
        let mut dir_index = HashMap::with_capacity(dirs.len());
        for (i, dir) in dirs.iter().enumerate() {
            dir_index.insert(dir.full_name_lower.clone(), i);
        }

        let mut files = Vec::with_capacity(file_records.len());
        let mut file_index = HashMap::with_capacity(file_records.len());
        let mut offset = file_data_offset as u64;
        for rec in &file_records {
            let parent_dir_index = if rec.dir_index == ROOT_MARKER {
                None
            } else {
                let idx = rec.dir_index as usize;
                if idx >= dirs.len() {
                    return Err(Error::InvalidArchiveFormat(format!(
                        "file dir_index {idx} out of range"
                    )));
                }
                Some(idx)
            };
            let raw_name = rec.name()?;
            let full_name = match parent_dir_index {
                Some(i) => format!("{}/{}", dirs[i].full_name_lower, to_lower(&raw_name)),
                None => to_lower(&raw_name),
            };
            let entry = ArchiveFileEntry {
                full_name_lower: full_name.clone(),
                parent_dir_index,
                data_offset: offset,
                compressed_size: rec.compressed_size,
                uncompressed_size: rec.uncompressed_size,
            };
            offset += rec.compressed_size as u64;
            file_index.insert(full_name, files.len());
            files.push(entry);
        }

        Ok(Self {
            path: path.to_path_buf(),
            filters: chain,
            dirs,
            dir_index,
            files,
            file_index,
            backing: std::cell::RefCell::new(reader),
        })
    }

    /// Post-process the raw dir records (§4.5 step 6): each entry's parent
    /// has a strictly smaller index (topologically ordered, parents first),
    /// so a single forward pass can build full lower-cased names by
    /// prefixing the already-resolved parent name.
    fn build_dir_table(records: &[RawDirRecord]) -> Result<Vec<ArchiveDir>> {
        let mut dirs: Vec<ArchiveDir> = Vec::with_capacity(records.len());
        for (i, rec) in records.iter().enumerate() {
            let raw_name = to_lower(&rec.name()?);
            let parent_index = if rec.parent_index == ROOT_MARKER {
                None
            } else {
                let idx = rec.parent_index as usize;
                if idx >= i {
                    return Err(Error::InvalidArchiveFormat(format!(
                        "dir {i} parent_index {idx} is not a smaller index (cycle or forward reference)"
                    )));
                }
                Some(idx)
            };
            let full_name = match parent_index {
                Some(p) => format!("{}/{}", dirs[p].full_name_lower, raw_name),
                None => raw_name,
            };
            dirs.push(ArchiveDir { full_name_lower: full_name, parent_index });
        }
        Ok(dirs)
    }

    pub fn exists_dir(&self, name: &str) -> bool {
        self.dir_index.contains_key(&to_lower(name))
    }

    pub fn exists_file(&self, name: &str) -> bool {
        self.file_index.contains_key(&to_lower(name))
    }

    pub fn find_dir_index(&self, name: &str) -> Option<usize> {
        self.dir_index.get(&to_lower(name)).copied()
    }

    pub fn find_file(&self, name: &str) -> Option<(usize, &ArchiveFileEntry)> {
        self.file_index.get(&to_lower(name)).map(|&i| (i, &self.files[i]))
    }

    pub fn dir(&self, index: usize) -> &ArchiveDir {
        &self.dirs[index]
    }

    pub fn file(&self, index: usize) -> &ArchiveFileEntry {
        &self.files[index]
    }

    /// Children of `parent` (`None` = archive root): (dir indices, file indices).
    pub fn children(&self, parent: Option<usize>) -> (Vec<usize>, Vec<usize>) {
        let dirs = self
            .dirs
            .iter()
            .enumerate()
            .filter(|(_, d)| d.parent_index == parent)
            .map(|(i, _)| i)
            .collect();
        let files = self
            .files
            .iter()
            .enumerate()
            .filter(|(_, f)| f.parent_dir_index == parent)
            .map(|(i, _)| i)
            .collect();
        (dirs, files)
    }

    /// Decode one file's payload (§4.10 steps 1-3): read its encoded bytes
    /// from the backing file, then fold the archive's filter chain over it.
    pub fn decode_file(&self, entry: &ArchiveFileEntry, registry: &FilterRegistry, info: &EntityInfo) -> Result<Vec<u8>> {
        let mut payload = vec![0u8; entry.compressed_size as usize];
        {
            let mut backing = self.backing.borrow_mut();
            backing.seek(SeekFrom::Start(entry.data_offset))?;
            backing.read_exact(&mut payload)?;
        }
        decode::decode(&self.filters, registry, payload, info)
    }

    pub fn info_for_dir(&self, index: Option<usize>, archive_leaf: &str) -> EntityInfo {
        match index {
            Some(i) => {
                let dir = &self.dirs[i];
                EntityInfo {
                    kind: EntityType::Directory,
                    archived: true,
                    full_path: dir.full_name_lower.clone(),
                    leaf_name: crate::path::get_name(&dir.full_name_lower).to_owned(),
                    size: 0,
                }
            }
            None => EntityInfo {
                kind: EntityType::Directory,
                archived: true,
                full_path: String::new(),
                leaf_name: archive_leaf.to_owned(),
                size: 0,
            },
        }
    }

    pub fn info_for_file(&self, entry: &ArchiveFileEntry) -> EntityInfo {
        EntityInfo {
            kind: EntityType::File,
            archived: true,
            full_path: entry.full_name_lower.clone(),
            leaf_name: crate::path::get_name(&entry.full_name_lower).to_owned(),
            size: entry.uncompressed_size as u64,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::io::Write;

    /// Build a minimal `.DAGN` archive in memory: `dirs` is `[(dir name, [(file name, contents)])]`.
    /// Only flat (single-level) archive roots are needed by this crate's tests.
    pub fn build_archive_bytes(dirs: &[(&str, &[(&str, &[u8])])]) -> Vec<u8> {
        let mut dir_records = Vec::new();
        let mut file_records = Vec::new();
        let mut payloads: Vec<Vec<u8>> = Vec::new();

        for (dir_idx, (dir_name, files)) in dirs.iter().enumerate() {
            dir_records.push(RawDirRecord::new(dir_name, ROOT_MARKER).unwrap());
            for (file_name, contents) in files.iter() {
                file_records.push((
                    *file_name,
                    dir_idx as u32,
                    contents.len() as u32,
                    contents.len() as u32,
                ));
                payloads.push(contents.to_vec());
            }
        }

        let header = RawHeader::new(0, dir_records.len() as u32, file_records.len() as u32);
        let mut out = Vec::new();
        header.write(&mut out).unwrap();
        for rec in &dir_records {
            crate::bin::write_struct(rec, &mut out).unwrap();
        }
        for (name, dir_index, uncompressed_size, compressed_size) in &file_records {
            let rec = RawFileRecord {
                name: {
                    let mut buf = [0u8; format::MAX_NAME_LENGTH];
                    buf[..name.len()].copy_from_slice(name.as_bytes());
                    buf
                },
                dir_index: *dir_index,
                uncompressed_size: *uncompressed_size,
                compressed_size: *compressed_size,
            };
            crate::bin::write_struct(&rec, &mut out).unwrap();
        }
        for payload in &payloads {
            out.write_all(payload).unwrap();
        }
        out
    }
}
