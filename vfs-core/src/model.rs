//! Data model types shared across the crate (§3).

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityType {
    File,
    Directory,
    Archive,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::File => write!(f, "file"),
            EntityType::Directory => write!(f, "directory"),
            EntityType::Archive => write!(f, "archive"),
        }
    }
}

/// Immutable description of a resolved entity. `archived` is true iff the
/// entity lives inside an archive; the archive container file itself is
/// never flagged archived. Directories report size 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityInfo {
    pub kind: EntityType,
    pub archived: bool,
    pub full_path: String,
    pub leaf_name: String,
    pub size: u64,
}

/// Which mode a file was opened in; drives whether writes are permitted and
/// whether an archive-backed path resolves at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    ReadWrite,
}
