//! Virtual file system unifying host directories and `.DAGN` archives under
//! one logical path namespace (§1, §2).
//!
//! The public entry point is [`Vfs`]: construct one, register filters,
//! add root paths, then `open`/`create`/`read`/`write`/`iterate` logical
//! paths without caring whether they land on disk or inside an archive.

mod archive;
mod backend;
mod bin;
mod cache;
mod decode;
mod error;
mod filter;
mod format;
mod handle;
mod iter;
mod model;
mod path;
mod roots;
mod vfs;

#[cfg(feature = "config")]
mod config;

pub use crate::archive::Archive;
pub use crate::backend::Backend;
pub use crate::cache::ArchiveCache;
pub use crate::error::{Error, Result};
pub use crate::filter::{Filter, FilterRegistry, NullPass};
pub use crate::format::{DEFAULT_ARCHIVE_EXTENSION, MAX_NAME_LENGTH};
pub use crate::handle::FileHandle;
pub use crate::model::{EntityInfo, EntityType, OpenMode};
pub use crate::path::{
    get_base_name, get_extension, get_name, get_path, is_absolute, join, to_lower, without_trailing_separator,
};
pub use crate::roots::RootPaths;
pub use crate::vfs::Vfs;

#[cfg(feature = "config")]
pub use crate::config::VfsConfig;
