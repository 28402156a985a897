//! Optional TOML configuration (feature `config`), the way the CLI wires a
//! `Vfs` up without requiring callers to hand-write `add_root` calls.
//!
//! Not part of the container format or the resolver — purely a convenience
//! layer over the public `Vfs` API, gated behind its own feature so the
//! core crate stays usable without `serde`/`toml` pulled in.

use serde::Deserialize;

use crate::error::Result;
use crate::vfs::Vfs;

#[derive(Debug, Default, Deserialize)]
pub struct VfsConfig {
    /// Archive filename extension, without the leading dot. Defaults to
    /// the container format's `DAGN` (§4.4) when absent.
    #[serde(default)]
    pub archive_extension: Option<String>,

    /// Absolute root paths added in file order (§4.3 — order is
    /// significant, the first entry becomes the write root).
    #[serde(default)]
    pub roots: Vec<String>,
}

impl VfsConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| crate::error::Error::InvalidParameter(format!("invalid config: {e}")))
    }

    /// Build a `Vfs` from this config, registering no filters — callers
    /// still register their own filter set before relying on archive reads.
    pub fn build(&self) -> Result<Vfs> {
        let mut vfs = Vfs::new();
        if let Some(ext) = &self.archive_extension {
            vfs = vfs.with_archive_extension(ext.clone());
        }
        for root in &self.roots {
            vfs.add_root(root)?;
        }
        Ok(vfs)
    }
}
