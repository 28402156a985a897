//! Filter registry (§4.2, C2) and the filter capability set (§3 "Filter",
//! §6 "Filter ABI").
//!
//! The reference ABI passes a `reader`/`writer` callback pair with no
//! context pointer and relies on a process-wide active-archive pointer to
//! give `load_config`/`save_config` somewhere to put their state (§4.10).
//! §9 flags exactly this as the thing to redesign. Since whole-file decode
//! (no streaming, §1 Non-goals) is already assumed, filters here just map
//! `&[u8] -> Vec<u8>` and take the per-archive config blob as an explicit
//! argument — there is no filter-owned mutable state and therefore no
//! active-archive pointer at all.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::format::MAX_NAME_LENGTH;
use crate::model::EntityInfo;

/// A user-supplied codec. `encode`/`decode` are inverses of each other.
/// `config` is the archive's per-filter configuration blob, exactly
/// `config_size()` bytes, opaque to everything but the filter itself.
pub trait Filter: fmt::Debug {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Size in bytes of this filter's per-archive configuration blob.
    fn config_size(&self) -> u32 {
        0
    }

    fn encode(&self, input: &[u8], config: &[u8], info: &EntityInfo) -> Result<Vec<u8>>;

    fn decode(&self, input: &[u8], config: &[u8], info: &EntityInfo) -> Result<Vec<u8>>;

    /// Produce the default config blob written when an archive is created
    /// fresh rather than copied from an existing one.
    fn default_config(&self) -> Vec<u8> {
        vec![0u8; self.config_size() as usize]
    }
}

/// Name-indexed registry of filters (§4.2). Keys are always lower-cased.
#[derive(Default)]
pub struct FilterRegistry {
    filters: Vec<Box<dyn Filter>>,
    by_name: HashMap<String, usize>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, filter: Box<dyn Filter>) -> Result<()> {
        let name = filter.name().to_owned();
        if name.len() >= MAX_NAME_LENGTH {
            return Err(Error::InvalidParameter(format!(
                "filter name {name:?} does not fit in a {MAX_NAME_LENGTH}-byte NUL-terminated name field"
            )));
        }
        let key = crate::path::to_lower(&name);
        if self.by_name.contains_key(&key) {
            return Err(Error::AlreadyExists(name));
        }
        let index = self.filters.len();
        self.filters.push(filter);
        self.by_name.insert(key, index);
        Ok(())
    }

    /// Unregistering compacts the backing vec, so stored indices get
    /// reassigned; only callers that look up by name can rely on stability.
    pub fn unregister_by_name(&mut self, name: &str) -> Result<()> {
        let key = crate::path::to_lower(name);
        let index = self
            .by_name
            .remove(&key)
            .ok_or_else(|| Error::NotFound(name.to_owned()))?;
        self.filters.remove(index);
        self.reindex();
        Ok(())
    }

    pub fn unregister_by_index(&mut self, index: usize) -> Result<()> {
        if index >= self.filters.len() {
            return Err(Error::InvalidParameter(format!("filter index {index} out of range")));
        }
        self.filters.remove(index);
        self.reindex();
        Ok(())
    }

    fn reindex(&mut self) {
        self.by_name.clear();
        for (i, f) in self.filters.iter().enumerate() {
            self.by_name.insert(crate::path::to_lower(f.name()), i);
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.by_name.contains_key(&crate::path::to_lower(name))
    }

    pub fn get(&self, name: &str) -> Option<&dyn Filter> {
        self.by_name
            .get(&crate::path::to_lower(name))
            .map(|&i| self.filters[i].as_ref())
    }

    pub fn get_by_index(&self, index: usize) -> Option<&dyn Filter> {
        self.filters.get(index).map(|f| f.as_ref())
    }

    pub fn count(&self) -> usize {
        self.filters.len()
    }

    pub fn list(&self) -> impl Iterator<Item = &dyn Filter> {
        self.filters.iter().map(|f| f.as_ref())
    }

    pub fn list_names(&self) -> Vec<String> {
        self.filters.iter().map(|f| f.name().to_owned()).collect()
    }
}

/// Identity codec; `config_size() == 0`. Useful as a default filter chain
/// entry and in tests (spec §8 scenario 1: "register filter `null-pass`").
#[derive(Debug, Default)]
pub struct NullPass;

impl Filter for NullPass {
    fn name(&self) -> &str {
        "null-pass"
    }

    fn description(&self) -> &str {
        "identity codec, no transformation"
    }

    fn encode(&self, input: &[u8], _config: &[u8], _info: &EntityInfo) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn decode(&self, input: &[u8], _config: &[u8], _info: &EntityInfo) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }
}
