//! Decode pipeline (§4.10, C10).
//!
//! The reference applies the filter chain over a shared ping-pong buffer
//! pair gated by a process-wide "active archive" pointer. Per §9's redesign
//! note, that's replaced here by an explicit fold over owned buffers — each
//! filter call gets its own input/output `Vec<u8>`, no global state, no
//! activation step. Because an archive's filter chain and per-filter config
//! are parsed once into the `Archive` object (§4.5 step 4), there is
//! nothing left to "activate" by the time decoding happens.

use crate::error::{Error, Result};
use crate::filter::FilterRegistry;
use crate::model::EntityInfo;

/// One link in an archive's filter chain: the filter's registry name plus
/// the per-archive configuration blob loaded for it at parse time.
#[derive(Clone, Debug)]
pub struct FilterLink {
    pub name: String,
    pub config: Vec<u8>,
}

/// Apply `chain` in stored order, looking each filter up in `registry`.
/// A name absent from the registry fails the whole decode with
/// `MissingFilters` (§3 invariant: "every filter name referenced by an
/// archive must resolve in the global filter registry").
pub fn decode(chain: &[FilterLink], registry: &FilterRegistry, payload: Vec<u8>, info: &EntityInfo) -> Result<Vec<u8>> {
    let mut buf = payload;
    for link in chain {
        let filter = registry
            .get(&link.name)
            .ok_or_else(|| Error::MissingFilters(vec![link.name.clone()]))?;
        buf = filter.decode(&buf, &link.config, info)?;
    }
    Ok(buf)
}

/// Apply `chain` in reverse order for encoding (not wired into any public
/// `Vfs` operation — archive creation is out of scope per §1 — but kept
/// alongside `decode` since it's the direct inverse and filter authors
/// expect both to exist).
pub fn encode(chain: &[FilterLink], registry: &FilterRegistry, payload: Vec<u8>, info: &EntityInfo) -> Result<Vec<u8>> {
    let mut buf = payload;
    for link in chain.iter().rev() {
        let filter = registry
            .get(&link.name)
            .ok_or_else(|| Error::MissingFilters(vec![link.name.clone()]))?;
        buf = filter.encode(&buf, &link.config, info)?;
    }
    Ok(buf)
}

/// Check that every filter name in `chain` resolves in `registry` (§4.5
/// step 4), returning the complete list of missing names rather than
/// failing on the first one — makes `MissingFilters` actionable.
pub fn check_filters_resolve(chain: &[FilterLink], registry: &FilterRegistry) -> Result<()> {
    let missing: Vec<String> = chain
        .iter()
        .filter(|link| !registry.exists(&link.name))
        .map(|link| link.name.clone())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingFilters(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::NullPass;
    use crate::model::EntityType;

    fn info() -> EntityInfo {
        EntityInfo {
            kind: EntityType::File,
            archived: true,
            full_path: "a/b.txt".to_owned(),
            leaf_name: "b.txt".to_owned(),
            size: 5,
        }
    }

    #[test]
    fn empty_chain_is_identity() {
        let registry = FilterRegistry::new();
        let out = decode(&[], &registry, b"hello".to_vec(), &info()).unwrap();
        assert_eq!(out, b"hello");
    }

    #[test]
    fn null_pass_chain_round_trips() {
        let mut registry = FilterRegistry::new();
        registry.register(Box::new(NullPass)).unwrap();
        let chain = vec![FilterLink { name: "null-pass".to_owned(), config: vec![] }];
        let out = decode(&chain, &registry, b"hello".to_vec(), &info()).unwrap();
        assert_eq!(out, b"hello");
    }

    #[test]
    fn missing_filter_reported() {
        let registry = FilterRegistry::new();
        let chain = vec![FilterLink { name: "ghost".to_owned(), config: vec![] }];
        assert!(matches!(check_filters_resolve(&chain, &registry), Err(Error::MissingFilters(names)) if names == vec!["ghost".to_owned()]));
    }
}
