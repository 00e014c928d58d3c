//! Maps methods flagged `Intrinsic` to backend-specific implementation
//! tokens.
//!
//! A method with no body means its meaning is supplied by the concrete
//! backend rather than by lowering IR nodes. Lookup is pure and keyed by
//! [`MethodRef`] (declared name), since intrinsics are recognized by
//! identity across IR contexts: the same `warpBroadcast` intrinsic is the
//! same registry entry whether it was imported once or a hundred times.

use rustc_hash::FxHashMap;
use std::sync::{Arc, RwLock};

use crate::ir::MethodRef;

/// A backend-specific token describing how to emit an intrinsic call.
///
/// Kept deliberately opaque here (the PTX/OpenCL/IL emitters are out of
/// scope for this core), but carrying a name lets [`IntrinsicProvider`]'s
/// tests and diagnostics refer to *which* mapping was found without a real
/// emitter backing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrinsicImpl {
    /// Backend-defined label for the implementation strategy (e.g. an ISA
    /// mnemonic template name).
    pub label: Arc<str>,
}

impl IntrinsicImpl {
    /// Construct a mapping token with the given label.
    pub fn new(label: impl Into<Arc<str>>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

/// Scope of a [`IntrinsicProvider::clear_cache`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearCacheMode {
    /// No-op.
    None,
    /// Drop any per-method memoized lookups, keep the process-wide
    /// registry.
    MethodCache,
    /// Drop everything, including the registry populated at construction.
    Everything,
}

/// Backend-owned registry of intrinsic implementations.
///
/// Populated once at backend construction from a process-wide registry
/// keyed by method name; lookups afterwards are pure reads. `clear_cache` is
/// documented as not thread-safe: callers must ensure no compilation is in
/// flight when they call it.
pub struct IntrinsicProvider {
    registry: FxHashMap<MethodRef, IntrinsicImpl>,
    lookup_cache: RwLock<FxHashMap<MethodRef, Option<IntrinsicImpl>>>,
}

impl IntrinsicProvider {
    /// Build a provider from a pre-populated registry (as if read from a
    /// process-wide table at backend construction time).
    pub fn new(registry: FxHashMap<MethodRef, IntrinsicImpl>) -> Self {
        Self {
            registry,
            lookup_cache: RwLock::new(FxHashMap::default()),
        }
    }

    /// An empty provider, useful for tests exercising the "no mapping
    /// registered" failure path.
    pub fn empty() -> Self {
        Self::new(FxHashMap::default())
    }

    /// A builder-style registration helper for tests and small embeddings
    /// that don't have a process-wide table to draw from.
    pub fn with_mapping(mut self, method: MethodRef, implementation: IntrinsicImpl) -> Self {
        self.registry.insert(method, implementation);
        self
    }

    /// Look up the implementation mapping for `method`, if one is
    /// registered. Pure: repeated calls with the same method return the
    /// same answer until the next `clear_cache`.
    pub fn try_get_mapping(&self, method: &MethodRef) -> Option<IntrinsicImpl> {
        if let Some(hit) = self.lookup_cache.read().unwrap().get(method) {
            return hit.clone();
        }
        let found = self.registry.get(method).cloned();
        self.lookup_cache
            .write()
            .unwrap()
            .insert(method.clone(), found.clone());
        found
    }

    /// Clear cached lookups at the requested scope. Not thread-safe: must
    /// only be called with no in-flight compilations.
    pub fn clear_cache(&mut self, mode: ClearCacheMode) {
        match mode {
            ClearCacheMode::None => {}
            ClearCacheMode::MethodCache => {
                self.lookup_cache.get_mut().unwrap().clear();
            }
            ClearCacheMode::Everything => {
                self.lookup_cache.get_mut().unwrap().clear();
                self.registry.clear();
            }
        }
    }
}

impl Drop for IntrinsicProvider {
    /// Resolves the open question of whether disposal
    /// should run in the `Backend` dispose chain: it does, unconditionally,
    /// clearing every cached mapping on drop.
    fn drop(&mut self) {
        self.clear_cache(ClearCacheMode::Everything);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_registered_mapping() {
        let provider = IntrinsicProvider::empty()
            .with_mapping(MethodRef::new("warpBroadcast"), IntrinsicImpl::new("shfl.bfly"));
        let found = provider.try_get_mapping(&MethodRef::new("warpBroadcast"));
        assert_eq!(found, Some(IntrinsicImpl::new("shfl.bfly")));
    }

    #[test]
    fn lookup_misses_unregistered_method() {
        let provider = IntrinsicProvider::empty();
        assert_eq!(provider.try_get_mapping(&MethodRef::new("warpBroadcast")), None);
    }

    #[test]
    fn clear_cache_everything_drops_registry() {
        let mut provider = IntrinsicProvider::empty()
            .with_mapping(MethodRef::new("barrier"), IntrinsicImpl::new("bar.sync"));
        assert!(provider.try_get_mapping(&MethodRef::new("barrier")).is_some());
        provider.clear_cache(ClearCacheMode::Everything);
        assert!(provider.try_get_mapping(&MethodRef::new("barrier")).is_none());
    }

    #[test]
    fn clear_cache_none_is_a_no_op() {
        let mut provider = IntrinsicProvider::empty()
            .with_mapping(MethodRef::new("barrier"), IntrinsicImpl::new("bar.sync"));
        provider.clear_cache(ClearCacheMode::None);
        assert!(provider.try_get_mapping(&MethodRef::new("barrier")).is_some());
    }
}
