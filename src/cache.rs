//! Cached unified spec with single-flight population.
//!
//! Readers load an `Arc` snapshot lock-free. Population and invalidation are
//! serialized behind one mutex so concurrent cold readers share a single build
//! and a reload can never be overwritten by a build that started before it.

use crate::spec::UnifiedSpec;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

#[derive(Default)]
pub struct UnifiedCache {
    current: ArcSwapOption<UnifiedSpec>,
    build_lock: Mutex<()>,
    generation: AtomicU64,
}

impl UnifiedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, if any.
    pub fn get(&self) -> Option<Arc<UnifiedSpec>> {
        self.current.load_full()
    }

    /// Return the cached spec, building it once if the cache is empty.
    ///
    /// Failed builds are not cached; the next caller retries.
    pub fn get_or_try_build<E, F>(&self, build: F) -> Result<Arc<UnifiedSpec>, E>
    where
        F: FnOnce() -> Result<UnifiedSpec, E>,
    {
        if let Some(spec) = self.current.load_full() {
            return Ok(spec);
        }

        let _guard = self.build_lock.lock();
        // Another caller may have populated it while we waited.
        if let Some(spec) = self.current.load_full() {
            return Ok(spec);
        }

        let spec = Arc::new(build()?);
        self.current.store(Some(Arc::clone(&spec)));
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(generation, "unified spec cache populated");
        Ok(spec)
    }

    /// Drop the cached spec. Waits for an in-flight build to finish first.
    pub fn invalidate(&self) {
        let _guard = self.build_lock.lock();
        self.current.store(None);
        debug!("unified spec cache cleared");
    }

    /// Number of successful builds so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for UnifiedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnifiedCache")
            .field("populated", &self.current.load().is_some())
            .field("generation", &self.generation())
            .finish()
    }
}
