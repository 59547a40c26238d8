//! Debug-only reentrancy detection for map entry points.
//!
//! Lookups call user `Hash`/`Eq` code while a bucket run is being walked
//! or a fresh node is about to be spliced. If that code calls back into
//! the same map, the run it observes may be half-linked. Debug builds
//! panic on such a nested call; release builds carry no state at all.

use core::cell::Cell;
use core::marker::PhantomData;

/// Embedded in each map; every public operation holds an [`Occupied`]
/// token for its duration.
#[derive(Debug)]
pub(crate) struct ReentryFlag {
    #[cfg(debug_assertions)]
    busy: Cell<bool>,
    // !Sync even in release builds.
    _not_sync: PhantomData<Cell<()>>,
}

impl ReentryFlag {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            busy: Cell::new(false),
            _not_sync: PhantomData,
        }
    }

    /// Mark the owner busy until the returned token is dropped.
    ///
    /// Panics in debug builds if the owner is already busy.
    #[inline]
    pub(crate) fn enter(&self) -> Occupied<'_> {
        #[cfg(debug_assertions)]
        {
            if self.busy.replace(true) {
                panic!("reentrant call into SeqHashMap from user Hash/Eq code");
            }
        }
        Occupied { flag: self }
    }
}

impl Default for ReentryFlag {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct Occupied<'a> {
    #[cfg_attr(not(debug_assertions), allow(dead_code))]
    flag: &'a ReentryFlag,
}

impl Drop for Occupied<'_> {
    #[inline]
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.flag.busy.set(false);
    }
}
