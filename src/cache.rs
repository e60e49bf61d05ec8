//! # Cache
//!
//! A fixed-capacity, index-addressed array of [`Slot`]s.
//!
//! There is deliberately no lock around the container: entries are pairwise
//! independent and each one carries its own synchronization (the flag-word
//! protocol in [`crate::slot`]), so concurrency granularity is per slot. The
//! array is allocated once, every slot starts uninitialized, and nothing is
//! ever evicted, reset, or reused — this is an append-once slot array, not a
//! general-purpose cache.
//!
//! [`CacheConfig`] is the one place configuration can fail: it derives the
//! slot count from a byte budget and checks, once for the whole range, the
//! sentinel precondition the slot protocol depends on. After that, every
//! per-call check on the hot path is just the bounds check in [`SlotCache::get`].

use thiserror::Error;

use crate::payload::{Payload, PAYLOAD_BYTES, WORD_OFFSET, WORDS};
use crate::slot::Slot;

/// Default total cache footprint: 1 GiB.
pub const DEFAULT_CACHE_BYTES: usize = 1 << 30;

/// Rejected cache geometry.
///
/// Raised only at configuration time; nothing on the access path returns an
/// error (out-of-range indices are a programmer error and panic).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The byte budget does not fit even one slot.
    #[error("byte budget {0} is smaller than one {PAYLOAD_BYTES}-byte slot")]
    BudgetTooSmall(usize),
    /// The canonical payload for some index in range would wrap the word
    /// domain, which could land word 0 on a reserved flag sentinel.
    #[error("index range 0..{0} overflows the canonical payload formula")]
    IndexRangeOverflow(usize),
}

/// Validated cache geometry.
///
/// ## Example
/// ```rust
/// use lazyslot::CacheConfig;
///
/// let cache = CacheConfig::with_slots(1024).unwrap().build();
/// assert_eq!(cache.len(), 1024);
/// assert!(cache.load_or_init(1023).validate(1023));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    slots: usize,
}

impl CacheConfig {
    /// Configures a cache with exactly `slots` entries.
    ///
    /// Validates the protocol precondition here, once: every canonical word
    /// of every slot in `0..slots` must be representable without wrapping,
    /// which keeps word 0 at `index + 17` and therefore clear of the flag
    /// sentinels 0 and 1. Per-call validation would be wasted work.
    pub fn with_slots(slots: usize) -> Result<Self, ConfigError> {
        if slots == 0 {
            return Err(ConfigError::BudgetTooSmall(0));
        }
        let last_word = (slots as u64 - 1)
            .checked_add(WORD_OFFSET)
            .and_then(|w| w.checked_add(WORDS as u64 - 1));
        if last_word.is_none() {
            return Err(ConfigError::IndexRangeOverflow(slots));
        }
        Ok(CacheConfig { slots })
    }

    /// Configures a cache sized to a total byte budget.
    ///
    /// The slot count is `budget / 64` (one payload per slot), the original
    /// sizing rule for the default 1 GiB footprint.
    pub fn with_byte_budget(budget: usize) -> Result<Self, ConfigError> {
        let slots = budget / PAYLOAD_BYTES;
        if slots == 0 {
            return Err(ConfigError::BudgetTooSmall(budget));
        }
        Self::with_slots(slots)
    }

    /// Number of slots.
    pub const fn slots(&self) -> usize {
        self.slots
    }

    /// Total cache footprint in bytes.
    pub const fn byte_size(&self) -> usize {
        self.slots * PAYLOAD_BYTES
    }

    /// Allocates the cache: one contiguous array, all slots uninitialized.
    pub fn build(&self) -> SlotCache {
        let slots: Vec<Slot> = (0..self.slots).map(|_| Slot::new()).collect();
        SlotCache {
            slots: slots.into_boxed_slice(),
        }
    }
}

impl Default for CacheConfig {
    /// The reference geometry: 1 GiB of 64-byte slots.
    fn default() -> Self {
        // Infallible: DEFAULT_CACHE_BYTES / 64 slots cannot wrap the formula.
        CacheConfig {
            slots: DEFAULT_CACHE_BYTES / PAYLOAD_BYTES,
        }
    }
}

/// The shared slot array.
///
/// `&SlotCache` is all any number of worker threads need; interior
/// synchronization is entirely per-slot.
pub struct SlotCache {
    slots: Box<[Slot]>,
}

impl SlotCache {
    /// Returns the slot at `index`.
    ///
    /// # Panics
    /// If `index` is out of range. Indices come from a generator constrained
    /// to `[0, len)`, so an out-of-range index is an internal bug, not a
    /// recoverable condition.
    #[inline]
    pub fn get(&self, index: usize) -> &Slot {
        &self.slots[index]
    }

    /// Shorthand for `get(index).load_or_init(index)`.
    #[inline]
    pub fn load_or_init(&self, index: usize) -> Payload {
        self.slots[index].load_or_init(index)
    }

    /// Number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` only for a zero-slot cache, which [`CacheConfig`] never builds.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Total footprint of the slot array in bytes.
    #[inline]
    pub fn byte_size(&self) -> usize {
        self.slots.len() * PAYLOAD_BYTES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::SlotState;

    #[test]
    fn byte_budget_determines_slot_count() {
        let config = CacheConfig::with_byte_budget(1 << 20).unwrap();
        assert_eq!(config.slots(), (1 << 20) / PAYLOAD_BYTES);
        assert_eq!(config.byte_size(), 1 << 20);
    }

    #[test]
    fn budget_below_one_slot_is_rejected() {
        assert_eq!(
            CacheConfig::with_byte_budget(PAYLOAD_BYTES - 1),
            Err(ConfigError::BudgetTooSmall(PAYLOAD_BYTES - 1))
        );
        assert_eq!(
            CacheConfig::with_slots(0),
            Err(ConfigError::BudgetTooSmall(0))
        );
    }

    #[test]
    fn wrapping_index_range_is_rejected() {
        assert_eq!(
            CacheConfig::with_slots(usize::MAX),
            Err(ConfigError::IndexRangeOverflow(usize::MAX))
        );
    }

    #[test]
    fn fresh_cache_starts_fully_uninitialized() {
        let cache = CacheConfig::with_slots(32).unwrap().build();
        assert_eq!(cache.len(), 32);
        for index in 0..cache.len() {
            assert_eq!(cache.get(index).state(), SlotState::Uninitialized);
        }
    }

    #[test]
    fn every_slot_serves_its_canonical_payload() {
        let cache = CacheConfig::with_slots(64).unwrap().build();
        for index in 0..cache.len() {
            let payload = cache.load_or_init(index);
            assert!(payload.validate(index));
            assert_eq!(cache.get(index).state(), SlotState::Ready(payload.word0()));
        }
    }

    #[test]
    #[should_panic]
    fn out_of_range_index_panics() {
        let cache = CacheConfig::with_slots(4).unwrap().build();
        let _ = cache.get(4);
    }

    /// Many threads hammering a small cache with random indices; every
    /// returned payload must validate, whatever the interleaving.
    #[cfg(feature = "std")]
    #[test]
    fn randomized_concurrent_reads_are_consistent() {
        use rand::{rngs::SmallRng, Rng, SeedableRng};
        use std::thread;

        const THREADS: usize = 8;
        const CALLS: usize = 100_000;

        let cache = CacheConfig::with_slots(64).unwrap().build();

        thread::scope(|s| {
            for t in 0..THREADS {
                let cache = &cache;
                s.spawn(move || {
                    let mut rng = SmallRng::seed_from_u64(0xC0FFEE + t as u64);
                    for _ in 0..CALLS {
                        let index = rng.gen_range(0..cache.len());
                        let payload = cache.load_or_init(index);
                        assert!(
                            payload.validate(index),
                            "slot {index}: torn payload, flag word {}",
                            payload.word0()
                        );
                    }
                });
            }
        });
    }
}
