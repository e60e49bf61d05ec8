//! # lazyslot ⚡
//!
//! A lightweight, **`no_std`-compatible** crate implementing a lock-free,
//! race-safe **lazy-initialization protocol** for fixed-size records shared by
//! many concurrent readers and initializers — plus the cache array and
//! measurement harness built around it.
//!
//! The crate includes:
//!
//! - [`Slot`] — an initialize-once record whose first word is both the state
//!   flag and payload word 0, published with release/acquire ordering.
//! - [`Payload`] — the canonical eight-word record a slot stores, with a pure
//!   generator, an auditor, and a wrapping checksum.
//! - [`Backoff`] — an adaptive exponential backoff for waiters (adopted as the
//!   optional [`SpinPolicy`]).
//! - [`SlotCache`] — a fixed-capacity, per-slot-synchronized array (`std`).
//! - [`bench`] — the multi-threaded measurement harness (`std`).
//!
//! ## ✨ Features
//!
//! - ✅ Core protocol is `no_std` compatible (uses `core` only)
//! - 🔒 Exactly one initializer per slot, arbitrated by a single compare-exchange
//! - 📦 One atomic word per slot; the seven trailing words stay plain
//! - ⚙️ Configurable spin policy: tight polling or exponential backoff
//! - 🧪 Deterministic payloads, so every read can be audited word-for-word
//!
//! ## 🚀 Quick Example
//!
//! ```rust
//! use lazyslot::{CacheConfig, SlotState};
//!
//! let cache = CacheConfig::with_slots(256).unwrap().build();
//!
//! // First access computes and publishes; later accesses just read.
//! let payload = cache.load_or_init(77);
//! assert!(payload.validate(77));
//! assert_eq!(cache.get(77).state(), SlotState::Ready(payload.word0()));
//! ```
//!
//! ## 🧠 Design
//!
//! A slot's flag word moves `Uninitialized (0)` → `InProgress (1)` →
//! `Ready(word0)` exactly once. The single winning thread writes the trailing
//! words with plain stores and then release-stores word 0 into the flag; any
//! thread that acquire-loads the settled value is guaranteed to see the whole
//! record — never a torn one. The payload formula keeps word 0 at `index + 17`,
//! safely clear of the two reserved sentinel values, and [`CacheConfig`]
//! verifies that once for the entire index range.
//!
//! ## ⚠️ Usage Notes
//!
//! - Slots are append-once: no eviction, invalidation, or reuse, ever.
//! - The only blocking behavior anywhere is the spin-wait on an `InProgress`
//!   flag; there is no timeout, and a preempted winner stalls its waiters.
//! - [`RelaxedSlot`] is a performance comparison point, not a correctness
//!   reference — see its documentation.
//!
//! ## 📦 Modules
//!
//! - [`payload`] — canonical record, generator, auditor, checksum.
//! - [`slot`] — the synchronization protocol.
//! - [`backoff`] — adaptive exponential backoff for waiters.
//! - [`cache`] — fixed-capacity slot array and configuration (`std`).
//! - [`bench`] — worker pool, timing, and throughput reporting (`std`).

#![cfg_attr(not(feature = "std"), no_std)]

pub mod backoff;
pub mod payload;
pub mod slot;

#[cfg(feature = "std")]
pub mod bench;
#[cfg(feature = "std")]
pub mod cache;

pub use backoff::Backoff;
pub use payload::Payload;
pub use slot::{RelaxedSlot, Slot, SlotState, SpinPolicy};

#[cfg(feature = "std")]
pub use cache::{CacheConfig, ConfigError, SlotCache};
