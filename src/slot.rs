//! # Slot
//!
//! The synchronization primitive: a race-safe, lock-free, initialize-once
//! record shared by any number of concurrent readers and initializers.
//!
//! A [`Slot`] stores one [`Payload`] in exactly eight words. The first word is
//! the only atomic: it doubles as the initialization-state discriminator and,
//! once settled, as payload word 0. The remaining seven words are plain
//! storage, written exactly once by the single winning initializer and made
//! visible to everyone else by a release store of the flag word.
//!
//! ## The protocol
//!
//! The flag word moves through three states, encoded by [`SlotState`]:
//!
//! ```text
//! Uninitialized (0) --CAS--> InProgress (1) --release store--> Ready(word0)
//! ```
//!
//! - Exactly one caller wins the `0 → 1` compare-exchange. The winner computes
//!   the payload, writes the seven tail words with plain stores, and only then
//!   publishes word 0 into the flag with **Release** ordering.
//! - A caller that finds the flag at `1` polls it with **Acquire** ordering
//!   until it leaves `1`. The acquire load that observes the published value
//!   synchronizes-with the winner's release store, which is what makes the
//!   plain tail words safely readable without being atomic themselves.
//! - A caller that finds the flag already settled assembles the payload
//!   immediately, no spin.
//!
//! The whole design leans on one precondition: a legitimate word 0 is never
//! `0` or `1`. The payload formula guarantees that (word 0 is always ≥ 17) and
//! [`crate::cache::CacheConfig`] checks it once for the whole index range, so
//! the packed representation never has to guess which state it is looking at.
//!
//! There is no failure path and no timeout: `load_or_init` always returns a
//! full payload. If the winner is preempted between its tail writes and the
//! release store, waiters spin (or back off, per [`SpinPolicy`]) until it gets
//! rescheduled; that stall is an accepted property of the design, not an error.
//!
//! ## Safety
//! - Never hold the result of `tail` reads across a flag state you did not
//!   acquire — all tail access in this module is gated by the flag protocol.
//! - [`RelaxedSlot`] is carried for performance comparison only and is **not**
//!   a correctness reference.

use core::cell::UnsafeCell;
use core::hint::spin_loop;
use core::mem::size_of;
use core::sync::atomic::{
    AtomicU64,
    Ordering::{AcqRel, Acquire, Relaxed, Release},
};

use crate::backoff::Backoff;
use crate::payload::{Payload, WORDS};

/// Flag value of a slot nobody has touched.
const UNINIT: u64 = 0;

/// Flag value while the winner is generating and writing the payload.
const IN_PROGRESS: u64 = 1;

/// Decoded view of the packed flag word.
///
/// The flag overloads one word as both a state discriminator and payload
/// word 0; this type is the one place where that packing is interpreted, so
/// the "0 and 1 are reserved" rule lives here instead of at every call site.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SlotState {
    /// No initializer has claimed the slot.
    Uninitialized,
    /// A winner holds the slot and has not yet published.
    InProgress,
    /// Settled; carries the published payload word 0.
    Ready(u64),
}

impl SlotState {
    /// Decodes a raw flag word.
    #[inline]
    pub const fn from_word(word: u64) -> Self {
        match word {
            UNINIT => SlotState::Uninitialized,
            IN_PROGRESS => SlotState::InProgress,
            w => SlotState::Ready(w),
        }
    }

    /// Encodes back to the packed representation.
    #[inline]
    pub const fn to_word(self) -> u64 {
        match self {
            SlotState::Uninitialized => UNINIT,
            SlotState::InProgress => IN_PROGRESS,
            SlotState::Ready(w) => w,
        }
    }

    /// `true` for a word a published payload is allowed to use.
    ///
    /// The payload generator's precondition, phrased once, centrally.
    #[inline]
    pub const fn is_valid_payload_word(word: u64) -> bool {
        word != UNINIT && word != IN_PROGRESS
    }
}

/// How a waiter burns time while a slot is [`SlotState::InProgress`].
///
/// Both variants issue an acquire load on every poll; the policy only decides
/// what happens between polls, so it can never change what a waiter observes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SpinPolicy {
    /// Pure busy-polling with a CPU pause per retry. The reference behavior:
    /// lowest latency for the short publication window, at full burn.
    #[default]
    Tight,
    /// Exponential [`Backoff`] between polls, yielding under `std` once the
    /// spin count grows past a threshold.
    Backoff,
}

/// A race-safe, initialize-once payload slot.
///
/// Exactly [`WORDS`] words of storage — one atomic flag plus a plain tail, no
/// separate "initialized" boolean. See the [module docs](self) for the
/// protocol.
///
/// ## Example
/// ```rust
/// use lazyslot::{Payload, Slot};
///
/// let slot = Slot::new();
/// let first = slot.load_or_init(9);
/// let again = slot.load_or_init(9);
/// assert_eq!(first, again);
/// assert!(first.validate(9));
/// ```
pub struct Slot {
    flag: AtomicU64,
    tail: UnsafeCell<[u64; WORDS - 1]>,
}

// A slot is exactly one payload wide; no hidden state.
const _: () = assert!(size_of::<Slot>() == WORDS * size_of::<u64>());

// Safety: `tail` is written only by the thread that won the 0 → 1
// compare-exchange, strictly before its release store of `flag`; every read
// of `tail` happens after an acquire load of `flag` observed the published
// value. Single-writer-then-immutable, ordered by release/acquire on `flag`.
unsafe impl Send for Slot {}
unsafe impl Sync for Slot {}

impl Slot {
    /// Creates an empty slot ([`SlotState::Uninitialized`]).
    #[inline(always)]
    pub const fn new() -> Self {
        Slot {
            flag: AtomicU64::new(UNINIT),
            tail: UnsafeCell::new([0; WORDS - 1]),
        }
    }

    /// Decodes the current state of the flag word.
    ///
    /// Acquire, so a `Ready` result here means a subsequent
    /// [`load_or_init`](Slot::load_or_init) will not spin.
    #[inline]
    pub fn state(&self) -> SlotState {
        SlotState::from_word(self.flag.load(Acquire))
    }

    /// Returns the slot's payload, initializing it from the canonical
    /// generator on first access.
    ///
    /// The first caller per slot computes [`Payload::generate`]`(index)` and
    /// publishes it; every caller, winner or not, gets the full payload back.
    /// Never fails, never returns a torn record.
    #[inline]
    pub fn load_or_init(&self, index: usize) -> Payload {
        self.get_or_init_with(|| Payload::generate(index), SpinPolicy::Tight)
    }

    /// The underlying publish/subscribe primitive.
    ///
    /// `init` runs at most once per slot, on the single thread that wins the
    /// claim; all other callers wait per `policy` and read the published
    /// payload. Exposed separately so callers can instrument the initializer
    /// (e.g. count invocations) or pick a [`SpinPolicy`].
    ///
    /// The produced payload's word 0 must satisfy
    /// [`SlotState::is_valid_payload_word`]; publishing a sentinel would wedge
    /// every waiter forever. Checked by `debug_assert` here, guaranteed for
    /// the canonical generator by [`crate::cache::CacheConfig`].
    pub fn get_or_init_with(&self, init: impl FnOnce() -> Payload, policy: SpinPolicy) -> Payload {
        match self.flag.compare_exchange(UNINIT, IN_PROGRESS, AcqRel, Acquire) {
            Ok(_) => self.publish(init()),
            Err(found) => self.wait_settled(found, policy),
        }
    }

    /// Winner path: write the tail, then release-store word 0 into the flag.
    fn publish(&self, payload: Payload) -> Payload {
        let words = payload.words();
        debug_assert!(
            SlotState::is_valid_payload_word(words[0]),
            "payload word 0 ({}) collides with a flag sentinel",
            words[0]
        );

        // Sole writer: winning the compare-exchange is the only way here, and
        // a slot is claimed at most once for the process lifetime.
        unsafe {
            (*self.tail.get()).copy_from_slice(&words[1..]);
        }

        // Publication point. The release store orders the plain tail writes
        // above before the flag value any acquire reader can observe.
        self.flag.store(words[0], Release);
        payload
    }

    /// Loser path: wait out `InProgress` (if at all), then assemble.
    fn wait_settled(&self, mut flag: u64, policy: SpinPolicy) -> Payload {
        if flag == IN_PROGRESS {
            let backoff = Backoff::new();
            loop {
                match policy {
                    SpinPolicy::Tight => spin_loop(),
                    SpinPolicy::Backoff => backoff.wait(),
                }
                // Acquire on every poll; the load that sees the settled value
                // must synchronize-with the winner's release store.
                flag = self.flag.load(Acquire);
                if flag != IN_PROGRESS {
                    break;
                }
            }
        }

        debug_assert!(SlotState::is_valid_payload_word(flag));

        let mut words = [0u64; WORDS];
        words[0] = flag;
        // Safety: the acquire load above observed the published word 0, so
        // the winner's tail writes happened-before this read and the tail is
        // immutable from here on.
        words[1..].copy_from_slice(unsafe { &*self.tail.get() });
        Payload::from_words(words)
    }
}

impl Default for Slot {
    fn default() -> Self {
        Self::new()
    }
}

/// The fully-atomic variant: all eight words atomic, written back-to-front
/// with relaxed ordering so word 0 lands last.
///
/// Carried only as a performance comparison point against [`Slot`]. Writing
/// order plus cache coherence is an informal substitute for a release/acquire
/// edge, and whether that is actually race-free on every target memory model
/// is unresolved. Do **not** use this where correctness matters; the
/// single-flag protocol in [`Slot`] is the contract this crate stands behind.
///
/// Note also the semantic gap: a relaxed load of word 0 equal to `0` sends
/// the caller down the initializer path, so under contention the payload may
/// be generated and stored more than once (harmlessly, since it is
/// deterministic) — there is no single-winner guarantee here.
pub struct RelaxedSlot {
    words: [AtomicU64; WORDS],
}

impl RelaxedSlot {
    /// Creates an empty slot (all words zero).
    pub const fn new() -> Self {
        RelaxedSlot {
            words: [const { AtomicU64::new(0) }; WORDS],
        }
    }

    /// Returns the slot's payload, initializing it on (apparent) first access.
    pub fn load_or_init(&self, index: usize) -> Payload {
        if self.words[0].load(Relaxed) == 0 {
            let payload = Payload::generate(index);
            let words = payload.words();
            // Back-to-front so word 0 is the last store.
            for j in (0..WORDS).rev() {
                self.words[j].store(words[j], Relaxed);
            }
            payload
        } else {
            let mut words = [0u64; WORDS];
            for (j, word) in words.iter_mut().enumerate() {
                *word = self.words[j].load(Relaxed);
            }
            Payload::from_words(words)
        }
    }
}

impl Default for RelaxedSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_packing_roundtrips() {
        assert_eq!(SlotState::from_word(0), SlotState::Uninitialized);
        assert_eq!(SlotState::from_word(1), SlotState::InProgress);
        assert_eq!(SlotState::from_word(17), SlotState::Ready(17));
        assert_eq!(SlotState::from_word(u64::MAX), SlotState::Ready(u64::MAX));

        for state in [
            SlotState::Uninitialized,
            SlotState::InProgress,
            SlotState::Ready(99),
        ] {
            assert_eq!(SlotState::from_word(state.to_word()), state);
        }
    }

    #[test]
    fn sentinels_are_rejected_as_payload_words() {
        assert!(!SlotState::is_valid_payload_word(0));
        assert!(!SlotState::is_valid_payload_word(1));
        assert!(SlotState::is_valid_payload_word(2));
        assert!(SlotState::is_valid_payload_word(u64::MAX));
    }

    #[test]
    fn cold_slot_initializes_to_canonical_payload() {
        let slot = Slot::new();
        assert_eq!(slot.state(), SlotState::Uninitialized);

        let payload = slot.load_or_init(7);
        assert!(payload.validate(7));
        assert_eq!(slot.state(), SlotState::Ready(payload.word0()));
    }

    #[test]
    fn settled_slot_is_idempotent() {
        let slot = Slot::new();
        let first = slot.load_or_init(123);

        for _ in 0..100 {
            assert_eq!(slot.load_or_init(123), first);
        }
    }

    #[cfg(feature = "std")]
    #[test]
    fn initializer_runs_exactly_once_under_contention() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Barrier;
        use std::thread;

        const THREADS: usize = 8;

        let slot = Slot::new();
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(THREADS);

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    barrier.wait();
                    let payload = slot.get_or_init_with(
                        || {
                            calls.fetch_add(1, Ordering::Relaxed);
                            Payload::generate(42)
                        },
                        SpinPolicy::Backoff,
                    );
                    assert!(payload.validate(42));
                });
            }
        });

        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[cfg(feature = "std")]
    #[test]
    fn concurrent_callers_always_see_a_whole_payload() {
        use std::thread;

        const THREADS: usize = 8;
        const ROUNDS: usize = 200;

        // Fresh slot per round so a winner and several waiters race each time.
        for round in 0..ROUNDS {
            let slot = Slot::new();
            thread::scope(|s| {
                for _ in 0..THREADS {
                    s.spawn(|| {
                        let payload = slot.load_or_init(round);
                        assert!(
                            payload.validate(round),
                            "slot {round}: torn payload, flag word {}",
                            payload.word0()
                        );
                    });
                }
            });
        }
    }

    #[test]
    fn relaxed_variant_matches_canonical_payload_sequentially() {
        let slot = RelaxedSlot::new();
        let first = slot.load_or_init(11);
        assert!(first.validate(11));
        assert_eq!(slot.load_or_init(11), first);
    }
}
