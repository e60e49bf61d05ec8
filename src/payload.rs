//! # Payload
//!
//! The canonical fixed-width record stored in a cache slot, and the pure
//! generator used both to initialize a slot and to audit whatever a slot
//! hands back.
//!
//! A [`Payload`] is eight 64-bit words. For slot `index`, word `j` has the
//! canonical value `index + j + 17`. The additive constant is load-bearing:
//! it keeps word 0 — the word the slot protocol reuses as its state flag —
//! strictly above the two reserved sentinel values (see [`crate::slot`]).
//! The index range is validated once, when the cache is configured, so the
//! generator itself stays branch-free on the hot path.
//!
//! ## Example
//! ```rust
//! use lazyslot::Payload;
//!
//! let p = Payload::generate(5);
//! assert_eq!(p.word0(), 22);
//! assert!(p.validate(5));
//! assert!(!p.validate(6));
//! ```

/// Words per payload.
pub const WORDS: usize = 8;

/// Payload size in bytes; also the size of one cache slot.
pub const PAYLOAD_BYTES: usize = WORDS * core::mem::size_of::<u64>();

/// Additive constant of the canonical formula. Any value ≥ 2 keeps word 0
/// clear of the protocol sentinels; 17 also keeps the remaining words clear.
pub const WORD_OFFSET: u64 = 17;

/// A fixed-width record of [`WORDS`] unsigned 64-bit words.
///
/// Cheap to copy, cheap to regenerate. Equality is word-by-word, so
/// "bit-identical" in tests is just `==`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Payload {
    words: [u64; WORDS],
}

impl Payload {
    /// Computes the canonical payload for `index`.
    ///
    /// Pure and deterministic: word `j` is `index + j + 17`. Addition wraps
    /// rather than panicking; cache configuration guarantees the configured
    /// index range never actually wraps (see [`crate::cache::CacheConfig`]).
    #[inline]
    pub fn generate(index: usize) -> Self {
        let base = (index as u64).wrapping_add(WORD_OFFSET);
        let mut words = [0u64; WORDS];
        for (j, word) in words.iter_mut().enumerate() {
            *word = base.wrapping_add(j as u64);
        }
        Payload { words }
    }

    /// Reassembles a payload from raw words, as read back out of a slot.
    #[inline]
    pub const fn from_words(words: [u64; WORDS]) -> Self {
        Payload { words }
    }

    /// Word 0 — the value the slot protocol publishes through its flag word.
    #[inline]
    pub const fn word0(&self) -> u64 {
        self.words[0]
    }

    /// All words, in order.
    #[inline]
    pub const fn words(&self) -> &[u64; WORDS] {
        &self.words
    }

    /// Checks this payload word-by-word against the canonical payload for
    /// `index`.
    ///
    /// A mismatch is never a data error: payloads are deterministic, so a
    /// failed validation means the synchronization protocol leaked a torn or
    /// stale read. Callers treat it as fatal (see [`crate::bench`]).
    #[inline]
    pub fn validate(&self, index: usize) -> bool {
        *self == Payload::generate(index)
    }

    /// Wrapping sum of all words; the aggregate witness value folded by the
    /// workers. Not a correctness check, just an accumulator that forces the
    /// compiler to actually read every word.
    #[inline]
    pub fn checksum(&self) -> u64 {
        self.words.iter().fold(0u64, |sum, w| sum.wrapping_add(*w))
    }
}
