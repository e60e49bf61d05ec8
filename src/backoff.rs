//! # Backoff
//!
//! A `no_std`-compatible exponential backoff used while a slot is mid-publication.
//!
//! The reference protocol in [`crate::slot`] polls the flag word in a tight
//! loop with nothing but a CPU pause between loads. That is the right call for
//! a publication window of a handful of plain stores, but under heavy
//! oversubscription it burns cycles the winner could be using. This module
//! provides the optional escalation path: each [`Backoff::wait`] spins for a
//! doubling number of [`core::hint::spin_loop`] iterations, and under the
//! `std` feature hands the core back to the scheduler once the spin count
//! crosses a threshold.
//!
//! Backoff never changes what the waiter observes — the acquire load on every
//! poll is issued by the caller, not here — it only changes how hard the
//! waiter burns while it waits.
//!
//! ## Features
//! - ✅ **`no_std` compatible** (uses `core` only)
//! - ⚙️ **Exponential spin delay** via doubling, capped
//! - 💡 **Optional yielding** under the `std` feature
//!
//! ## Example
//! ```rust
//! use lazyslot::Backoff;
//!
//! let backoff = Backoff::new();
//! loop {
//!     if published() {
//!         break;
//!     }
//!     backoff.wait();
//! }
//!
//! fn published() -> bool {
//!     // pseudo flag poll
//!     true
//! }
//! ```

use core::{cell::Cell, hint::spin_loop};

/// Spin ceiling; the doubling stops here.
const MAX_SPIN: u32 = 1 << 18;

/// Default starting spin count.
const START_SPIN: u32 = 1 << 4;

/// Past this spin count, `wait` also yields the thread (std builds only).
#[cfg(feature = "std")]
const YIELD_THRESHOLD: u32 = 1 << 10;

/// Exponential spin-wait state for one polling loop.
///
/// Thread-local by construction (interior [`Cell`], not atomic): each waiter
/// builds its own `Backoff` and drops it once the flag settles.
pub struct Backoff {
    spin: Cell<u32>,
}

impl Backoff {
    /// Creates a backoff with the default starting spin count.
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            spin: Cell::new(START_SPIN),
        }
    }

    /// Creates a backoff with a custom starting spin count.
    ///
    /// `0` degenerates to a pure yield loop on std builds and a bare retry
    /// loop on `no_std` builds.
    #[inline(always)]
    pub const fn new_with(start: u32) -> Self {
        Self {
            spin: Cell::new(start),
        }
    }

    /// Spins for the current count, then doubles it (up to [`MAX_SPIN`]).
    ///
    /// Under the `std` feature, once the count passes the yield threshold
    /// each call also invokes [`std::thread::yield_now`], so a waiter stuck
    /// behind a preempted winner stops monopolizing its core.
    #[inline(always)]
    pub fn wait(&self) {
        let end = self.spin.get();

        for _ in 0..end {
            spin_loop();
        }

        self.spin.set((end << 1).min(MAX_SPIN));

        #[cfg(feature = "std")]
        if end > YIELD_THRESHOLD {
            std::thread::yield_now();
        }
    }

    /// Current spin count.
    #[inline(always)]
    pub fn current(&self) -> u32 {
        self.spin.get()
    }

    /// Restores the default starting spin count.
    #[inline(always)]
    pub fn reset(&self) {
        self.spin.set(START_SPIN);
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
