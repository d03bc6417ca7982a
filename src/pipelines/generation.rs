// SPDX-License-Identifier: GPL-3.0-only

//! Generation tokens for last-writer-wins async effects
//!
//! Both the filter renderer and the label auto-hide timer start work that
//! finishes later, and both must ignore a late result once something newer
//! has been requested. [`LatestSlot`] implements that once:
//!
//! - every request is tagged with a [`Generation`]
//! - the slot remembers the highest generation it has seen
//! - [`LatestSlot::publish`] stores a value only if its generation is still
//!   the highest, and the check happens under the same lock as the store
//!
//! Stale results are dropped silently. Nothing is aborted.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Monotonic token identifying one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    /// Nothing has been requested yet
    pub const ZERO: Generation = Generation(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A published value guarded by the newest generation
///
/// Cloning shares the slot.
#[derive(Debug)]
pub struct LatestSlot<T> {
    latest: Arc<AtomicU64>,
    value: Arc<watch::Sender<T>>,
}

impl<T> Clone for LatestSlot<T> {
    fn clone(&self) -> Self {
        Self {
            latest: Arc::clone(&self.latest),
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> LatestSlot<T> {
    pub fn new(initial: T) -> Self {
        Self {
            latest: Arc::new(AtomicU64::new(0)),
            value: Arc::new(watch::Sender::new(initial)),
        }
    }

    /// Allocate the next generation and make it the newest
    pub fn claim(&self) -> Generation {
        Generation(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Record a generation allocated elsewhere. Never moves backwards.
    pub fn observe(&self, generation: Generation) {
        self.latest.fetch_max(generation.0, Ordering::SeqCst);
    }

    /// Highest generation seen so far
    pub fn latest(&self) -> Generation {
        Generation(self.latest.load(Ordering::SeqCst))
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.latest() == generation
    }

    /// Store the value produced for `generation` if it is still the newest
    ///
    /// Returns whether the value was published. The generation check runs
    /// inside the slot's lock, so two racing publishers cannot interleave
    /// a check with the other's store.
    pub fn publish(&self, generation: Generation, value: T) -> bool {
        let mut value = Some(value);
        self.value.send_if_modified(|slot| {
            if self.latest.load(Ordering::SeqCst) != generation.0 {
                return false;
            }
            match value.take() {
                Some(v) => {
                    *slot = v;
                    true
                }
                None => false,
            }
        })
    }

    /// Observe published values
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.value.subscribe()
    }

    /// Read the current value
    pub fn borrow(&self) -> watch::Ref<'_, T> {
        self.value.borrow()
    }
}

impl<T: Default> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_monotonic() {
        let slot = LatestSlot::new(0u32);
        assert_eq!(slot.latest(), Generation::ZERO);
        assert_eq!(slot.claim(), Generation::new(1));
        assert_eq!(slot.claim(), Generation::new(2));
        assert!(slot.is_current(Generation::new(2)));
    }

    #[test]
    fn test_observe_never_moves_backwards() {
        let slot = LatestSlot::new(0u32);
        slot.observe(Generation::new(5));
        slot.observe(Generation::new(3));
        assert_eq!(slot.latest(), Generation::new(5));
    }

    #[test]
    fn test_stale_publish_is_dropped() {
        let slot = LatestSlot::new("none");
        slot.observe(Generation::new(1));
        slot.observe(Generation::new(2));

        assert!(!slot.publish(Generation::new(1), "first"));
        assert_eq!(*slot.borrow(), "none");

        assert!(slot.publish(Generation::new(2), "second"));
        assert_eq!(*slot.borrow(), "second");

        slot.observe(Generation::new(3));
        assert!(!slot.publish(Generation::new(2), "second again"));
        assert_eq!(*slot.borrow(), "second");
    }

    #[tokio::test]
    async fn test_subscribers_see_only_current_values() {
        let slot = LatestSlot::new(0u64);
        let mut rx = slot.subscribe();
        let g = slot.claim();
        slot.claim();
        slot.publish(g, 1);
        assert!(!rx.has_changed().unwrap());

        let g = slot.latest();
        slot.publish(g, 2);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 2);
    }
}
