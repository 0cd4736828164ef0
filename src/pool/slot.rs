//! Fixed-size lock-free slot pool.
//!
//! Each slot moves through a small state machine stored in an atomic byte:
//!
//! ```text
//!            acquire_empty            release(Full)
//!   Empty ─────────────────► Filling ───────────────► Full
//!     ▲                        │  ▲                    │
//!     │       release(Empty)   │  │ evict_oldest_full  │ acquire_full
//!     ├────────────────────────┘  └────────────────────┤
//!     │                                                ▼
//!     └──────────────────── release(Empty) ──────── Draining
//! ```
//!
//! Transitions out of `Empty` and `Full` are compare-and-swap, so a slot is
//! owned by exactly one side at a time. Ownership is represented by a
//! [`SlotHandle`], which is not `Clone` and must be given back through
//! [`SlotPool::release`].
//!
//! Every slot released as `Full` is stamped with a wrapping sequence number
//! so consumers always get the oldest one first.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

static NEXT_POOL_ID: AtomicU32 = AtomicU32::new(1);

/// Slot lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SlotState {
    /// Free for a producer.
    Empty = 0,
    /// Owned by a producer.
    Filling = 1,
    /// Published, waiting for a consumer.
    Full = 2,
    /// Owned by a consumer.
    Draining = 3,
}

impl SlotState {
    const fn from_u8(v: u8) -> Self {
        match v {
            0 => SlotState::Empty,
            1 => SlotState::Filling,
            2 => SlotState::Full,
            _ => SlotState::Draining,
        }
    }
}

/// State to hand a slot back in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseAs {
    /// Contents are discarded or consumed.
    Empty,
    /// Contents are published for a consumer.
    Full,
}

/// Exclusive ownership of one slot.
#[must_use = "a slot handle must be released back to its pool"]
#[derive(Debug, PartialEq, Eq)]
pub struct SlotHandle {
    pool: u32,
    index: usize,
}

impl SlotHandle {
    /// Position of the slot in its pool.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Pool of `N` slots holding a `T` each.
pub struct SlotPool<T, const N: usize> {
    id: u32,
    slots: [UnsafeCell<T>; N],
    states: [AtomicU8; N],
    stamps: [AtomicU32; N],
    sequence: AtomicU32,
}

// Slot contents are only reachable through a unique `SlotHandle`, whose
// existence is guaranteed by the CAS on `states`.
unsafe impl<T: Send, const N: usize> Sync for SlotPool<T, N> {}

impl<T: Default, const N: usize> SlotPool<T, N> {
    /// Create a pool with every slot empty.
    pub fn new() -> Self {
        Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            slots: std::array::from_fn(|_| UnsafeCell::new(T::default())),
            states: std::array::from_fn(|_| AtomicU8::new(SlotState::Empty as u8)),
            stamps: std::array::from_fn(|_| AtomicU32::new(0)),
            sequence: AtomicU32::new(0),
        }
    }
}

impl<T: Default, const N: usize> Default for SlotPool<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> SlotPool<T, N> {
    /// Number of slots.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Current state of a slot.
    #[inline]
    pub fn state(&self, index: usize) -> SlotState {
        SlotState::from_u8(self.states[index].load(Ordering::Acquire))
    }

    /// Number of slots currently in `state`.
    pub fn count(&self, state: SlotState) -> usize {
        (0..N).filter(|&i| self.state(i) == state).count()
    }

    /// Claim any empty slot for filling.
    pub fn acquire_empty(&self) -> Option<SlotHandle> {
        (0..N).find_map(|index| {
            self.transition(index, SlotState::Empty, SlotState::Filling)
                .then(|| self.handle(index))
        })
    }

    /// Claim the oldest full slot for draining.
    pub fn acquire_full(&self) -> Option<SlotHandle> {
        self.take_oldest_full(SlotState::Draining)
    }

    /// Take the oldest full slot back for filling, dropping its contents.
    pub fn evict_oldest_full(&self) -> Option<SlotHandle> {
        self.take_oldest_full(SlotState::Filling)
    }

    /// Give a slot back.
    pub fn release(&self, handle: SlotHandle, to: ReleaseAs) {
        self.check(&handle);
        match to {
            ReleaseAs::Empty => {
                self.states[handle.index].store(SlotState::Empty as u8, Ordering::Release);
            }
            ReleaseAs::Full => {
                let stamp = self.sequence.fetch_add(1, Ordering::Relaxed);
                self.stamps[handle.index].store(stamp, Ordering::Relaxed);
                self.states[handle.index].store(SlotState::Full as u8, Ordering::Release);
            }
        }
    }

    /// Shared access to an owned slot.
    #[inline]
    pub fn get<'a>(&'a self, handle: &'a SlotHandle) -> &'a T {
        self.check(handle);
        unsafe { &*self.slots[handle.index].get() }
    }

    /// Exclusive access to an owned slot.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub fn get_mut<'a>(&'a self, handle: &'a mut SlotHandle) -> &'a mut T {
        self.check(handle);
        unsafe { &mut *self.slots[handle.index].get() }
    }

    fn take_oldest_full(&self, to: SlotState) -> Option<SlotHandle> {
        for _ in 0..2 * N {
            let index = self.oldest_full()?;
            if !self.transition(index, SlotState::Full, to) {
                continue;
            }
            // The scan may have raced a publication of an older slot, which
            // is visible now that we synchronized with this slot's release.
            let stamp = self.stamps[index].load(Ordering::Relaxed);
            match self.oldest_full() {
                Some(other) if is_older(self.stamps[other].load(Ordering::Relaxed), stamp) => {
                    self.states[index].store(SlotState::Full as u8, Ordering::Release);
                }
                _ => return Some(self.handle(index)),
            }
        }
        None
    }

    fn oldest_full(&self) -> Option<usize> {
        let mut oldest: Option<(usize, u32)> = None;
        for index in 0..N {
            if self.state(index) != SlotState::Full {
                continue;
            }
            let stamp = self.stamps[index].load(Ordering::Relaxed);
            match oldest {
                Some((_, best)) if !is_older(stamp, best) => {}
                _ => oldest = Some((index, stamp)),
            }
        }
        oldest.map(|(index, _)| index)
    }

    #[inline]
    fn transition(&self, index: usize, from: SlotState, to: SlotState) -> bool {
        self.states[index]
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[inline]
    fn handle(&self, index: usize) -> SlotHandle {
        SlotHandle {
            pool: self.id,
            index,
        }
    }

    #[inline]
    fn check(&self, handle: &SlotHandle) {
        assert_eq!(handle.pool, self.id, "slot handle belongs to another pool");
    }
}

/// Wrapping comparison of sequence stamps.
#[inline]
fn is_older(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) < 0
}
