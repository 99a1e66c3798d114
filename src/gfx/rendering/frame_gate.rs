//! Bounds the number of frames the GPU may have queued
//!
//! A [`FrameGate`] hands out at most `capacity` [`FramePermit`]s at a time.
//! The renderer takes a permit before encoding a frame and moves it into
//! the queue's work-done callback after submission, so the slot frees up
//! only when the GPU has finished with that frame. Dropping a permit on an
//! early return frees it immediately.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct Slots {
    available: Mutex<usize>,
}

impl Slots {
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.available.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct FrameGate {
    slots: Arc<Slots>,
    capacity: usize,
}

/// One frame's claim on the gate; releases its slot when dropped
#[must_use = "dropping a permit releases the frame slot immediately"]
pub struct FramePermit {
    slots: Arc<Slots>,
}

impl FrameGate {
    /// Creates a gate admitting `capacity` frames at once (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Arc::new(Slots {
                available: Mutex::new(capacity),
            }),
            capacity,
        }
    }

    /// Frames currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.capacity - *self.slots.lock()
    }

    pub fn try_acquire(&self) -> Option<FramePermit> {
        let mut available = self.slots.lock();
        if *available == 0 {
            return None;
        }
        *available -= 1;
        Some(self.permit())
    }

    /// Acquires a slot, calling `drive` while none is free.
    ///
    /// Releases may come from another thread or as a side effect of
    /// `drive`, e.g. polling the device so completion callbacks run.
    /// The gate lock is not held while `drive` runs.
    pub fn acquire_with(&self, mut drive: impl FnMut()) -> FramePermit {
        loop {
            if let Some(permit) = self.try_acquire() {
                return permit;
            }
            log::trace!("All {} frame slots busy, waiting for the GPU", self.capacity);
            drive();
        }
    }

    fn permit(&self) -> FramePermit {
        FramePermit {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl Drop for FramePermit {
    fn drop(&mut self) {
        *self.slots.lock() += 1;
    }
}
