/// Ring of per-frame slots holding items retired during that frame.
///
/// The GPU may still read a resource up to F frames after the CPU issued its
/// last use. Items pushed while slot `s` is current are handed back by
/// `advance(s)` the next time the frame pacer revisits slot `s`, i.e. F frames
/// later, at which point every submission that could reference them has
/// completed.
///
/// Items pushed before the first `advance` have not been submitted yet. The
/// first `advance(i)` carries them into slot `i` so they come back F frames
/// after the frame that first references them.
///
/// # Example
///
/// ```ignore
/// let mut ring = FrameRing::new(2);
/// ring.advance(0);
/// ring.push(handle)?;            // retired during frame slot 0
/// assert!(ring.advance(1).is_empty());
/// assert_eq!(ring.advance(0), vec![handle]); // two frames later
/// ```

use crate::error::{Error, Result};

pub struct FrameRing<T> {
    slots: Vec<Vec<T>>,
    current_slot: usize,
    started: bool,
}

impl<T> FrameRing<T> {
    /// Create a ring with one slot per frame in flight (at least one)
    pub fn new(frames_in_flight: usize) -> Self {
        let slot_count = frames_in_flight.max(1);
        Self {
            slots: (0..slot_count).map(|_| Vec::new()).collect(),
            current_slot: 0,
            started: false,
        }
    }

    /// Number of slots (F)
    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Slot that receives pushed items
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    /// Make room for `additional` pushes into the current slot
    ///
    /// A push following a successful reserve cannot fail, which lets callers
    /// reserve before they mutate any other state.
    ///
    /// # Errors
    ///
    /// Returns `OutOfMemory` if host memory cannot be reserved.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        self.slots[self.current_slot]
            .try_reserve(additional)
            .map_err(|_| Error::OutOfMemory)
    }

    /// Park an item in the current slot
    ///
    /// # Errors
    ///
    /// Returns `OutOfMemory` if the slot cannot grow. The item is not parked,
    /// so whatever it refers to is still owned by the caller.
    pub fn push(&mut self, item: T) -> Result<()> {
        self.reserve(1)?;
        self.slots[self.current_slot].push(item);
        Ok(())
    }

    /// Move to `frame_index` and hand back everything parked there F frames ago
    ///
    /// The first call hands back nothing: items parked before any frame move
    /// into the new current slot instead.
    pub fn advance(&mut self, frame_index: usize) -> Vec<T> {
        let slot = frame_index % self.slots.len();
        if !self.started {
            self.started = true;
            // Every other slot is still empty
            self.slots.swap(self.current_slot, slot);
            self.current_slot = slot;
            return Vec::new();
        }
        self.current_slot = slot;
        std::mem::take(&mut self.slots[slot])
    }

    /// Number of items in `slot`
    pub fn slot_len(&self, slot: usize) -> usize {
        self.slots.get(slot).map_or(0, Vec::len)
    }

    /// Number of items parked across all slots
    pub fn pending_count(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }

    /// Whether no item is parked
    pub fn is_empty(&self) -> bool {
        self.pending_count() == 0
    }

    /// Take every parked item regardless of age (shutdown after a device idle wait)
    pub fn drain_all(&mut self) -> Vec<T> {
        let mut items = Vec::with_capacity(self.pending_count());
        for slot in &mut self.slots {
            items.append(slot);
        }
        items
    }
}

#[cfg(test)]
#[path = "frame_ring_tests.rs"]
mod tests;
