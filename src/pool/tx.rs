//! Transmit slot queue.
//!
//! Four text slots filled by producers and drained by the byte sink in
//! strict FIFO order. Draining goes through a [`Pacer`]: nothing is handed
//! to the sink until the minimum interval since the previous transmission
//! has passed.

use std::ops::{Deref, DerefMut};

use super::slot::{ReleaseAs, SlotHandle, SlotPool, SlotState};
use crate::error::{LinkbusError, Result};
use crate::pacer::Pacer;
use crate::protocol::{TxLine, MAX_TX_LINE, TX_SLOTS};

/// Paced FIFO of outbound lines.
pub struct TxQueue {
    slots: SlotPool<TxLine, TX_SLOTS>,
    pacer: Pacer,
}

impl TxQueue {
    /// Create a queue with the default pacer.
    pub fn new() -> Self {
        Self::with_pacer(Pacer::new())
    }

    pub fn with_pacer(pacer: Pacer) -> Self {
        Self {
            slots: SlotPool::new(),
            pacer,
        }
    }

    #[inline]
    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    /// Claim an empty slot for writing. The line comes back cleared.
    ///
    /// Returns `None` while all slots are queued or draining.
    pub fn acquire_empty_for_write(&self) -> Option<SlotHandle> {
        let mut handle = self.slots.acquire_empty()?;
        self.slots.get_mut(&mut handle).clear();
        Some(handle)
    }

    #[inline]
    pub fn line<'a>(&'a self, handle: &'a SlotHandle) -> &'a TxLine {
        self.slots.get(handle)
    }

    #[inline]
    pub fn line_mut<'a>(&'a self, handle: &'a mut SlotHandle) -> &'a mut TxLine {
        self.slots.get_mut(handle)
    }

    /// Queue a written slot behind every line queued before it.
    #[inline]
    pub fn enqueue(&self, handle: SlotHandle) {
        self.slots.release(handle, ReleaseAs::Full);
    }

    /// Give back a claimed slot without sending it.
    #[inline]
    pub fn cancel(&self, handle: SlotHandle) {
        self.slots.release(handle, ReleaseAs::Empty);
    }

    /// Take the oldest queued line if the pacer allows a transmission now.
    ///
    /// A successful call starts a transmission as far as the pacer is
    /// concerned.
    pub fn next_to_drain(&self) -> Option<SlotHandle> {
        if !self.pacer.is_ready() {
            return None;
        }
        let handle = self.slots.acquire_full()?;
        self.pacer.mark_started();
        Some(handle)
    }

    /// Return a fully sent slot.
    #[inline]
    pub fn release_drained(&self, handle: SlotHandle) {
        self.slots.release(handle, ReleaseAs::Empty);
    }

    /// Claim a slot behind a guard; dropping the guard without
    /// [`commit`](TxLineWriter::commit) gives the slot back unsent.
    pub fn writer(&self) -> Option<TxLineWriter<'_>> {
        self.acquire_empty_for_write().map(|handle| TxLineWriter {
            queue: self,
            handle: Some(handle),
        })
    }

    /// Queue `text` as one line without waiting.
    pub fn try_push(&self, text: &str) -> Result<()> {
        if text.len() > MAX_TX_LINE {
            return Err(LinkbusError::LineTooLong {
                len: text.len(),
                max: MAX_TX_LINE,
            });
        }
        let mut writer = self.writer().ok_or(LinkbusError::TxPoolExhausted)?;
        // Length was checked above.
        let _ = writer.push_str(text);
        writer.commit();
        Ok(())
    }

    /// Lines queued and not yet handed to the sink.
    #[inline]
    pub fn pending(&self) -> usize {
        self.slots.count(SlotState::Full)
    }

    /// Check if the sink is currently sending a line.
    #[inline]
    pub fn in_progress(&self) -> bool {
        self.slots.count(SlotState::Draining) > 0
    }

    /// Check if a producer could claim a slot right now.
    #[inline]
    pub fn has_room(&self) -> bool {
        self.slots.count(SlotState::Empty) > 0
    }
}

impl Default for TxQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Write access to a claimed transmit slot.
pub struct TxLineWriter<'a> {
    queue: &'a TxQueue,
    handle: Option<SlotHandle>,
}

impl TxLineWriter<'_> {
    /// Queue the line for transmission.
    pub fn commit(mut self) {
        if let Some(handle) = self.handle.take() {
            self.queue.enqueue(handle);
        }
    }
}

impl Deref for TxLineWriter<'_> {
    type Target = TxLine;

    fn deref(&self) -> &TxLine {
        match &self.handle {
            Some(handle) => self.queue.line(handle),
            None => unreachable!("handle is only taken on commit or drop"),
        }
    }
}

impl DerefMut for TxLineWriter<'_> {
    fn deref_mut(&mut self) -> &mut TxLine {
        match &mut self.handle {
            Some(handle) => self.queue.line_mut(handle),
            None => unreachable!("handle is only taken on commit or drop"),
        }
    }
}

impl Drop for TxLineWriter<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.queue.cancel(handle);
        }
    }
}
