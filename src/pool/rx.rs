//! Receive slot pool.
//!
//! Two [`Message`] slots shared between the byte-receive path (producer)
//! and the main loop (consumer). The producer only claims a slot for a
//! message that is already complete. When none is empty, the oldest unread
//! message is overwritten so reception never stalls.

use std::ops::Deref;

use super::slot::{ReleaseAs, SlotHandle, SlotPool, SlotState};
use crate::protocol::{Message, RX_SLOTS};

/// Slot pool for received messages.
pub struct RxPool {
    slots: SlotPool<Message, RX_SLOTS>,
}

impl RxPool {
    pub fn new() -> Self {
        Self {
            slots: SlotPool::new(),
        }
    }

    /// Claim an empty slot.
    #[inline]
    pub fn acquire_empty(&self) -> Option<SlotHandle> {
        self.slots.acquire_empty()
    }

    /// Claim the oldest full slot.
    #[inline]
    pub fn acquire_full(&self) -> Option<SlotHandle> {
        self.slots.acquire_full()
    }

    #[inline]
    pub fn release(&self, handle: SlotHandle, to: ReleaseAs) {
        self.slots.release(handle, to)
    }

    #[inline]
    pub fn message<'a>(&'a self, handle: &'a SlotHandle) -> &'a Message {
        self.slots.get(handle)
    }

    #[inline]
    pub fn message_mut<'a>(&'a self, handle: &'a mut SlotHandle) -> &'a mut Message {
        self.slots.get_mut(handle)
    }

    /// Copy a complete message into the pool and publish it.
    ///
    /// Uses an empty slot if there is one, otherwise overwrites the oldest
    /// unread message. Returns whether a message was evicted, or `None`
    /// when the consumer holds every slot.
    pub fn publish(&self, message: &Message) -> Option<bool> {
        let (mut handle, evicted) = match self.slots.acquire_empty() {
            Some(handle) => (handle, false),
            None => {
                let handle = self.slots.evict_oldest_full()?;
                tracing::warn!(
                    "Receive slots full, dropping unread message {}",
                    self.slots.get(&handle).id()
                );
                (handle, true)
            }
        };
        self.slots.get_mut(&mut handle).clone_from(message);
        self.slots.release(handle, ReleaseAs::Full);
        Some(evicted)
    }

    /// Take the oldest complete message.
    ///
    /// The slot returns to the pool when the guard is dropped.
    pub fn next_message(&self) -> Option<RxMessage<'_>> {
        self.acquire_full().map(|handle| RxMessage {
            pool: self,
            handle: Some(handle),
        })
    }

    /// Number of complete messages waiting.
    #[inline]
    pub fn pending(&self) -> usize {
        self.slots.count(SlotState::Full)
    }

    /// Number of slots available to the parser without eviction.
    #[inline]
    pub fn available(&self) -> usize {
        self.slots.count(SlotState::Empty)
    }
}

impl Default for RxPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowed received message.
pub struct RxMessage<'a> {
    pool: &'a RxPool,
    handle: Option<SlotHandle>,
}

impl std::fmt::Debug for RxMessage<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RxMessage").field(self.deref()).finish()
    }
}

impl Deref for RxMessage<'_> {
    type Target = Message;

    fn deref(&self) -> &Message {
        match &self.handle {
            Some(handle) => self.pool.message(handle),
            None => unreachable!("handle is only taken on drop"),
        }
    }
}

impl Drop for RxMessage<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.pool.release(handle, ReleaseAs::Empty);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Identifier, MessageId, MessageType};

    fn publish(pool: &RxPool, code: &str) -> Option<bool> {
        let mut msg = Message::new();
        msg.set_kind(MessageType::Command);
        msg.set_id(Identifier::from_code(code));
        pool.publish(&msg)
    }

    #[test]
    fn test_next_message_releases_on_drop() {
        let pool = RxPool::new();
        assert_eq!(publish(&pool, "GO"), Some(false));
        assert_eq!(pool.pending(), 1);

        {
            let msg = pool.next_message().unwrap();
            assert_eq!(msg.id(), Identifier::from_code("GO"));
            assert_eq!(pool.pending(), 0);
        }
        assert_eq!(pool.available(), RX_SLOTS);
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let pool = RxPool::new();
        assert_eq!(publish(&pool, "GO"), Some(false));
        assert_eq!(publish(&pool, "ID"), Some(false));
        assert_eq!(publish(&pool, "LED"), Some(true));

        let first = pool.next_message().unwrap();
        assert_eq!(first.id(), Identifier::from_code("ID"));
        drop(first);
        let second = pool.next_message().unwrap();
        assert_eq!(second.id(), Identifier::from_code("LED"));
    }

    #[test]
    fn test_publish_overwrites_stale_fields() {
        let pool = RxPool::new();
        let mut long = Message::outbound(MessageType::Command, MessageId::Leds);
        long.push_field("ON").unwrap();
        long.push_field("OFF").unwrap();
        pool.publish(&long);
        drop(pool.next_message());

        publish(&pool, "GO");
        let msg = pool.next_message().unwrap();
        assert_eq!(msg.field_count(), 0);
        assert_eq!(msg.id(), Identifier::from_code("GO"));
    }

    #[test]
    fn test_publish_fails_when_consumer_holds_all() {
        let pool = RxPool::new();
        publish(&pool, "GO");
        publish(&pool, "ID");
        let a = pool.next_message().unwrap();
        let b = pool.next_message().unwrap();
        assert_eq!(publish(&pool, "LED"), None);
        drop(a);
        drop(b);
        assert_eq!(pool.available(), RX_SLOTS);
    }

    #[test]
    fn test_raw_slot_accessors() {
        let pool = RxPool::new();
        let mut handle = pool.acquire_empty().unwrap();
        pool.message_mut(&mut handle).set_id(Identifier::from_code("VER"));
        pool.release(handle, ReleaseAs::Full);

        let handle = pool.acquire_full().unwrap();
        assert_eq!(pool.message(&handle).id(), Identifier::from_code("VER"));
        pool.release(handle, ReleaseAs::Empty);
        assert_eq!(pool.available(), RX_SLOTS);
    }
}
