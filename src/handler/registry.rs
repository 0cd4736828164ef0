//! Handler registry for dispatching received messages by identifier.
//!
//! The registry maps [`MessageId`]s to handlers. Messages whose identifier
//! is outside the vocabulary are reported as
//! [`LinkbusError::UnknownMessage`] instead of reaching any handler.
//!
//! # Example
//!
//! ```ignore
//! use linkbus::handler::HandlerRegistry;
//! use linkbus::protocol::MessageId;
//!
//! let mut registry = HandlerRegistry::new();
//!
//! registry.register(MessageId::Version, |msg, link| {
//!     link.send_string("!VER,1.0;", SendMode::Wait)
//! });
//!
//! while let Some(result) = registry.poll(&link) {
//!     if let Err(e) = result {
//!         tracing::warn!("{}", e);
//!     }
//! }
//! ```

use std::collections::HashMap;

use crate::error::{LinkbusError, Result};
use crate::link::Linkbus;
use crate::protocol::{Message, MessageId, MessageType};

/// Result type for handler functions.
pub type HandlerResult = Result<()>;

/// Trait for message handlers.
pub trait Handler: Send + Sync + 'static {
    /// Handle one received message.
    fn call(&self, message: &Message, link: &Linkbus) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&Message, &Linkbus) -> HandlerResult + Send + Sync + 'static,
{
    fn call(&self, message: &Message, link: &Linkbus) -> HandlerResult {
        self(message, link)
    }
}

/// Registry mapping message identifiers to handlers.
pub struct HandlerRegistry {
    handlers: HashMap<MessageId, Box<dyn Handler>>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler, replacing any previous one for the same message.
    pub fn register<H: Handler>(&mut self, id: MessageId, handler: H) {
        if self.handlers.insert(id, Box::new(handler)).is_some() {
            tracing::debug!("Replacing handler for {}", id);
        }
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<H: Handler>(mut self, id: MessageId, handler: H) -> Self {
        self.register(id, handler);
        self
    }

    /// Get the handler for a message.
    pub fn get_handler(&self, id: MessageId) -> Option<&dyn Handler> {
        self.handlers.get(&id).map(|h| h.as_ref())
    }

    #[inline]
    pub fn contains(&self, id: MessageId) -> bool {
        self.handlers.contains_key(&id)
    }

    /// Registered messages.
    pub fn registered(&self) -> impl Iterator<Item = MessageId> + '_ {
        self.handlers.keys().copied()
    }

    /// Dispatch a message to its handler.
    pub fn dispatch(&self, message: &Message, link: &Linkbus) -> Result<()> {
        if message.checked_type() == MessageType::Invalid {
            return Err(LinkbusError::UnknownMessage(message.id()));
        }
        let id = message
            .message_id()
            .ok_or(LinkbusError::UnknownMessage(message.id()))?;

        let handler = self
            .get_handler(id)
            .ok_or(LinkbusError::HandlerNotFound(id))?;
        handler.call(message, link)
    }

    /// Take the next received message and dispatch it.
    ///
    /// Returns `None` when no message is waiting. The receive slot is
    /// released once the handler returns.
    pub fn poll(&self, link: &Linkbus) -> Option<Result<()>> {
        let message = link.next_message()?;
        let result = self.dispatch(&message, link);
        if let Err(e) = &result {
            tracing::debug!("Dispatch failed for {}: {}", message.id(), e);
        }
        Some(result)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
