//! Error types for linkbus.
//!
//! Framing problems on the receive path never show up here: the parser
//! recovers on its own and only reports them through
//! [`Feed`](crate::protocol::Feed). These errors cover the producer side,
//! the consumer side and the host transport.

use thiserror::Error;

use crate::protocol::{Identifier, MessageId};

/// Main error type for all linkbus operations.
#[derive(Debug, Error)]
pub enum LinkbusError {
    /// I/O error on the host byte stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested baud rate cannot be derived from the clock.
    #[error("Invalid baud rate {baud} for a {clock_hz} Hz clock")]
    InvalidBaud { baud: u32, clock_hz: u32 },

    /// A configuration value the link cannot run with.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Every transmit slot is queued.
    #[error("No free transmit slot")]
    TxPoolExhausted,

    /// Text does not fit in a transmit slot.
    #[error("Line too long: {len} bytes (max {max})")]
    LineTooLong { len: usize, max: usize },

    /// A message already carries the maximum number of fields.
    #[error("Too many fields (max {max})")]
    TooManyFields { max: usize },

    /// The identifier is not part of the message vocabulary.
    #[error("Unknown message identifier: {0}")]
    UnknownMessage(Identifier),

    /// No handler registered for a known message.
    #[error("Handler not found for message: {0}")]
    HandlerNotFound(MessageId),

    /// A message handler rejected the message.
    #[error("Handler error: {0}")]
    Handler(String),

    /// The link was closed.
    #[error("Link closed")]
    LinkClosed,
}

/// Result type alias using LinkbusError.
pub type Result<T> = std::result::Result<T, LinkbusError>;
