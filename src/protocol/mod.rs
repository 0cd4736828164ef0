//! Protocol module - wire format, identifiers, messages and parsing.
//!
//! This module implements the line protocol:
//! - Wire constants and byte classes
//! - Identifier codec and message vocabulary
//! - Message struct with typed accessors
//! - Byte-at-a-time frame parser

mod identifier;
mod message;
mod parser;
mod wire_format;

pub use identifier::{Identifier, MessageId};
pub use message::{Broadcast, DeviceId, Field, Message, MessageType, TxLine};
pub use parser::{Feed, FrameParser, FramingError, ParserState};
pub use wire_format::{
    is_field_byte, is_id_byte, markers, MAX_COMMANDLINE_LENGTH, MAX_FIELDS, MAX_FIELD_LENGTH,
    MAX_ID_LENGTH, MAX_MSG_LENGTH, MAX_TX_LINE, MAX_TX_MSG_LENGTH, MIN_TX_INTERVAL, POWERUP_DELAY,
    RX_SLOTS, TX_SLOTS,
};
