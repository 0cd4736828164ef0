//! Message types carried in receive slots.
//!
//! A [`Message`] is what the parser leaves behind in a receive slot once a
//! frame is complete: the frame type, the identifier and up to three
//! fields. Empty fields mean "no change"; a query with only empty fields
//! asks for the current value, while a query with data asks to apply the
//! change and then report.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::identifier::{Identifier, MessageId};
use super::wire_format::{markers, MAX_FIELDS, MAX_FIELD_LENGTH, MAX_TX_LINE};
use crate::error::{LinkbusError, Result};

/// One message field.
pub type Field = heapless::String<MAX_FIELD_LENGTH>;

/// One line of outbound text.
pub type TxLine = heapless::String<MAX_TX_LINE>;

/// Frame classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MessageType {
    /// Not yet classified (slot still being filled or cleared).
    #[default]
    Unknown,
    /// `$...;`
    Command,
    /// `$...?` or `!...?`
    Query,
    /// `!...;`
    Reply,
    /// Identifier outside the known vocabulary.
    Invalid,
}

/// Receive slot content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    kind: MessageType,
    id: Identifier,
    fields: [Field; MAX_FIELDS],
    field_count: usize,
    truncated: bool,
    dropped_fields: bool,
}

impl Message {
    /// Create an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an outbound message for a known identifier.
    pub fn outbound(kind: MessageType, id: MessageId) -> Self {
        let mut msg = Self::new();
        msg.kind = kind;
        msg.id = id.identifier();
        msg
    }

    /// Reset to the empty state.
    pub fn clear(&mut self) {
        self.kind = MessageType::Unknown;
        self.id = Identifier::EMPTY;
        for field in &mut self.fields {
            field.clear();
        }
        self.field_count = 0;
        self.truncated = false;
        self.dropped_fields = false;
    }

    #[inline]
    pub fn kind(&self) -> MessageType {
        self.kind
    }

    #[inline]
    pub fn id(&self) -> Identifier {
        self.id
    }

    /// Vocabulary entry, if the identifier is known.
    #[inline]
    pub fn message_id(&self) -> Option<MessageId> {
        self.id.message_id()
    }

    /// Type with the vocabulary applied: unknown identifiers are `Invalid`.
    pub fn checked_type(&self) -> MessageType {
        if self.message_id().is_none() {
            MessageType::Invalid
        } else {
            self.kind
        }
    }

    /// Fields in wire order.
    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields[..self.field_count]
    }

    /// Field text by position, `None` past the last field.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields().get(index).map(|f| f.as_str())
    }

    #[inline]
    pub fn field_count(&self) -> usize {
        self.field_count
    }

    /// At least one field was cut to fit.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Fields beyond the maximum were discarded.
    #[inline]
    pub fn dropped_fields(&self) -> bool {
        self.dropped_fields
    }

    /// Frame ended in `?`.
    #[inline]
    pub fn is_query(&self) -> bool {
        self.kind == MessageType::Query
    }

    /// Any field carries data.
    pub fn requests_change(&self) -> bool {
        self.fields().iter().any(|f| !f.is_empty())
    }

    /// Query without data: report the current value (or subscribe).
    pub fn is_poll(&self) -> bool {
        self.is_query() && !self.requests_change()
    }

    /// Query with data: apply the change, then report.
    pub fn is_apply_then_report(&self) -> bool {
        self.is_query() && self.requests_change()
    }

    /// Append an outbound field.
    pub fn push_field(&mut self, value: &str) -> Result<()> {
        if self.field_count == MAX_FIELDS {
            return Err(LinkbusError::TooManyFields { max: MAX_FIELDS });
        }
        let mut field = Field::new();
        field.push_str(value).map_err(|_| LinkbusError::LineTooLong {
            len: value.len(),
            max: MAX_FIELD_LENGTH,
        })?;
        self.fields[self.field_count] = field;
        self.field_count += 1;
        Ok(())
    }

    /// Render as a wire line, e.g. `!LED,ON;`.
    ///
    /// Replies use `!`; commands and queries use `$`.
    pub fn encode_into(&self, line: &mut TxLine) -> Result<()> {
        let id = self
            .message_id()
            .ok_or(LinkbusError::UnknownMessage(self.id))?;
        let prefix = match self.kind {
            MessageType::Reply => markers::REPLY,
            _ => markers::COMMAND,
        };
        let terminator = match self.kind {
            MessageType::Query => markers::QUERY,
            _ => markers::END,
        };

        line.clear();
        let overflow = || LinkbusError::LineTooLong {
            len: self.encoded_len(id),
            max: MAX_TX_LINE,
        };
        line.push(prefix as char).map_err(|_| overflow())?;
        line.push_str(id.code()).map_err(|_| overflow())?;
        for field in self.fields() {
            write!(line, ",{}", field).map_err(|_| overflow())?;
        }
        line.push(terminator as char).map_err(|_| overflow())?;
        Ok(())
    }

    fn encoded_len(&self, id: MessageId) -> usize {
        2 + id.code().len() + self.fields().iter().map(|f| f.len() + 1).sum::<usize>()
    }

    // Parser-side accessors.

    pub(crate) fn set_kind(&mut self, kind: MessageType) {
        self.kind = kind;
    }

    pub(crate) fn set_id(&mut self, id: Identifier) {
        self.id = id;
    }

    /// Open the next field; returns `false` when none is left.
    pub(crate) fn open_field(&mut self) -> bool {
        if self.field_count == MAX_FIELDS {
            self.dropped_fields = true;
            return false;
        }
        self.field_count += 1;
        true
    }

    /// Append to the last open field, truncating on overflow.
    pub(crate) fn push_field_byte(&mut self, byte: u8) {
        let Some(last) = self.field_count.checked_sub(1) else {
            return;
        };
        if self.fields[last].push(byte as char).is_err() {
            self.truncated = true;
        }
    }
}

/// Periodic report channels a peer can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Broadcast(u8);

impl Broadcast {
    pub const NONE: Self = Self(0);
    pub const BATTERY: Self = Self(0x01);
    pub const RSSI: Self = Self(0x02);
    pub const RF: Self = Self(0x04);
    pub const PROCESSOR_TEMP: Self = Self(0x08);
    pub const ALL: Self = Self(0xFF);

    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Broadcast {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Station roles on a shared link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum DeviceId {
    #[default]
    None = 0,
    ControlHead = 1,
    Receiver = 2,
    Transmitter = 3,
}

impl TryFrom<u8> for DeviceId {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        match value {
            0 => Ok(DeviceId::None),
            1 => Ok(DeviceId::ControlHead),
            2 => Ok(DeviceId::Receiver),
            3 => Ok(DeviceId::Transmitter),
            other => Err(other),
        }
    }
}
