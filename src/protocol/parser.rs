//! Byte-at-a-time frame parser.
//!
//! Implements the receive state machine:
//! - `Idle`: waiting for `$` or `!`, everything else is ignored
//! - `ReadingId`: up to 3 alphanumeric identifier characters
//! - `ReadingField(k)`: up to 10 characters of field `k`
//! - `Skipping`: absorbing fields past the third until the terminator
//!
//! The frame in progress is staged inside the parser. Only a valid
//! terminator touches the [`RxPool`]: the staged message is copied into a
//! free slot (or over the oldest unread one) and published as full.
//! Malformed input throws the staged frame away and returns to `Idle`
//! without disturbing any received message; the caller only sees it
//! through [`Feed`].
//!
//! # Example
//!
//! ```ignore
//! use linkbus::pool::RxPool;
//! use linkbus::protocol::{Feed, FrameParser};
//!
//! let pool = RxPool::new();
//! let mut parser = FrameParser::new();
//!
//! for &byte in b"$LED,ON;" {
//!     if let Feed::Published { .. } = parser.push(&pool, byte) {
//!         let msg = pool.next_message().unwrap();
//!         println!("{} {:?}", msg.id(), msg.field(0));
//!     }
//! }
//! ```

use super::identifier::Identifier;
use super::message::{Message, MessageType};
use super::wire_format::{is_field_byte, is_id_byte, markers, MAX_ID_LENGTH, MAX_MSG_LENGTH};
use crate::pool::RxPool;

/// Parser position inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    #[default]
    Idle,
    ReadingId,
    ReadingField(usize),
    Skipping,
}

/// Why a frame was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingError {
    /// Byte not allowed at this point of the frame.
    UnexpectedByte(u8),
    /// A start marker arrived inside a frame; the new frame was started.
    UnexpectedStart,
    /// More than three identifier characters.
    IdTooLong,
    /// Separator or terminator right after the prefix.
    EmptyId,
    /// Frame longer than the maximum line length.
    LineTooLong,
}

/// Outcome of feeding one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    /// Byte outside any frame.
    Ignored,
    /// Receive path is disabled.
    Disabled,
    /// A new frame started.
    Started,
    /// Byte added to the current frame.
    Accepted,
    /// A complete message is waiting in the pool; `evicted` tells whether
    /// an unread message was overwritten to make room.
    Published { evicted: bool },
    /// The current frame was thrown away.
    Discarded(FramingError),
    /// A frame completed but the consumer holds every slot.
    Dropped,
}

/// Receive state machine.
#[derive(Debug, Default)]
pub struct FrameParser {
    state: ParserState,
    staged: Message,
    prefix: u8,
    id: [u8; MAX_ID_LENGTH],
    id_len: usize,
    line_len: usize,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Check if a frame is in progress.
    #[inline]
    pub fn in_frame(&self) -> bool {
        self.state != ParserState::Idle
    }

    /// Feed one received byte.
    pub fn push(&mut self, pool: &RxPool, byte: u8) -> Feed {
        if self.state == ParserState::Idle {
            return if markers::is_start(byte) {
                self.begin(byte);
                Feed::Started
            } else {
                Feed::Ignored
            };
        }

        if markers::is_start(byte) {
            tracing::trace!("Start marker inside frame, resynchronizing");
            self.begin(byte);
            return Feed::Discarded(FramingError::UnexpectedStart);
        }

        self.line_len += 1;
        if self.line_len > MAX_MSG_LENGTH {
            return self.discard(FramingError::LineTooLong);
        }

        match self.state {
            ParserState::Idle => Feed::Ignored,
            ParserState::ReadingId => self.read_id(pool, byte),
            ParserState::ReadingField(k) => self.read_field(pool, k, byte),
            ParserState::Skipping => {
                if markers::is_terminator(byte) {
                    self.complete(pool, byte)
                } else if is_field_byte(byte) || byte == markers::FIELD_SEPARATOR {
                    Feed::Accepted
                } else {
                    self.discard(FramingError::UnexpectedByte(byte))
                }
            }
        }
    }

    /// Drop any frame in progress and return to `Idle`.
    pub fn reset(&mut self) {
        self.state = ParserState::Idle;
        self.id_len = 0;
        self.line_len = 0;
    }

    fn read_id(&mut self, pool: &RxPool, byte: u8) -> Feed {
        if is_id_byte(byte) {
            if self.id_len == MAX_ID_LENGTH {
                return self.discard(FramingError::IdTooLong);
            }
            self.id[self.id_len] = byte.to_ascii_uppercase();
            self.id_len += 1;
            return Feed::Accepted;
        }

        if byte != markers::FIELD_SEPARATOR && !markers::is_terminator(byte) {
            return self.discard(FramingError::UnexpectedByte(byte));
        }
        if self.id_len == 0 {
            return self.discard(FramingError::EmptyId);
        }

        self.staged.set_id(Identifier::encode(&self.id[..self.id_len]));

        if byte == markers::FIELD_SEPARATOR {
            self.staged.open_field();
            self.state = ParserState::ReadingField(0);
            Feed::Accepted
        } else {
            self.complete(pool, byte)
        }
    }

    fn read_field(&mut self, pool: &RxPool, k: usize, byte: u8) -> Feed {
        if is_field_byte(byte) {
            self.staged.push_field_byte(byte);
            Feed::Accepted
        } else if byte == markers::FIELD_SEPARATOR {
            self.state = if self.staged.open_field() {
                ParserState::ReadingField(k + 1)
            } else {
                ParserState::Skipping
            };
            Feed::Accepted
        } else if markers::is_terminator(byte) {
            self.complete(pool, byte)
        } else {
            self.discard(FramingError::UnexpectedByte(byte))
        }
    }

    fn begin(&mut self, prefix: u8) {
        self.staged.clear();
        self.prefix = prefix;
        self.state = ParserState::ReadingId;
        self.id_len = 0;
        self.line_len = 1;
    }

    fn complete(&mut self, pool: &RxPool, terminator: u8) -> Feed {
        let kind = match (self.prefix, terminator) {
            (_, markers::QUERY) => MessageType::Query,
            (markers::REPLY, _) => MessageType::Reply,
            _ => MessageType::Command,
        };
        self.staged.set_kind(kind);
        self.reset();

        match pool.publish(&self.staged) {
            Some(evicted) => {
                tracing::trace!("Frame complete: {}", self.staged.id());
                Feed::Published { evicted }
            }
            None => {
                tracing::warn!(
                    "No receive slot available, dropping message {}",
                    self.staged.id()
                );
                Feed::Dropped
            }
        }
    }

    fn discard(&mut self, error: FramingError) -> Feed {
        tracing::debug!("Discarding frame: {:?}", error);
        self.reset();
        Feed::Discarded(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{MessageId, MAX_FIELDS, MAX_FIELD_LENGTH};

    fn feed(parser: &mut FrameParser, pool: &RxPool, bytes: &[u8]) -> Vec<Feed> {
        bytes.iter().map(|&b| parser.push(pool, b)).collect()
    }

    fn parse_one(bytes: &[u8]) -> Option<Message> {
        let pool = RxPool::new();
        let mut parser = FrameParser::new();
        feed(&mut parser, &pool, bytes);
        pool.next_message().map(|m| (*m).clone())
    }

    #[test]
    fn test_simple_command() {
        let msg = parse_one(b"$GO;").unwrap();
        assert_eq!(msg.kind(), MessageType::Command);
        assert_eq!(msg.message_id(), Some(MessageId::Go));
        assert_eq!(msg.field_count(), 0);
    }

    #[test]
    fn test_command_with_field() {
        let msg = parse_one(b"$ID,W1FOX;").unwrap();
        assert_eq!(msg.message_id(), Some(MessageId::StationId));
        assert_eq!(msg.fields().len(), 1);
        assert_eq!(msg.field(0), Some("W1FOX"));
        assert!(msg.requests_change());
    }

    #[test]
    fn test_empty_field_is_no_change() {
        let msg = parse_one(b"$ID,;").unwrap();
        assert_eq!(msg.kind(), MessageType::Command);
        assert_eq!(msg.field_count(), 1);
        assert_eq!(msg.field(0), Some(""));
        assert!(!msg.requests_change());
    }

    #[test]
    fn test_reply() {
        let msg = parse_one(b"!ACK;").unwrap();
        assert_eq!(msg.kind(), MessageType::Reply);
        assert_eq!(msg.message_id(), Some(MessageId::Ack));
    }

    #[test]
    fn test_query_and_apply_then_report() {
        let poll = parse_one(b"$BAT?").unwrap();
        assert_eq!(poll.kind(), MessageType::Query);
        assert!(poll.is_poll());

        let apply = parse_one(b"$CLK,5000000?").unwrap();
        assert!(apply.is_apply_then_report());
        assert_eq!(apply.field(0), Some("5000000"));
        // CLK is not part of the vocabulary.
        assert_eq!(apply.checked_type(), MessageType::Invalid);
    }

    #[test]
    fn test_lowercase_id_is_uppercased() {
        let msg = parse_one(b"$led,1;").unwrap();
        assert_eq!(msg.message_id(), Some(MessageId::Leds));
    }

    #[test]
    fn test_field_truncated() {
        let msg = parse_one(b"$ID,ABCDEFGHIJKLMNOP;").unwrap();
        assert_eq!(msg.field(0), Some("ABCDEFGHIJ"));
        assert_eq!(msg.field(0).unwrap().len(), MAX_FIELD_LENGTH);
        assert!(msg.is_truncated());
    }

    #[test]
    fn test_extra_fields_dropped() {
        let msg = parse_one(b"$LED,a,b,c,d,e;").unwrap();
        assert_eq!(msg.field_count(), MAX_FIELDS);
        let fields: Vec<&str> = msg.fields().iter().map(|f| f.as_str()).collect();
        assert_eq!(fields, ["a", "b", "c"]);
        assert!(msg.dropped_fields());
    }

    #[test]
    fn test_noise_before_frame_ignored() {
        let pool = RxPool::new();
        let mut parser = FrameParser::new();
        let results = feed(&mut parser, &pool, b"xx\r\n$GO;");
        assert_eq!(&results[..4], &[Feed::Ignored; 4]);
        assert_eq!(results[4], Feed::Started);
        assert_eq!(results.last(), Some(&Feed::Published { evicted: false }));
    }

    #[test]
    fn test_invalid_byte_discards() {
        let pool = RxPool::new();
        let mut parser = FrameParser::new();
        let results = feed(&mut parser, &pool, b"$LED,O\rN;");
        assert!(results.contains(&Feed::Discarded(FramingError::UnexpectedByte(b'\r'))));
        assert_eq!(parser.state(), ParserState::Idle);
        assert!(pool.next_message().is_none());
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_id_too_long() {
        let pool = RxPool::new();
        let mut parser = FrameParser::new();
        let results = feed(&mut parser, &pool, b"$LEDS;");
        assert_eq!(results[4], Feed::Discarded(FramingError::IdTooLong));
        assert!(pool.next_message().is_none());
    }

    #[test]
    fn test_empty_id() {
        let pool = RxPool::new();
        let mut parser = FrameParser::new();
        let results = feed(&mut parser, &pool, b"$;$,1;");
        assert_eq!(results[1], Feed::Discarded(FramingError::EmptyId));
        assert_eq!(results[3], Feed::Discarded(FramingError::EmptyId));
        assert!(pool.next_message().is_none());
    }

    #[test]
    fn test_line_too_long() {
        let pool = RxPool::new();
        let mut parser = FrameParser::new();
        let mut line = b"$LED".to_vec();
        while line.len() < MAX_MSG_LENGTH {
            line.extend_from_slice(b",a");
        }
        line.push(b';');
        assert!(line.len() > MAX_MSG_LENGTH);

        let results = feed(&mut parser, &pool, &line);
        assert!(results.contains(&Feed::Discarded(FramingError::LineTooLong)));
        assert!(pool.next_message().is_none());
    }

    #[test]
    fn test_max_length_line_accepted() {
        let mut line = b"$LED,".to_vec();
        line.resize(MAX_MSG_LENGTH - 1, b'a');
        line.push(b';');
        assert_eq!(line.len(), MAX_MSG_LENGTH);
        assert!(parse_one(&line).is_some());
    }

    #[test]
    fn test_start_marker_resyncs() {
        let pool = RxPool::new();
        let mut parser = FrameParser::new();
        let results = feed(&mut parser, &pool, b"$LED,O$GO;");
        assert_eq!(results[6], Feed::Discarded(FramingError::UnexpectedStart));
        assert_eq!(results.last(), Some(&Feed::Published { evicted: false }));

        let msg = pool.next_message().unwrap();
        assert_eq!(msg.message_id(), Some(MessageId::Go));
        assert_eq!(msg.field_count(), 0);
        drop(msg);
        assert!(pool.next_message().is_none());
    }

    #[test]
    fn test_overflow_loses_oldest() {
        let pool = RxPool::new();
        let mut parser = FrameParser::new();
        feed(&mut parser, &pool, b"$GO;$ID;");
        let results = feed(&mut parser, &pool, b"$LED;");
        assert_eq!(results.last(), Some(&Feed::Published { evicted: true }));

        let ids: Vec<_> = std::iter::from_fn(|| pool.next_message().map(|m| m.id())).collect();
        assert_eq!(
            ids,
            vec![Identifier::from_code("ID"), Identifier::from_code("LED")]
        );
    }

    #[test]
    fn test_malformed_frame_never_evicts() {
        let pool = RxPool::new();
        let mut parser = FrameParser::new();
        feed(&mut parser, &pool, b"$GO;$ID;");

        let garbage: [&[u8]; 4] = [b"$\r", b"$;", b"!LEDS;", b"$LED,ON\x7f"];
        for frame in garbage {
            let results = feed(&mut parser, &pool, frame);
            assert!(results.iter().any(|r| matches!(r, Feed::Discarded(_))));
            assert!(!results.iter().any(|r| matches!(r, Feed::Published { .. })));
        }
        // A lone start marker leaves a frame open, still without a slot.
        feed(&mut parser, &pool, b"$");
        assert!(parser.in_frame());

        let ids: Vec<_> =
            std::iter::from_fn(|| pool.next_message().map(|m| m.message_id())).collect();
        assert_eq!(ids, vec![Some(MessageId::Go), Some(MessageId::StationId)]);
    }

    #[test]
    fn test_partial_frame_holds_no_slot() {
        let pool = RxPool::new();
        let mut parser = FrameParser::new();
        feed(&mut parser, &pool, b"$LED,ON,1");
        assert_eq!(parser.state(), ParserState::ReadingField(1));
        assert_eq!(pool.available(), 2);
        assert_eq!(pool.pending(), 0);
    }

    #[test]
    fn test_dropped_when_consumer_holds_slots() {
        let pool = RxPool::new();
        let mut parser = FrameParser::new();
        feed(&mut parser, &pool, b"$GO;$ID;");
        let a = pool.next_message().unwrap();
        let b = pool.next_message().unwrap();

        let results = feed(&mut parser, &pool, b"$LED;");
        assert_eq!(results.last(), Some(&Feed::Dropped));
        assert_eq!(parser.state(), ParserState::Idle);
        drop((a, b));

        feed(&mut parser, &pool, b"$VER?");
        assert_eq!(
            pool.next_message().unwrap().message_id(),
            Some(MessageId::Version)
        );
    }

    #[test]
    fn test_reset_mid_frame() {
        let pool = RxPool::new();
        let mut parser = FrameParser::new();
        feed(&mut parser, &pool, b"$LED,O");
        assert!(parser.in_frame());

        parser.reset();
        assert_eq!(parser.state(), ParserState::Idle);
        assert_eq!(pool.available(), 2);

        // Remainder of the old frame is ignored.
        let results = feed(&mut parser, &pool, b"N;");
        assert_eq!(results, vec![Feed::Ignored, Feed::Ignored]);
        assert!(pool.next_message().is_none());
    }

    #[test]
    fn test_states() {
        let pool = RxPool::new();
        let mut parser = FrameParser::new();
        parser.push(&pool, b'$');
        assert_eq!(parser.state(), ParserState::ReadingId);
        feed(&mut parser, &pool, b"LED,");
        assert_eq!(parser.state(), ParserState::ReadingField(0));
        feed(&mut parser, &pool, b"1,2,");
        assert_eq!(parser.state(), ParserState::ReadingField(2));
        parser.push(&pool, b',');
        assert_eq!(parser.state(), ParserState::Skipping);
        parser.push(&pool, b';');
        assert_eq!(parser.state(), ParserState::Idle);
    }
}
