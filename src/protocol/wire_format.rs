//! Wire format constants and byte classes.
//!
//! Every frame is one line of printable ASCII:
//! ```text
//! ┌────────┬──────────┬───────────────────────┬────────────┐
//! │ Prefix │ ID       │ Fields                │ Terminator │
//! │ $ or ! │ 1-3 chars│ (',' 0-10 chars) x 0-3│ ; or ?     │
//! └────────┴──────────┴───────────────────────┴────────────┘
//! ```
//!
//! `$` starts a command, `!` a reply or broadcast. `;` ends a message,
//! `?` ends a query (subscription request).

use std::time::Duration;

/// Longest inbound line, prefix through terminator.
pub const MAX_MSG_LENGTH: usize = 50;

/// Maximum characters in one field.
pub const MAX_FIELD_LENGTH: usize = 10;

/// Maximum fields kept per message.
pub const MAX_FIELDS: usize = 3;

/// Maximum characters in a message identifier.
pub const MAX_ID_LENGTH: usize = 3;

/// Number of receive slots.
pub const RX_SLOTS: usize = 2;

/// Transmit slot size in bytes, including the terminating NUL of the
/// firmware buffer.
pub const MAX_TX_MSG_LENGTH: usize = 41;

/// Usable text per transmit slot.
pub const MAX_TX_LINE: usize = MAX_TX_MSG_LENGTH - 1;

/// Number of transmit slots.
pub const TX_SLOTS: usize = 4;

/// Longest command line a console user can type.
pub const MAX_COMMANDLINE_LENGTH: usize = (1 + MAX_FIELD_LENGTH) * MAX_FIELDS;

/// Minimum spacing between the starts of two transmissions.
pub const MIN_TX_INTERVAL: Duration = Duration::from_millis(100);

/// Settle time a peer waits after power-up before talking.
pub const POWERUP_DELAY: Duration = Duration::from_secs(6);

/// Frame marker bytes.
pub mod markers {
    /// Starts a command frame.
    pub const COMMAND: u8 = b'$';
    /// Starts a reply or broadcast frame.
    pub const REPLY: u8 = b'!';
    /// Separates the identifier and fields.
    pub const FIELD_SEPARATOR: u8 = b',';
    /// Ends a message.
    pub const END: u8 = b';';
    /// Ends a query.
    pub const QUERY: u8 = b'?';

    /// Check if a byte starts a frame.
    #[inline]
    pub fn is_start(byte: u8) -> bool {
        byte == COMMAND || byte == REPLY
    }

    /// Check if a byte terminates a frame.
    #[inline]
    pub fn is_terminator(byte: u8) -> bool {
        byte == END || byte == QUERY
    }
}

/// Check if a byte may appear in a message identifier.
#[inline]
pub fn is_id_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
}

/// Check if a byte may appear inside a field.
///
/// Any printable ASCII character is allowed except the frame markers.
#[inline]
pub fn is_field_byte(byte: u8) -> bool {
    (0x20..=0x7E).contains(&byte)
        && !markers::is_start(byte)
        && !markers::is_terminator(byte)
        && byte != markers::FIELD_SEPARATOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers() {
        assert!(markers::is_start(b'$'));
        assert!(markers::is_start(b'!'));
        assert!(!markers::is_start(b';'));
        assert!(markers::is_terminator(b';'));
        assert!(markers::is_terminator(b'?'));
        assert!(!markers::is_terminator(b','));
    }

    #[test]
    fn test_field_bytes() {
        assert!(is_field_byte(b'W'));
        assert!(is_field_byte(b'1'));
        assert!(is_field_byte(b' '));
        assert!(is_field_byte(b'-'));
        assert!(!is_field_byte(b','));
        assert!(!is_field_byte(b';'));
        assert!(!is_field_byte(b'?'));
        assert!(!is_field_byte(b'$'));
        assert!(!is_field_byte(b'\r'));
        assert!(!is_field_byte(0x80));
    }

    #[test]
    fn test_id_bytes() {
        assert!(is_id_byte(b'G'));
        assert!(is_id_byte(b'k'));
        assert!(is_id_byte(b'0'));
        assert!(!is_id_byte(b'_'));
        assert!(!is_id_byte(b' '));
    }

    #[test]
    fn test_sizes() {
        assert_eq!(MAX_TX_LINE, 40);
        assert_eq!(MAX_COMMANDLINE_LENGTH, 33);
        assert_eq!(MIN_TX_INTERVAL, Duration::from_millis(100));
    }
}
