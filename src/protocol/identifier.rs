//! Message identifier codec.
//!
//! A message identifier is a short alphanumeric code (`GO`, `LED`, ...)
//! folded into a `u16` with positional decimal weights:
//!
//! ```text
//! id = Σ code[i] · 10^(n-1-i)        e.g. "GO" = 'G'·10 + 'O' = 789
//! ```
//!
//! Only the first three characters take part. Three bytes of at most 255
//! sum to 28305, so the value always fits and never reaches the
//! [`Identifier::INVALID`] sentinel.
//!
//! The codec does not judge validity. [`MessageId`] is the closed
//! vocabulary a consumer matches against.

use std::fmt;

use super::wire_format::MAX_ID_LENGTH;

/// Compact numeric message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Identifier(u16);

impl Identifier {
    /// No message.
    pub const EMPTY: Self = Self(0);

    /// Sentinel for a message that could not be identified.
    pub const INVALID: Self = Self(u16::MAX);

    /// Encode a code. Bytes beyond the third are ignored.
    pub const fn encode(code: &[u8]) -> Self {
        let mut value: u16 = 0;
        let mut i = 0;
        while i < code.len() && i < MAX_ID_LENGTH {
            value = value * 10 + code[i] as u16;
            i += 1;
        }
        Self(value)
    }

    /// Encode a textual code.
    #[inline]
    pub const fn from_code(code: &str) -> Self {
        Self::encode(code.as_bytes())
    }

    /// Wrap a raw value.
    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == Self::EMPTY.0
    }

    #[inline]
    pub const fn is_invalid(self) -> bool {
        self.0 == Self::INVALID.0
    }

    /// Look up the vocabulary entry for this identifier.
    #[inline]
    pub fn message_id(self) -> Option<MessageId> {
        MessageId::from_identifier(self)
    }
}

impl From<u16> for Identifier {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message_id() {
            Some(id) => write!(f, "{} ({})", id.code(), self.0),
            None if self.is_invalid() => f.write_str("INVALID"),
            None => write!(f, "{}", self.0),
        }
    }
}

macro_rules! vocabulary {
    ($($variant:ident => $code:literal, $about:literal;)+) => {
        /// Known message identifiers.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum MessageId {
            $(
                #[doc = $about]
                $variant,
            )+
        }

        impl MessageId {
            /// Every known message.
            pub const ALL: &'static [MessageId] = &[$(MessageId::$variant),+];

            /// Textual code as sent on the wire.
            pub const fn code(self) -> &'static str {
                match self {
                    $(MessageId::$variant => $code,)+
                }
            }

            /// One-line description for help output.
            pub const fn about(self) -> &'static str {
                match self {
                    $(MessageId::$variant => $about,)+
                }
            }
        }
    };
}

vocabulary! {
    ClockCal => "CAL", "Set clock calibration";
    FactoryReset => "FAC", "Restore default settings";
    OverrideDip => "DIP", "Override DIP switches";
    Leds => "LED", "Turn LEDs on or off";
    Temperature => "TEM", "Temperature data";
    StationId => "ID", "Set station callsign";
    Go => "GO", "Synchronize clock";
    CodeSpeed => "SPD", "Set code speed";
    StartTones => "STA", "Enable start tones";
    TransmitterEnable => "TXE", "Enable transmitter keying";
    Reset => "RST", "Processor reset";
    Version => "VER", "Software version";
    Battery => "BAT", "Battery voltage reports";
    Ack => "ACK", "Acknowledge a command";
}

impl MessageId {
    /// Numeric identifier of this message.
    #[inline]
    pub const fn identifier(self) -> Identifier {
        Identifier::from_code(self.code())
    }

    /// Reverse lookup from a numeric identifier.
    pub fn from_identifier(id: Identifier) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.identifier() == id)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
