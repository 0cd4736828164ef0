//! Line producers for the transmit queue.
//!
//! Convenience senders on [`Linkbus`] for the console side of a link:
//! - `send_help` - command list, one line per message
//! - `send_new_prompt` / `send_new_line` - prompt and line breaks
//! - `echo_char` - echo of a typed character
//! - `send_string` - arbitrary text, waiting or failing fast
//! - `send_value` - labeled number
//! - `send_reply` / `ack` - protocol replies
//!
//! Every producer goes through the transmit queue, so pacing applies to
//! all of them.
//!
//! # Example
//!
//! ```ignore
//! link.send_value(12, "Battery")?;
//! link.send_new_prompt()?;
//!
//! // From async code
//! link.send("!VER,1.0;").await?;
//! ```

use std::fmt::Write as _;

use crate::error::{LinkbusError, Result};
use crate::link::Linkbus;
use crate::protocol::{Message, MessageId, MessageType, TxLine, MAX_TX_LINE};

const NEW_LINE: &str = "\n";
const NEW_PROMPT: &str = "\n> ";

/// What a send does when every transmit slot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendMode {
    /// Retry up to the configured spin limit, yielding in between.
    #[default]
    Wait,
    /// Return [`LinkbusError::TxPoolExhausted`] immediately.
    FailFast,
}

impl Linkbus {
    /// Queue `text` as one line.
    pub fn send_string(&self, text: &str, mode: SendMode) -> Result<()> {
        if self.is_closed() {
            return Err(LinkbusError::LinkClosed);
        }
        let tx = self.tx_queue();
        match mode {
            SendMode::FailFast => tx.try_push(text),
            SendMode::Wait => {
                for _ in 0..self.config().send_spin_limit.max(1) {
                    match tx.try_push(text) {
                        Err(LinkbusError::TxPoolExhausted) => std::thread::yield_now(),
                        other => return other,
                    }
                }
                tracing::warn!("Transmit queue stayed full, dropping line");
                Err(LinkbusError::TxPoolExhausted)
            }
        }
    }

    /// Queue `text`, waiting asynchronously for a free slot.
    ///
    /// Gives up with [`LinkbusError::TxPoolExhausted`] after the configured
    /// send timeout.
    pub async fn send(&self, text: &str) -> Result<()> {
        let start = tokio::time::Instant::now();
        let config = self.config();

        loop {
            if self.is_closed() {
                return Err(LinkbusError::LinkClosed);
            }
            match self.tx_queue().try_push(text) {
                Err(LinkbusError::TxPoolExhausted) => {}
                other => return other,
            }
            if start.elapsed() > config.send_timeout {
                return Err(LinkbusError::TxPoolExhausted);
            }
            tokio::time::sleep(config.tx_poll_interval).await;
        }
    }

    /// Send the command list.
    pub fn send_help(&self) -> Result<()> {
        self.send_string("\nCommands:\n", SendMode::Wait)?;
        let mut line = TxLine::new();
        for id in MessageId::ALL {
            line.clear();
            writeln!(line, "  ${:<3}  {}", id.code(), id.about()).map_err(|_| {
                LinkbusError::LineTooLong {
                    len: 8 + id.about().len(),
                    max: MAX_TX_LINE,
                }
            })?;
            self.send_string(&line, SendMode::Wait)?;
        }
        Ok(())
    }

    /// Start a new prompt line.
    pub fn send_new_prompt(&self) -> Result<()> {
        self.send_string(NEW_PROMPT, SendMode::Wait)
    }

    pub fn send_new_line(&self) -> Result<()> {
        self.send_string(NEW_LINE, SendMode::Wait)
    }

    /// Echo a received character. Never waits.
    pub fn echo_char(&self, byte: u8) -> Result<()> {
        let mut line = TxLine::new();
        // A single char always fits.
        let _ = line.push(byte as char);
        self.send_string(&line, SendMode::FailFast)
    }

    /// Send `label: value` on its own line.
    pub fn send_value(&self, value: i64, label: &str) -> Result<()> {
        let mut line = TxLine::new();
        writeln!(line, "{}: {}", label, value).map_err(|_| LinkbusError::LineTooLong {
            len: label.len() + 3 + value.to_string().len(),
            max: MAX_TX_LINE,
        })?;
        self.send_string(&line, SendMode::Wait)
    }

    /// Encode and queue a protocol message.
    pub fn send_reply(&self, message: &Message) -> Result<()> {
        let mut line = TxLine::new();
        message.encode_into(&mut line)?;
        self.send_string(&line, SendMode::Wait)
    }

    /// Send `!ACK;`.
    pub fn ack(&self) -> Result<()> {
        self.send_reply(&Message::outbound(MessageType::Reply, MessageId::Ack))
    }
}
