//! # linkbus
//!
//! Line-oriented serial framing protocol for links between small
//! controllers.
//!
//! Frames are single ASCII lines such as `$LED,ON;`, `!VER,1.0;` or
//! `$BAT?`. This crate turns a stream of received bytes into messages and
//! queues outbound lines for a paced byte sink.
//!
//! ## Architecture
//!
//! - **Receive path**: bytes go into [`RxPort`], whose frame parser stages
//!   each frame and copies it into one of two receive slots once it is
//!   complete. The main loop takes complete messages from
//!   [`Linkbus::next_message`]. If the consumer falls behind, the oldest
//!   unread message is overwritten.
//! - **Transmit path**: producers queue lines into four transmit slots.
//!   [`TxPort`] hands them out byte by byte in FIFO order, never starting a
//!   new line less than 100 ms after the previous one started.
//!
//! Slot ownership moves through atomic state flags, so both ports can run
//! in interrupt context or on another thread without locks.
//!
//! ## Example
//!
//! ```ignore
//! use linkbus::handler::HandlerRegistry;
//! use linkbus::protocol::MessageId;
//! use linkbus::transport::{spawn_rx_task, spawn_tx_task};
//! use linkbus::Linkbus;
//!
//! #[tokio::main]
//! async fn main() -> linkbus::Result<()> {
//!     let (link, rx, tx) = Linkbus::init(57_600)?;
//!     let (reader, writer) = tokio::io::split(open_serial_port()?);
//!     spawn_rx_task(reader, rx);
//!     spawn_tx_task(writer, tx);
//!
//!     let registry = HandlerRegistry::new().with(MessageId::Go, |_, link| link.ack());
//!     loop {
//!         while let Some(result) = registry.poll(&link) {
//!             if let Err(e) = result {
//!                 tracing::warn!("{}", e);
//!             }
//!         }
//!         tokio::time::sleep(std::time::Duration::from_millis(10)).await;
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod pacer;
pub mod pool;
pub mod protocol;
pub mod transport;

mod console;
mod link;

pub use config::LinkConfig;
pub use console::SendMode;
pub use error::{LinkbusError, Result};
pub use link::{Linkbus, LinkbusBuilder, RxPort, TxPort};
pub use pacer::Pacer;
pub use protocol::{Identifier, Message, MessageId, MessageType};
