//! Handler module - message dispatch.
//!
//! Provides:
//! - [`HandlerRegistry`] - maps message identifiers to handlers
//! - [`Handler`] - implemented for any `Fn(&Message, &Linkbus) -> Result<()>`
//!
//! # Example
//!
//! ```ignore
//! use linkbus::handler::HandlerRegistry;
//! use linkbus::protocol::MessageId;
//!
//! let registry = HandlerRegistry::new()
//!     .with(MessageId::Go, |_msg, link| link.ack())
//!     .with(MessageId::Battery, |msg, link| {
//!         if msg.is_poll() {
//!             link.subscribe(Broadcast::BATTERY);
//!         }
//!         link.send_value(3300, "Battery mV")
//!     });
//! ```

mod registry;

pub use registry::{Handler, HandlerRegistry, HandlerResult};
