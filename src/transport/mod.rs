//! Transport module - host byte-stream adapters.
//!
//! Drives the link ports from tokio `AsyncRead` / `AsyncWrite` streams,
//! e.g. a serial device opened by the application or an in-memory duplex
//! in tests.

mod stream;

pub use stream::{spawn_rx_task, spawn_tx_task};
