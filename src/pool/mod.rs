//! Slot pools shared between the byte path and the main loop.
//!
//! - [`SlotPool`] - generic fixed-size pool with atomic slot states
//! - [`RxPool`] - two message slots, overwrite-oldest on overflow
//! - [`TxQueue`] - four paced line slots, FIFO drain

mod rx;
mod slot;
mod tx;

pub use rx::{RxMessage, RxPool};
pub use slot::{ReleaseAs, SlotHandle, SlotPool, SlotState};
pub use tx::{TxLineWriter, TxQueue};
