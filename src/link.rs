//! Link handle, builder and byte ports.
//!
//! [`Linkbus::init`] (or the [`LinkbusBuilder`]) creates three pieces that
//! share one set of pools:
//!
//! - [`Linkbus`]: the main-loop handle. Cloneable. Reads messages, queues
//!   lines, controls the receive path.
//! - [`RxPort`]: the byte source side. Owns the frame parser and takes one
//!   received byte at a time.
//! - [`TxPort`]: the byte sink side. Hands out one byte at a time from the
//!   oldest queued line, subject to pacing.
//!
//! The ports never block and never allocate, so they can sit behind an
//! interrupt handler or a host I/O task alike.
//!
//! # Example
//!
//! ```ignore
//! use linkbus::Linkbus;
//!
//! let (link, mut rx, mut tx) = Linkbus::init(57_600)?;
//!
//! for &byte in b"$VER?" {
//!     rx.receive(byte);
//! }
//! if let Some(msg) = link.next_message() {
//!     link.send_string("!VER,1.0;", SendMode::FailFast)?;
//! }
//! while let Some(byte) = tx.next_byte() {
//!     uart_write(byte);
//! }
//! ```

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use quanta::Clock;

use crate::config::LinkConfig;
use crate::error::Result;
use crate::pacer::Pacer;
use crate::pool::{RxMessage, RxPool, SlotHandle, TxQueue};
use crate::protocol::{Broadcast, DeviceId, Feed, FrameParser, ParserState};

/// State shared by the link handle and both ports.
pub(crate) struct LinkShared {
    config: LinkConfig,
    rx: RxPool,
    tx: TxQueue,
    rx_enabled: AtomicBool,
    /// Bumped to make the receive port drop its frame in progress.
    rx_epoch: AtomicU32,
    subscriptions: AtomicU8,
    closed: AtomicBool,
}

/// Builder for configuring and creating a link.
#[derive(Default)]
pub struct LinkbusBuilder {
    config: LinkConfig,
    clock: Option<Clock>,
}

impl LinkbusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: LinkConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the line rate.
    ///
    /// Default: 57600
    pub fn baud(mut self, baud: u32) -> Self {
        self.config.baud = baud;
        self
    }

    /// Set the UART clock.
    ///
    /// Default: 16 MHz
    pub fn clock_hz(mut self, clock_hz: u32) -> Self {
        self.config.clock_hz = clock_hz;
        self
    }

    /// Set the minimum spacing between transmissions.
    ///
    /// Default: 100ms
    pub fn min_tx_interval(mut self, interval: Duration) -> Self {
        self.config.min_tx_interval = interval;
        self
    }

    /// Set how many attempts a waiting send makes.
    ///
    /// Default: 10000
    pub fn send_spin_limit(mut self, limit: u32) -> Self {
        self.config.send_spin_limit = limit;
        self
    }

    /// Set the idle poll interval of the host transmit task.
    ///
    /// Default: 5ms
    pub fn tx_poll_interval(mut self, interval: Duration) -> Self {
        self.config.tx_poll_interval = interval;
        self
    }

    /// Set how long async sends wait for a slot.
    ///
    /// Default: 5s
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.config.send_timeout = timeout;
        self
    }

    /// Set the role of this station.
    pub fn device(mut self, device: DeviceId) -> Self {
        self.config.device = device;
        self
    }

    /// Use a specific clock for pacing (e.g. `Clock::mock()` in tests).
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the configuration and create the link.
    pub fn build(self) -> Result<(Linkbus, RxPort, TxPort)> {
        self.config.validate()?;
        let divisor = self.config.divisor()?;
        tracing::debug!(
            "Linkbus at {} baud (divisor {}), min tx interval {:?}",
            self.config.baud,
            divisor,
            self.config.min_tx_interval
        );

        let clock = self.clock.unwrap_or_else(Clock::new);
        let pacer = Pacer::with_clock(clock, self.config.min_tx_interval);
        let shared = Arc::new(LinkShared {
            config: self.config,
            rx: RxPool::new(),
            tx: TxQueue::with_pacer(pacer),
            rx_enabled: AtomicBool::new(true),
            rx_epoch: AtomicU32::new(0),
            subscriptions: AtomicU8::new(Broadcast::NONE.bits()),
            closed: AtomicBool::new(false),
        });

        let rx = RxPort {
            shared: shared.clone(),
            parser: FrameParser::new(),
            epoch: 0,
        };
        let tx = TxPort {
            shared: shared.clone(),
            current: None,
            cursor: 0,
        };
        Ok((Linkbus { shared }, rx, tx))
    }
}

/// Main-loop handle to a link.
#[derive(Clone)]
pub struct Linkbus {
    pub(crate) shared: Arc<LinkShared>,
}

impl Linkbus {
    /// Create a new link builder.
    pub fn builder() -> LinkbusBuilder {
        LinkbusBuilder::new()
    }

    /// Create a link at `baud` with default settings.
    pub fn init(baud: u32) -> Result<(Linkbus, RxPort, TxPort)> {
        Self::builder().baud(baud).build()
    }

    #[inline]
    pub fn config(&self) -> &LinkConfig {
        &self.shared.config
    }

    #[inline]
    pub fn device(&self) -> DeviceId {
        self.shared.config.device
    }

    /// Turn the receiver off and drop any frame in progress.
    ///
    /// A frame in progress never holds a receive slot, so both slots stay
    /// available to complete messages while the receiver is off.
    pub fn disable(&self) {
        self.shared.rx_enabled.store(false, Ordering::Release);
        self.reset_rx();
    }

    /// Turn the receiver back on.
    pub fn enable(&self) {
        self.shared.rx_enabled.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_rx_enabled(&self) -> bool {
        self.shared.rx_enabled.load(Ordering::Acquire)
    }

    /// Make the receive port return to idle before its next byte.
    ///
    /// Messages already complete stay queued.
    pub fn reset_rx(&self) {
        self.shared.rx_epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Receive slot pool.
    #[inline]
    pub fn rx_pool(&self) -> &RxPool {
        &self.shared.rx
    }

    /// Transmit queue.
    #[inline]
    pub fn tx_queue(&self) -> &TxQueue {
        &self.shared.tx
    }

    /// Take the oldest complete message.
    #[inline]
    pub fn next_message(&self) -> Option<RxMessage<'_>> {
        self.shared.rx.next_message()
    }

    /// Number of complete messages waiting.
    #[inline]
    pub fn pending_messages(&self) -> usize {
        self.shared.rx.pending()
    }

    /// Check if the sink is sending a line.
    #[inline]
    pub fn tx_in_progress(&self) -> bool {
        self.shared.tx.in_progress()
    }

    /// Number of queued lines not yet handed to the sink.
    #[inline]
    pub fn pending_tx(&self) -> usize {
        self.shared.tx.pending()
    }

    /// Add broadcast subscriptions.
    pub fn subscribe(&self, channels: Broadcast) {
        self.shared
            .subscriptions
            .fetch_or(channels.bits(), Ordering::AcqRel);
    }

    /// Remove broadcast subscriptions.
    pub fn unsubscribe(&self, channels: Broadcast) {
        self.shared
            .subscriptions
            .fetch_and(!channels.bits(), Ordering::AcqRel);
    }

    #[inline]
    pub fn subscriptions(&self) -> Broadcast {
        Broadcast::from_bits(self.shared.subscriptions.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_subscribed(&self, channel: Broadcast) -> bool {
        self.subscriptions().contains(channel)
    }

    /// Stop accepting new lines. The transmit side finishes what is queued.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

/// Byte source side of a link.
pub struct RxPort {
    shared: Arc<LinkShared>,
    parser: FrameParser,
    epoch: u32,
}

impl RxPort {
    /// Feed one received byte.
    pub fn receive(&mut self, byte: u8) -> Feed {
        self.service();
        if !self.shared.rx_enabled.load(Ordering::Acquire) {
            return Feed::Disabled;
        }
        self.parser.push(&self.shared.rx, byte)
    }

    /// Apply a pending reset without feeding a byte.
    pub fn service(&mut self) {
        let epoch = self.shared.rx_epoch.load(Ordering::Acquire);
        if epoch != self.epoch {
            if self.parser.in_frame() {
                tracing::debug!("Receive reset, dropping frame in progress");
            }
            self.parser.reset();
            self.epoch = epoch;
        }
    }

    /// Parser state, with a requested reset already taken into account.
    pub fn state(&self) -> ParserState {
        if self.shared.rx_epoch.load(Ordering::Acquire) != self.epoch {
            ParserState::Idle
        } else {
            self.parser.state()
        }
    }
}

/// Byte sink side of a link.
pub struct TxPort {
    shared: Arc<LinkShared>,
    current: Option<SlotHandle>,
    cursor: usize,
}

impl TxPort {
    /// Next byte to put on the wire.
    ///
    /// Returns `None` when nothing may be sent right now: the queue is
    /// empty, the pacer is holding the next line, or the current line just
    /// ended. The slot of a finished line is released by that `None`.
    pub fn next_byte(&mut self) -> Option<u8> {
        let tx = &self.shared.tx;
        if self.current.is_none() {
            self.current = Some(tx.next_to_drain()?);
            self.cursor = 0;
        }

        let byte = self
            .current
            .as_ref()
            .and_then(|handle| tx.line(handle).as_bytes().get(self.cursor).copied());
        match byte {
            Some(byte) => {
                self.cursor += 1;
                Some(byte)
            }
            None => {
                self.end_tx();
                None
            }
        }
    }

    /// Finish the current line and release its slot.
    pub fn end_tx(&mut self) {
        if let Some(handle) = self.current.take() {
            if self.cursor < self.shared.tx.line(&handle).len() {
                tracing::debug!("Transmission ended early at byte {}", self.cursor);
            }
            self.shared.tx.release_drained(handle);
        }
        self.cursor = 0;
    }

    /// Check if a line is being sent.
    #[inline]
    pub fn in_progress(&self) -> bool {
        self.current.is_some()
    }

    /// Time until the pacer allows the next line.
    #[inline]
    pub fn pacing_delay(&self) -> Duration {
        self.shared.tx.pacer().remaining()
    }

    /// The link is closed and every queued line went out.
    pub fn is_finished(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
            && self.current.is_none()
            && self.shared.tx.pending() == 0
    }

    #[inline]
    pub(crate) fn poll_interval(&self) -> Duration {
        self.shared.config.tx_poll_interval
    }
}

impl Drop for TxPort {
    fn drop(&mut self) {
        self.end_tx();
    }
}
