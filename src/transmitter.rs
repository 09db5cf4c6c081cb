//! DMX512 output.
//!
//! The transmitter owns the UART and runs one cycle per refresh period:
//! wait for the previous frame to drain, pick up pending writes from the
//! [`FrameStore`], generate break and mark-after-break with interrupts
//! disabled, then queue the 513 frame bytes.
//!
//! # Usage
//!
//! ```ignore
//! static STORE: FrameStore = FrameStore::new();
//!
//! #[embassy_executor::task]
//! async fn dmx_task(uart: EspDmxUart) -> ! {
//!     DmxTransmitter::new(uart, &STORE).run().await
//! }
//! ```

use embassy_time::{Duration, Timer, block_for, with_timeout};

use crate::frame::DmxFrame;
use crate::frame_store::FrameStore;

/// Hardware side of the DMX output.
///
/// The port is expected to be configured for
/// [`DMX_BAUD`](crate::consts::DMX_BAUD), 8 data bits, no parity and 2 stop
/// bits.
pub trait DmxUart {
    type Error: core::fmt::Debug;

    /// Wait until every byte queued by [`DmxUart::write`] has left the wire
    async fn wait_tx_done(&mut self) -> Result<(), Self::Error>;

    /// Invert the TX line. An inverted idle line is a break.
    ///
    /// Called with interrupts disabled; must not block.
    fn set_line_inverted(&mut self, inverted: bool) -> Result<(), Self::Error>;

    /// Queue bytes for transmission. May return before they are sent.
    async fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// Signal timing of the DMX output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmxTimings {
    /// Length of the break
    pub break_time: Duration,
    /// Mark between break and start code
    pub mark_after_break: Duration,
    /// Pause after a frame has been queued
    pub frame_interval: Duration,
    /// Bound on waiting for the previous frame to drain
    pub drain_timeout: Duration,
}

impl DmxTimings {
    /// Shortest break receivers must detect
    pub const MIN_BREAK: Duration = Duration::from_micros(92);
    /// Shortest legal mark-after-break
    pub const MIN_MARK_AFTER_BREAK: Duration = Duration::from_micros(12);
    /// Airtime of a full 513-slot frame at 250 kbaud with 11 bits per slot
    pub const MIN_FRAME_INTERVAL: Duration = Duration::from_micros(22_572);
    /// Many fixtures black out if they see no update for a second
    pub const MAX_FRAME_INTERVAL: Duration = Duration::from_secs(1);

    /// 184 µs break, 24 µs MAB, ~20 Hz refresh
    pub const DEFAULT: Self = Self {
        break_time: Duration::from_micros(184),
        mark_after_break: Duration::from_micros(24),
        frame_interval: Duration::from_millis(50),
        drain_timeout: Duration::from_millis(1000),
    };

    /// Check the timings against the DMX512 limits
    pub fn is_compliant(&self) -> bool {
        self.break_time >= Self::MIN_BREAK
            && self.mark_after_break >= Self::MIN_MARK_AFTER_BREAK
            && self.frame_interval >= Self::MIN_FRAME_INTERVAL
            && self.frame_interval <= Self::MAX_FRAME_INTERVAL
    }
}

impl Default for DmxTimings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Errors raised while putting a frame on the wire
#[derive(Debug, thiserror::Error)]
pub enum TransmitError<E> {
    #[error("line inversion failed: {0:?}")]
    Line(E),
    #[error("frame write failed: {0:?}")]
    Write(E),
}

/// What happened during one transmitter cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// The previous frame drained before the timeout
    pub drained: bool,
    /// Pending writes were swapped in
    pub swapped: bool,
    /// Break, MAB and frame bytes went out
    pub transmitted: bool,
}

/// Periodic DMX512 frame generator
pub struct DmxTransmitter<'a, U: DmxUart> {
    uart: U,
    store: &'a FrameStore,
    timings: DmxTimings,
    frame: DmxFrame,
}

impl<'a, U: DmxUart> DmxTransmitter<'a, U> {
    /// Create a transmitter with [`DmxTimings::DEFAULT`]
    pub fn new(uart: U, store: &'a FrameStore) -> Self {
        Self::with_timings(uart, store, DmxTimings::DEFAULT)
    }

    /// Create a transmitter with custom timings
    pub fn with_timings(uart: U, store: &'a FrameStore, timings: DmxTimings) -> Self {
        if !timings.is_compliant() {
            warn!("[dmx] timings outside DMX512 limits: {:?}", timings);
        }
        Self {
            uart,
            store,
            timings,
            frame: DmxFrame::new(),
        }
    }

    /// Transmit forever at the configured refresh interval
    pub async fn run(&mut self) -> ! {
        loop {
            self.tick().await;
            Timer::after(self.timings.frame_interval).await;
        }
    }

    /// Run a single cycle without the trailing pause.
    ///
    /// No failure is fatal: a busy UART skips the cycle, a contended store
    /// retransmits the last frame.
    pub async fn tick(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        match with_timeout(self.timings.drain_timeout, self.uart.wait_tx_done()).await {
            Ok(Ok(())) => report.drained = true,
            Ok(Err(err)) => {
                warn!("[dmx] waiting for tx failed, skipping frame: {:?}", err);
                return report;
            }
            Err(_) => {
                warn!(
                    "[dmx] uart busy for {} ms, skipping frame",
                    self.timings.drain_timeout.as_millis()
                );
                return report;
            }
        }

        report.swapped = self.store.maybe_swap().await.unwrap_or(false);
        if let Ok(frame) = self.store.read_active().await {
            self.frame = frame;
        }

        match self.transmit().await {
            Ok(()) => report.transmitted = true,
            Err(err) => error!("[dmx] {}", err),
        }
        report
    }

    async fn transmit(&mut self) -> Result<(), TransmitError<U::Error>> {
        self.send_break()?;
        self.uart
            .write(self.frame.as_bytes())
            .await
            .map_err(TransmitError::Write)
    }

    /// Break and mark-after-break, timed with interrupts disabled
    fn send_break(&mut self) -> Result<(), TransmitError<U::Error>> {
        let uart = &mut self.uart;
        let timings = self.timings;
        critical_section::with(|_| {
            let inverted = uart.set_line_inverted(true);
            if inverted.is_ok() {
                block_for(timings.break_time);
            }
            // The line must not be left in break, even if inverting failed
            let restored = uart
                .set_line_inverted(false)
                .or_else(|_| uart.set_line_inverted(false));
            inverted.and(restored).map_err(TransmitError::Line)?;
            block_for(timings.mark_after_break);
            Ok(())
        })
    }

    /// Frame sent by the most recent cycle
    pub const fn frame(&self) -> &DmxFrame {
        &self.frame
    }

    pub const fn timings(&self) -> &DmxTimings {
        &self.timings
    }

    pub const fn uart(&self) -> &U {
        &self.uart
    }

    pub fn uart_mut(&mut self) -> &mut U {
        &mut self.uart
    }
}
