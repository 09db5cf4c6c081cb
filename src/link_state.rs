//! Shared link/device state gating the receive loop.
//!
//! The connectivity task owns the state and moves it through its lifecycle.
//! Everyone else gets a [`LinkStateReader`]. Only holders of a
//! [`LinkStateWriter`] may change it. The cell is guarded by a critical
//! section, so it can be shared between tasks and interrupt handlers.

use core::cell::Cell;

use critical_section::Mutex;
use embassy_time::{Duration, Timer};

/// Default polling interval while waiting for a state
pub const GATE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Connectivity state of the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// Power-on, nothing configured yet
    #[default]
    Initializing,
    /// Network link is being established
    Connecting,
    /// Link is up, packets may be received
    Ready,
    /// Link was lost and retries are exhausted
    Disconnected,
    /// Unrecoverable failure, the receive loop is gone
    Faulted,
}

impl LinkState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Disconnected => "disconnected",
            Self::Faulted => "faulted",
        }
    }
}

/// A state cell shared between the connectivity task and the bridge
pub struct LinkStateCell {
    inner: Mutex<Cell<LinkState>>,
}

impl LinkStateCell {
    /// Create a cell in [`LinkState::Initializing`]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(LinkState::Initializing)),
        }
    }

    /// Get a read-only handle
    pub const fn reader(&self) -> LinkStateReader<'_> {
        LinkStateReader { cell: self }
    }

    /// Get a read-write handle
    pub const fn writer(&self) -> LinkStateWriter<'_> {
        LinkStateWriter { cell: self }
    }

    /// Current state
    pub fn get(&self) -> LinkState {
        critical_section::with(|cs| self.inner.borrow(cs).get())
    }

    /// Replace the state, returning the previous one
    pub(crate) fn set(&self, state: LinkState) -> LinkState {
        let previous = critical_section::with(|cs| self.inner.borrow(cs).replace(state));
        if previous != state {
            info!(
                "[link] state {} -> {}",
                previous.as_str(),
                state.as_str()
            );
        }
        previous
    }

    /// Poll every `interval` until the state equals `state` or the link
    /// faults. Returns the state that ended the wait.
    pub async fn wait_for(&self, state: LinkState, interval: Duration) -> LinkState {
        loop {
            let current = self.get();
            if current == state || current == LinkState::Faulted {
                return current;
            }
            Timer::after(interval).await;
        }
    }
}

impl Default for LinkStateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only handle to a [`LinkStateCell`]
#[derive(Clone, Copy)]
pub struct LinkStateReader<'a> {
    cell: &'a LinkStateCell,
}

impl LinkStateReader<'_> {
    pub fn get(&self) -> LinkState {
        self.cell.get()
    }

    pub fn is_ready(&self) -> bool {
        self.get() == LinkState::Ready
    }

    /// See [`LinkStateCell::wait_for`]
    pub async fn wait_for(&self, state: LinkState, interval: Duration) -> LinkState {
        self.cell.wait_for(state, interval).await
    }
}

/// Read-write handle to a [`LinkStateCell`]
#[derive(Clone, Copy)]
pub struct LinkStateWriter<'a> {
    cell: &'a LinkStateCell,
}

impl<'a> LinkStateWriter<'a> {
    /// Replace the state, returning the previous one
    pub fn set(&self, state: LinkState) -> LinkState {
        self.cell.set(state)
    }

    /// Downgrade to a read-only handle
    pub const fn reader(&self) -> LinkStateReader<'a> {
        self.cell.reader()
    }
}
