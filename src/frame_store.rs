//! Double-buffered channel store shared by the network and the DMX output.
//!
//! Writers always land in the inactive frame and raise a swap request. The
//! transmitter flips the buffers between two transmissions, so the frame on
//! the wire is never mutated while it is being sent.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_time::{Duration, with_timeout};

use crate::consts::DMX_FRAME_SIZE;
use crate::frame::DmxFrame;

/// Default bound on waiting for the store lock
pub const LOCK_TIMEOUT: Duration = Duration::from_millis(10);

/// Errors returned by [`FrameStore`] operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The write would touch slot 0 or run past channel 512
    #[error("write of {len} values at channel {first_channel} is outside 1..=512")]
    ChannelOutOfRange { first_channel: u16, len: usize },
    /// The lock was held by a peer for longer than the configured bound
    #[error("frame store lock not acquired in time")]
    LockTimeout,
}

#[derive(Debug)]
pub(crate) struct Buffers {
    frames: [DmxFrame; 2],
    active: usize,
    swap_pending: bool,
}

impl Buffers {
    const fn inactive(&self) -> usize {
        1 - self.active
    }
}

/// Two channel frames, the active index and the swap request behind one lock
pub struct FrameStore {
    inner: Mutex<CriticalSectionRawMutex, Buffers>,
    lock_timeout: Duration,
}

impl FrameStore {
    /// Create a store with both frames blacked out
    pub const fn new() -> Self {
        Self::with_lock_timeout(LOCK_TIMEOUT)
    }

    /// Create a store with a custom bound on lock acquisition
    pub const fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(Buffers {
                frames: [DmxFrame::new(); 2],
                active: 0,
                swap_pending: false,
            }),
            lock_timeout,
        }
    }

    /// Copy `values` into the inactive frame starting at `first_channel`.
    ///
    /// The write becomes visible after the transmitter's next swap. Nothing is
    /// written if the range leaves 1..=512 or the lock can't be taken in time.
    pub async fn write(&self, first_channel: u16, values: &[u8]) -> Result<(), StoreError> {
        let first = check_range(first_channel, values.len())?;

        let mut buffers = self.lock().await?;
        let inactive = buffers.inactive();
        buffers.frames[inactive].write(first, values);
        buffers.swap_pending = true;
        Ok(())
    }

    /// Set a single channel in the inactive frame
    pub async fn write_single(&self, channel: u16, value: u8) -> Result<(), StoreError> {
        self.write(channel, &[value]).await
    }

    /// Flip the buffers if a write is pending.
    ///
    /// Must only be called by the transmitter between two transmissions.
    /// Returns whether a swap happened. The new inactive frame is seeded with
    /// the new active one, so partial writes keep building on the latest state.
    pub async fn maybe_swap(&self) -> Result<bool, StoreError> {
        let mut buffers = self.lock().await?;
        if !buffers.swap_pending {
            return Ok(false);
        }

        buffers.active = buffers.inactive();
        let active = buffers.frames[buffers.active];
        let inactive = buffers.inactive();
        buffers.frames[inactive] = active;
        buffers.swap_pending = false;
        Ok(true)
    }

    /// Copy of the frame at the active index
    pub async fn read_active(&self) -> Result<DmxFrame, StoreError> {
        let buffers = self.lock().await?;
        Ok(buffers.frames[buffers.active])
    }

    /// Whether a write is waiting for the next swap
    pub async fn is_swap_pending(&self) -> Result<bool, StoreError> {
        Ok(self.lock().await?.swap_pending)
    }

    /// Take the lock outright, as a contending peer would
    #[cfg(test)]
    pub(crate) fn hold_lock(&self) -> MutexGuard<'_, CriticalSectionRawMutex, Buffers> {
        self.inner.try_lock().unwrap()
    }

    async fn lock(&self) -> Result<MutexGuard<'_, CriticalSectionRawMutex, Buffers>, StoreError> {
        with_timeout(self.lock_timeout, self.inner.lock())
            .await
            .map_err(|_| {
                warn!(
                    "[frame_store] lock not acquired within {} ms",
                    self.lock_timeout.as_millis()
                );
                StoreError::LockTimeout
            })
    }
}

impl Default for FrameStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate that `len` values starting at `first_channel` fit channels 1..=512
fn check_range(first_channel: u16, len: usize) -> Result<usize, StoreError> {
    let first = usize::from(first_channel);
    if first == 0 || first >= DMX_FRAME_SIZE || first + len > DMX_FRAME_SIZE {
        warn!(
            "[frame_store] rejected write of {} values to channel {}",
            len, first_channel
        );
        return Err(StoreError::ChannelOutOfRange { first_channel, len });
    }
    Ok(first)
}
