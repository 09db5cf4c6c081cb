//! DMX512 channel frame

use core::fmt;

use crate::consts::{DMX_CHANNELS, DMX_FRAME_SIZE, DMX_NULL_START};

/// One DMX512 packet: start code followed by 512 channel slots.
///
/// Slot 0 always holds the null start code. Channels are addressed 1..=512,
/// matching the slot index on the wire.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DmxFrame {
    slots: [u8; DMX_FRAME_SIZE],
}

impl DmxFrame {
    /// Create a blacked out frame
    pub const fn new() -> Self {
        Self {
            slots: [DMX_NULL_START; DMX_FRAME_SIZE],
        }
    }

    /// Create a frame from channel values starting at channel 1.
    ///
    /// Values beyond channel 512 are ignored.
    pub fn from_channels(channels: &[u8]) -> Self {
        let mut frame = Self::new();
        let len = channels.len().min(DMX_CHANNELS);
        frame.slots[1..=len].copy_from_slice(&channels[..len]);
        frame
    }

    /// Raw bytes as they go out on the wire
    pub const fn as_bytes(&self) -> &[u8; DMX_FRAME_SIZE] {
        &self.slots
    }

    pub const fn start_code(&self) -> u8 {
        self.slots[0]
    }

    /// Channel values 1..=512
    pub fn channels(&self) -> &[u8] {
        &self.slots[1..]
    }

    /// Value of a single channel, `None` outside 1..=512
    pub fn channel(&self, channel: u16) -> Option<u8> {
        match usize::from(channel) {
            0 => None,
            index => self.slots.get(index).copied(),
        }
    }

    /// Copy `values` into the slots starting at `first_channel`.
    ///
    /// The range must already be validated to stay within 1..=512.
    pub(crate) fn write(&mut self, first_channel: usize, values: &[u8]) {
        self.slots[first_channel..first_channel + values.len()].copy_from_slice(values);
    }
}

impl Default for DmxFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DmxFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lit = self.channels().iter().filter(|value| **value != 0).count();
        f.debug_struct("DmxFrame")
            .field("start_code", &self.start_code())
            .field("non_zero_channels", &lit)
            .finish()
    }
}
