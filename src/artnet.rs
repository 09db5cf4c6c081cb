//! Art-Net packet validation and channel extraction
//!
//! [`parse`] turns a datagram into a typed [`ArtPacket`] view without
//! copying. [`ArtNetHandler`] applies accepted ArtDmx packets to the
//! [`FrameStore`].

use crate::consts::{
    ARTDMX_HEADER_SIZE, ARTNET_MAGIC, DMX_CHANNELS, MIN_PACKET_SIZE, OP_DMX, OP_POLL,
    OP_POLL_REPLY, OP_SYNC, PROTOCOL_VERSION, SUPPORTED_UNIVERSE, UNIVERSE_MASK,
};
use crate::frame_store::{FrameStore, StoreError};

/// Art-Net operation codes the node knows by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Poll,
    PollReply,
    Dmx,
    Sync,
    Other(u16),
}

impl OpCode {
    pub const fn code(self) -> u16 {
        match self {
            Self::Poll => OP_POLL,
            Self::PollReply => OP_POLL_REPLY,
            Self::Dmx => OP_DMX,
            Self::Sync => OP_SYNC,
            Self::Other(code) => code,
        }
    }
}

impl From<u16> for OpCode {
    fn from(code: u16) -> Self {
        match code {
            OP_POLL => Self::Poll,
            OP_POLL_REPLY => Self::PollReply,
            OP_DMX => Self::Dmx,
            OP_SYNC => Self::Sync,
            other => Self::Other(other),
        }
    }
}

/// Channel data carried by an ArtDmx packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtDmx<'a> {
    /// Sequence number, 0 when the sender doesn't sequence
    pub sequence: u8,
    /// Physical input port of the sender
    pub physical: u8,
    /// 15-bit target universe
    pub universe: u16,
    /// Channel values starting at channel 1
    pub data: &'a [u8],
}

/// A validated Art-Net packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtPacket<'a> {
    Dmx(ArtDmx<'a>),
    /// Well-formed, but not something this node acts on
    Unsupported(OpCode),
}

/// Reasons a datagram is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    #[error("packet too short ({len} bytes)")]
    TooShort { len: usize },
    #[error("incorrect magic value")]
    BadMagic,
    #[error("protocol version {0} is not 14")]
    UnsupportedVersion(u16),
    #[error("payload length {declared} does not match {actual} received bytes")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("payload length {0} exceeds a DMX512 frame")]
    PayloadTooLong(usize),
}

/// Validate a datagram and return a view of its contents
pub fn parse(packet: &[u8]) -> Result<ArtPacket<'_>, PacketError> {
    if packet.len() < MIN_PACKET_SIZE {
        return Err(PacketError::TooShort { len: packet.len() });
    }
    if &packet[..ARTNET_MAGIC.len()] != ARTNET_MAGIC {
        return Err(PacketError::BadMagic);
    }

    let opcode = OpCode::from(u16::from_le_bytes([packet[8], packet[9]]));
    let version = u16::from_be_bytes([packet[10], packet[11]]);
    if version != PROTOCOL_VERSION {
        return Err(PacketError::UnsupportedVersion(version));
    }

    match opcode {
        OpCode::Dmx => parse_dmx(packet).map(ArtPacket::Dmx),
        other => Ok(ArtPacket::Unsupported(other)),
    }
}

fn parse_dmx(packet: &[u8]) -> Result<ArtDmx<'_>, PacketError> {
    if packet.len() < ARTDMX_HEADER_SIZE {
        return Err(PacketError::TooShort { len: packet.len() });
    }

    let universe = u16::from_le_bytes([packet[14], packet[15]]) & UNIVERSE_MASK;
    let declared = usize::from(u16::from_be_bytes([packet[16], packet[17]]));
    let data = &packet[ARTDMX_HEADER_SIZE..];

    if declared != data.len() {
        return Err(PacketError::LengthMismatch {
            declared,
            actual: data.len(),
        });
    }
    if declared > DMX_CHANNELS {
        return Err(PacketError::PayloadTooLong(declared));
    }

    Ok(ArtDmx {
        sequence: packet[12],
        physical: packet[13],
        universe,
        data,
    })
}

/// Applies inbound Art-Net packets to a [`FrameStore`]
#[derive(Clone, Copy)]
pub struct ArtNetHandler<'a> {
    store: &'a FrameStore,
}

impl<'a> ArtNetHandler<'a> {
    /// Bind the packet pipeline to a store
    pub const fn new(store: &'a FrameStore) -> Self {
        Self { store }
    }

    /// Handle one datagram.
    ///
    /// Returns `false` if the packet was rejected. Rejected packets never
    /// touch the store. Packets for other universes and other opcodes are
    /// accepted and ignored.
    pub async fn handle_inbound_packet(&self, packet: &[u8]) -> bool {
        match parse(packet) {
            Ok(ArtPacket::Dmx(dmx)) => {
                self.apply_dmx(&dmx).await;
                true
            }
            Ok(ArtPacket::Unsupported(opcode)) => {
                debug!(
                    "[artnet] ignoring opcode {:04x} ({:?})",
                    opcode.code(),
                    opcode
                );
                true
            }
            Err(err) => {
                warn!("[artnet] rejected packet: {}", err);
                false
            }
        }
    }

    async fn apply_dmx(&self, dmx: &ArtDmx<'_>) {
        if dmx.universe != SUPPORTED_UNIVERSE {
            debug!("[artnet] ignoring universe {}", dmx.universe);
            return;
        }
        // Failures are already logged by the store, the packet is dropped
        let _ = self.store.write(1, dmx.data).await;
    }

    /// Set a single channel (1..=512)
    pub async fn write_channel(&self, channel: u16, value: u8) -> Result<(), StoreError> {
        self.store.write_single(channel, value).await
    }

    /// Set consecutive channels starting at `first_channel`.
    ///
    /// `first_channel + values.len()` must not exceed 513.
    pub async fn write_channels(&self, first_channel: u16, values: &[u8]) -> Result<(), StoreError> {
        self.store.write(first_channel, values).await
    }

    pub const fn store(&self) -> &'a FrameStore {
        self.store
    }
}
