//! Wire and bus constants shared by the bridge components.

/// UDP port Art-Net nodes listen on
pub const ARTNET_PORT: u16 = 6454;

/// Identifier every Art-Net packet starts with
pub const ARTNET_MAGIC: &[u8; 8] = b"Art-Net\0";

/// Art-Net protocol revision this node speaks
pub const PROTOCOL_VERSION: u16 = 14;

/// Shortest packet worth looking at (ArtPoll is the smallest message)
pub const MIN_PACKET_SIZE: usize = 13;

/// Size of the ArtDmx header preceding the channel payload
pub const ARTDMX_HEADER_SIZE: usize = 18;

pub const OP_POLL: u16 = 0x2000;
pub const OP_POLL_REPLY: u16 = 0x2100;
pub const OP_DMX: u16 = 0x5000;
pub const OP_SYNC: u16 = 0x5200;

/// The only universe this node outputs
pub const SUPPORTED_UNIVERSE: u16 = 0;

/// Universe numbers are 15 bit, the top bit is reserved
pub const UNIVERSE_MASK: u16 = 0x7fff;

/// DMX512 bit rate (8 data bits, no parity, 2 stop bits)
pub const DMX_BAUD: u32 = 250_000;

/// Number of channels in a DMX512 universe
pub const DMX_CHANNELS: usize = 512;

/// Start code + 512 channels
pub const DMX_FRAME_SIZE: usize = DMX_CHANNELS + 1;

/// Null start code, marks standard dimmer data
pub const DMX_NULL_START: u8 = 0x00;

/// Receive buffer for a single datagram
pub const RX_BUFFER_SIZE: usize = 2048;
