//! Art-Net to DMX512 bridge
//!
//! Receives ArtDmx packets over UDP and keeps retransmitting the latest
//! channel values as a DMX512 frame. The network side and the UART side run as
//! separate tasks and share a double-buffered [`FrameStore`].
#![no_std]
#![allow(async_fn_in_trait)]

#[macro_use]
mod log;

pub mod artnet;
pub mod consts;
pub mod frame;
pub mod frame_store;
pub mod link_state;
pub mod receiver;
pub mod transmitter;

pub use artnet::{ArtDmx, ArtNetHandler, ArtPacket, OpCode, PacketError, parse};
pub use frame::DmxFrame;
pub use frame_store::{FrameStore, StoreError};
pub use link_state::{LinkState, LinkStateCell, LinkStateReader, LinkStateWriter};
pub use receiver::{ArtNetReceiver, DatagramSocket, ReceiveError, ReceiverConfig};
pub use transmitter::{CycleReport, DmxTimings, DmxTransmitter, DmxUart, TransmitError};

pub use embassy_time::{Duration, Instant};
