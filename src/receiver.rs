//! Art-Net receive loop.
//!
//! Waits for the link to come up, binds the Art-Net port and feeds every
//! datagram to an [`ArtNetHandler`]. The receive call is the only place the
//! loop suspends while the link is ready.

use core::convert::Infallible;

use embassy_time::Duration;

use crate::artnet::ArtNetHandler;
use crate::consts::{ARTNET_PORT, RX_BUFFER_SIZE};
use crate::link_state::{GATE_POLL_INTERVAL, LinkState, LinkStateWriter};

/// Datagram transport the receive loop listens on
pub trait DatagramSocket {
    type Error: core::fmt::Debug;
    /// Sender address, only used for diagnostics
    type Endpoint: core::fmt::Debug;

    /// Bind to `port` on every local address
    fn bind(&mut self, port: u16) -> Result<(), Self::Error>;

    /// Wait for the next datagram and copy it into `buf`.
    ///
    /// Returns the datagram length and its sender.
    async fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, Self::Endpoint), Self::Error>;
}

/// Receive loop settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// UDP port to bind
    pub port: u16,
    /// Polling interval while waiting for the link
    pub gate_poll_interval: Duration,
}

impl ReceiverConfig {
    pub const DEFAULT: Self = Self {
        port: ARTNET_PORT,
        gate_poll_interval: GATE_POLL_INTERVAL,
    };
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Conditions that end the receive loop
#[derive(Debug, thiserror::Error)]
pub enum ReceiveError<E> {
    #[error("socket unable to bind port {port}: {error:?}")]
    Bind { port: u16, error: E },
    #[error("link state is faulted")]
    Faulted,
}

/// Listens for Art-Net datagrams and applies them to the frame store
pub struct ArtNetReceiver<'a, S: DatagramSocket> {
    socket: S,
    handler: ArtNetHandler<'a>,
    link: LinkStateWriter<'a>,
    config: ReceiverConfig,
    buffer: [u8; RX_BUFFER_SIZE],
}

impl<'a, S: DatagramSocket> ArtNetReceiver<'a, S> {
    pub fn new(socket: S, handler: ArtNetHandler<'a>, link: LinkStateWriter<'a>) -> Self {
        Self::with_config(socket, handler, link, ReceiverConfig::DEFAULT)
    }

    pub fn with_config(
        socket: S,
        handler: ArtNetHandler<'a>,
        link: LinkStateWriter<'a>,
        config: ReceiverConfig,
    ) -> Self {
        Self {
            socket,
            handler,
            link,
            config,
            buffer: [0; RX_BUFFER_SIZE],
        }
    }

    /// Run until the loop becomes inoperative.
    ///
    /// Only returns if binding fails, which moves the link to
    /// [`LinkState::Faulted`], or if the link is found faulted.
    pub async fn run(&mut self) -> Result<Infallible, ReceiveError<S::Error>> {
        self.wait_until_ready().await?;
        self.bind()?;

        loop {
            if !self.link.reader().is_ready() {
                warn!("[artnet] link not ready, pausing receive");
                self.wait_until_ready().await?;
            }
            self.receive_one().await;
        }
    }

    /// Poll the link state until it is ready. Fails if the link faults.
    pub async fn wait_until_ready(&self) -> Result<(), ReceiveError<S::Error>> {
        let reader = self.link.reader();
        match reader
            .wait_for(LinkState::Ready, self.config.gate_poll_interval)
            .await
        {
            LinkState::Ready => Ok(()),
            _ => Err(ReceiveError::Faulted),
        }
    }

    /// Bind the socket, faulting the link on failure
    pub fn bind(&mut self) -> Result<(), ReceiveError<S::Error>> {
        let port = self.config.port;
        if let Err(err) = self.socket.bind(port) {
            error!("[artnet] socket unable to bind port {}: {:?}", port, err);
            self.link.set(LinkState::Faulted);
            return Err(ReceiveError::Bind { port, error: err });
        }
        info!("[artnet] socket bound, port {}", port);
        Ok(())
    }

    /// Receive and handle a single datagram.
    ///
    /// Returns whether the packet was accepted. Receive errors are logged and
    /// count as rejected packets.
    pub async fn receive_one(&mut self) -> bool {
        match self.socket.recv_from(&mut self.buffer).await {
            Ok((len, from)) => {
                debug!("[artnet] {} bytes from {:?}", len, from);
                let len = len.min(self.buffer.len());
                self.handler.handle_inbound_packet(&self.buffer[..len]).await
            }
            Err(err) => {
                error!("[artnet] recvfrom failed: {:?}", err);
                false
            }
        }
    }

    pub const fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    pub const fn socket(&self) -> &S {
        &self.socket
    }

    pub fn socket_mut(&mut self) -> &mut S {
        &mut self.socket
    }
}
