use crate::prelude::*;
use crate::goodwe::command::{CommandCommon, ProtocolCommand};

use {
    async_trait::async_trait,
    std::io,
    std::net::{Ipv4Addr, SocketAddr},
    tokio::net::UdpSocket,
};

const MAX_DATAGRAM: usize = 4096;

pub const DEFAULT_PORT: u16 = 8899;
pub const BROADCAST_PORT: u16 = 48899;

/// A datagram association able to carry one exchange at a time.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, frame: &[u8]) -> io::Result<()>;

    async fn recv(&mut self) -> io::Result<Vec<u8>>;
}

// UdpTransport {{{
/// Connected UDP socket on an ephemeral local port.
pub struct UdpTransport {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpTransport {
    pub async fn connect(host: &str, port: u16) -> Result<Self, InverterError> {
        let operation = || format!("connect to {}:{}", host, port);

        let peer = tokio::net::lookup_host((host, port))
            .await
            .map_err(|source| InverterError::NoResponse {
                operation: operation(),
                source,
            })?
            .next()
            .ok_or_else(|| InverterError::NoResponse {
                operation: operation(),
                source: io::Error::new(io::ErrorKind::NotFound, "host did not resolve"),
            })?;

        let local: SocketAddr = if peer.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| InverterError::NoResponse {
                operation: operation(),
                source,
            })?;
        socket
            .connect(peer)
            .await
            .map_err(|source| InverterError::NoResponse {
                operation: operation(),
                source,
            })?;

        debug!("udp session {} -> {}", socket.local_addr().map(|a| a.to_string()).unwrap_or_default(), peer);

        Ok(Self { socket, peer })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        self.socket.send(frame).await.map(|_| ())
    }

    async fn recv(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let len = self.socket.recv(&mut buf).await?;
        buf.truncate(len);
        Ok(buf)
    }
} // }}}

// BroadcastTransport {{{
/// Unconnected broadcast-enabled socket sending every datagram to `target`.
/// Replies are accepted from any peer.
pub struct BroadcastTransport {
    socket: UdpSocket,
    target: SocketAddr,
}

impl BroadcastTransport {
    pub async fn bind(target: SocketAddr) -> Result<Self, InverterError> {
        let map_err = |source| InverterError::NoResponse {
            operation: format!("broadcast to {}", target),
            source,
        };

        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await.map_err(map_err)?;
        socket.set_broadcast(true).map_err(map_err)?;

        Ok(Self { socket, target })
    }
}

#[async_trait]
impl Transport for BroadcastTransport {
    async fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        self.socket.send_to(frame, self.target).await.map(|_| ())
    }

    async fn recv(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (len, from) = self.socket.recv_from(&mut buf).await?;
        debug!("broadcast reply from {}", from);
        buf.truncate(len);
        Ok(buf)
    }
} // }}}

/// Send `command` and wait for a response that passes its validator.
///
/// An invalid response triggers an immediate re-send. A silent timeout
/// re-sends after the full `timeout`. Either way at most `retries + 1`
/// requests go out. Socket errors end the exchange at once.
pub async fn exchange<T: Transport + ?Sized>(
    transport: &mut T,
    command: &ProtocolCommand,
    timeout: Duration,
    retries: u32,
) -> Result<Vec<u8>, InverterError> {
    let request = command.request();
    let mut attempt: u32 = 0;

    loop {
        debug!(
            "sent {} (attempt {}/{})",
            Utils::hex(request),
            attempt.saturating_add(1),
            retries.saturating_add(1)
        );
        transport
            .send(request)
            .await
            .map_err(|source| InverterError::NoResponse {
                operation: command.describe(),
                source,
            })?;

        match tokio::time::timeout(timeout, transport.recv()).await {
            Ok(Ok(response)) => {
                debug!("received {}", Utils::hex(&response));
                if command.is_valid(&response) {
                    return Ok(response);
                }
                warn!("invalid response {} to {}", Utils::hex(&response), command.describe());
            }
            Ok(Err(source)) => {
                return Err(InverterError::NoResponse {
                    operation: command.describe(),
                    source,
                });
            }
            Err(_) => {
                debug!("no response to {} within {:?}", command.describe(), timeout);
            }
        }

        if attempt >= retries {
            return Err(InverterError::MaxRetries {
                operation: command.describe(),
                attempts: attempt.saturating_add(1),
            });
        }
        attempt += 1;
    }
}
