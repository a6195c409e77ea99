use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use crate::error::{Result, TunerError};

/// UDP socket the RTP media arrives on.
///
/// Bound either to an ephemeral port (RTSP mode, the port is then
/// advertised in the SETUP `Transport` header) or to the exact address
/// and port of a bare `rtp://` feed. Every read is bounded by the
/// configured timeout so the delivery loop can poll for cancellation.
///
/// The socket is closed exactly once: by [`close`](Self::close) or, failing
/// that, on drop.
#[derive(Debug)]
pub struct DataSocket {
    socket: Option<UdpSocket>,
    local_addr: SocketAddr,
    read_timeout: Duration,
}

impl DataSocket {
    /// Bind to `address:port` (port 0 requests an ephemeral port) and
    /// apply the per-read timeout.
    pub fn bind(address: Ipv4Addr, port: u16, read_timeout: Duration) -> Result<Self> {
        let socket =
            UdpSocket::bind(SocketAddrV4::new(address, port)).map_err(TunerError::SocketCreation)?;
        socket
            .set_read_timeout(Some(read_timeout))
            .map_err(TunerError::SocketCreation)?;
        let local_addr = socket.local_addr().map_err(TunerError::SocketCreation)?;

        tracing::info!(%local_addr, ?read_timeout, "created UDP socket");

        Ok(Self {
            socket: Some(socket),
            local_addr,
            read_timeout,
        })
    }

    /// Join the multicast group the socket is bound to.
    ///
    /// Best effort: on hosts without a multicast route the join fails,
    /// which is logged and otherwise ignored.
    pub fn join_multicast(&self, group: Ipv4Addr, interface: Ipv4Addr) {
        let Some(socket) = &self.socket else {
            return;
        };
        match socket.join_multicast_v4(&group, &interface) {
            Ok(()) => tracing::info!(%group, %interface, "joined multicast group"),
            Err(e) => tracing::warn!(%group, %interface, error = %e, "multicast join failed"),
        }
    }

    /// Local address realized by the bind.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Read one datagram into `buf`.
    ///
    /// Returns the datagram length (0 for an empty datagram). An expired
    /// read deadline surfaces as [`TunerError::Timeout`].
    pub fn receive(&self, buf: &mut [u8]) -> Result<usize> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| TunerError::Io(std::io::ErrorKind::NotConnected.into()))?;
        socket
            .recv(buf)
            .map_err(|e| TunerError::from_io(e, self.read_timeout))
    }

    /// Close the socket. Returns `false` if it was already closed.
    pub fn close(&mut self) -> bool {
        match self.socket.take() {
            Some(socket) => {
                tracing::info!(local_addr = %self.local_addr, "closing UDP socket");
                drop(socket);
                true
            }
            None => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }
}

impl Drop for DataSocket {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_port_is_read_back() {
        let socket = DataSocket::bind(Ipv4Addr::LOCALHOST, 0, Duration::from_secs(5)).unwrap();
        assert_eq!(socket.local_addr().ip(), Ipv4Addr::LOCALHOST);
        assert_ne!(socket.local_addr().port(), 0);
    }

    #[test]
    fn receive_returns_datagram() {
        let socket = DataSocket::bind(Ipv4Addr::LOCALHOST, 0, Duration::from_secs(2)).unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(b"hello", socket.local_addr()).unwrap();

        let mut buf = [0u8; 64];
        let n = socket.receive(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
    }

    #[test]
    fn receive_times_out() {
        let socket =
            DataSocket::bind(Ipv4Addr::LOCALHOST, 0, Duration::from_millis(50)).unwrap();
        let mut buf = [0u8; 64];
        let err = socket.receive(&mut buf).unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err:?}");
    }

    #[test]
    fn close_is_idempotent() {
        let mut socket = DataSocket::bind(Ipv4Addr::LOCALHOST, 0, Duration::from_secs(5)).unwrap();
        let addr = socket.local_addr();
        assert!(socket.close());
        assert!(!socket.close());
        assert!(socket.is_closed());

        let mut buf = [0u8; 8];
        assert!(matches!(socket.receive(&mut buf), Err(TunerError::Io(_))));

        // The port is free again once closed.
        UdpSocket::bind(addr).unwrap();
    }

    #[test]
    fn bind_conflict_is_socket_creation_error() {
        let first = DataSocket::bind(Ipv4Addr::LOCALHOST, 0, Duration::from_secs(5)).unwrap();
        let port = first.local_addr().port();
        let err = DataSocket::bind(Ipv4Addr::LOCALHOST, port, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, TunerError::SocketCreation(_)));
    }
}
