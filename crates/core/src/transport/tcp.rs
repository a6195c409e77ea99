use std::io::Write;
use std::net::{Ipv4Addr, Shutdown, SocketAddr, SocketAddrV4, TcpStream};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

use crate::error::{Result, TunerError};
use crate::protocol::handshake::ControlChannel;
use crate::protocol::{RtspRequest, RtspResponse};

/// TCP connection carrying the RTSP control exchange.
///
/// The socket is bound to the tuner's local address on an ephemeral port
/// before connecting, so signaling leaves from the same interface the
/// media is expected on. Connect, reads and writes are all bounded by
/// the handshake timeout.
///
/// Like [`DataSocket`](super::DataSocket), it is closed exactly once.
#[derive(Debug)]
pub struct ControlSocket {
    stream: Option<TcpStream>,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
    timeout: Duration,
}

impl ControlSocket {
    /// Bind to `local:0`, then connect to `remote`.
    ///
    /// If the connect fails, the bound socket is closed before the error
    /// is returned.
    pub fn connect(local: Ipv4Addr, remote: SocketAddrV4, timeout: Duration) -> Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
            .map_err(TunerError::SocketCreation)?;
        socket
            .bind(&SocketAddrV4::new(local, 0).into())
            .map_err(TunerError::SocketCreation)?;
        let bound = socket
            .local_addr()
            .map_err(TunerError::SocketCreation)?
            .as_socket()
            .unwrap_or(SocketAddr::V4(SocketAddrV4::new(local, 0)));

        tracing::info!(local_addr = %bound, "created TCP socket");
        tracing::debug!(local_addr = %bound, peer = %remote, "connecting control socket");

        if let Err(e) = socket.connect_timeout(&remote.into(), timeout) {
            tracing::warn!(local_addr = %bound, peer = %remote, error = %e, "connect failed, closing TCP socket");
            return Err(TunerError::SocketCreation(e));
        }

        let stream: TcpStream = socket.into();
        stream
            .set_read_timeout(Some(timeout))
            .map_err(TunerError::SocketCreation)?;
        stream
            .set_write_timeout(Some(timeout))
            .map_err(TunerError::SocketCreation)?;
        let local_addr = stream.local_addr().map_err(TunerError::SocketCreation)?;

        Ok(Self {
            stream: Some(stream),
            local_addr,
            peer_addr: SocketAddr::V4(remote),
            timeout,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Shut down and close the connection. Returns `false` if it was
    /// already closed. Shutdown errors are logged, never returned.
    pub fn close(&mut self) -> bool {
        match self.stream.take() {
            Some(stream) => {
                tracing::info!(local_addr = %self.local_addr, peer = %self.peer_addr, "closing TCP socket");
                if let Err(e) = stream.shutdown(Shutdown::Both) {
                    tracing::debug!(local_addr = %self.local_addr, error = %e, "TCP shutdown error");
                }
                true
            }
            None => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    fn stream(&mut self) -> Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| TunerError::Io(std::io::ErrorKind::NotConnected.into()))
    }

    fn with_deadline(&self, err: TunerError) -> TunerError {
        match err {
            TunerError::Io(e) => TunerError::from_io(e, self.timeout),
            other => other,
        }
    }
}

impl ControlChannel for ControlSocket {
    fn send(&mut self, request: &RtspRequest) -> Result<()> {
        let wire = request.serialize();
        tracing::debug!(
            peer = %self.peer_addr,
            method = %request.method,
            uri = %request.uri,
            cseq = request.cseq,
            "sending RTSP request"
        );
        let result = self
            .stream()
            .and_then(|s| s.write_all(wire.as_bytes()).map_err(TunerError::from));
        result.map_err(|e| self.with_deadline(e))
    }

    fn read_response(&mut self) -> Result<RtspResponse> {
        let result = self.stream().and_then(RtspResponse::read_from);
        let response = result.map_err(|e| self.with_deadline(e))?;
        tracing::debug!(peer = %self.peer_addr, status = response.status_code, "RTSP response");
        Ok(response)
    }
}

impl Drop for ControlSocket {
    fn drop(&mut self) {
        self.close();
    }
}
