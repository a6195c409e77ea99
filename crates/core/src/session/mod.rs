//! Stream sessions: one per playback request.
//!
//! A session owns every socket opened for its request and is the only
//! place they are closed. Its lifecycle:
//!
//! ```text
//! open     -> sockets bound (+ control connected, DESCRIBE/SETUP done for rtsp://)
//! deliver  -> PLAY sent (rtsp:// only), Delivery handed to the consumer
//! Delivery -> payload chunks until release, empty read, timeout or error
//! finish   -> data socket then control socket closed, exactly once
//! ```
//!
//! A failure anywhere in `open` or `deliver` closes whatever was already
//! opened before the error is returned, so a caller gets either a usable
//! session or an error, never a half-initialized session.

pub mod request;

use std::iter::FusedIterator;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::cancel::HoldSignal;
use crate::config::TunerConfig;
use crate::error::{Result, TunerError};
use crate::media::rtp::{FIXED_HEADER_LEN, RtpPacket};
use crate::protocol::{HandshakeClient, HandshakeState, SessionId};
use crate::transport::address::{parse_rtp_url, resolve_local_bind_address};
use crate::transport::{ControlSocket, DataSocket};

pub use request::{StreamMode, StreamRequest};

/// Sockets owned by a session. Closing is idempotent; the data socket is
/// always closed first.
#[derive(Debug, Default)]
struct SocketPair {
    data: Option<DataSocket>,
    control: Option<ControlSocket>,
}

impl SocketPair {
    fn close(&mut self) {
        if let Some(data) = self.data.as_mut() {
            data.close();
        }
        if let Some(control) = self.control.as_mut() {
            control.close();
        }
    }

    fn is_closed(&self) -> bool {
        self.data.as_ref().is_none_or(DataSocket::is_closed)
            && self.control.as_ref().is_none_or(ControlSocket::is_closed)
    }
}

/// A negotiated stream, ready to deliver.
pub struct StreamSession {
    request: StreamRequest,
    mode: StreamMode,
    hold: Arc<dyn HoldSignal>,
    sockets: SocketPair,
    handshake: Option<HandshakeClient>,
}

impl StreamSession {
    /// Open a session with the default [`TunerConfig`].
    pub fn open(request: StreamRequest, hold: Arc<dyn HoldSignal>) -> Result<Self> {
        Self::open_with_config(request, hold, &TunerConfig::default())
    }

    /// Bind the sockets the URL scheme calls for and, for `rtsp://`,
    /// connect the control socket and run the handshake to `Ready`.
    ///
    /// `hold` is only observed, never changed: delivery stops once it
    /// reports the tune released.
    pub fn open_with_config(
        request: StreamRequest,
        hold: Arc<dyn HoldSignal>,
        config: &TunerConfig,
    ) -> Result<Self> {
        let mode = request.mode()?;
        tracing::info!(url = %request.url, ?mode, content_type = %request.content_type, "opening stream session");

        let mut sockets = SocketPair::default();
        let result = match mode {
            StreamMode::Rtsp => Self::open_rtsp(&request, config, &mut sockets).map(Some),
            StreamMode::Rtp => Self::open_rtp(&request, config, &mut sockets).map(|()| None),
        };

        match result {
            Ok(handshake) => Ok(Self {
                request,
                mode,
                hold,
                sockets,
                handshake,
            }),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "tune failed, closing sockets");
                sockets.close();
                Err(e)
            }
        }
    }

    fn open_rtsp(
        request: &StreamRequest,
        config: &TunerConfig,
        sockets: &mut SocketPair,
    ) -> Result<HandshakeClient> {
        let local = resolve_local_bind_address(config.discovery_address, &request.advertised_base_url)
            .ok_or(TunerError::NoBindAddress)?;

        let data = sockets
            .data
            .insert(DataSocket::bind(local, 0, config.read_timeout)?);
        let client_port = data.local_addr().port();

        let remote = request.control_endpoint()?;
        let control = sockets
            .control
            .insert(ControlSocket::connect(local, remote, config.handshake_timeout)?);

        let mut client = HandshakeClient::new(&request.url, request.credentials(), &config.user_agent);
        client.handshake(control, client_port)?;
        Ok(client)
    }

    fn open_rtp(request: &StreamRequest, config: &TunerConfig, sockets: &mut SocketPair) -> Result<()> {
        let addr = parse_rtp_url(&request.url)?;
        let data = sockets
            .data
            .insert(DataSocket::bind(*addr.ip(), addr.port(), config.read_timeout)?);
        if addr.ip().is_multicast() {
            data.join_multicast(*addr.ip(), config.multicast_interface);
        }
        Ok(())
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    pub fn request(&self) -> &StreamRequest {
        &self.request
    }

    /// Local address of the data socket.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.sockets.data.as_ref().map(DataSocket::local_addr)
    }

    /// Local address of the control socket (`rtsp://` only).
    pub fn control_addr(&self) -> Option<SocketAddr> {
        self.sockets.control.as_ref().map(ControlSocket::local_addr)
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.handshake.as_ref().and_then(HandshakeClient::session_id)
    }

    pub fn handshake_state(&self) -> Option<HandshakeState> {
        self.handshake.as_ref().map(HandshakeClient::state)
    }

    pub fn is_closed(&self) -> bool {
        self.sockets.is_closed()
    }

    /// Start delivery.
    ///
    /// For `rtsp://` sessions PLAY is sent here, once, so nothing is
    /// requested before the consumer is ready to read. The returned
    /// [`Delivery`] is single-pass; open a new session to retry.
    pub fn deliver(self) -> Result<Delivery> {
        let StreamSession {
            request,
            hold,
            mut sockets,
            handshake,
            ..
        } = self;

        tracing::info!(url = %request.url, content_type = %request.content_type, "starting delivery");

        if let Some(mut client) = handshake {
            tracing::info!(session_id = ?client.session_id(), "sending PLAY");
            let played = match sockets.control.as_mut() {
                Some(control) => client.play(control),
                None => Err(TunerError::Io(std::io::ErrorKind::NotConnected.into())),
            };
            if let Err(e) = played {
                tracing::warn!(url = %request.url, error = %e, "PLAY failed, closing sockets");
                sockets.close();
                return Err(e);
            }
        }

        let chunk_size = request.read_chunk_size.max(FIXED_HEADER_LEN);
        Ok(Delivery {
            sockets,
            hold,
            buf: vec![0; chunk_size],
            finished: false,
            chunks: 0,
            bytes: 0,
        })
    }
}

/// Lazy, single-pass sequence of media payload chunks.
///
/// Each call to `next` first polls the hold signal, then performs one
/// bounded read. The sequence ends (and every socket is closed) when:
///
/// - the hold signal reports the tune released (`None`),
/// - an empty datagram is read (`None`),
/// - the read times out or fails, or a datagram fails to decode
///   (one `Some(Err(_))`, then `None`),
/// - the `Delivery` is dropped mid-iteration.
pub struct Delivery {
    sockets: SocketPair,
    hold: Arc<dyn HoldSignal>,
    buf: Vec<u8>,
    finished: bool,
    chunks: u64,
    bytes: u64,
}

impl Delivery {
    /// Whether every socket of the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.sockets.is_closed()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.sockets.data.as_ref().map(DataSocket::local_addr)
    }

    /// Payload chunks and bytes yielded so far.
    pub fn stats(&self) -> (u64, u64) {
        (self.chunks, self.bytes)
    }

    fn finish(&mut self, reason: &'static str) {
        if self.finished {
            return;
        }
        self.finished = true;
        tracing::info!(reason, chunks = self.chunks, bytes = self.bytes, "delivery finished");
        self.sockets.close();
    }

    fn fail(&mut self, error: TunerError) -> Option<Result<Vec<u8>>> {
        tracing::warn!(error = %error, "delivery failed");
        self.finish("error");
        Some(Err(error))
    }
}

impl Iterator for Delivery {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if !self.hold.is_held() {
            self.finish("tuner released");
            return None;
        }

        let received = match self.sockets.data.as_ref() {
            Some(data) => data.receive(&mut self.buf),
            None => Err(TunerError::Io(std::io::ErrorKind::NotConnected.into())),
        };
        let len = match received {
            Ok(0) => {
                self.finish("end of stream");
                return None;
            }
            Ok(len) => len,
            Err(e) => return self.fail(e),
        };

        let decoded = RtpPacket::decode(&self.buf[..len]).map(|packet| {
            tracing::trace!(
                sequence = packet.sequence,
                timestamp = packet.timestamp,
                payload_len = packet.payload.len(),
                "RTP packet"
            );
            packet.payload.to_vec()
        });
        match decoded {
            Ok(chunk) => {
                self.chunks += 1;
                self.bytes += chunk.len() as u64;
                Some(Ok(chunk))
            }
            Err(e) => self.fail(e),
        }
    }
}

impl FusedIterator for Delivery {}

impl Drop for Delivery {
    fn drop(&mut self) {
        self.finish("dropped by consumer");
    }
}
