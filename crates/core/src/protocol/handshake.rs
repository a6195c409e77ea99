use base64::prelude::{BASE64_STANDARD, Engine as _};

use crate::error::{HandshakeErrorKind, Result, TunerError};
use crate::protocol::request::RtspRequest;
use crate::protocol::response::{RtspResponse, SessionId};

/// Track requested in SETUP. The DESCRIBE body is never inspected; the
/// first track is selected by convention.
pub const SETUP_TRACK: &str = "trackID=1";

/// CSeq of the first request on a control connection.
pub const FIRST_CSEQ: u32 = 2;

/// Request/response exchange over an RTSP control connection.
///
/// Implemented by [`ControlSocket`](crate::transport::ControlSocket);
/// the handshake only needs to send a request and read one response.
pub trait ControlChannel {
    fn send(&mut self, request: &RtspRequest) -> Result<()>;

    fn read_response(&mut self) -> Result<RtspResponse>;
}

/// Client-side handshake progress.
///
/// ```text
/// NotStarted -> Describing -> SettingUp -> AwaitingSession -> Ready
/// ```
///
/// Any failure before `Ready` ends in `Failed`. No step is ever skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    NotStarted,
    /// DESCRIBE sent, waiting for its response.
    Describing,
    /// SETUP sent, waiting for its response.
    SettingUp,
    /// SETUP answered, session identifier not yet parsed.
    AwaitingSession,
    /// Session identifier known; PLAY may be sent.
    Ready,
    Failed,
}

impl HandshakeState {
    /// The only state reachable on success.
    fn successor(self) -> Self {
        match self {
            Self::NotStarted => Self::Describing,
            Self::Describing => Self::SettingUp,
            Self::SettingUp => Self::AwaitingSession,
            Self::AwaitingSession => Self::Ready,
            Self::Ready | Self::Failed => self,
        }
    }
}

/// Drives DESCRIBE and SETUP over a control connection and builds the
/// PLAY request that starts delivery.
///
/// Owns no socket: the session that created the control connection stays
/// responsible for closing it, whatever the handshake outcome.
#[derive(Debug)]
pub struct HandshakeClient {
    url: String,
    user_agent: String,
    /// Pre-encoded `Basic` credentials.
    authorization: Option<String>,
    next_cseq: u32,
    state: HandshakeState,
    session_id: Option<SessionId>,
}

impl HandshakeClient {
    /// `credentials` are sent as HTTP Basic authorization on every request.
    pub fn new(url: &str, credentials: Option<(&str, &str)>, user_agent: &str) -> Self {
        let authorization = credentials.map(|(user, pass)| {
            format!("Basic {}", BASE64_STANDARD.encode(format!("{user}:{pass}")))
        });
        Self {
            url: url.trim().to_string(),
            user_agent: user_agent.to_string(),
            authorization,
            next_cseq: FIRST_CSEQ,
            state: HandshakeState::NotStarted,
            session_id: None,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    /// Run DESCRIBE then SETUP, advertising `client_port` as the RTP port.
    ///
    /// Ends in [`HandshakeState::Ready`] with the parsed session identifier,
    /// or in [`HandshakeState::Failed`].
    pub fn handshake<C: ControlChannel + ?Sized>(
        &mut self,
        channel: &mut C,
        client_port: u16,
    ) -> Result<SessionId> {
        if self.state != HandshakeState::NotStarted {
            tracing::warn!(state = ?self.state, "handshake already attempted");
            return self
                .session_id
                .ok_or_else(|| handshake_error(HandshakeErrorKind::MissingSession));
        }

        match self.negotiate(channel, client_port) {
            Ok(id) => Ok(id),
            Err(e) => {
                tracing::warn!(url = %self.url, state = ?self.state, error = %e, "RTSP handshake failed");
                self.state = HandshakeState::Failed;
                Err(e)
            }
        }
    }

    fn negotiate<C: ControlChannel + ?Sized>(
        &mut self,
        channel: &mut C,
        client_port: u16,
    ) -> Result<SessionId> {
        self.advance();
        let url = self.url.clone();
        let describe = self.request("DESCRIBE", &url).add_header("Accept", "application/sdp");
        let describe = self.authorize(describe);
        channel.send(&describe)?;
        let response = channel.read_response()?;
        tracing::info!(status = response.status_code, "DESCRIBE answered");

        self.advance();
        let track = format!("{}/{}", url.trim_end_matches('/'), SETUP_TRACK);
        let setup = self
            .request("SETUP", &track)
            .add_header("Transport", &format!("RTP/AVP;unicast;client_port={client_port}"));
        let setup = self.authorize(setup);
        channel.send(&setup)?;
        let response = channel.read_response()?;
        if !response.is_success() {
            return Err(handshake_error(HandshakeErrorKind::Status(
                response.status_code,
            )));
        }

        self.advance();
        let id = response.session_id()?;
        self.session_id = Some(id);

        self.advance();
        tracing::info!(session_id = %id, "RTSP session established");
        Ok(id)
    }

    /// Send PLAY for the negotiated session and wait for its answer.
    ///
    /// Only valid once the handshake is [`Ready`](HandshakeState::Ready).
    pub fn play<C: ControlChannel + ?Sized>(&mut self, channel: &mut C) -> Result<()> {
        let id = match (self.state, self.session_id) {
            (HandshakeState::Ready, Some(id)) => id,
            _ => return Err(handshake_error(HandshakeErrorKind::MissingSession)),
        };

        let url = self.url.clone();
        let play = self.request("PLAY", &url);
        let play = self
            .authorize(play)
            .add_header("Session", &id.to_string())
            .add_header("Range", "npt=0.000-");
        channel.send(&play)?;
        let response = channel.read_response()?;
        if !response.is_success() {
            return Err(handshake_error(HandshakeErrorKind::Status(
                response.status_code,
            )));
        }
        tracing::info!(session_id = %id, "PLAY accepted");
        Ok(())
    }

    fn advance(&mut self) {
        let next = self.state.successor();
        tracing::debug!(old_state = ?self.state, new_state = ?next, "handshake state transition");
        self.state = next;
    }

    /// Start a request with the next CSeq and the `User-Agent` header.
    fn request(&mut self, method: &str, uri: &str) -> RtspRequest {
        let cseq = self.next_cseq;
        self.next_cseq += 1;
        RtspRequest::new(method, uri, cseq).add_header("User-Agent", &self.user_agent)
    }

    fn authorize(&self, request: RtspRequest) -> RtspRequest {
        match &self.authorization {
            Some(value) => request.add_header("Authorization", value),
            None => request,
        }
    }
}

fn handshake_error(kind: HandshakeErrorKind) -> TunerError {
    TunerError::Handshake { kind }
}
