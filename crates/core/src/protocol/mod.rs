//! RTSP client protocol (RFC 2326).
//!
//! This module handles the text-based RTSP signaling a tuner needs to
//! start a unicast RTP feed: building requests, reading and parsing
//! responses, and driving the handshake.
//!
//! ## RTSP message format (RFC 2326 §4)
//!
//! ```text
//! SETUP rtsp://cam/stream/trackID=1 RTSP/1.0\r\n
//! CSeq: 3\r\n
//! User-Agent: rtp-tuner/0.1.0\r\n
//! Transport: RTP/AVP;unicast;client_port=50000\r\n
//! Authorization: Basic dXNlcjpwYXNz\r\n
//! \r\n
//! ```
//!
//! ## Methods used
//!
//! | Method | RFC section | Purpose |
//! |--------|-------------|---------|
//! | DESCRIBE | §10.2 | Opens the exchange; the SDP body is not inspected |
//! | SETUP | §10.4 | Advertise the local RTP port, obtain a session ID |
//! | PLAY | §10.5 | Start media delivery, sent when the consumer starts reading |

pub mod handshake;
pub mod request;
pub mod response;

pub use handshake::{ControlChannel, HandshakeClient, HandshakeState};
pub use request::RtspRequest;
pub use response::{RtspResponse, SessionId};
