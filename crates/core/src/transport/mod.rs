//! Network transport layer for RTSP signaling and RTP media reception.
//!
//! A tuned stream uses a split transport model:
//!
//! - **UDP** ([`udp`]): the RTP data socket. Always present; bound to an
//!   ephemeral port in RTSP mode, or to the exact `rtp://` address for
//!   bare feeds.
//!
//! - **TCP** ([`tcp`]): the RTSP control connection, present only for
//!   `rtsp://` URLs. Bound to the same local address as the data socket.
//!
//! [`address`] decides which local address the sockets bind to.

pub mod address;
pub mod tcp;
pub mod udp;

pub use tcp::ControlSocket;
pub use udp::DataSocket;
