//! Error types for the tuner engine.

use std::fmt;
use std::time::Duration;

/// Domain code carried by every tuning failure ("806 - Tune Failed").
pub const TUNE_FAILED: u16 = 806;

/// Errors that can occur while acquiring or delivering a stream.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Socket creation**: [`SocketCreation`](Self::SocketCreation),
///   [`NoBindAddress`](Self::NoBindAddress), [`InvalidUrl`](Self::InvalidUrl).
/// - **Handshake**: [`Handshake`](Self::Handshake): missing or malformed
///   RTSP responses.
/// - **Decode**: [`Decode`](Self::Decode): malformed RTP datagrams.
/// - **Timeout**: [`Timeout`](Self::Timeout): no data within the read deadline.
/// - **Transport**: [`Io`](Self::Io): any other socket failure.
///
/// The caller sees all of them as one tuning failure: [`code`](Self::code)
/// is always [`TUNE_FAILED`].
#[derive(Debug, thiserror::Error)]
pub enum TunerError {
    /// Binding, configuring or connecting a socket failed.
    #[error("could not create socket: {0}")]
    SocketCreation(#[source] std::io::Error),

    /// No discovery address is configured and the advertised base URL
    /// does not carry a literal IPv4 host.
    #[error("could not create socket: no local bind address")]
    NoBindAddress,

    /// The stream URL has an unsupported scheme or a malformed authority.
    #[error("invalid stream URL: {0}")]
    InvalidUrl(String),

    /// The RTSP server answered with something the handshake cannot use.
    #[error("RTSP handshake failed: {kind}")]
    Handshake { kind: HandshakeErrorKind },

    /// A received datagram is not a valid RTP packet (RFC 3550 §5.1).
    #[error("RTP decode failed: {kind}")]
    Decode { kind: DecodeErrorKind },

    /// Nothing arrived before the read deadline expired.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Underlying I/O or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TunerError {
    /// Numeric domain code reported to the tuner layer.
    pub fn code(&self) -> u16 {
        TUNE_FAILED
    }

    /// Render as `"<code> - Tune Failed: <cause>"`.
    pub fn describe(&self) -> String {
        format!("{} - Tune Failed: {}", self.code(), self)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Map a socket read/write error, turning expired deadlines into
    /// [`Timeout`](Self::Timeout).
    pub(crate) fn from_io(err: std::io::Error, deadline: Duration) -> Self {
        match err.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => {
                Self::Timeout(deadline)
            }
            _ => Self::Io(err),
        }
    }
}

/// Specific kind of RTSP handshake failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeErrorKind {
    /// The server closed the control connection before a full response arrived.
    ConnectionClosed,
    /// The status line did not have the expected `RTSP/1.0 <code> <text>` format.
    InvalidStatusLine,
    /// A header line did not contain a colon separator.
    InvalidHeader,
    /// The response was not valid UTF-8.
    InvalidEncoding,
    /// The response exceeded the maximum accepted size.
    ResponseTooLarge,
    /// The server answered with a non-2xx status.
    Status(u16),
    /// The SETUP response carried no `Session` header.
    MissingSession,
    /// The `Session` header value is not a numeric identifier.
    InvalidSession(String),
}

impl fmt::Display for HandshakeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionClosed => write!(f, "connection closed by server"),
            Self::InvalidStatusLine => write!(f, "invalid status line"),
            Self::InvalidHeader => write!(f, "invalid header"),
            Self::InvalidEncoding => write!(f, "response is not valid UTF-8"),
            Self::ResponseTooLarge => write!(f, "response too large"),
            Self::Status(code) => write!(f, "server replied with status {code}"),
            Self::MissingSession => write!(f, "missing Session header"),
            Self::InvalidSession(value) => write!(f, "invalid session identifier {value:?}"),
        }
    }
}

/// Specific kind of RTP decode failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Datagram is shorter than the fixed header plus CSRC list.
    Truncated { len: usize, needed: usize },
    /// The header extension runs past the end of the datagram.
    ExtensionOverrun,
    /// The padding count is zero or larger than the bytes after the header.
    InvalidPadding(u8),
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { len, needed } => {
                write!(f, "datagram of {len} bytes is shorter than {needed}")
            }
            Self::ExtensionOverrun => write!(f, "header extension exceeds datagram"),
            Self::InvalidPadding(count) => write!(f, "invalid padding count {count}"),
        }
    }
}

/// Convenience alias for `Result<T, TunerError>`.
pub type Result<T> = std::result::Result<T, TunerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_is_a_tune_failure() {
        let errors = [
            TunerError::NoBindAddress,
            TunerError::Timeout(Duration::from_secs(5)),
            TunerError::Handshake {
                kind: HandshakeErrorKind::MissingSession,
            },
            TunerError::Decode {
                kind: DecodeErrorKind::Truncated { len: 3, needed: 12 },
            },
        ];
        for err in &errors {
            assert_eq!(err.code(), TUNE_FAILED);
            assert!(err.describe().starts_with("806 - Tune Failed: "));
        }
    }

    #[test]
    fn would_block_maps_to_timeout() {
        let err = TunerError::from_io(
            std::io::Error::from(std::io::ErrorKind::WouldBlock),
            Duration::from_secs(5),
        );
        assert!(err.is_timeout());

        let err = TunerError::from_io(
            std::io::Error::from(std::io::ErrorKind::ConnectionReset),
            Duration::from_secs(5),
        );
        assert!(matches!(err, TunerError::Io(_)));
    }
}
