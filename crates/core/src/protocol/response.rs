use std::fmt;
use std::io::Read;

use crate::error::{HandshakeErrorKind, Result, TunerError};

/// Bytes requested per receive on the control socket.
pub const RECV_CHUNK_LEN: usize = 4096;

/// Upper bound on a single response, headers and body included.
pub const MAX_RESPONSE_LEN: usize = 64 * 1024;

/// Numeric RTSP session identifier issued in the SETUP response
/// (RFC 2326 §12.37).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A parsed RTSP response (RFC 2326 §7).
///
/// ```text
/// RTSP/1.0 200 OK\r\n
/// CSeq: 3\r\n
/// Session: 12345;timeout=60\r\n
/// \r\n
/// ```
///
/// Header lookup is case-insensitive per RFC 2326 §4.2.
#[derive(Debug, Clone)]
pub struct RtspResponse {
    /// Protocol version (expected: `RTSP/1.0`).
    pub version: String,
    pub status_code: u16,
    pub status_text: String,
    /// Headers as ordered (name, value) pairs, names stored as received.
    pub headers: Vec<(String, String)>,
    /// Body, present when `Content-Length` is non-zero (e.g. DESCRIBE SDP).
    pub body: Option<String>,
}

impl RtspResponse {
    /// Parse a response from its text representation.
    ///
    /// Anything after the blank line terminating the headers is taken as
    /// the body.
    pub fn parse(raw: &str) -> Result<Self> {
        let (head, body) = match raw.split_once("\r\n\r\n") {
            Some((head, body)) => (head, body),
            None => (raw, ""),
        };
        let mut lines = head.split("\r\n");

        let status_line = lines.next().unwrap_or_default();
        let mut parts = status_line.splitn(3, ' ');
        let version = parts.next().unwrap_or_default();
        if !version.starts_with("RTSP/") {
            return Err(handshake(HandshakeErrorKind::InvalidStatusLine));
        }
        let status_code = parts
            .next()
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(|| handshake(HandshakeErrorKind::InvalidStatusLine))?;
        let status_text = parts.next().unwrap_or_default().trim();

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| handshake(HandshakeErrorKind::InvalidHeader))?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        Ok(RtspResponse {
            version: version.to_string(),
            status_code,
            status_text: status_text.to_string(),
            headers,
            body: (!body.is_empty()).then(|| body.to_string()),
        })
    }

    /// Read one complete response from the control connection.
    ///
    /// Receives in chunks of at most [`RECV_CHUNK_LEN`] bytes until the
    /// blank line ending the headers has arrived, then reads exactly
    /// `Content-Length` body bytes so the body cannot bleed into the next
    /// response.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; RECV_CHUNK_LEN];

        let header_end = loop {
            if let Some(pos) = find_header_end(&buf) {
                break pos;
            }
            fill(reader, &mut buf, &mut chunk)?;
        };

        let head = std::str::from_utf8(&buf[..header_end])
            .map_err(|_| handshake(HandshakeErrorKind::InvalidEncoding))?;
        let mut response = Self::parse(head)?;

        let body_start = header_end + 4;
        let body_len = response.content_length();
        let body_end = body_start
            .checked_add(body_len)
            .filter(|&end| end <= MAX_RESPONSE_LEN)
            .ok_or_else(|| handshake(HandshakeErrorKind::ResponseTooLarge))?;
        while buf.len() < body_end {
            fill(reader, &mut buf, &mut chunk)?;
        }
        if body_len > 0 {
            let body = &buf[body_start..body_end];
            response.body = Some(String::from_utf8_lossy(body).into_owned());
        }

        Ok(response)
    }

    /// Look up a header value by name (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn cseq(&self) -> Option<&str> {
        self.get_header("CSeq")
    }

    /// `Content-Length` value, 0 when absent or unparsable.
    pub fn content_length(&self) -> usize {
        self.get_header("Content-Length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Extract the session identifier from the `Session` header.
    ///
    /// The first whitespace-delimited token, cut at the first `;`, must be
    /// numeric: `Session: 12345;timeout=60` yields `12345`.
    pub fn session_id(&self) -> Result<SessionId> {
        let value = self
            .get_header("Session")
            .ok_or_else(|| handshake(HandshakeErrorKind::MissingSession))?;
        let token = value.split_whitespace().next().unwrap_or_default();
        let id = token.split(';').next().unwrap_or_default().trim();
        id.parse::<u64>()
            .map(SessionId)
            .map_err(|_| handshake(HandshakeErrorKind::InvalidSession(value.to_string())))
    }
}

fn handshake(kind: HandshakeErrorKind) -> TunerError {
    TunerError::Handshake { kind }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Append one receive to `buf`, enforcing the size limit.
fn fill<R: Read>(reader: &mut R, buf: &mut Vec<u8>, chunk: &mut [u8]) -> Result<()> {
    if buf.len() >= MAX_RESPONSE_LEN {
        return Err(handshake(HandshakeErrorKind::ResponseTooLarge));
    }
    let n = loop {
        match reader.read(chunk) {
            Ok(n) => break n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TunerError::Io(e)),
        }
    };
    if n == 0 {
        return Err(handshake(HandshakeErrorKind::ConnectionClosed));
    }
    buf.extend_from_slice(&chunk[..n]);
    Ok(())
}
