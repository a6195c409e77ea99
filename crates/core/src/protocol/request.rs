/// An outgoing RTSP request (RFC 2326 §6).
///
/// Serializes to the standard text format:
///
/// ```text
/// SETUP rtsp://cam/stream/trackID=1 RTSP/1.0\r\n
/// CSeq: 3\r\n
/// User-Agent: rtp-tuner/0.1.0\r\n
/// Transport: RTP/AVP;unicast;client_port=50000\r\n
/// \r\n
/// ```
///
/// Uses a builder pattern: chain [`add_header`](Self::add_header), then
/// call [`serialize`](Self::serialize). `CSeq` is always the first header.
/// Requests carry no body.
#[must_use]
#[derive(Debug, Clone)]
pub struct RtspRequest {
    pub method: String,
    pub uri: String,
    /// Sequence number echoed by the server (RFC 2326 §12.17).
    pub cseq: u32,
    pub headers: Vec<(String, String)>,
}

impl RtspRequest {
    pub fn new(method: &str, uri: &str, cseq: u32) -> Self {
        RtspRequest {
            method: method.to_string(),
            uri: uri.to_string(),
            cseq,
            headers: Vec::new(),
        }
    }

    pub fn add_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Look up a header value by name (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Serialize to the RTSP text wire format.
    pub fn serialize(&self) -> String {
        let mut request = format!("{} {} RTSP/1.0\r\nCSeq: {}\r\n", self.method, self.uri, self.cseq);
        for (name, value) in &self.headers {
            request.push_str(&format!("{}: {}\r\n", name, value));
        }
        request.push_str("\r\n");
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_describe() {
        let req = RtspRequest::new("DESCRIBE", "rtsp://cam/stream", 2)
            .add_header("User-Agent", "test")
            .add_header("Accept", "application/sdp");
        assert_eq!(
            req.serialize(),
            "DESCRIBE rtsp://cam/stream RTSP/1.0\r\n\
             CSeq: 2\r\n\
             User-Agent: test\r\n\
             Accept: application/sdp\r\n\
             \r\n"
        );
    }

    #[test]
    fn serialize_without_headers() {
        let req = RtspRequest::new("PLAY", "rtsp://cam/stream", 4);
        assert_eq!(req.serialize(), "PLAY rtsp://cam/stream RTSP/1.0\r\nCSeq: 4\r\n\r\n");
    }

    #[test]
    fn header_lookup_case_insensitive() {
        let req = RtspRequest::new("PLAY", "rtsp://cam", 4).add_header("Session", "12345");
        assert_eq!(req.get_header("session"), Some("12345"));
        assert_eq!(req.get_header("Range"), None);
    }
}
