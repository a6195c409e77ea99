use std::net::SocketAddrV4;

use crate::error::{Result, TunerError};
use crate::transport::address::{parse_rtsp_authority, resolve_v4};

/// Bytes per UDP read when the caller does not choose (one Ethernet MTU).
pub const DEFAULT_READ_CHUNK_SIZE: usize = 1500;

/// How a stream is acquired, decided by the URL scheme alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// `rtsp://`: RTSP handshake over TCP, then RTP over UDP.
    Rtsp,
    /// `rtp://host:port`: bare RTP datagrams, no control channel.
    Rtp,
}

impl StreamMode {
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url
            .trim()
            .split_once("://")
            .map(|(scheme, _)| scheme)
            .ok_or_else(|| TunerError::InvalidUrl(format!("{url}: missing scheme")))?;
        if scheme.eq_ignore_ascii_case("rtsp") {
            Ok(Self::Rtsp)
        } else if scheme.eq_ignore_ascii_case("rtp") {
            Ok(Self::Rtp)
        } else {
            Err(TunerError::InvalidUrl(format!(
                "{url}: unsupported scheme {scheme:?}"
            )))
        }
    }
}

/// Connection parameters for one playback request, as supplied by the
/// source adapter that resolved the channel.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    /// `rtsp://...` or `rtp://host:port`.
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// RTSP control endpoint host. Defaults to the URL host.
    pub remote_address: Option<String>,
    /// RTSP control endpoint port. Defaults to the URL port, then 554.
    pub remote_port: Option<u16>,
    /// Base URL the tuner advertises; only used to infer a local bind address.
    pub advertised_base_url: String,
    /// Descriptive content type, logged only.
    pub content_type: String,
    /// Maximum bytes per UDP read.
    pub read_chunk_size: usize,
}

impl StreamRequest {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim().to_string(),
            username: None,
            password: None,
            remote_address: None,
            remote_port: None,
            advertised_base_url: String::new(),
            content_type: "video/mp2t".to_string(),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    pub fn with_remote(mut self, address: &str, port: u16) -> Self {
        self.remote_address = Some(address.to_string());
        self.remote_port = Some(port);
        self
    }

    pub fn with_advertised_base_url(mut self, base_url: &str) -> Self {
        self.advertised_base_url = base_url.to_string();
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size;
        self
    }

    pub fn mode(&self) -> Result<StreamMode> {
        StreamMode::from_url(&self.url)
    }

    /// `(username, password)` when a username was supplied.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.username
            .as_deref()
            .filter(|user| !user.is_empty())
            .map(|user| (user, self.password.as_deref().unwrap_or_default()))
    }

    /// RTSP control endpoint, falling back to the URL authority.
    pub fn control_endpoint(&self) -> Result<SocketAddrV4> {
        let (url_host, url_port) = parse_rtsp_authority(&self.url)?;
        let host = self.remote_address.as_deref().unwrap_or(&url_host);
        let port = self.remote_port.unwrap_or(url_port);
        resolve_v4(host, port).ok_or_else(|| {
            TunerError::SocketCreation(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("cannot resolve RTSP host {host:?}"),
            ))
        })
    }
}
