use std::net::Ipv4Addr;
use std::time::Duration;

/// Data-socket read timeout (and worst-case cancellation latency).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline applied to every control-socket connect, write and read.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Client identification string sent in every RTSP request.
pub const USER_AGENT: &str = concat!("rtp-tuner/", env!("CARGO_PKG_VERSION"));

/// Tuner-level configuration shared by every stream session.
#[derive(Debug, Clone)]
pub struct TunerConfig {
    /// Local address to bind RTSP sockets to. Takes precedence over
    /// the host inferred from the advertised base URL.
    pub discovery_address: Option<Ipv4Addr>,
    /// Per-read timeout on the UDP data socket.
    pub read_timeout: Duration,
    /// Timeout for the RTSP control connection.
    pub handshake_timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Interface used when joining a multicast group in bare RTP mode.
    pub multicast_interface: Ipv4Addr,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            discovery_address: None,
            read_timeout: DEFAULT_READ_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            user_agent: USER_AGENT.to_string(),
            multicast_interface: Ipv4Addr::UNSPECIFIED,
        }
    }
}

impl TunerConfig {
    pub fn with_discovery_address(mut self, address: Ipv4Addr) -> Self {
        self.discovery_address = Some(address);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_multicast_interface(mut self, interface: Ipv4Addr) -> Self {
        self.multicast_interface = interface;
        self
    }
}
