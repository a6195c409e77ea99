//! RTP de-encapsulation.
//!
//! Every UDP datagram received on the data socket is one RTP packet
//! (RFC 3550). The tuner only needs the media payload, so decoding is
//! a pure function of the datagram: header fields are parsed, the CSRC
//! list, header extension and padding are skipped, and the remaining
//! bytes are handed downstream untouched (typically MPEG-TS).

pub mod rtp;

pub use rtp::{HeaderExtension, RtpPacket};
