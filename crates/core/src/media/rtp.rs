use crate::error::{DecodeErrorKind, Result, TunerError};

/// Size of the fixed RTP header in bytes.
pub const FIXED_HEADER_LEN: usize = 12;

/// A decoded RTP packet (RFC 3550 §5.1), borrowing from the datagram.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// |            CSRC list (CC entries, 4 bytes each)               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// When X is set, a header extension (16-bit profile, 16-bit length in
/// 32-bit words, then data) follows the CSRC list. When P is set, the
/// last byte of the datagram counts the padding bytes to strip.
///
/// A packet lives only as long as the datagram it was decoded from;
/// nothing is buffered or reordered across packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket<'a> {
    pub version: u8,
    pub padding: bool,
    pub extension: bool,
    pub csrc_count: u8,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    pub csrc: Vec<u32>,
    pub header_extension: Option<HeaderExtension<'a>>,
    /// Media bytes after the header, extension and padding.
    pub payload: &'a [u8],
}

/// RTP header extension block (RFC 3550 §5.3.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderExtension<'a> {
    /// Profile-defined identifier.
    pub profile: u16,
    pub data: &'a [u8],
}

impl<'a> RtpPacket<'a> {
    /// Decode a raw datagram.
    ///
    /// Fails with [`TunerError::Decode`] if the datagram is shorter than
    /// the fixed header plus CSRC list, if the extension overruns the
    /// datagram, or if the padding count is inconsistent.
    pub fn decode(datagram: &'a [u8]) -> Result<Self> {
        if datagram.len() < FIXED_HEADER_LEN {
            return Err(truncated(datagram.len(), FIXED_HEADER_LEN));
        }

        let version = datagram[0] >> 6;
        let padding = datagram[0] & 0x20 != 0;
        let extension = datagram[0] & 0x10 != 0;
        let csrc_count = datagram[0] & 0x0f;
        let marker = datagram[1] & 0x80 != 0;
        let payload_type = datagram[1] & 0x7f;
        let sequence = u16::from_be_bytes([datagram[2], datagram[3]]);
        let timestamp = read_u32(datagram, 4);
        let ssrc = read_u32(datagram, 8);

        let header_len = FIXED_HEADER_LEN + 4 * csrc_count as usize;
        if datagram.len() < header_len {
            return Err(truncated(datagram.len(), header_len));
        }
        let csrc = (0..csrc_count as usize)
            .map(|i| read_u32(datagram, FIXED_HEADER_LEN + 4 * i))
            .collect();

        let mut offset = header_len;
        let header_extension = if extension {
            if datagram.len() < offset + 4 {
                return Err(TunerError::Decode {
                    kind: DecodeErrorKind::ExtensionOverrun,
                });
            }
            let profile = u16::from_be_bytes([datagram[offset], datagram[offset + 1]]);
            let words = u16::from_be_bytes([datagram[offset + 2], datagram[offset + 3]]) as usize;
            let start = offset + 4;
            let end = start + 4 * words;
            if datagram.len() < end {
                return Err(TunerError::Decode {
                    kind: DecodeErrorKind::ExtensionOverrun,
                });
            }
            offset = end;
            Some(HeaderExtension {
                profile,
                data: &datagram[start..end],
            })
        } else {
            None
        };

        let mut end = datagram.len();
        if padding {
            let count = datagram[end - 1];
            if count == 0 || count as usize > end - offset {
                return Err(TunerError::Decode {
                    kind: DecodeErrorKind::InvalidPadding(count),
                });
            }
            end -= count as usize;
        }

        Ok(RtpPacket {
            version,
            padding,
            extension,
            csrc_count,
            marker,
            payload_type,
            sequence,
            timestamp,
            ssrc,
            csrc,
            header_extension,
            payload: &datagram[offset..end],
        })
    }
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn truncated(len: usize, needed: usize) -> TunerError {
    TunerError::Decode {
        kind: DecodeErrorKind::Truncated { len, needed },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(first_byte: u8, second_byte: u8) -> Vec<u8> {
        let mut buf = vec![first_byte, second_byte];
        buf.extend_from_slice(&0x1234u16.to_be_bytes());
        buf.extend_from_slice(&90_000u32.to_be_bytes());
        buf.extend_from_slice(&0xAABBCCDDu32.to_be_bytes());
        buf
    }

    fn assert_decode_error(datagram: &[u8]) -> DecodeErrorKind {
        match RtpPacket::decode(datagram) {
            Err(TunerError::Decode { kind }) => kind,
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn fixed_header_fields() {
        let mut buf = header(0x80, 0x80 | 33);
        buf.extend_from_slice(b"payload");
        let packet = RtpPacket::decode(&buf).unwrap();
        assert_eq!(packet.version, 2);
        assert!(!packet.padding);
        assert!(!packet.extension);
        assert!(packet.marker);
        assert_eq!(packet.payload_type, 33);
        assert_eq!(packet.sequence, 0x1234);
        assert_eq!(packet.timestamp, 90_000);
        assert_eq!(packet.ssrc, 0xAABBCCDD);
        assert_eq!(packet.payload, b"payload");
    }

    #[test]
    fn shorter_than_fixed_header_fails() {
        for len in 0..FIXED_HEADER_LEN {
            let buf = vec![0x80; len];
            assert_eq!(
                assert_decode_error(&buf),
                DecodeErrorKind::Truncated { len, needed: 12 }
            );
        }
    }

    #[test]
    fn header_only_yields_empty_payload() {
        let buf = header(0x80, 33);
        assert!(RtpPacket::decode(&buf).unwrap().payload.is_empty());
    }

    #[test]
    fn csrc_list_is_skipped() {
        let mut buf = header(0x82, 33);
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&[9, 9, 9]);
        let packet = RtpPacket::decode(&buf).unwrap();
        assert_eq!(packet.csrc, vec![1, 2]);
        assert_eq!(packet.payload, &[9, 9, 9]);
    }

    #[test]
    fn truncated_csrc_list_fails() {
        let mut buf = header(0x83, 33);
        buf.extend_from_slice(&[0; 8]);
        assert_eq!(
            assert_decode_error(&buf),
            DecodeErrorKind::Truncated { len: 20, needed: 24 }
        );
    }

    #[test]
    fn extension_is_skipped() {
        let mut buf = header(0x90, 33);
        buf.extend_from_slice(&0xBEDEu16.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&[1, 2, 3, 4]);
        buf.extend_from_slice(b"ts");
        let packet = RtpPacket::decode(&buf).unwrap();
        let ext = packet.header_extension.unwrap();
        assert_eq!(ext.profile, 0xBEDE);
        assert_eq!(ext.data, &[1, 2, 3, 4]);
        assert_eq!(packet.payload, b"ts");
    }

    #[test]
    fn extension_overrun_fails() {
        let mut buf = header(0x90, 33);
        buf.extend_from_slice(&0xBEDEu16.to_be_bytes());
        buf.extend_from_slice(&4u16.to_be_bytes());
        buf.extend_from_slice(&[1, 2, 3, 4]);
        assert_eq!(assert_decode_error(&buf), DecodeErrorKind::ExtensionOverrun);
    }

    #[test]
    fn padding_is_stripped() {
        let mut buf = header(0xA0, 33);
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&[0, 0, 3]);
        let packet = RtpPacket::decode(&buf).unwrap();
        assert!(packet.padding);
        assert_eq!(packet.payload, b"data");
    }

    #[test]
    fn invalid_padding_fails() {
        let mut buf = header(0xA0, 33);
        buf.extend_from_slice(&[1, 0]);
        assert_eq!(assert_decode_error(&buf), DecodeErrorKind::InvalidPadding(0));

        let mut buf = header(0xA0, 33);
        buf.extend_from_slice(&[1, 9]);
        assert_eq!(assert_decode_error(&buf), DecodeErrorKind::InvalidPadding(9));
    }

    #[test]
    fn mpeg_ts_sized_datagram() {
        let mut buf = header(0x80, 33);
        buf.extend((0..1388).map(|i| i as u8));
        let packet = RtpPacket::decode(&buf).unwrap();
        assert_eq!(packet.payload.len(), 1388);
        assert_eq!(packet.payload[..], buf[12..]);
    }
}
