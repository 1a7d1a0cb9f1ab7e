//! Final-hop routing header.
//!
//! A request payload arriving at its terminating mix starts with a 2-byte
//! big-endian destination port, optionally followed by a 4-byte end-to-end
//! pseudonym. The routing layer strips the header before handing the payload
//! to the local socket layer.

use crate::error::{MessageError, MessageResult};

/// Destination port consumed silently at the final hop (dummy sink).
pub const DISCARD_PORT: u16 = 0;

/// Routing header carried at the front of a request payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    /// Destination port on the terminating node.
    pub port: u16,
    /// Optional end-to-end pseudonym.
    pub pseudonym: Option<u32>,
}

impl Header {
    /// Bytes occupied by the destination port.
    pub const PORT_LEN: usize = 2;
    /// Bytes occupied by the pseudonym when present.
    pub const PSEUDONYM_LEN: usize = 4;

    /// Encoded length of this header.
    pub fn encoded_len(&self) -> usize {
        Self::PORT_LEN
            + if self.pseudonym.is_some() {
                Self::PSEUDONYM_LEN
            } else {
                0
            }
    }

    /// Prepends this header to `payload`.
    pub fn encode_onto(&self, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len() + payload.len());
        out.extend_from_slice(&self.port.to_be_bytes());
        if let Some(nym) = self.pseudonym {
            out.extend_from_slice(&nym.to_be_bytes());
        }
        out.extend_from_slice(payload);
        out
    }

    /// Splits the routing header off a final-hop request payload.
    pub fn strip(payload: &[u8], with_pseudonym: bool) -> MessageResult<(Header, &[u8])> {
        let need = Self::PORT_LEN
            + if with_pseudonym {
                Self::PSEUDONYM_LEN
            } else {
                0
            };
        if payload.len() < need {
            return Err(MessageError::HeaderTruncated {
                len: payload.len(),
                need,
            });
        }
        let port = u16::from_be_bytes([payload[0], payload[1]]);
        let pseudonym = with_pseudonym
            .then(|| u32::from_be_bytes([payload[2], payload[3], payload[4], payload[5]]));
        Ok((Header { port, pseudonym }, &payload[need..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encoding then stripping must return the original port, pseudonym and
    /// payload bytes.
    #[test]
    fn round_trip_with_pseudonym() {
        let header = Header {
            port: 4711,
            pseudonym: Some(0xDEAD_BEEF),
        };
        let encoded = header.encode_onto(b"payload");
        assert_eq!(encoded.len(), 6 + 7);

        let (parsed, rest) = Header::strip(&encoded, true).expect("strip");
        assert_eq!(parsed, header);
        assert_eq!(rest, b"payload");
    }

    /// Without a pseudonym only the two port bytes are consumed.
    #[test]
    fn round_trip_port_only() {
        let header = Header {
            port: 80,
            pseudonym: None,
        };
        let encoded = header.encode_onto(b"x");
        let (parsed, rest) = Header::strip(&encoded, false).expect("strip");
        assert_eq!(parsed.port, 80);
        assert_eq!(parsed.pseudonym, None);
        assert_eq!(rest, b"x");
    }

    /// A payload shorter than the configured header is a typed error, not a
    /// panic: it comes off the wire, not from a local caller.
    #[test]
    fn truncated_payload_is_an_error() {
        let err = Header::strip(&[0x01], false).unwrap_err();
        assert!(matches!(
            err,
            MessageError::HeaderTruncated { len: 1, need: 2 }
        ));

        let err = Header::strip(&[0, 1, 2, 3], true).unwrap_err();
        assert!(matches!(
            err,
            MessageError::HeaderTruncated { len: 4, need: 6 }
        ));
    }

    /// An all-zero prefix decodes to the discard port, which is what makes
    /// zero-filled dummies self-terminating.
    #[test]
    fn zero_prefix_is_discard_port() {
        let (header, _) = Header::strip(&[0u8; 8], false).expect("strip");
        assert_eq!(header.port, DISCARD_PORT);
    }
}
