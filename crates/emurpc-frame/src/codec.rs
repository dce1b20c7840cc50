use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::integrity::Integrity;

/// Frame header: signatures (3) + routing (3) + length (2) + transaction (1) + checksum (1).
pub const HEADER_SIZE: usize = 10;

/// Frame footer: body checksum (2).
pub const FOOTER_SIZE: usize = 2;

/// First header signature.
pub const SIGNATURE1: u16 = 0xBEEF;

/// Second header signature.
pub const SIGNATURE2: u8 = 0xED;

/// Largest body the 16-bit length field can describe.
pub const DEFAULT_MAX_BODY: usize = u16::MAX as usize;

/// Additive checksum over header bytes, modulo 256.
pub fn header_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, byte| sum.wrapping_add(*byte))
}

/// The three routing bytes of a frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub destination: u8,
    pub source: u8,
    pub packet_type: u8,
}

/// Parsed or to-be-sent frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub signature1: u16,
    pub signature2: u8,
    pub destination: u8,
    pub source: u8,
    pub packet_type: u8,
    pub body_length: u16,
    pub transaction_id: u8,
    pub checksum: u8,
}

impl FrameHeader {
    /// Build an outgoing header; the checksum is computed over the other fields.
    pub fn new(route: Route, body_length: u16, transaction_id: u8) -> Self {
        let mut header = Self {
            signature1: SIGNATURE1,
            signature2: SIGNATURE2,
            destination: route.destination,
            source: route.source,
            packet_type: route.packet_type,
            body_length,
            transaction_id,
            checksum: 0,
        };
        header.checksum = header.computed_checksum();
        header
    }

    /// Routing bytes as carried on the wire.
    pub fn route(&self) -> Route {
        Route {
            destination: self.destination,
            source: self.source,
            packet_type: self.packet_type,
        }
    }

    /// Header bytes that precede the checksum field.
    pub fn checksummed_bytes(&self) -> [u8; HEADER_SIZE - 1] {
        let sig = self.signature1.to_be_bytes();
        let len = self.body_length.to_be_bytes();
        [
            sig[0],
            sig[1],
            self.signature2,
            self.destination,
            self.source,
            self.packet_type,
            len[0],
            len[1],
            self.transaction_id,
        ]
    }

    /// Checksum recomputed from the header fields.
    pub fn computed_checksum(&self) -> u8 {
        header_checksum(&self.checksummed_bytes())
    }

    /// Whether both signature fields carry the protocol constants.
    pub fn has_valid_signature(&self) -> bool {
        self.signature1 == SIGNATURE1 && self.signature2 == SIGNATURE2
    }

    /// Encodes the header to bytes.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_slice(&self.checksummed_bytes());
        dst.put_u8(self.checksum);
    }

    /// Decodes a header from exactly [`HEADER_SIZE`] bytes.
    pub fn decode(src: &[u8; HEADER_SIZE]) -> Self {
        let mut buf = &src[..];
        Self {
            signature1: buf.get_u16(),
            signature2: buf.get_u8(),
            destination: buf.get_u8(),
            source: buf.get_u8(),
            packet_type: buf.get_u8(),
            body_length: buf.get_u16(),
            transaction_id: buf.get_u8(),
            checksum: buf.get_u8(),
        }
    }
}

/// One complete header + body + footer unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub body: Bytes,
    /// Body checksum carried in the footer.
    pub footer: u16,
}

impl Frame {
    /// Create an outgoing frame, checksumming the body with `integrity`.
    pub fn new(
        route: Route,
        transaction_id: u8,
        body: impl Into<Bytes>,
        integrity: &dyn Integrity,
    ) -> Result<Self> {
        let body = body.into();
        let body_length = u16::try_from(body.len()).map_err(|_| FrameError::BodyTooLarge {
            size: body.len(),
            max: DEFAULT_MAX_BODY,
        })?;
        let footer = integrity.body_checksum(&body);
        Ok(Self {
            header: FrameHeader::new(route, body_length, transaction_id),
            body,
            footer,
        })
    }

    /// The total wire size of this frame (header + body + footer).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.body.len() + FOOTER_SIZE
    }
}

/// Encode a frame into the wire format.
///
/// Wire format (all integers big-endian):
/// ```text
/// ┌──────┬────┬──────┬─────┬──────┬─────────┬─────┬─────┬──────────┬──────────┐
/// │ BEEF │ ED │ dest │ src │ type │ len(2B) │ tid │ hcs │ body     │ bcs (2B) │
/// └──────┴────┴──────┴─────┴──────┴─────────┴─────┴─────┴──────────┴──────────┘
/// ```
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    if frame.body.len() != usize::from(frame.header.body_length) {
        return Err(FrameError::LengthMismatch {
            declared: usize::from(frame.header.body_length),
            actual: frame.body.len(),
        });
    }
    dst.reserve(frame.wire_size());
    frame.header.encode(dst);
    dst.put_slice(&frame.body);
    dst.put_u16(frame.footer);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. Signatures and
/// checksums are not judged here; that is the [`Integrity`] strategy's job.
pub fn decode_frame(src: &mut BytesMut, max_body: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    let mut raw = [0u8; HEADER_SIZE];
    raw.copy_from_slice(&src[..HEADER_SIZE]);
    let header = FrameHeader::decode(&raw);
    let body_len = usize::from(header.body_length);

    if body_len > max_body {
        return Err(FrameError::ReplyTooLarge {
            size: body_len,
            max: max_body,
        });
    }

    let total = HEADER_SIZE + body_len + FOOTER_SIZE;
    if src.len() < total {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let body = src.split_to(body_len).freeze();
    let footer = src.get_u16();

    Ok(Some(Frame {
        header,
        body,
        footer,
    }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum accepted reply body size in bytes. Default: 65535.
    pub max_body_size: usize,
    /// Read timeout for blocking operations. Default: block indefinitely.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
