use std::fmt;

/// Which part of a frame was being read when a transfer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSection {
    Header,
    Body,
    Footer,
}

impl fmt::Display for FrameSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameSection::Header => f.write_str("header"),
            FrameSection::Body => f.write_str("body"),
            FrameSection::Footer => f.write_str("footer"),
        }
    }
}

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame header carries unexpected signature bytes.
    #[error("invalid frame signature 0x{signature1:04X}/0x{signature2:02X} (expected 0xBEEF/0xED)")]
    InvalidSignature { signature1: u16, signature2: u8 },

    /// The header checksum does not match the header bytes.
    #[error("header checksum mismatch: computed 0x{expected:02X}, received 0x{actual:02X}")]
    HeaderChecksum { expected: u8, actual: u8 },

    /// The footer checksum does not match the body.
    #[error("body checksum mismatch: computed 0x{expected:04X}, received 0x{actual:04X}")]
    BodyChecksum { expected: u16, actual: u16 },

    /// An outgoing body does not fit the 16-bit length field or the configured limit.
    #[error("body too large ({size} bytes, max {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// A received header declares a body over the configured limit.
    #[error("reply body too large ({size} bytes, max {max})")]
    ReplyTooLarge { size: usize, max: usize },

    /// The header's length field disagrees with the body it describes.
    #[error("header declares {declared} body bytes but {actual} were supplied")]
    LengthMismatch { declared: usize, actual: usize },

    /// The peer closed the connection before a frame section was complete.
    #[error("short read in frame {section}: expected {expected} bytes, received {received}")]
    ShortRead {
        section: FrameSection,
        expected: usize,
        received: usize,
    },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection accepted no more bytes while a frame was being sent.
    #[error("connection closed (incomplete frame sent)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
