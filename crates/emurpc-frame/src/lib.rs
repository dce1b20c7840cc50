//! Header/body/footer framing for the emulator debugger protocol.
//!
//! Every packet body travels inside a frame:
//! - A 10-byte header: two signatures (`0xBEEF`, `0xED`), destination,
//!   source and packet-type routing bytes, a big-endian body length, the
//!   transaction id, and an additive header checksum
//! - The packet body
//! - A 2-byte footer carrying a body checksum
//!
//! Callers read whole frames; short reads surface as errors, never as
//! partially filled frames.

pub mod codec;
pub mod error;
pub mod integrity;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod tokio_codec;

pub use codec::{
    decode_frame, encode_frame, header_checksum, Frame, FrameConfig, FrameHeader, Route,
    DEFAULT_MAX_BODY, FOOTER_SIZE, HEADER_SIZE, SIGNATURE1, SIGNATURE2,
};
pub use error::{FrameError, FrameSection, Result};
pub use integrity::{HeaderVerified, Integrity, Placeholder};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use tokio_codec::EmuFrameCodec;
