//! Pluggable integrity checks for frames.
//!
//! The emulator's body checksum has never been specified for this protocol,
//! so the default [`Placeholder`] sends zero and verifies nothing. Wire-level
//! corruption inside a body is therefore not detected with the default.

use std::fmt;

use crate::codec::FrameHeader;
use crate::error::{FrameError, Result};

/// Checksum and verification policy applied by the frame layer.
pub trait Integrity: fmt::Debug + Send + Sync {
    /// Footer checksum for an outgoing body.
    fn body_checksum(&self, body: &[u8]) -> u16;

    /// Judge a received header before its body is read.
    fn verify_header(&self, _header: &FrameHeader) -> Result<()> {
        Ok(())
    }

    /// Judge a received body against its footer.
    fn verify_body(&self, _body: &[u8], _footer: u16) -> Result<()> {
        Ok(())
    }
}

/// Zero footer, no verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct Placeholder;

impl Integrity for Placeholder {
    fn body_checksum(&self, _body: &[u8]) -> u16 {
        0
    }
}

/// Zero footer; received signatures and header checksums must be correct.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderVerified;

impl Integrity for HeaderVerified {
    fn body_checksum(&self, _body: &[u8]) -> u16 {
        0
    }

    fn verify_header(&self, header: &FrameHeader) -> Result<()> {
        if !header.has_valid_signature() {
            return Err(FrameError::InvalidSignature {
                signature1: header.signature1,
                signature2: header.signature2,
            });
        }
        let expected = header.computed_checksum();
        if expected != header.checksum {
            return Err(FrameError::HeaderChecksum {
                expected,
                actual: header.checksum,
            });
        }
        Ok(())
    }
}
