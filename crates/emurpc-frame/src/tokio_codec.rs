use std::sync::Arc;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, Frame, DEFAULT_MAX_BODY};
use crate::error::FrameError;
use crate::integrity::{Integrity, Placeholder};

/// `tokio_util` codec over the same wire format as [`crate::FrameReader`].
///
/// Decoded frames have already passed the integrity strategy's header and
/// body checks.
#[derive(Debug, Clone)]
pub struct EmuFrameCodec {
    max_body_size: usize,
    integrity: Arc<dyn Integrity>,
}

impl Default for EmuFrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BODY, Arc::new(Placeholder))
    }
}

impl EmuFrameCodec {
    pub fn new(max_body_size: usize, integrity: Arc<dyn Integrity>) -> Self {
        Self {
            max_body_size,
            integrity,
        }
    }
}

impl Decoder for EmuFrameCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(frame) = decode_frame(src, self.max_body_size)? else {
            return Ok(None);
        };
        self.integrity.verify_header(&frame.header)?;
        self.integrity.verify_body(&frame.body, frame.footer)?;
        Ok(Some(frame))
    }
}

impl Encoder<Frame> for EmuFrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, dst)
    }
}
