use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use emurpc_transport::EmuStream;
use tracing::trace;

use crate::codec::{Frame, FrameConfig, FrameHeader, FOOTER_SIZE, HEADER_SIZE};
use crate::error::{FrameError, FrameSection, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Reads frames from any `Read` stream, one section at a time.
///
/// Each section is read with exactly the number of bytes the protocol
/// declares. A stream that ends early yields [`FrameError::ShortRead`]; the
/// reader never tries to resynchronize afterwards.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read exactly one 10-byte header (blocking).
    pub fn read_header(&mut self) -> Result<FrameHeader> {
        let mut raw = [0u8; HEADER_SIZE];
        self.fill(&mut raw, FrameSection::Header)?;
        let header = FrameHeader::decode(&raw);
        trace!(
            body_length = header.body_length,
            transaction_id = header.transaction_id,
            "read frame header"
        );
        Ok(header)
    }

    /// Read exactly `len` body bytes (blocking).
    pub fn read_body(&mut self, len: usize) -> Result<Bytes> {
        if len > self.config.max_body_size {
            return Err(FrameError::ReplyTooLarge {
                size: len,
                max: self.config.max_body_size,
            });
        }
        self.buf.clear();
        self.buf.resize(len, 0);
        let mut body = std::mem::take(&mut self.buf);
        let filled = self.fill(&mut body[..], FrameSection::Body);
        let bytes = body.split().freeze();
        self.buf = body;
        filled?;
        Ok(bytes)
    }

    /// Read exactly one 2-byte footer (blocking).
    pub fn read_footer(&mut self) -> Result<u16> {
        let mut raw = [0u8; FOOTER_SIZE];
        self.fill(&mut raw, FrameSection::Footer)?;
        Ok(u16::from_be_bytes(raw))
    }

    /// Read the next complete frame (blocking).
    pub fn read_frame(&mut self) -> Result<Frame> {
        let header = self.read_header()?;
        let body = self.read_body(usize::from(header.body_length))?;
        let footer = self.read_footer()?;
        Ok(Frame {
            header,
            body,
            footer,
        })
    }

    fn fill(&mut self, dst: &mut [u8], section: FrameSection) -> Result<()> {
        let mut filled = 0usize;
        while filled < dst.len() {
            match self.inner.read(&mut dst[filled..]) {
                Ok(0) => {
                    return Err(FrameError::ShortRead {
                        section,
                        expected: dst.len(),
                        received: filled,
                    })
                }
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        Ok(())
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<EmuStream> {
    /// Create a frame reader for `EmuStream` and apply read timeout from config.
    pub fn with_config_emu(inner: EmuStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: emurpc_transport::TransportError) -> FrameError {
    match err {
        emurpc_transport::TransportError::Io(io) => FrameError::Io(io),
        emurpc_transport::TransportError::Resolve { source, .. }
        | emurpc_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_frame, Route};
    use crate::integrity::Placeholder;

    const ROUTE: Route = Route {
        destination: 1,
        source: 1,
        packet_type: 0,
    };

    fn wire(tid: u8, body: &'static [u8]) -> Vec<u8> {
        let frame = Frame::new(ROUTE, tid, Bytes::from_static(body), &Placeholder).unwrap();
        let mut buf = BytesMut::new();
        encode_frame(&frame, &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn read_single_frame() {
        let mut reader = FrameReader::new(Cursor::new(wire(1, b"hello")));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.header.transaction_id, 1);
        assert_eq!(frame.body.as_ref(), b"hello");
        assert_eq!(frame.footer, 0);
    }

    #[test]
    fn read_sections_individually() {
        let mut reader = FrameReader::new(Cursor::new(wire(4, b"abc")));

        let header = reader.read_header().unwrap();
        assert_eq!(header.body_length, 3);
        let body = reader.read_body(3).unwrap();
        assert_eq!(body.as_ref(), b"abc");
        assert_eq!(reader.read_footer().unwrap(), 0);
    }

    #[test]
    fn read_multiple_frames() {
        let mut bytes = wire(1, b"one");
        bytes.extend(wire(2, b"two"));
        let mut reader = FrameReader::new(Cursor::new(bytes));

        let f1 = reader.read_frame().unwrap();
        let f2 = reader.read_frame().unwrap();
        assert_eq!((f1.header.transaction_id, f1.body.as_ref()), (1, b"one".as_ref()));
        assert_eq!((f2.header.transaction_id, f2.body.as_ref()), (2, b"two".as_ref()));
    }

    #[test]
    fn bodies_do_not_alias_between_frames() {
        let mut bytes = wire(1, b"first");
        bytes.extend(wire(2, b"later"));
        let mut reader = FrameReader::new(Cursor::new(bytes));

        let f1 = reader.read_frame().unwrap();
        let _f2 = reader.read_frame().unwrap();
        assert_eq!(f1.body.as_ref(), b"first");
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire(6, b"slow"),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.body.as_ref(), b"slow");
    }

    #[test]
    fn short_header_is_reported() {
        let mut reader = FrameReader::new(Cursor::new(vec![0xBE, 0xEF, 0xED]));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::ShortRead {
                section: FrameSection::Header,
                expected: 10,
                received: 3
            }
        ));
    }

    #[test]
    fn short_body_is_reported() {
        let mut bytes = wire(1, b"truncated");
        bytes.truncate(HEADER_SIZE + 4);
        let mut reader = FrameReader::new(Cursor::new(bytes));

        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::ShortRead {
                section: FrameSection::Body,
                expected: 9,
                received: 4
            }
        ));
    }

    #[test]
    fn missing_footer_is_reported() {
        let mut bytes = wire(1, b"x");
        bytes.truncate(bytes.len() - 1);
        let mut reader = FrameReader::new(Cursor::new(bytes));

        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::ShortRead {
                section: FrameSection::Footer,
                expected: 2,
                received: 1
            }
        ));
    }

    #[test]
    fn empty_stream_is_short_header() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::ShortRead {
                section: FrameSection::Header,
                received: 0,
                ..
            }
        ));
    }

    #[test]
    fn oversized_body_rejected_before_reading() {
        let cfg = FrameConfig {
            max_body_size: 2,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire(1, b"too long")), cfg);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ReplyTooLarge { size: 8, max: 2 }));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            interrupted: false,
            bytes: wire(8, b"ok"),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let frame = framed.read_frame().unwrap();
        assert_eq!(frame.body.as_ref(), b"ok");
    }

    #[test]
    fn would_block_propagates_io_error() {
        let mut framed = FrameReader::new(WouldBlockReader);
        let err = framed.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        assert_eq!(reader.config().max_body_size, u16::MAX as usize);
        let _inner = reader.into_inner();
    }

    #[test]
    fn applies_read_timeout_for_emu_stream() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || listener.accept().unwrap());

        let stream = emurpc_transport::TcpTransport::connect_addr(addr).unwrap();
        let _peer = server.join().unwrap();

        let cfg = FrameConfig {
            read_timeout: Some(std::time::Duration::from_millis(10)),
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config_emu(stream, cfg).unwrap();
        let err = reader.read_header().unwrap_err();
        assert!(matches!(
            err,
            FrameError::Io(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
        ));
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct WouldBlockReader;

    impl Read for WouldBlockReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::WouldBlock))
        }
    }
}
