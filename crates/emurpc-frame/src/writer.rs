use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use emurpc_transport::EmuStream;
use tracing::trace;

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::reader::transport_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Writes complete frames to any `Write` stream.
///
/// Header, body and footer go out as one buffered write.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.body.len() > self.config.max_body_size {
            return Err(FrameError::BodyTooLarge {
                size: frame.body.len(),
                max: self.config.max_body_size,
            });
        }

        self.buf.clear();
        encode_frame(frame, &mut self.buf)?;
        trace!(
            transaction_id = frame.header.transaction_id,
            body_length = frame.body.len(),
            "writing frame"
        );

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<EmuStream> {
    /// Create a frame writer for `EmuStream` and apply write timeout from config.
    pub fn with_config_emu(inner: EmuStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    use bytes::{Bytes, BytesMut};
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;
    use crate::codec::{decode_frame, Route, FOOTER_SIZE, HEADER_SIZE};
    use crate::integrity::Placeholder;
    use crate::reader::FrameReader;

    const ROUTE: Route = Route {
        destination: 14,
        source: 1,
        packet_type: 0,
    };

    fn frame(tid: u8, body: &'static [u8]) -> Frame {
        Frame::new(ROUTE, tid, Bytes::from_static(body), &Placeholder).unwrap()
    }

    #[test]
    fn write_single_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_frame(&frame(1, b"hello")).unwrap();

        let mut wire = BytesMut::from(writer.into_inner().into_inner().as_slice());
        assert_eq!(wire.len(), HEADER_SIZE + 5 + FOOTER_SIZE);
        assert_eq!(&wire[..3], &[0xBE, 0xEF, 0xED]);
        assert_eq!(wire[3], 14);

        let decoded = decode_frame(&mut wire, usize::MAX).unwrap().unwrap();
        assert_eq!(decoded.body.as_ref(), b"hello");
    }

    #[derive(Clone, Default)]
    struct LogCapture(Arc<Mutex<Vec<u8>>>);

    impl Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogCapture {
        type Writer = LogCapture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn trace_reports_body_length_only() {
        let logs = LogCapture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(logs.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut writer = FrameWriter::new(Vec::new());
            writer.write_frame(&frame(3, b"hello")).unwrap();
        });

        let out = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("writing frame"), "{out}");
        assert!(out.contains("body_length=5"), "{out}");
    }

    #[test]
    fn write_multiple_frames() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_frame(&frame(1, b"one")).unwrap();
        writer.write_frame(&frame(2, b"two")).unwrap();

        let mut wire = BytesMut::from(writer.into_inner().into_inner().as_slice());
        let f1 = decode_frame(&mut wire, usize::MAX).unwrap().unwrap();
        let f2 = decode_frame(&mut wire, usize::MAX).unwrap().unwrap();
        assert_eq!(f1.header.transaction_id, 1);
        assert_eq!(f2.header.transaction_id, 2);
        assert_eq!(f2.body.as_ref(), b"two");
    }

    #[test]
    fn body_over_limit_rejected() {
        let cfg = FrameConfig {
            max_body_size: 4,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);

        let err = writer.write_frame(&frame(1, b"oversized")).unwrap_err();
        assert!(matches!(err, FrameError::BodyTooLarge { size: 9, max: 4 }));
    }

    #[test]
    fn interrupted_sink_still_gets_whole_frame() {
        let mut writer = FrameWriter::new(FlakySink::default());
        writer.write_frame(&frame(5, b"retry")).unwrap();

        let sink = writer.into_inner();
        assert_eq!(sink.interrupts, 2);
        assert!(sink.flushed);
        assert_eq!(sink.data.len(), HEADER_SIZE + 5 + FOOTER_SIZE);
        assert_eq!(sink.data[8], 5);
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ClosedPeer);
        let err = writer.write_frame(&frame(1, b"x")).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn written_bytes_read_back() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_frame(&frame(3, b"z")).unwrap();

        let wire = writer.into_inner().into_inner();
        let mut reader = FrameReader::new(Cursor::new(wire));
        let read = reader.read_frame().unwrap();
        assert_eq!(read, frame(3, b"z"));
    }

    #[test]
    fn roundtrip_over_tcp() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = FrameReader::new(stream);
            reader.read_frame().unwrap()
        });

        let stream = emurpc_transport::TcpTransport::connect_addr(addr).unwrap();
        let mut writer = FrameWriter::with_config_emu(stream, FrameConfig::default()).unwrap();
        writer.write_frame(&frame(11, b"tcp")).unwrap();

        let received = server.join().unwrap();
        assert_eq!(received.header.transaction_id, 11);
        assert_eq!(received.body.as_ref(), b"tcp");
    }

    /// Interrupts the first write and the first flush.
    #[derive(Default)]
    struct FlakySink {
        interrupts: usize,
        flushed: bool,
        data: Vec<u8>,
    }

    impl Write for FlakySink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.interrupts == 0 {
                self.interrupts += 1;
                return Err(ErrorKind::Interrupted.into());
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if self.interrupts == 1 {
                self.interrupts += 1;
                return Err(ErrorKind::Interrupted.into());
            }
            self.flushed = true;
            Ok(())
        }
    }

    /// A peer whose receive window never opens.
    struct ClosedPeer;

    impl Write for ClosedPeer {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
