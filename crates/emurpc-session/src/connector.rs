use emurpc_frame::{FrameReader, FrameWriter};
use emurpc_transport::TcpTransport;
use tracing::info;

use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::Session;

/// Connect to the emulator at `transport`'s endpoint with default settings.
pub fn connect(transport: &TcpTransport) -> Result<Session> {
    connect_with_config(transport, SessionConfig::default())
}

/// Connect with explicit configuration.
pub fn connect_with_config(transport: &TcpTransport, config: SessionConfig) -> Result<Session> {
    let stream = transport.connect()?;
    let reader_stream = stream.try_clone()?;

    let reader = FrameReader::with_config_emu(reader_stream, config.frame.clone())?;
    let writer = FrameWriter::with_config_emu(stream, config.frame.clone())?;
    info!(
        endpoint = %transport.endpoint(),
        integrity = ?config.integrity,
        "session open"
    );

    Ok(Session::from_parts(reader, writer, config))
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;

    use emurpc_frame::{Frame, Placeholder, Route};
    use emurpc_packet::{MemoryRead, Packet};

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn connect_and_call() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = FrameReader::new(stream.try_clone().unwrap());
            let mut writer = FrameWriter::new(stream);
            let request = reader.read_frame().unwrap();
            let route = Route {
                destination: request.header.source,
                source: request.header.destination,
                packet_type: 0,
            };
            let reply = Frame::new(
                route,
                request.header.transaction_id,
                &[0x81, 0x00, 0xDE, 0xAD][..],
                &Placeholder,
            )
            .unwrap();
            writer.write_frame(&reply).unwrap();
            request
        });

        let transport = TcpTransport::new(addr.ip().to_string(), addr.port());
        let mut session = connect(&transport).unwrap();
        assert_eq!(session.peer_addr().unwrap(), addr);

        let mut read = MemoryRead::new(0x3000, 2);
        session.call(&mut read).unwrap();
        assert_eq!(read.memory().unwrap().as_ref(), &[0xDE, 0xAD]);
        assert_eq!(read.reply_command(), Some(0x81));

        let request = server.join().unwrap();
        assert_eq!(request.body.as_ref(), &[0x01, 0x00, 0, 0, 0x30, 0, 0, 2]);
        session.close().unwrap();
    }

    #[test]
    fn connect_refused_is_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = TcpTransport::new("127.0.0.1", addr.port());
        let err = connect(&transport).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportFailure);
    }
}
