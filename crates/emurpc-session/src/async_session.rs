use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use emurpc_frame::{EmuFrameCodec, Frame, FrameError, Integrity, Route};
use emurpc_packet::Packet;
use emurpc_transport::TcpTransport;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};

/// Async counterpart of [`crate::Session`] over a tokio TCP stream.
///
/// A call is one future covering send and receive. If that future is dropped
/// before it completes, the connection may hold half a frame, so the session
/// refuses every later call.
pub struct AsyncSession {
    framed: Framed<TcpStream, EmuFrameCodec>,
    transaction_id: u8,
    source: u8,
    packet_type: u8,
    integrity: Arc<dyn Integrity>,
    read_timeout: Option<Duration>,
    in_flight: bool,
    poisoned: Option<String>,
}

/// Connect asynchronously with explicit configuration.
pub async fn connect_async(transport: &TcpTransport, config: SessionConfig) -> Result<AsyncSession> {
    let stream = transport.connect_async().await?;
    info!(endpoint = %transport.endpoint(), "async session open");
    Ok(AsyncSession::new(stream, config))
}

impl AsyncSession {
    pub fn new(stream: TcpStream, config: SessionConfig) -> Self {
        let codec = EmuFrameCodec::new(config.frame.max_body_size, Arc::clone(&config.integrity));
        Self {
            framed: Framed::new(stream, codec),
            transaction_id: config.initial_transaction_id,
            source: config.source,
            packet_type: config.packet_type,
            integrity: config.integrity,
            read_timeout: config.frame.read_timeout,
            in_flight: false,
            poisoned: None,
        }
    }

    /// Send `packet` and decode the reply into it.
    pub async fn call<P: Packet + ?Sized>(&mut self, packet: &mut P) -> Result<()> {
        if self.in_flight {
            self.poisoned
                .get_or_insert_with(|| "previous call was cancelled mid-frame".to_string());
            self.in_flight = false;
        }
        if let Some(reason) = &self.poisoned {
            return Err(SessionError::Poisoned(reason.clone()));
        }

        let mut body = BytesMut::new();
        packet.marshal(&mut body)?;
        let tid = self.transaction_id;
        let route = Route {
            destination: packet.destination(),
            source: self.source,
            packet_type: self.packet_type,
        };
        let request = Frame::new(route, tid, body.freeze(), self.integrity.as_ref())?;
        debug!(
            command = packet.command(),
            transaction_id = tid,
            "sending async call"
        );

        self.in_flight = true;
        let reply = self.exchange(request).await;
        self.in_flight = false;

        let reply = match reply {
            Ok(reply) => reply,
            Err(err) => return Err(self.poison(err)),
        };
        self.transaction_id = tid.wrapping_add(1);
        packet
            .unmarshal(reply.body)
            .map_err(|err| self.poison(err.into()))
    }

    async fn exchange(&mut self, request: Frame) -> Result<Frame> {
        self.framed.send(request).await?;
        let next = match self.read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.framed.next())
                .await
                .map_err(|_| SessionError::Timeout(timeout))?,
            None => self.framed.next().await,
        };
        match next {
            Some(reply) => Ok(reply?),
            None => Err(FrameError::ConnectionClosed.into()),
        }
    }

    fn poison(&mut self, err: SessionError) -> SessionError {
        warn!(error = %err, "async call failed; session poisoned");
        self.poisoned = Some(err.to_string());
        err
    }

    /// Transaction id the next call will carry.
    pub fn transaction_id(&self) -> u8 {
        self.transaction_id
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some() || self.in_flight
    }

    /// Consume the session and return the underlying stream.
    pub fn into_inner(self) -> TcpStream {
        self.framed.into_inner()
    }
}

impl std::fmt::Debug for AsyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncSession")
            .field("transaction_id", &self.transaction_id)
            .field("in_flight", &self.in_flight)
            .field("poisoned", &self.poisoned)
            .finish_non_exhaustive()
    }
}
