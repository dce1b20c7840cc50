use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use bytes::BytesMut;
use emurpc_frame::{Frame, FrameReader, FrameWriter, Integrity, Route};
use emurpc_packet::Packet;
use emurpc_transport::EmuStream;
use tracing::{debug, trace, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};

/// Where a call currently is in its round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Sending,
    AwaitingHeader,
    AwaitingBody,
    AwaitingFooter,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallState::Idle => "idle",
            CallState::Sending => "sending",
            CallState::AwaitingHeader => "awaiting-header",
            CallState::AwaitingBody => "awaiting-body",
            CallState::AwaitingFooter => "awaiting-footer",
        };
        f.write_str(name)
    }
}

/// A connection to a running emulator that performs one call at a time.
///
/// Each [`call`](Session::call) marshals a packet, frames it with the
/// current transaction id, waits for the complete reply frame and decodes
/// the reply back into the same packet.
///
/// There is no resynchronization: once a request has gone out, any failure
/// (short read, bad reply, undecodable body) leaves the session refusing
/// further calls with [`SessionError::Poisoned`]. Errors raised while
/// marshaling, before anything is sent, leave the session usable.
pub struct Session<R = EmuStream, W = EmuStream> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    transaction_id: u8,
    source: u8,
    packet_type: u8,
    integrity: Arc<dyn Integrity>,
    state: CallState,
    poisoned: Option<String>,
    body: BytesMut,
}

impl<R: Read, W: Write> Session<R, W> {
    /// Assemble a session from an already connected reader/writer pair.
    pub fn from_parts(reader: FrameReader<R>, writer: FrameWriter<W>, config: SessionConfig) -> Self {
        Self {
            reader,
            writer,
            transaction_id: config.initial_transaction_id,
            source: config.source,
            packet_type: config.packet_type,
            integrity: config.integrity,
            state: CallState::Idle,
            poisoned: None,
            body: BytesMut::new(),
        }
    }

    /// Send `packet` and decode the reply into it (blocking).
    pub fn call<P: Packet + ?Sized>(&mut self, packet: &mut P) -> Result<()> {
        if let Some(reason) = &self.poisoned {
            return Err(SessionError::Poisoned(reason.clone()));
        }

        self.body.clear();
        packet.marshal(&mut self.body)?;
        let tid = self.transaction_id;
        let route = Route {
            destination: packet.destination(),
            source: self.source,
            packet_type: self.packet_type,
        };
        let request = Frame::new(route, tid, self.body.split().freeze(), self.integrity.as_ref())?;
        debug!(
            command = packet.command(),
            destination = route.destination,
            transaction_id = tid,
            body_length = request.body.len(),
            "sending call"
        );

        let reply = match self.exchange(&request) {
            Ok(reply) => reply,
            Err(err) => return Err(self.poison(err)),
        };
        self.transaction_id = tid.wrapping_add(1);

        if reply.header.transaction_id != tid {
            trace!(
                sent = tid,
                received = reply.header.transaction_id,
                "reply carries a different transaction id"
            );
        }

        match packet.unmarshal(reply.body) {
            Ok(()) => {
                debug!(
                    transaction_id = tid,
                    reply_command = packet.reply_command(),
                    "call complete"
                );
                Ok(())
            }
            Err(err) => Err(self.poison(err.into())),
        }
    }

    fn exchange(&mut self, request: &Frame) -> Result<Frame> {
        self.transition(CallState::Sending);
        self.writer.write_frame(request)?;

        self.transition(CallState::AwaitingHeader);
        let header = self.reader.read_header()?;
        self.integrity.verify_header(&header)?;

        self.transition(CallState::AwaitingBody);
        let body = self.reader.read_body(usize::from(header.body_length))?;

        self.transition(CallState::AwaitingFooter);
        let footer = self.reader.read_footer()?;
        self.integrity.verify_body(&body, footer)?;

        self.transition(CallState::Idle);
        Ok(Frame {
            header,
            body,
            footer,
        })
    }

    fn transition(&mut self, next: CallState) {
        trace!(from = %self.state, to = %next, "call state");
        self.state = next;
    }

    fn poison(&mut self, err: SessionError) -> SessionError {
        warn!(state = %self.state, error = %err, "call failed; session poisoned");
        self.poisoned = Some(format!("{err} (while {})", self.state));
        err
    }

    /// Transaction id the next call will carry.
    pub fn transaction_id(&self) -> u8 {
        self.transaction_id
    }

    /// State of the current call, or where the failed call stopped.
    pub fn state(&self) -> CallState {
        self.state
    }

    /// Whether an earlier failure has made this session unusable.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// Borrow the frame reader.
    pub fn reader(&self) -> &FrameReader<R> {
        &self.reader
    }

    /// Borrow the frame writer.
    pub fn writer(&self) -> &FrameWriter<W> {
        &self.writer
    }

    /// Consume the session and return the reader/writer pair.
    pub fn into_parts(self) -> (FrameReader<R>, FrameWriter<W>) {
        (self.reader, self.writer)
    }
}

impl Session<EmuStream, EmuStream> {
    /// Shut the connection down.
    pub fn close(self) -> Result<()> {
        self.writer.get_ref().shutdown()?;
        Ok(())
    }

    /// Address of the connected emulator.
    pub fn peer_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.writer.get_ref().peer_addr()?)
    }
}

impl<R, W> fmt::Debug for Session<R, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("transaction_id", &self.transaction_id)
            .field("state", &self.state)
            .field("poisoned", &self.poisoned)
            .finish_non_exhaustive()
    }
}
