use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{PacketError, Result};

/// Command codes carried in the first body byte.
pub mod command {
    pub const READ_MEMORY: u8 = 0x01;
    pub const WRITE_MEMORY: u8 = 0x02;
    pub const RPC: u8 = 0x0A;
    pub const RPC2: u8 = 0x70;
}

/// Frame destination bytes.
pub mod destination {
    /// Memory access and RPC-v1.
    pub const SYSTEM: u8 = 1;
    pub const RPC2: u8 = 14;
}

/// A request that can be sent through a session.
///
/// `marshal` produces the frame body for the request. `unmarshal` takes the
/// reply body and rewrites the packet's fields in place, so the same value
/// carries both the request and its results.
pub trait Packet: fmt::Debug + Send {
    /// Command code sent in the request body.
    fn command(&self) -> u8;

    /// Frame destination byte.
    fn destination(&self) -> u8;

    /// Append the request body to `dst`.
    fn marshal(&self, dst: &mut BytesMut) -> Result<()>;

    /// Decode a reply body into this packet.
    fn unmarshal(&mut self, body: Bytes) -> Result<()>;

    /// Command code of the last decoded reply.
    fn reply_command(&self) -> Option<u8>;
}

pub(crate) fn marshal_base(command: u8, dst: &mut BytesMut) {
    dst.put_u8(command);
    dst.put_u8(0);
}

/// Read the base header and return the reply's command code.
pub(crate) fn unmarshal_base(body: &mut BodyCursor) -> Result<u8> {
    let command = body.u8()?;
    body.u8()?;
    Ok(command)
}

/// Bounds-checked big-endian reads over a reply body.
pub(crate) struct BodyCursor {
    buf: Bytes,
}

impl BodyCursor {
    pub(crate) fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn need(&self, n: usize) -> Result<()> {
        if self.buf.len() < n {
            return Err(PacketError::TruncatedBody {
                needed: n,
                available: self.buf.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        self.need(2)?;
        Ok(self.buf.get_u16())
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<Bytes> {
        self.need(n)?;
        Ok(self.buf.split_to(n))
    }

    pub(crate) fn peek(&self, n: usize) -> Result<&[u8]> {
        self.need(n)?;
        Ok(&self.buf[..n])
    }

    pub(crate) fn rest(&mut self) -> Bytes {
        std::mem::take(&mut self.buf)
    }
}

/// A packet with only the base header and an opaque payload.
///
/// Useful for commands without a dedicated variant. The whole reply after
/// the base header is kept as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    command: u8,
    destination: u8,
    payload: Bytes,
    reply_command: Option<u8>,
    reply: Bytes,
}

impl RawPacket {
    pub fn new(command: u8, destination: u8) -> Self {
        Self {
            command,
            destination,
            payload: Bytes::new(),
            reply_command: None,
            reply: Bytes::new(),
        }
    }

    /// Bytes sent after the base header.
    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Reply bytes after the base header.
    pub fn reply(&self) -> &Bytes {
        &self.reply
    }
}

impl Packet for RawPacket {
    fn command(&self) -> u8 {
        self.command
    }

    fn destination(&self) -> u8 {
        self.destination
    }

    fn marshal(&self, dst: &mut BytesMut) -> Result<()> {
        marshal_base(self.command, dst);
        dst.extend_from_slice(&self.payload);
        Ok(())
    }

    fn unmarshal(&mut self, body: Bytes) -> Result<()> {
        let mut cursor = BodyCursor::new(body);
        self.reply_command = Some(unmarshal_base(&mut cursor)?);
        self.reply = cursor.rest();
        Ok(())
    }

    fn reply_command(&self) -> Option<u8> {
        self.reply_command
    }
}

impl fmt::Display for RawPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<raw packet, cmd=0x{:02X}, payload={} bytes, reply={} bytes>",
            self.reply_command.unwrap_or(self.command),
            self.payload.len(),
            self.reply.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_marshal_is_base_plus_payload() {
        let pkt = RawPacket::new(0x7F, destination::SYSTEM).with_payload(vec![1, 2, 3]);
        let mut buf = BytesMut::new();
        pkt.marshal(&mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0x7F, 0x00, 1, 2, 3]);
    }

    #[test]
    fn raw_unmarshal_keeps_reply_command_separately() {
        let mut pkt = RawPacket::new(0x7F, destination::SYSTEM);
        pkt.unmarshal(Bytes::from_static(&[0xFF, 0x00, 9, 8])).unwrap();

        assert_eq!(pkt.command(), 0x7F);
        assert_eq!(pkt.reply_command(), Some(0xFF));
        assert_eq!(pkt.reply().as_ref(), &[9, 8]);
    }

    #[test]
    fn base_header_needs_two_bytes() {
        let mut pkt = RawPacket::new(0x7F, destination::SYSTEM);
        let err = pkt.unmarshal(Bytes::from_static(&[0x7F])).unwrap_err();
        assert!(matches!(
            err,
            PacketError::TruncatedBody {
                needed: 1,
                available: 0
            }
        ));
    }

    #[test]
    fn cursor_reads_big_endian() {
        let mut cursor = BodyCursor::new(Bytes::from_static(&[
            0x12, 0x34, 0xDE, 0xAD, 0xBE, 0xEF, 0x01,
        ]));
        assert_eq!(cursor.u16().unwrap(), 0x1234);
        assert_eq!(cursor.u32().unwrap(), 0xDEADBEEF);
        assert_eq!(cursor.remaining(), 1);
        assert!(matches!(
            cursor.take(2),
            Err(PacketError::TruncatedBody {
                needed: 2,
                available: 1
            })
        ));
    }
}
