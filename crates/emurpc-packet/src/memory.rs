use std::fmt::{self, Write as _};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{PacketError, Result};
use crate::packet::{command, destination, marshal_base, unmarshal_base, BodyCursor, Packet};

/// Format `data` as `Addr=0x… Len=0x… (n)` followed by rows of eight bytes,
/// each row prefixed with its address.
pub fn hexdump(address: u32, data: &[u8]) -> String {
    let mut out = format!(
        "Addr=0x{address:08X} Len=0x{len:04X} ({len}) ",
        len = data.len()
    );
    for (i, byte) in data.iter().enumerate() {
        if i % 8 == 0 {
            let _ = write!(out, "\n  {:08X} ", address.wrapping_add(i as u32));
        }
        let _ = write!(out, " {byte:02X}");
    }
    out
}

/// Read `length` bytes of emulated memory starting at `address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRead {
    address: u32,
    length: u16,
    memory: Option<Bytes>,
    reply_command: Option<u8>,
}

impl MemoryRead {
    pub fn new(address: u32, length: u16) -> Self {
        Self {
            address,
            length,
            memory: None,
            reply_command: None,
        }
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn length(&self) -> u16 {
        self.length
    }

    /// Memory returned by the last reply.
    pub fn memory(&self) -> Option<&Bytes> {
        self.memory.as_ref()
    }

    pub fn into_memory(self) -> Option<Bytes> {
        self.memory
    }
}

impl Packet for MemoryRead {
    fn command(&self) -> u8 {
        command::READ_MEMORY
    }

    fn destination(&self) -> u8 {
        destination::SYSTEM
    }

    fn marshal(&self, dst: &mut BytesMut) -> Result<()> {
        marshal_base(command::READ_MEMORY, dst);
        dst.put_u32(self.address);
        dst.put_u16(self.length);
        Ok(())
    }

    fn unmarshal(&mut self, body: Bytes) -> Result<()> {
        let mut cursor = BodyCursor::new(body);
        let reply_command = unmarshal_base(&mut cursor)?;
        self.memory = Some(cursor.take(usize::from(self.length))?);
        self.reply_command = Some(reply_command);
        Ok(())
    }

    fn reply_command(&self) -> Option<u8> {
        self.reply_command
    }
}

impl fmt::Display for MemoryRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd=0x{:02X}, ", self.reply_command.unwrap_or(command::READ_MEMORY))?;
        match &self.memory {
            Some(memory) => f.write_str(&hexdump(self.address, memory)),
            None => write!(
                f,
                "Addr=0x{:08X} Len=0x{len:04X} ({len}) <not read>",
                self.address,
                len = self.length
            ),
        }
    }
}

/// Write a block of emulated memory starting at `address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryWrite {
    address: u32,
    memory: Bytes,
    reply_command: Option<u8>,
}

impl MemoryWrite {
    /// Fails with [`PacketError::TooLarge`] when `memory` exceeds the 16-bit
    /// length field.
    pub fn new(address: u32, memory: impl Into<Bytes>) -> Result<Self> {
        let memory = memory.into();
        if memory.len() > usize::from(u16::MAX) {
            return Err(PacketError::TooLarge {
                what: "memory write",
                size: memory.len(),
                max: usize::from(u16::MAX),
            });
        }
        Ok(Self {
            address,
            memory,
            reply_command: None,
        })
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn length(&self) -> u16 {
        // Bounded at construction.
        self.memory.len() as u16
    }

    pub fn memory(&self) -> &Bytes {
        &self.memory
    }
}

impl Packet for MemoryWrite {
    fn command(&self) -> u8 {
        command::WRITE_MEMORY
    }

    fn destination(&self) -> u8 {
        destination::SYSTEM
    }

    fn marshal(&self, dst: &mut BytesMut) -> Result<()> {
        marshal_base(command::WRITE_MEMORY, dst);
        dst.put_u32(self.address);
        dst.put_u16(self.length());
        dst.extend_from_slice(&self.memory);
        Ok(())
    }

    fn unmarshal(&mut self, body: Bytes) -> Result<()> {
        let mut cursor = BodyCursor::new(body);
        self.reply_command = Some(unmarshal_base(&mut cursor)?);
        Ok(())
    }

    fn reply_command(&self) -> Option<u8> {
        self.reply_command
    }
}

impl fmt::Display for MemoryWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cmd=0x{:02X}, {}",
            self.reply_command.unwrap_or(command::WRITE_MEMORY),
            hexdump(self.address, &self.memory)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marshal(pkt: &impl Packet) -> Vec<u8> {
        let mut buf = BytesMut::new();
        pkt.marshal(&mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn read_request_layout() {
        let pkt = MemoryRead::new(0x0001_2340, 10);
        assert_eq!(pkt.destination(), 1);
        assert_eq!(
            marshal(&pkt),
            vec![0x01, 0x00, 0x00, 0x01, 0x23, 0x40, 0x00, 0x0A]
        );
    }

    #[test]
    fn read_reply_takes_declared_length() {
        let mut pkt = MemoryRead::new(0x1000, 3);
        pkt.unmarshal(Bytes::from_static(&[0x81, 0x00, b'a', b'b', b'c', b'd']))
            .unwrap();
        assert_eq!(pkt.memory().unwrap().as_ref(), b"abc");
        assert_eq!(pkt.reply_command(), Some(0x81));
        assert_eq!(pkt.command(), command::READ_MEMORY);
    }

    #[test]
    fn read_reply_shorter_than_length_is_truncated() {
        let mut pkt = MemoryRead::new(0x1000, 4);
        let err = pkt
            .unmarshal(Bytes::from_static(&[0x81, 0x00, 1, 2]))
            .unwrap_err();
        assert!(matches!(
            err,
            PacketError::TruncatedBody {
                needed: 4,
                available: 2
            }
        ));
        assert!(pkt.memory().is_none());
    }

    #[test]
    fn write_request_layout() {
        let pkt = MemoryWrite::new(0xAABBCCDD, &b"hi"[..]).unwrap();
        assert_eq!(pkt.length(), 2);
        assert_eq!(
            marshal(&pkt),
            vec![0x02, 0x00, 0xAA, 0xBB, 0xCC, 0xDD, 0x00, 0x02, b'h', b'i']
        );
    }

    #[test]
    fn write_rejects_oversized_memory() {
        let err = MemoryWrite::new(0, vec![0u8; 65_536]).unwrap_err();
        assert!(matches!(err, PacketError::TooLarge { size: 65_536, .. }));
    }

    #[test]
    fn write_reply_is_base_only() {
        let mut pkt = MemoryWrite::new(0, &b"x"[..]).unwrap();
        pkt.unmarshal(Bytes::from_static(&[0x82, 0x00])).unwrap();
        assert_eq!(pkt.reply_command(), Some(0x82));
    }

    #[test]
    fn hexdump_rows_of_eight() {
        let dump = hexdump(0x100, b"123456789\0");
        assert_eq!(
            dump,
            "Addr=0x00000100 Len=0x000A (10) \n  00000100  31 32 33 34 35 36 37 38\n  00000108  39 00"
        );
    }

    #[test]
    fn display_before_and_after_read() {
        let mut pkt = MemoryRead::new(0x20, 1);
        assert!(pkt.to_string().ends_with("<not read>"));
        pkt.unmarshal(Bytes::from_static(&[0x81, 0x00, 0xFF])).unwrap();
        assert_eq!(
            pkt.to_string(),
            "cmd=0x81, Addr=0x00000020 Len=0x0001 (1) \n  00000020  FF"
        );
    }
}
