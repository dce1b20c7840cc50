use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{PacketError, Result};
use crate::packet::{command, destination, marshal_base, unmarshal_base, BodyCursor, Packet};
use crate::param::{RpcParam, Value};
use crate::slot::{RpcSlot, ScalarRegister, SlotValue};

/// Named trap parameters in wire order.
///
/// A newly declared name goes to the front of the list, so the most
/// recently declared parameter is sent first. Re-declaring an existing name
/// replaces its parameter without moving it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterList {
    entries: Vec<(String, RpcParam)>,
}

impl ParameterList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, param: RpcParam) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = param,
            None => self.entries.insert(0, (name, param)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RpcParam> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    /// Decoded value of a declared parameter.
    pub fn value(&self, name: &str) -> Result<&Value> {
        self.get(name)
            .map(RpcParam::value)
            .ok_or_else(|| PacketError::UnknownParameter(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in wire order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RpcParam)> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p))
    }

    /// Append `count ‖ parameters`.
    pub(crate) fn marshal(&self, dst: &mut BytesMut) -> Result<()> {
        let count = u16::try_from(self.entries.len()).map_err(|_| PacketError::TooLarge {
            what: "parameter count",
            size: self.entries.len(),
            max: usize::from(u16::MAX),
        })?;
        dst.put_u16(count);
        for (_, param) in &self.entries {
            param.marshal(dst);
        }
        Ok(())
    }

    /// Read `count ‖ parameters` positionally into the declared parameters.
    pub(crate) fn unmarshal(&mut self, body: &mut BodyCursor) -> Result<()> {
        let count = usize::from(body.u16()?);
        if count != self.entries.len() {
            return Err(PacketError::ProtocolMismatch {
                declared: self.entries.len(),
                received: count,
            });
        }
        for (name, param) in &mut self.entries {
            let wire_size = body.peek(2).map(|h| usize::from(h[1])).unwrap_or(0);
            let raw = body.take((wire_size + 2).min(body.remaining()))?;
            param
                .unmarshal(&raw)
                .map_err(|err| match err {
                    PacketError::MalformedParameter(reason) => {
                        PacketError::MalformedParameter(format!("{name}: {reason}"))
                    }
                    other => other,
                })?;
            trace!(name = %name, value = %param.value(), "decoded parameter");
        }
        Ok(())
    }
}

impl fmt::Display for ParameterList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Params(")?;
        for (name, param) in &self.entries {
            write!(f, " {name}={param}")?;
        }
        f.write_str(" )")
    }
}

/// Trap call returning results in the A0 and D0 registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcPacket {
    trap: u16,
    a0: u32,
    d0: u32,
    params: ParameterList,
    reply_command: Option<u8>,
}

impl RpcPacket {
    pub fn new(trap: u16) -> Self {
        Self {
            trap,
            a0: 0,
            d0: 0,
            params: ParameterList::new(),
            reply_command: None,
        }
    }

    pub fn trap(&self) -> u16 {
        self.trap
    }

    pub fn a0(&self) -> u32 {
        self.a0
    }

    pub fn d0(&self) -> u32 {
        self.d0
    }

    pub fn params(&self) -> &ParameterList {
        &self.params
    }

    /// Declare or replace a parameter.
    pub fn param(&mut self, name: impl Into<String>, param: RpcParam) -> &mut Self {
        self.params.insert(name, param);
        self
    }

    /// Decoded value of a declared parameter.
    pub fn value(&self, name: &str) -> Result<&Value> {
        self.params.value(name)
    }

    /// Write a slot. Any name other than A0 and D0 is a parameter.
    pub fn set(&mut self, slot: impl Into<RpcSlot>, value: impl Into<SlotValue>) -> Result<()> {
        match (slot.into(), value.into()) {
            (RpcSlot::Scalar(ScalarRegister::A0), SlotValue::Word(v)) => self.a0 = v,
            (RpcSlot::Scalar(ScalarRegister::D0), SlotValue::Word(v)) => self.d0 = v,
            (RpcSlot::Parameter(name), SlotValue::Param(p)) => self.params.insert(name, p),
            (slot @ RpcSlot::Scalar(_), SlotValue::Param(_)) => {
                return Err(unsupported(&slot, "scalar registers take a word"))
            }
            (slot @ RpcSlot::Parameter(_), SlotValue::Word(_)) => {
                return Err(unsupported(&slot, "parameters take a typed RpcParam"))
            }
        }
        Ok(())
    }

    /// Read a slot.
    pub fn get(&self, slot: impl Into<RpcSlot>) -> Result<SlotValue> {
        match slot.into() {
            RpcSlot::Scalar(ScalarRegister::A0) => Ok(SlotValue::Word(self.a0)),
            RpcSlot::Scalar(ScalarRegister::D0) => Ok(SlotValue::Word(self.d0)),
            RpcSlot::Parameter(name) => self
                .params
                .get(&name)
                .cloned()
                .map(SlotValue::Param)
                .ok_or(PacketError::UnknownParameter(name)),
        }
    }
}

pub(crate) fn unsupported(slot: &impl fmt::Display, reason: &'static str) -> PacketError {
    PacketError::UnsupportedSlot {
        slot: slot.to_string(),
        reason,
    }
}

impl Packet for RpcPacket {
    fn command(&self) -> u8 {
        command::RPC
    }

    fn destination(&self) -> u8 {
        destination::SYSTEM
    }

    fn marshal(&self, dst: &mut BytesMut) -> Result<()> {
        marshal_base(command::RPC, dst);
        dst.put_u16(self.trap);
        dst.put_u32(self.d0);
        dst.put_u32(self.a0);
        self.params.marshal(dst)
    }

    fn unmarshal(&mut self, body: Bytes) -> Result<()> {
        let mut cursor = BodyCursor::new(body);
        let reply_command = unmarshal_base(&mut cursor)?;
        self.trap = cursor.u16()?;
        self.d0 = cursor.u32()?;
        self.a0 = cursor.u32()?;
        self.reply_command = Some(reply_command);
        self.params.unmarshal(&mut cursor)
    }

    fn reply_command(&self) -> Option<u8> {
        self.reply_command
    }
}

impl fmt::Display for RpcPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<rpc packet, cmd=0x{:02X}, trap=0x{:04X}, a0=0x{:08X}, d0=0x{:08X}({}), {} >",
            self.reply_command.unwrap_or(command::RPC),
            self.trap,
            self.a0,
            self.d0,
            self.d0,
            self.params
        )
    }
}
