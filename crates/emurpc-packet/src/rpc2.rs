use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{PacketError, Result};
use crate::packet::{command, destination, marshal_base, unmarshal_base, BodyCursor, Packet};
use crate::param::{RpcParam, Value};
use crate::register::{Register, RegisterSet};
use crate::rpc::{unsupported, ParameterList};
use crate::slot::{ScalarRegister, Slot, SlotValue};

/// Trap call carrying an exception code and an arbitrary register set.
///
/// Registers travel behind a 16-bit mask. On the way out the populated
/// registers are written in canonical order (`D7` first); replies list them
/// starting from the least significant mask bit (`A0` first). Decoding only
/// overwrites the registers present in the reply mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rpc2Packet {
    trap: u16,
    a0: u32,
    d0: u32,
    exception: u16,
    registers: RegisterSet,
    params: ParameterList,
    reply_command: Option<u8>,
}

impl Rpc2Packet {
    pub fn new(trap: u16) -> Self {
        Self {
            trap,
            a0: 0,
            d0: 0,
            exception: 0,
            registers: RegisterSet::new(),
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

    pub fn exception(&self) -> u16 {
        self.exception
    }

    pub fn registers(&self) -> &RegisterSet {
        &self.registers
    }

    pub fn params(&self) -> &ParameterList {
        &self.params
    }

    /// Declare or replace a parameter.
    pub fn param(&mut self, name: impl Into<String>, param: RpcParam) -> &mut Self {
        self.params.insert(name, param);
        self
    }

    /// Populate a register for the request.
    pub fn register(&mut self, reg: Register, value: u32) -> &mut Self {
        self.registers.set(reg, value);
        self
    }

    /// Decoded value of a declared parameter.
    pub fn value(&self, name: &str) -> Result<&Value> {
        self.params.value(name)
    }

    /// Write a slot.
    pub fn set(&mut self, slot: impl Into<Slot>, value: impl Into<SlotValue>) -> Result<()> {
        match (slot.into(), value.into()) {
            (Slot::Scalar(ScalarRegister::A0), SlotValue::Word(v)) => self.a0 = v,
            (Slot::Scalar(ScalarRegister::D0), SlotValue::Word(v)) => self.d0 = v,
            (Slot::Register(reg), SlotValue::Word(v)) => self.registers.set(reg, v),
            (slot @ Slot::Exception, SlotValue::Word(v)) => {
                self.exception = u16::try_from(v)
                    .map_err(|_| unsupported(&slot, "exception codes are 16-bit"))?;
            }
            (Slot::Parameter(name), SlotValue::Param(p)) => self.params.insert(name, p),
            (slot @ Slot::Parameter(_), SlotValue::Word(_)) => {
                return Err(unsupported(&slot, "parameters take a typed RpcParam"))
            }
            (slot, SlotValue::Param(_)) => {
                return Err(unsupported(&slot, "registers take a word"))
            }
        }
        Ok(())
    }

    /// Read a slot.
    pub fn get(&self, slot: impl Into<Slot>) -> Result<SlotValue> {
        match slot.into() {
            Slot::Scalar(ScalarRegister::A0) => Ok(SlotValue::Word(self.a0)),
            Slot::Scalar(ScalarRegister::D0) => Ok(SlotValue::Word(self.d0)),
            Slot::Register(reg) => self
                .registers
                .get(reg)
                .map(SlotValue::Word)
                .ok_or_else(|| PacketError::UnknownRegister(reg.to_string())),
            Slot::Exception => Ok(SlotValue::Word(u32::from(self.exception))),
            Slot::Parameter(name) => self
                .params
                .get(&name)
                .cloned()
                .map(SlotValue::Param)
                .ok_or(PacketError::UnknownParameter(name)),
        }
    }
}

impl Packet for Rpc2Packet {
    fn command(&self) -> u8 {
        command::RPC2
    }

    fn destination(&self) -> u8 {
        destination::RPC2
    }

    fn marshal(&self, dst: &mut BytesMut) -> Result<()> {
        marshal_base(command::RPC2, dst);
        dst.put_u16(self.trap);
        dst.put_u32(self.d0);
        dst.put_u32(self.a0);
        dst.put_u16(self.exception);
        dst.put_u16(self.registers.mask());
        for (_, value) in self.registers.iter() {
            dst.put_u32(value);
        }
        self.params.marshal(dst)
    }

    fn unmarshal(&mut self, body: Bytes) -> Result<()> {
        let mut cursor = BodyCursor::new(body);
        let reply_command = unmarshal_base(&mut cursor)?;
        self.trap = cursor.u16()?;
        self.d0 = cursor.u32()?;
        self.a0 = cursor.u32()?;
        self.exception = cursor.u16()?;
        let mask = cursor.u16()?;
        for reg in Register::ALL.into_iter().rev() {
            if mask & reg.mask_bit() != 0 {
                let value = cursor.u32()?;
                self.registers.set(reg, value);
            }
        }
        self.reply_command = Some(reply_command);
        self.params.unmarshal(&mut cursor)
    }

    fn reply_command(&self) -> Option<u8> {
        self.reply_command
    }
}

impl fmt::Display for Rpc2Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<rpc2 packet, cmd=0x{:02X}, trap=0x{:04X}, a0=0x{:08X}, d0=0x{:08X}({}), exception=0x{:04X}, registers={{",
            self.reply_command.unwrap_or(command::RPC2),
            self.trap,
            self.a0,
            self.d0,
            self.d0,
            self.exception
        )?;
        for (i, (reg, value)) in self.registers.iter().enumerate() {
            let sep = if i == 0 { "" } else { ", " };
            write!(f, "{sep}{reg}=0x{value:08X}")?;
        }
        write!(f, "}}, {} >", self.params)
    }
}
