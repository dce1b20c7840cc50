use std::fmt;

use crate::param::{RpcParam, Value};
use crate::register::Register;

/// The two registers every RPC packet carries as plain scalar fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarRegister {
    A0,
    D0,
}

/// A named field of an RPC packet, resolved once from its name.
///
/// `"A0"` and `"D0"` always address the scalar fields, even on RPC-v2
/// packets; the other register names address the register set, and
/// `"exception"` addresses the RPC-v2 exception code. Any other name is a
/// trap parameter. Register and exception names match case-insensitively,
/// parameter names are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Scalar(ScalarRegister),
    Register(Register),
    Exception,
    Parameter(String),
}

impl Slot {
    pub fn parse(name: &str) -> Slot {
        if name.eq_ignore_ascii_case("A0") {
            return Slot::Scalar(ScalarRegister::A0);
        }
        if name.eq_ignore_ascii_case("D0") {
            return Slot::Scalar(ScalarRegister::D0);
        }
        if name.eq_ignore_ascii_case("exception") {
            return Slot::Exception;
        }
        match name.parse::<Register>() {
            Ok(reg) => Slot::Register(reg),
            Err(_) => Slot::Parameter(name.to_string()),
        }
    }

    /// Shorthand for a parameter slot.
    pub fn param(name: impl Into<String>) -> Slot {
        Slot::Parameter(name.into())
    }
}

impl From<&str> for Slot {
    fn from(name: &str) -> Self {
        Slot::parse(name)
    }
}

impl From<Register> for Slot {
    fn from(reg: Register) -> Self {
        match reg {
            Register::A0 => Slot::Scalar(ScalarRegister::A0),
            Register::D0 => Slot::Scalar(ScalarRegister::D0),
            other => Slot::Register(other),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Scalar(ScalarRegister::A0) => f.write_str("A0"),
            Slot::Scalar(ScalarRegister::D0) => f.write_str("D0"),
            Slot::Register(reg) => write!(f, "{reg}"),
            Slot::Exception => f.write_str("exception"),
            Slot::Parameter(name) => f.write_str(name),
        }
    }
}

/// A named field of an RPC-v1 packet.
///
/// Only `"A0"` and `"D0"` are special on RPC-v1. Register names and
/// `"exception"` are ordinary parameter names there and are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcSlot {
    Scalar(ScalarRegister),
    Parameter(String),
}

impl RpcSlot {
    pub fn parse(name: &str) -> RpcSlot {
        match Slot::parse(name) {
            Slot::Scalar(reg) => RpcSlot::Scalar(reg),
            _ => RpcSlot::Parameter(name.to_string()),
        }
    }
}

impl From<&str> for RpcSlot {
    fn from(name: &str) -> Self {
        RpcSlot::parse(name)
    }
}

impl From<Slot> for RpcSlot {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::Scalar(reg) => RpcSlot::Scalar(reg),
            Slot::Parameter(name) => RpcSlot::Parameter(name),
            other => RpcSlot::Parameter(other.to_string()),
        }
    }
}

impl From<Register> for RpcSlot {
    fn from(reg: Register) -> Self {
        RpcSlot::from(Slot::from(reg))
    }
}

impl fmt::Display for RpcSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcSlot::Scalar(reg) => write!(f, "{}", Slot::Scalar(*reg)),
            RpcSlot::Parameter(name) => f.write_str(name),
        }
    }
}

/// Value written to or read from a [`Slot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotValue {
    /// Scalar, register or exception value.
    Word(u32),
    /// A whole typed parameter.
    Param(RpcParam),
}

impl SlotValue {
    /// Integer content: the word itself, or an integer parameter's value.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            SlotValue::Word(v) => Some(*v),
            SlotValue::Param(p) => p.value().as_u32(),
        }
    }

    /// Decoded value of a parameter slot.
    pub fn value(&self) -> Value {
        match self {
            SlotValue::Word(v) => Value::Int(*v),
            SlotValue::Param(p) => p.value().clone(),
        }
    }
}

impl From<u32> for SlotValue {
    fn from(v: u32) -> Self {
        SlotValue::Word(v)
    }
}

impl From<RpcParam> for SlotValue {
    fn from(p: RpcParam) -> Self {
        SlotValue::Param(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_names_take_precedence() {
        assert_eq!(Slot::parse("A0"), Slot::Scalar(ScalarRegister::A0));
        assert_eq!(Slot::parse("d0"), Slot::Scalar(ScalarRegister::D0));
        assert_eq!(Slot::from(Register::A0), Slot::Scalar(ScalarRegister::A0));
    }

    #[test]
    fn other_registers_and_exception() {
        assert_eq!(Slot::parse("a7"), Slot::Register(Register::A7));
        assert_eq!(Slot::parse("D3"), Slot::Register(Register::D3));
        assert_eq!(Slot::parse("Exception"), Slot::Exception);
        assert_eq!(Slot::parse("EXCEPTION"), Slot::Exception);
    }

    #[test]
    fn everything_else_is_a_parameter() {
        assert_eq!(Slot::parse("dbID"), Slot::param("dbID"));
        assert_eq!(Slot::parse("D8"), Slot::param("D8"));
        assert_eq!(Slot::parse(""), Slot::param(""));
    }

    #[test]
    fn rpc_v1_names_only_scalars_specially() {
        assert_eq!(RpcSlot::parse("a0"), RpcSlot::Scalar(ScalarRegister::A0));
        assert_eq!(RpcSlot::parse("d3"), RpcSlot::Parameter("d3".into()));
        assert_eq!(RpcSlot::parse("Exception"), RpcSlot::Parameter("Exception".into()));
        assert_eq!(RpcSlot::from(Register::A1), RpcSlot::Parameter("A1".into()));
        assert_eq!(RpcSlot::from(Slot::Exception), RpcSlot::Parameter("exception".into()));
        assert_eq!(RpcSlot::from(Register::D0), RpcSlot::Scalar(ScalarRegister::D0));
    }

    #[test]
    fn slot_value_integer_view() {
        assert_eq!(SlotValue::Word(9).as_u32(), Some(9));
        assert_eq!(SlotValue::Param(RpcParam::u16(4)).as_u32(), Some(4));
        let text = RpcParam::new(false, "4s", "ab").unwrap();
        assert_eq!(SlotValue::Param(text).as_u32(), None);
    }
}
