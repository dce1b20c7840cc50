//! Packet bodies for the emulator debugger protocol.
//!
//! A packet knows how to marshal itself into a frame body and how to
//! unmarshal the reply body back into its own fields. The variants are:
//! - [`RawPacket`] — the bare two-byte command header
//! - [`MemoryRead`] / [`MemoryWrite`] — emulated memory access
//! - [`RpcPacket`] — trap call with fixed A0/D0 result registers
//! - [`Rpc2Packet`] — trap call with exception code and a masked register set
//!
//! Trap parameters are [`RpcParam`] values, addressed by name through
//! [`Slot`] ([`RpcSlot`] on RPC-v1). Replies are matched to parameters by position, so the names
//! declared before a call are exactly the names read back after it.

pub mod error;
pub mod memory;
pub mod packet;
pub mod param;
pub mod register;
pub mod rpc;
pub mod rpc2;
pub mod slot;

pub use error::{PacketError, Result};
pub use memory::{hexdump, MemoryRead, MemoryWrite};
pub use packet::{command, destination, Packet, RawPacket};
pub use param::{ParamType, RpcParam, Value};
pub use register::{Register, RegisterSet};
pub use rpc::{ParameterList, RpcPacket};
pub use rpc2::Rpc2Packet;
pub use slot::{RpcSlot, ScalarRegister, Slot, SlotValue};
