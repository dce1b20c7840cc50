use std::collections::BTreeMap;

use emurpc_packet::{
    Packet, ParamType, Register, Rpc2Packet, RpcPacket, RpcParam, Slot, SlotValue, Value,
};
use emurpc_session::{parse_trap_number, SessionError, TrapTable};
use serde::Serialize;
use tracing::debug;

use crate::cmd::{parse_address, CallArgs, Connection};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

/// A `--param` argument: `[&]NAME:TYPE[=VALUE]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub byref: bool,
    pub ty: ParamType,
    pub value: Option<String>,
}

impl ParamSpec {
    fn to_param(&self) -> Result<RpcParam, String> {
        let value = self.value.as_deref().unwrap_or_default();
        let value = match self.ty {
            ParamType::FixedString(_) => Value::from(value),
            _ if value.is_empty() => Value::Int(0),
            _ => Value::Int(parse_address(value)?),
        };
        RpcParam::typed(self.byref, self.ty, value).map_err(|err| err.to_string())
    }
}

pub fn parse_param_spec(input: &str) -> Result<ParamSpec, String> {
    let (byref, rest) = match input.strip_prefix('&') {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    let (decl, value) = match rest.split_once('=') {
        Some((decl, value)) => (decl, Some(value.to_string())),
        None => (rest, None),
    };
    let (name, tag) = decl
        .rsplit_once(':')
        .ok_or_else(|| format!("'{input}' is missing ':TYPE'"))?;
    if name.is_empty() {
        return Err(format!("'{input}' has an empty parameter name"));
    }
    let ty = tag.parse::<ParamType>().map_err(|err| err.to_string())?;

    let spec = ParamSpec {
        name: name.to_string(),
        byref,
        ty,
        value,
    };
    spec.to_param()?;
    Ok(spec)
}

/// A `--reg` argument: `REG=VALUE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterSpec {
    pub register: Register,
    pub value: u32,
}

pub fn parse_register_spec(input: &str) -> Result<RegisterSpec, String> {
    let (name, value) = input
        .split_once('=')
        .ok_or_else(|| format!("'{input}' is not REG=VALUE"))?;
    let register = name.trim().parse::<Register>().map_err(|err| err.to_string())?;
    Ok(RegisterSpec {
        register,
        value: parse_address(value)?,
    })
}

#[derive(Serialize)]
struct ParamOutput {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    byref: bool,
    value: serde_json::Value,
}

#[derive(Serialize)]
struct CallOutput {
    trap: u16,
    reply_command: Option<u8>,
    d0: u32,
    a0: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    exception: Option<u16>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    registers: BTreeMap<String, u32>,
    params: Vec<ParamOutput>,
}

impl CallOutput {
    fn rows(&self) -> Vec<(&str, String)> {
        let mut rows = vec![
            ("trap", format!("0x{:04X}", self.trap)),
            ("d0", format!("0x{:08X}", self.d0)),
            ("a0", format!("0x{:08X}", self.a0)),
        ];
        if let Some(exception) = self.exception {
            rows.push(("exception", exception.to_string()));
        }
        for (name, value) in &self.registers {
            rows.push((name.as_str(), format!("0x{value:08X}")));
        }
        for param in &self.params {
            rows.push((param.name.as_str(), param.value.to_string()));
        }
        rows
    }
}

pub fn resolve_trap(name: &str, traps: &TrapTable) -> Result<u16, SessionError> {
    match parse_trap_number(name) {
        Some(trap) => Ok(trap),
        None => traps.resolve(name),
    }
}

/// Apply the parsed arguments through the packet's slot setter.
fn declare<F>(args: &CallArgs, mut set: F) -> Result<(), SessionError>
where
    F: FnMut(Slot, SlotValue) -> emurpc_packet::Result<()>,
{
    for spec in &args.params {
        let param = spec
            .to_param()
            .map_err(|reason| SessionError::Packet(emurpc_packet::PacketError::InvalidValue {
                ty: spec.ty.to_string(),
                reason,
            }))?;
        set(Slot::param(spec.name.as_str()), SlotValue::Param(param))?;
    }
    for reg in &args.registers {
        set(Slot::from(reg.register), SlotValue::Word(reg.value))?;
    }
    if let Some(exception) = args.exception {
        set(Slot::Exception, SlotValue::Word(exception))?;
    }
    Ok(())
}

/// `--reg` and `--exception` address the register file, which RPC-v1 lacks.
fn set_v1(pkt: &mut RpcPacket, slot: Slot, value: SlotValue) -> emurpc_packet::Result<()> {
    match slot {
        Slot::Register(_) | Slot::Exception => Err(emurpc_packet::PacketError::UnsupportedSlot {
            slot: slot.to_string(),
            reason: "RPC-v1 packets carry only the A0 and D0 registers",
        }),
        slot => pkt.set(slot, value),
    }
}

fn params_output<'a>(params: impl Iterator<Item = (&'a str, &'a RpcParam)>) -> Vec<ParamOutput> {
    let mut out: Vec<ParamOutput> = params
        .map(|(name, param)| ParamOutput {
            name: name.to_string(),
            ty: param.param_type().to_string(),
            byref: param.is_byref(),
            value: match param.value() {
                Value::Int(v) => serde_json::Value::from(*v),
                other => serde_json::Value::from(other.to_string_lossy().unwrap_or_default()),
            },
        })
        .collect();
    // declaration order
    out.reverse();
    out
}

pub fn run(args: CallArgs, conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    let traps = conn.trap_table()?;
    let trap = resolve_trap(&args.trap, &traps).map_err(|err| session_error("call", err))?;

    let output = if args.v1 {
        let mut pkt = RpcPacket::new(trap);
        declare(&args, |slot, value| set_v1(&mut pkt, slot, value))
            .map_err(|err| session_error("call", err))?;
        let mut session = conn.open()?;
        session
            .call(&mut pkt)
            .map_err(|err| session_error("call failed", err))?;
        debug!(trap, reply = ?pkt.reply_command(), "rpc call complete");
        CallOutput {
            trap,
            reply_command: pkt.reply_command(),
            d0: pkt.d0(),
            a0: pkt.a0(),
            exception: None,
            registers: BTreeMap::new(),
            params: params_output(pkt.params().iter()),
        }
    } else {
        let mut pkt = Rpc2Packet::new(trap);
        declare(&args, |slot, value| pkt.set(slot, value))
            .map_err(|err| session_error("call", err))?;
        let mut session = conn.open()?;
        session
            .call(&mut pkt)
            .map_err(|err| session_error("call failed", err))?;
        debug!(trap, reply = ?pkt.reply_command(), "rpc2 call complete");
        CallOutput {
            trap,
            reply_command: pkt.reply_command(),
            d0: pkt.d0(),
            a0: pkt.a0(),
            exception: Some(pkt.exception()),
            registers: pkt
                .registers()
                .iter()
                .map(|(reg, value)| (reg.to_string(), value))
                .collect(),
            params: params_output(pkt.params().iter()),
        }
    };

    print_record(&output, &output.rows(), format);
    Ok(SUCCESS)
}
