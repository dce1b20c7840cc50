use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use emurpc_frame::HeaderVerified;
use emurpc_session::{connect_with_config, Session, SessionConfig, TrapTable};
use emurpc_transport::{TcpTransport, DEFAULT_HOST, DEFAULT_PORT};

use crate::exit::{session_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod alloc;
pub mod call;
pub mod db;
pub mod key;
pub mod memory;
pub mod ticks;
pub mod traps;
pub mod version;

use call::{ParamSpec, RegisterSpec};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read emulated memory and print it.
    Read(ReadArgs),
    /// Write bytes into emulated memory.
    Write(WriteArgs),
    /// Allocate a block on the emulated heap.
    Alloc(AllocArgs),
    /// Call an OS trap with typed parameters.
    Call(CallArgs),
    /// Type text into the emulator's event queue.
    Key(KeyArgs),
    /// List databases, or show one by name.
    Db(DbArgs),
    /// Print the system tick rate.
    Ticks,
    /// List the loaded trap table.
    Traps,
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Read(args) => memory::read(args, conn, format),
        Command::Write(args) => memory::write(args, conn, format),
        Command::Alloc(args) => alloc::run(args, conn, format),
        Command::Call(args) => call::run(args, conn, format),
        Command::Key(args) => key::run(args, conn, format),
        Command::Db(args) => db::run(args, conn, format),
        Command::Ticks => ticks::run(conn, format),
        Command::Traps => traps::run(conn, format),
        Command::Version(args) => version::run(args),
    }
}

/// Emulator endpoint and session settings shared by every subcommand.
#[derive(Args, Debug)]
pub struct Connection {
    /// Emulator host.
    #[arg(long, env = "EMURPC_HOST", default_value = DEFAULT_HOST, global = true)]
    pub host: String,
    /// Emulator debugger port.
    #[arg(long, env = "EMURPC_PORT", default_value_t = DEFAULT_PORT, global = true)]
    pub port: u16,
    /// Socket read/write timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", global = true)]
    pub timeout: String,
    /// JSON trap table mapping trap names to numbers.
    #[arg(long, env = "EMURPC_TRAPS", value_name = "FILE", global = true)]
    pub traps: Option<PathBuf>,
    /// Check reply header checksums.
    #[arg(long, global = true)]
    pub verify: bool,
}

impl Connection {
    pub fn transport(&self) -> TcpTransport {
        TcpTransport::new(self.host.clone(), self.port)
    }

    pub fn open(&self) -> CliResult<Session> {
        let timeout = parse_duration(&self.timeout)?;
        let mut config = SessionConfig::default().with_timeout(Some(timeout));
        if self.verify {
            config = config.with_integrity(HeaderVerified);
        }
        let transport = self.transport().with_connect_timeout(timeout);
        connect_with_config(&transport, config).map_err(|err| session_error("connect failed", err))
    }

    /// The trap table from `--traps`, or an empty one.
    pub fn trap_table(&self) -> CliResult<TrapTable> {
        match &self.traps {
            Some(path) => {
                TrapTable::load(path).map_err(|err| session_error("trap table", err))
            }
            None => Ok(TrapTable::new()),
        }
    }
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Start address (decimal or 0x hex).
    #[arg(value_parser = parse_address)]
    pub address: u32,
    /// Number of bytes to read.
    pub length: u16,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Start address (decimal or 0x hex).
    #[arg(value_parser = parse_address)]
    pub address: u32,
    /// String payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex payload, e.g. 48656c6c6f00.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
    /// Append a NUL terminator to the payload.
    #[arg(long)]
    pub nul: bool,
}

#[derive(Args, Debug)]
pub struct AllocArgs {
    /// Block size in bytes.
    #[arg(value_parser = parse_address)]
    pub size: u32,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Trap number (decimal or 0x hex) or a name from the trap table.
    pub trap: String,
    /// Use the original RPC packet (A0/D0 only, no registers).
    #[arg(long)]
    pub v1: bool,
    /// Parameter as [&]NAME:TYPE[=VALUE]; TYPE is B, H, L or <N>s, `&` passes by reference.
    #[arg(long = "param", short = 'p', value_name = "SPEC", value_parser = call::parse_param_spec)]
    pub params: Vec<ParamSpec>,
    /// Register value as REG=VALUE. With --v1 only A0 and D0 are accepted.
    #[arg(long = "reg", value_name = "REG=VALUE", value_parser = call::parse_register_spec)]
    pub registers: Vec<RegisterSpec>,
    /// Exception word sent with the call.
    #[arg(long, value_parser = parse_address, conflicts_with = "v1")]
    pub exception: Option<u32>,
}

#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Text to type, one key event per character.
    pub text: String,
    /// Key code sent with every character.
    #[arg(long, default_value_t = 0)]
    pub keycode: u16,
    /// Modifier flags sent with every character.
    #[arg(long, default_value_t = 0)]
    pub modifiers: u16,
}

#[derive(Args, Debug)]
pub struct DbArgs {
    /// Database name. Lists every database when omitted.
    pub name: Option<String>,
    /// Memory card number.
    #[arg(long, default_value_t = 0)]
    pub card: u16,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Parse a 32-bit number written as decimal or `0x` hex.
pub fn parse_address(input: &str) -> Result<u32, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("'{input}' is not a 32-bit decimal or 0x hex number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert_eq!(parse_duration("").unwrap_err().code, USAGE);
    }

    #[test]
    fn parse_address_forms() {
        assert_eq!(parse_address("0x3000"), Ok(0x3000));
        assert_eq!(parse_address("0XFFFFFFFF"), Ok(u32::MAX));
        assert_eq!(parse_address("4096"), Ok(4096));
        assert!(parse_address("0x1_0000_0000").is_err());
        assert!(parse_address("-1").is_err());
    }

    #[test]
    fn missing_trap_file_is_usage_error() {
        let conn = Connection {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            timeout: "1s".into(),
            traps: Some(PathBuf::from("/nonexistent/traps.json")),
            verify: false,
        };
        assert_eq!(conn.trap_table().unwrap_err().code, USAGE);
        assert_eq!(conn.transport().endpoint(), "localhost:6414");
    }
}
