use std::fs;

use emurpc_session::calls::{mem_read_memory, mem_write_memory};
use serde::Serialize;

use crate::cmd::{Connection, ReadArgs, WriteArgs};
use crate::exit::{io_error, session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_memory, print_record, OutputFormat};

pub fn read(args: ReadArgs, conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    let mut session = conn.open()?;
    let data = mem_read_memory(&mut session, args.address, args.length)
        .map_err(|err| session_error("read failed", err))?;
    print_memory(args.address, &data, format);
    Ok(SUCCESS)
}

#[derive(Serialize)]
struct WriteOutput {
    address: u32,
    written: usize,
}

pub fn write(args: WriteArgs, conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    let mut payload = resolve_payload(&args)?;
    if args.nul {
        payload.push(0);
    }
    if payload.is_empty() {
        return Err(CliError::new(USAGE, "nothing to write: use --data, --hex or --file"));
    }
    let written = payload.len();

    let mut session = conn.open()?;
    mem_write_memory(&mut session, args.address, payload)
        .map_err(|err| session_error("write failed", err))?;

    let out = WriteOutput {
        address: args.address,
        written,
    };
    let rows = [
        ("address", format!("0x{:08X}", out.address)),
        ("written", out.written.to_string()),
    ];
    print_record(&out, &rows, format);
    Ok(SUCCESS)
}

fn resolve_payload(args: &WriteArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = input
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::new(USAGE, "--hex needs an even number of digits"));
    }
    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| CliError::new(USAGE, format!("invalid hex in --hex: {input}")))
        })
        .collect()
}
