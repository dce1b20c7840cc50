use emurpc_session::calls::mem_ptr_new;
use serde::Serialize;

use crate::cmd::{AllocArgs, Connection};
use crate::exit::{session_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct AllocOutput {
    size: u32,
    address: u32,
}

pub fn run(args: AllocArgs, conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    let traps = conn.trap_table()?;
    let mut session = conn.open()?;
    let address = mem_ptr_new(&mut session, &traps, args.size)
        .map_err(|err| session_error("MemPtrNew failed", err))?;

    let out = AllocOutput {
        size: args.size,
        address,
    };
    let rows = [
        ("size", out.size.to_string()),
        ("address", format!("0x{address:08X}")),
    ];
    print_record(&out, &rows, format);

    // MemPtrNew returns NULL when the heap is exhausted.
    Ok(if address == 0 { FAILURE } else { SUCCESS })
}
