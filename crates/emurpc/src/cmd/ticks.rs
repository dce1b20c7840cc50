use emurpc_session::calls::sys_ticks_per_second;
use serde::Serialize;

use crate::cmd::Connection;
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

#[derive(Serialize)]
struct TicksOutput {
    ticks_per_second: u32,
}

pub fn run(conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    let traps = conn.trap_table()?;
    let mut session = conn.open()?;
    let ticks_per_second = sys_ticks_per_second(&mut session, &traps)
        .map_err(|err| session_error("SysTicksPerSecond failed", err))?;

    let out = TicksOutput { ticks_per_second };
    print_record(
        &out,
        &[("ticks_per_second", ticks_per_second.to_string())],
        format,
    );
    Ok(SUCCESS)
}
