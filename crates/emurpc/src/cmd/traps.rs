use serde::Serialize;

use crate::cmd::Connection;
use crate::exit::{CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_list, OutputFormat};

#[derive(Serialize)]
struct TrapOutput<'a> {
    name: &'a str,
    trap: u16,
}

pub fn run(conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    if conn.traps.is_none() {
        return Err(CliError::new(
            USAGE,
            "no trap table: pass --traps FILE or set EMURPC_TRAPS",
        ));
    }
    let table = conn.trap_table()?;

    let items: Vec<TrapOutput<'_>> = table
        .iter()
        .map(|(name, trap)| TrapOutput { name, trap })
        .collect();
    let rows = items
        .iter()
        .map(|t| vec![t.name.to_string(), format!("0x{:04X}", t.trap)])
        .collect();
    print_list(&items, &["NAME", "TRAP"], rows, format);
    Ok(SUCCESS)
}
