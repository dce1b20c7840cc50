use emurpc_session::calls::{
    dm_database_info, dm_find_database, dm_get_database, dm_get_last_error, dm_num_databases,
};
use emurpc_session::{DatabaseInfo, Session, TrapTable};
use serde::Serialize;
use tracing::{debug, warn};

use crate::cmd::{Connection, DbArgs};
use crate::exit::{session_error, CliResult, FAILURE, SUCCESS};
use crate::output::{four_cc, print_list, OutputFormat};

#[derive(Serialize)]
struct DatabaseOutput {
    id: u32,
    #[serde(flatten)]
    info: DatabaseInfo,
}

impl DatabaseOutput {
    fn row(&self) -> Vec<String> {
        vec![
            format!("0x{:08X}", self.id),
            self.info.name.clone(),
            four_cc(self.info.db_type),
            four_cc(self.info.creator),
            self.info.version.to_string(),
            format!("0x{:04X}", self.info.attributes),
            self.info.modification_number.to_string(),
        ]
    }
}

const HEADER: [&str; 7] = ["ID", "NAME", "TYPE", "CREATOR", "VERSION", "ATTRIBUTES", "MODNUM"];

fn describe(
    session: &mut Session,
    traps: &TrapTable,
    card: u16,
    id: u32,
) -> CliResult<DatabaseOutput> {
    let info = dm_database_info(session, traps, card, id)
        .map_err(|err| session_error("DmDatabaseInfo failed", err))?;
    if info.result != 0 {
        warn!(id, result = info.result, "DmDatabaseInfo returned an error");
    }
    Ok(DatabaseOutput { id, info })
}

pub fn run(args: DbArgs, conn: &Connection, format: OutputFormat) -> CliResult<i32> {
    let traps = conn.trap_table()?;
    let mut session = conn.open()?;

    let mut items = Vec::new();
    match &args.name {
        Some(name) => {
            let id = dm_find_database(&mut session, &traps, args.card, name)
                .map_err(|err| session_error("DmFindDatabase failed", err))?;
            if id == 0 {
                let code = dm_get_last_error(&mut session, &traps).unwrap_or_default();
                eprintln!("database '{name}' not found (DmGetLastErr 0x{code:04X})");
                return Ok(FAILURE);
            }
            items.push(describe(&mut session, &traps, args.card, id)?);
        }
        None => {
            let count = dm_num_databases(&mut session, &traps, args.card)
                .map_err(|err| session_error("DmNumDatabases failed", err))?;
            debug!(card = args.card, count, "listing databases");
            for index in 0..count {
                // DmGetDatabase takes a 16-bit index
                let Ok(index) = u16::try_from(index) else {
                    break;
                };
                let id = dm_get_database(&mut session, &traps, args.card, index)
                    .map_err(|err| session_error("DmGetDatabase failed", err))?;
                if id == 0 {
                    continue;
                }
                items.push(describe(&mut session, &traps, args.card, id)?);
            }
        }
    }

    let rows = items.iter().map(DatabaseOutput::row).collect();
    print_list(&items, &HEADER, rows, format);
    Ok(SUCCESS)
}
