//! Find the memo database on a running emulator and print its header.
//!
//! Run with:
//!   cargo run --example memo-lookup -- traps.json [DatabaseName]
//!
//! `traps.json` maps trap names to numbers, for example:
//!   { "sysTrapDmFindDatabase": "0xA045", "sysTrapDmDatabaseInfo": "0xA046", ... }

use emurpc::session::calls::{
    dm_database_info, dm_find_database, mem_ptr_new, mem_read_memory, mem_write_memory,
};
use emurpc::session::{connect, TrapTable};
use emurpc::transport::TcpTransport;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let traps_path = args.next().ok_or("usage: memo-lookup TRAPS.json [NAME]")?;
    let name = args.next().unwrap_or_else(|| "MemoDB".to_string());

    let traps = TrapTable::load(&traps_path)?;
    let mut session = connect(&TcpTransport::default())?;
    eprintln!("Connected to {}", session.peer_addr()?);

    let id = dm_find_database(&mut session, &traps, 0, &name)?;
    if id == 0 {
        eprintln!("{name} not found");
        return Ok(());
    }
    let info = dm_database_info(&mut session, &traps, 0, id)?;
    println!(
        "{name}: id=0x{id:08X} version={} modnum={}",
        info.version, info.modification_number
    );

    // Scratch round trip through the emulated heap.
    let buf = mem_ptr_new(&mut session, &traps, name.len() as u32)?;
    mem_write_memory(&mut session, buf, name.clone().into_bytes())?;
    let back = mem_read_memory(&mut session, buf, name.len() as u16)?;
    println!("heap 0x{buf:08X}: {}", String::from_utf8_lossy(&back));

    session.close()?;
    Ok(())
}
