//! Ask the emulator for its tick rate from a tokio runtime.
//!
//! Run with:
//!   cargo run --example async-ticks --features async -- 0xA2E9
//!
//! The argument is the SysTicksPerSecond trap number for the emulated ROM.

use std::time::Duration;

use emurpc::packet::Rpc2Packet;
use emurpc::session::{connect_async, parse_trap_number, SessionConfig};
use emurpc::transport::TcpTransport;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let trap = std::env::args()
        .nth(1)
        .and_then(|arg| parse_trap_number(&arg))
        .ok_or("usage: async-ticks TRAP_NUMBER")?;

    let config = SessionConfig::default().with_timeout(Some(Duration::from_secs(3)));
    let mut session = connect_async(&TcpTransport::default(), config).await?;

    let mut pkt = Rpc2Packet::new(trap);
    session.call(&mut pkt).await?;
    println!("ticks per second: {}", pkt.d0());
    Ok(())
}
