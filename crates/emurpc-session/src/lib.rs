//! Call sessions for the emulator RPC protocol.
//!
//! This is the "just works" layer: connect to a running emulator, send a
//! packet, get the same packet back with the reply decoded into it.
//!
//! ```no_run
//! use emurpc_packet::RpcPacket;
//! use emurpc_session::connect;
//! use emurpc_transport::TcpTransport;
//!
//! # fn main() -> emurpc_session::Result<()> {
//! let mut session = connect(&TcpTransport::default())?;
//! let mut pkt = RpcPacket::new(0xA2E9);
//! session.call(&mut pkt)?;
//! println!("D0 = {}", pkt.d0());
//! # Ok(())
//! # }
//! ```

pub mod calls;
pub mod config;
pub mod connector;
pub mod error;
pub mod session;
pub mod traps;

#[cfg(feature = "async")]
pub mod async_session;

pub use calls::DatabaseInfo;
pub use config::{SessionConfig, DEFAULT_PACKET_TYPE, DEFAULT_SOURCE, INITIAL_TRANSACTION_ID};
pub use connector::{connect, connect_with_config};
pub use error::{ErrorKind, Result, SessionError};
pub use session::{CallState, Session};
pub use traps::{parse_trap_number, TrapTable};

#[cfg(feature = "async")]
pub use async_session::{connect_async, AsyncSession};
