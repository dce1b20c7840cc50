//! Blocking TCP transport to a running emulator.
//!
//! The emulator listens for debugger/scripting clients on a TCP port
//! (6414 by default). This crate owns the connection lifecycle and hands
//! out an [`EmuStream`] that the frame layer reads and writes.
//!
//! This is the lowest layer of emurpc. Everything else builds on top of
//! the [`EmuStream`] type provided here.

pub mod error;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use tcp::{TcpTransport, DEFAULT_HOST, DEFAULT_PORT};
pub use traits::EmuStream;
